pub const DEFAULT_SESSION_COOKIE: &str = "sessionId";
pub const DEFAULT_MAX_HEADER_LINES: usize = 10_000;

/// Knobs for `parse_with_config`. `ParserConfig::default()` gives the
/// behaviour of plain `parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Cookie whose value becomes the request's session id. Matched case-sensitively.
    pub session_cookie_name: String,
    /// Percent-decode query, form and cookie values.
    pub percent_decode: bool,
    /// Scan multipart bodies without a `boundary=` parameter using the
    /// line-based heuristic scanner instead of skipping file extraction.
    pub heuristic_multipart_fallback: bool,
    /// Header field lines past this count are dropped and flagged. The
    /// default is far above what any real client sends.
    pub max_header_lines: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            percent_decode: false,
            heuristic_multipart_fallback: true,
            max_header_lines: DEFAULT_MAX_HEADER_LINES,
        }
    }
}

impl ParserConfig {
    pub fn with_session_cookie_name(mut self, name: &str) -> Self {
        self.session_cookie_name = name.to_string();
        self
    }

    pub fn with_percent_decode(mut self, enabled: bool) -> Self {
        self.percent_decode = enabled;
        self
    }

    pub fn with_heuristic_multipart_fallback(mut self, enabled: bool) -> Self {
        self.heuristic_multipart_fallback = enabled;
        self
    }

    pub fn with_max_header_lines(mut self, max: usize) -> Self {
        self.max_header_lines = max;
        self
    }
}
