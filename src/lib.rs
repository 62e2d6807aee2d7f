//! Turns raw HTTP/1.x request bytes into a [`ParsedRequest`].
//!
//! ```
//! let request = http_request_parser::parse(b"GET /search?q=cats HTTP/1.1\r\nHost: example.com\r\n\r\n");
//! assert!(request.is_valid());
//! assert_eq!(request.target(), "/search");
//! assert_eq!(request.parameter("q"), Some("cats"));
//! ```
//!
//! Parsing never fails outright. Malformed input either yields a request
//! with `is_valid() == false`, or a valid request whose
//! [`ParsedRequest::degradations`] list what was tolerated along the way.

pub mod config;
pub mod multimap;
pub mod request;

pub use config::ParserConfig;
pub use multimap::MultiMap;
pub use request::{
    Cookie, Degradation, HTTPMethod, HTTPVersion, ParameterSource, ParsedRequest,
    RequestParseError,
};

/// Parses one request message with the default configuration.
///
/// Header lines past [`config::DEFAULT_MAX_HEADER_LINES`] are dropped, each
/// with a [`Degradation::MalformedHeaderLine`].
pub fn parse(raw: &[u8]) -> ParsedRequest {
    parse_with_config(raw, &ParserConfig::default())
}

pub fn parse_with_config(raw: &[u8], config: &ParserConfig) -> ParsedRequest {
    request::http1_1::parse_request(raw, config)
}
