use serde::{Serialize, Serializer};
use std::str::FromStr;

use super::headers::content_type::ContentTypeInfo;
use crate::multimap::MultiMap;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum HTTPMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    // More obscure methods below
    Connect,
    Options,
    Trace,
    Head,
}

#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub enum HTTPVersion {
    V0_9,
    V1_0,
    V1_1,
}

pub type HTTPHeaders = MultiMap<String>;
pub type Parameters = MultiMap<String>;
pub type UploadedFiles = MultiMap<Vec<u8>>;

/// Why a message could not be turned into a request at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RequestParseError {
    /// No `\r\n\r\n` separates the head from the body.
    MissingHeaderTerminator,
    InvalidStartLine(&'static str),
}

/// Something the parser tolerated instead of rejecting the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Degradation {
    /// Content-Length was present but not a non-negative integer; 0 was used.
    InvalidContentLength(String),
    /// A query or form pair with more than one `=` was dropped.
    MalformedParameter {
        source: ParameterSource,
        pair: String,
    },
    /// A header line without a `:`, or one past the configured line limit.
    MalformedHeaderLine(String),
    /// A Cookie header with no usable `name=value` pair.
    MalformedCookie(String),
    /// Multipart body length differs from Content-Length, so no files were extracted.
    BodyLengthMismatch { declared: u64, actual: u64 },
    /// The Content-Type had no boundary and the line scanner was used.
    HeuristicMultipart,
    /// Multipart body has no boundary and the fallback scanner is disabled.
    MissingBoundary,
    MultipartPartWithoutDisposition { index: usize },
    MultipartMissingClosingDelimiter,
    /// The line scanner met a field part and stopped; holds the cleaned header.
    MultipartStoppedAtField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterSource {
    Query,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// The outcome of parsing one request message.
///
/// Check [`ParsedRequest::is_valid`] before reading anything else: an
/// invalid request has every other field at its default.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRequest {
    pub(crate) valid: bool,
    pub(crate) invalid_reason: Option<RequestParseError>,
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) http_version: String,
    pub(crate) headers: HTTPHeaders,
    pub(crate) query_parameters: Parameters,
    pub(crate) body_parameters: Parameters,
    pub(crate) cookies: Vec<Cookie>,
    pub(crate) session_id: String,
    pub(crate) content_length: u64,
    pub(crate) content_type: String,
    #[serde(skip)]
    pub(crate) content_type_info: ContentTypeInfo,
    pub(crate) multipart: bool,
    pub(crate) file_extraction_attempted: bool,
    #[serde(serialize_with = "lossy_bytes")]
    pub(crate) body: Vec<u8>,
    #[serde(serialize_with = "lossy_files")]
    pub(crate) uploaded_files: UploadedFiles,
    pub(crate) form_fields: Parameters,
    pub(crate) degradations: Vec<Degradation>,
}

fn lossy_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn lossy_files<S: Serializer>(files: &UploadedFiles, serializer: S) -> Result<S::Ok, S::Error> {
    files
        .iter_flat()
        .map(|(name, data)| (name, String::from_utf8_lossy(data).into_owned()))
        .collect::<MultiMap<String>>()
        .serialize(serializer)
}

impl ParsedRequest {
    pub(crate) fn invalid(reason: RequestParseError) -> Self {
        Self {
            invalid_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalid_reason(&self) -> Option<&RequestParseError> {
        self.invalid_reason.as_ref()
    }

    /// The method token, uppercased.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The method as a known verb, if it is one.
    pub fn method_kind(&self) -> Option<HTTPMethod> {
        HTTPMethod::from_str(&self.method).ok()
    }

    /// Request target. For GET requests with a query string this is only the path.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    pub fn version_kind(&self) -> Option<HTTPVersion> {
        HTTPVersion::from_str(&self.http_version).ok()
    }

    /// Value of the session cookie, or `""` when there is none.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Last value received for a header. Names are matched ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get_last_ignore_ascii_case(name)
            .map(String::as_str)
    }

    /// Every value received for a header, in arrival order.
    pub fn headers(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all_ignore_ascii_case(name)
            .into_iter()
            .map(String::as_str)
            .collect()
    }

    pub fn header_map(&self) -> &HTTPHeaders {
        &self.headers
    }

    pub fn query_parameters(&self) -> &Parameters {
        &self.query_parameters
    }

    pub fn body_parameters(&self) -> &Parameters {
        &self.body_parameters
    }

    /// Last value for a parameter, looking at the body before the query string.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.body_parameters
            .get_last(name)
            .or_else(|| self.query_parameters.get_last(name))
            .map(String::as_str)
    }

    /// Query values followed by body values.
    pub fn parameters(&self, name: &str) -> Vec<&str> {
        self.query_parameters
            .get_all(name)
            .iter()
            .chain(self.body_parameters.get_all(name))
            .map(String::as_str)
            .collect()
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Declared Content-Length, 0 when missing or unparsable. Negative values
    /// count as unparsable, so `-1` reads as 0 with an `InvalidContentLength`
    /// degradation rather than as -1.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_type_info(&self) -> &ContentTypeInfo {
        &self.content_type_info
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// Whether the multipart body was complete enough to look for files.
    pub fn file_extraction_attempted(&self) -> bool {
        self.file_extraction_attempted
    }

    /// The body, minus any file parts pulled out of a multipart body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    pub fn uploaded_file(&self, filename: &str) -> Option<&[u8]> {
        self.uploaded_files.get(filename).map(Vec::as_slice)
    }

    /// Multipart parts that carried a field name but no filename.
    pub fn form_fields(&self) -> &Parameters {
        &self.form_fields
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

impl FromStr for HTTPMethod {
    type Err = ();
    fn from_str(s: &str) -> Result<HTTPMethod, Self::Err> {
        match s {
            "GET" => Ok(HTTPMethod::Get),
            "POST" => Ok(HTTPMethod::Post),
            "PUT" => Ok(HTTPMethod::Put),
            "PATCH" => Ok(HTTPMethod::Patch),
            "DELETE" => Ok(HTTPMethod::Delete),
            "CONNECT" => Ok(HTTPMethod::Connect),
            "OPTIONS" => Ok(HTTPMethod::Options),
            "TRACE" => Ok(HTTPMethod::Trace),
            "HEAD" => Ok(HTTPMethod::Head),
            _ => Err(()),
        }
    }
}

impl FromStr for HTTPVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/0.9" => Ok(HTTPVersion::V0_9),
            "HTTP/1.0" => Ok(HTTPVersion::V1_0),
            "HTTP/1.1" => Ok(HTTPVersion::V1_1),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RequestParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prelude = "Failed to parse request.";
        let content = match self {
            Self::MissingHeaderTerminator => {
                "No blank line separates the headers from the body".to_string()
            }
            Self::InvalidStartLine(reason) => format!("Start line is invalid: {reason}"),
        };
        write!(f, "{prelude}\n=>{content}")
    }
}

impl std::error::Error for RequestParseError {}

impl std::fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query string"),
            Self::Body => write!(f, "body"),
        }
    }
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContentLength(value) => {
                write!(f, "{value} is not a valid Content-Length, using 0")
            }
            Self::MalformedParameter { source, pair } => {
                write!(f, "Dropped malformed {source} parameter \"{pair}\"")
            }
            Self::MalformedHeaderLine(line) => write!(f, "Dropped header line \"{line}\""),
            Self::MalformedCookie(raw) => write!(f, "Could not read a cookie from \"{raw}\""),
            Self::BodyLengthMismatch { declared, actual } => write!(
                f,
                "Content-Length ({declared}) does not match the body length ({actual}), skipping files"
            ),
            Self::HeuristicMultipart => {
                write!(f, "No multipart boundary declared, scanning lines instead")
            }
            Self::MissingBoundary => write!(f, "No multipart boundary declared, skipping files"),
            Self::MultipartPartWithoutDisposition { index } => {
                write!(f, "Multipart part {index} has no Content-Disposition")
            }
            Self::MultipartMissingClosingDelimiter => {
                write!(f, "Multipart body ends without a closing delimiter")
            }
            Self::MultipartStoppedAtField(header) => {
                write!(f, "Stopped reading files at field part \"{header}\"")
            }
        }
    }
}
