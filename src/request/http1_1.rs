use log::{debug, warn};

use super::bytes::find;
use super::headers::content_type::parse_content_type;
use super::headers::cookie::extract_cookies;
use super::multipart::{parse_heuristic, parse_with_boundary};
use super::params::{parse_form_body, parse_target};
use super::types::*;
use crate::config::ParserConfig;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug)]
struct StartLine {
    method: String,
    target: String,
    version: String,
}

/// Splits a raw message at the first blank line into the header block and
/// the body. Neither slice contains the `\r\n\r\n` between them.
pub fn split_head_and_body(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    find(raw, HEAD_TERMINATOR).map(|pos| (&raw[..pos], &raw[pos + HEAD_TERMINATOR.len()..]))
}

fn parse_start_line(line: &str) -> Result<StartLine, RequestParseError> {
    let segments: Vec<&str> = line.split(' ').collect();
    match segments.as_slice() {
        [] | [""] => Err(RequestParseError::InvalidStartLine("Empty")),
        [_] | [_, _] => Err(RequestParseError::InvalidStartLine("Too few segments")),
        [method, target, version, ..] => Ok(StartLine {
            method: method.to_ascii_uppercase(),
            target: target.to_string(),
            version: version.to_string(),
        }),
    }
}

fn parse_headers<'a, I: Iterator<Item = &'a str>>(
    lines: I,
    config: &ParserConfig,
    degradations: &mut Vec<Degradation>,
) -> HTTPHeaders {
    let mut headers = HTTPHeaders::new();
    let mut accepted = 0;
    for line in lines.filter(|line| !line.is_empty()) {
        let Some((name, value)) = line
            .split_once(':')
            .filter(|_| accepted < config.max_header_lines)
        else {
            warn!(target: "parser", "Dropping header line \"{line}\"");
            degradations.push(Degradation::MalformedHeaderLine(line.to_string()));
            continue;
        };

        headers.insert(name.trim(), value.trim().to_string());
        accepted += 1;
    }
    headers
}

fn parse_content_length(headers: &HTTPHeaders, degradations: &mut Vec<Degradation>) -> u64 {
    let Some(value) = headers.get_last_ignore_ascii_case("Content-Length") else {
        return 0;
    };
    value.parse().unwrap_or_else(|_| {
        warn!(target: "parser", "{value} is not a valid Content-Length, using 0");
        degradations.push(Degradation::InvalidContentLength(value.clone()));
        0
    })
}

fn extract_files(request: &mut ParsedRequest, config: &ParserConfig) {
    let outcome = match request.content_type_info.boundary.as_deref() {
        Some(boundary) => parse_with_boundary(&request.body, boundary),
        None if config.heuristic_multipart_fallback => {
            warn!(target: "parser", "No multipart boundary declared, scanning lines instead");
            parse_heuristic(&request.body)
        }
        None => {
            warn!(target: "parser", "No multipart boundary declared, skipping files");
            request.degradations.push(Degradation::MissingBoundary);
            return;
        }
    };

    for (name, value) in outcome.fields.iter_flat() {
        request.body_parameters.insert(name, value.clone());
    }
    request.uploaded_files = outcome.files;
    request.form_fields = outcome.fields;
    request.body = outcome.remaining_body;
    request.degradations.extend(outcome.degradations);
}

/// Parses one HTTP/1.x request message. Never fails: a message that is not
/// a request comes back with `is_valid() == false` and the reason set.
pub fn parse_request(raw: &[u8], config: &ParserConfig) -> ParsedRequest {
    let Some((head, body)) = split_head_and_body(raw) else {
        warn!(target: "parser", "{}", RequestParseError::MissingHeaderTerminator);
        return ParsedRequest::invalid(RequestParseError::MissingHeaderTerminator);
    };

    let head = String::from_utf8_lossy(head).replace('\r', "");
    let mut lines = head.split('\n');
    let start_line = match lines.next().map(parse_start_line) {
        Some(Ok(start_line)) => start_line,
        Some(Err(err)) => {
            warn!(target: "parser", "{err}");
            return ParsedRequest::invalid(err);
        }
        None => return ParsedRequest::invalid(RequestParseError::InvalidStartLine("Empty")),
    };
    debug!(
        target: "parser",
        "Parsing {} {} {}", start_line.method, start_line.target, start_line.version
    );

    let mut request = ParsedRequest {
        method: start_line.method,
        target: start_line.target,
        http_version: start_line.version,
        body: body.to_vec(),
        ..ParsedRequest::default()
    };

    if request.method == "GET" {
        let parsed = parse_target(&request.target, config.percent_decode);
        request.target = parsed.path;
        request.query_parameters = parsed.query;
        request.degradations.extend(parsed.degradations);
    }

    request.headers = parse_headers(lines, config, &mut request.degradations);
    request.content_length = parse_content_length(&request.headers, &mut request.degradations);
    request.content_type = request
        .headers
        .get_last_ignore_ascii_case("Content-Type")
        .cloned()
        .unwrap_or_default();
    request.content_type_info = parse_content_type(&request.content_type);
    request.multipart = request.content_type.contains("multipart");

    if request.content_type.contains("urlencoded") {
        let degradations =
            parse_form_body(&request.body, config.percent_decode, &mut request.body_parameters);
        request.degradations.extend(degradations);
    }

    let cookies = extract_cookies(&request.headers, config);
    request.cookies = cookies.cookies;
    request.session_id = cookies.session_id;
    request.degradations.extend(cookies.degradations);

    if request.multipart {
        let actual = request.body.len() as u64;
        request.file_extraction_attempted = actual == request.content_length;
        if request.file_extraction_attempted {
            extract_files(&mut request, config);
        } else {
            warn!(
                target: "parser",
                "Content-Length ({}) does not match the body length ({actual}), skipping files",
                request.content_length
            );
            request.degradations.push(Degradation::BodyLengthMismatch {
                declared: request.content_length,
                actual,
            });
        }
    }

    request.valid = true;
    request
}
