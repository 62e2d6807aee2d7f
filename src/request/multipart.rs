use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use super::bytes::{contains, find, find_from};
use super::types::{Degradation, Parameters, UploadedFiles};

static DISPOSITION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*name\s*=\s*(?:"([^"]*)"|([^;\s]*))"#)
        .expect("The regex should compile")
});
static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"([^"]*)"|([^;\s]*))"#)
        .expect("The regex should compile")
});

const DISPOSITION_MARKER: &[u8] = b"Content-Disposition:";

/// Files and fields pulled out of a multipart body.
#[derive(Debug, Default, PartialEq)]
pub struct MultipartOutcome {
    pub files: UploadedFiles,
    pub fields: Parameters,
    /// What is left of the body once the file parts are gone.
    pub remaining_body: Vec<u8>,
    pub degradations: Vec<Degradation>,
}

fn disposition_param(regex: &Regex, disposition: &str) -> Option<String> {
    regex.captures(disposition).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

/// Splits a part into its header block and content at the first blank line.
fn split_part(part: &[u8]) -> (&[u8], &[u8]) {
    if let Some(rest) = part
        .strip_prefix(b"\r\n")
        .or_else(|| part.strip_prefix(b"\n"))
    {
        return (&part[..0], rest);
    }

    let crlf = find(part, b"\r\n\r\n").map(|pos| (pos, pos + 4));
    let lf = find(part, b"\n\n").map(|pos| (pos, pos + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((head_end, content_start)) => (&part[..head_end], &part[content_start..]),
        None => (part, &part[part.len()..]),
    }
}

fn content_disposition(head: &[u8]) -> Option<String> {
    String::from_utf8_lossy(head).lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("Content-Disposition")
            .then(|| value.trim().to_string())
    })
}

/// Finds the next delimiter line, which must start the body or follow a newline.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(pos) = find_from(body, delimiter, from) {
        if pos == 0 || body[pos - 1] == b'\n' {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn strip_line_break(content: &[u8]) -> &[u8] {
    content
        .strip_suffix(b"\r\n")
        .or_else(|| content.strip_suffix(b"\n"))
        .unwrap_or(content)
}

/// Parses a multipart body using the boundary declared in its Content-Type.
///
/// Parts with a filename become files and are cut out of the body. Parts
/// with only a name become fields and stay in the body.
pub fn parse_with_boundary(body: &[u8], boundary: &str) -> MultipartOutcome {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut outcome = MultipartOutcome::default();
    let mut file_ranges: Vec<(usize, usize)> = Vec::new();
    let mut closed = false;

    let mut cursor = find_delimiter(body, &delimiter, 0);
    let mut index = 0;
    while let Some(start) = cursor {
        let after_delimiter = start + delimiter.len();
        if body[after_delimiter..].starts_with(b"--") {
            closed = true;
            break;
        }
        let Some(line_end) = find_from(body, b"\n", after_delimiter) else {
            break;
        };
        let Some(next) = find_delimiter(body, &delimiter, line_end + 1) else {
            break;
        };

        let (head, content) = split_part(strip_line_break(&body[line_end + 1..next]));
        match content_disposition(head) {
            None => {
                warn!(target: "parser", "Multipart part {index} has no Content-Disposition, skipping");
                outcome
                    .degradations
                    .push(Degradation::MultipartPartWithoutDisposition { index });
            }
            Some(disposition) => {
                let filename = disposition_param(&DISPOSITION_FILENAME, &disposition);
                let name = disposition_param(&DISPOSITION_NAME, &disposition);
                match (filename, name) {
                    (Some(filename), _) if !filename.is_empty() => {
                        debug!(target: "parser", "Extracted file \"{filename}\" ({} bytes)", content.len());
                        outcome.files.insert(filename, content.to_vec());
                        file_ranges.push((start, next));
                    }
                    // A file input left empty by the browser
                    (Some(_), _) => {}
                    (None, Some(name)) => {
                        let value = String::from_utf8_lossy(content).into_owned();
                        outcome.fields.insert(name, value);
                    }
                    (None, None) => {}
                }
            }
        }

        index += 1;
        cursor = Some(next);
    }

    if !closed {
        warn!(target: "parser", "Multipart body ends without a closing delimiter");
        outcome
            .degradations
            .push(Degradation::MultipartMissingClosingDelimiter);
    }

    let mut remaining = Vec::with_capacity(body.len());
    let mut kept_from = 0;
    for (start, end) in file_ranges {
        remaining.extend_from_slice(&body[kept_from..start]);
        kept_from = end;
    }
    remaining.extend_from_slice(&body[kept_from..]);
    outcome.remaining_body = remaining;
    outcome
}

/// Line scanner for multipart bodies that do not declare a boundary.
///
/// Boundary lines are recognised by the `WebKit` and `--------` markers
/// browsers put in generated boundaries. Content keeps its line endings
/// and every line gets a trailing `\n`. Scanning stops at the first part
/// without a filename.
pub fn parse_heuristic(body: &[u8]) -> MultipartOutcome {
    let mut outcome = MultipartOutcome {
        degradations: vec![Degradation::HeuristicMultipart],
        ..MultipartOutcome::default()
    };

    let start = find(body, DISPOSITION_MARKER).unwrap_or(0);
    let lines: Vec<&[u8]> = body[start..].split(|b| *b == b'\n').collect();

    let mut content: Vec<u8> = Vec::new();
    let mut filename: Option<String> = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if contains(line, b"Content-Disposition: ") {
            let cleaned = String::from_utf8_lossy(line)
                .replace("Content-Disposition: ", "")
                .replace("form-data; ", "")
                .replace(['\r', '"'], "");

            if let Some(previous) = filename.take() {
                outcome.files.insert(previous, std::mem::take(&mut content));
            }
            if !cleaned.contains("filename") {
                warn!(target: "parser", "Stopped reading files at field part \"{cleaned}\"");
                outcome
                    .degradations
                    .push(Degradation::MultipartStoppedAtField(cleaned));
                break;
            }

            let tokens: Vec<&str> = cleaned.split('=').collect();
            filename = tokens
                .windows(2)
                .find(|pair| pair[0].contains("filename") && pair[1] != "\r")
                .map(|pair| pair[1].to_string())
                .filter(|name| !name.is_empty());
            // Skip the part's Content-Type line and the blank line after it
            i += 3;
            continue;
        }

        if !contains(line, b"WebKit") && !contains(line, b"--------") {
            content.extend_from_slice(line);
            content.push(b'\n');
        }
        i += 1;
    }

    if let Some(filename) = filename {
        if outcome.files.is_empty() {
            outcome.files.insert(filename, content.clone());
        }
    }
    outcome.remaining_body = content;
    outcome
}
