/// What the parser needs to know from a Content-Type header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTypeInfo {
    /// The `type/subtype` part, trimmed, as sent.
    pub media_type: String,
    pub boundary: Option<String>,
    pub charset: Option<String>,
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Splits a Content-Type value into its media type and the parameters the
/// parser cares about. Never fails: malformed or unknown parameters are skipped.
pub fn parse_content_type(content_type: &str) -> ContentTypeInfo {
    let mut parts = content_type.split(';');
    let media_type = parts.next().unwrap_or_default().trim().to_string();

    let (mut charset, mut boundary) = (None, None);
    for param in parts {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let value = unquote(value);
        if value.is_empty() {
            continue;
        }
        match name.trim().to_ascii_lowercase().as_str() {
            "boundary" => boundary = Some(value.to_string()),
            "charset" => charset = Some(value.to_string()),
            _ => {}
        }
    }

    ContentTypeInfo {
        media_type,
        boundary,
        charset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_type() {
        let info = parse_content_type("");
        assert_eq!(info, ContentTypeInfo::default());
    }

    #[test]
    fn plain_media_type() {
        let info = parse_content_type("application/x-www-form-urlencoded");
        assert_eq!(info.media_type, "application/x-www-form-urlencoded");
        assert!(info.boundary.is_none());
        assert!(info.charset.is_none());
    }

    #[test]
    fn with_boundary() {
        let info = parse_content_type(
            "multipart/form-data; boundary=---------------------------1003363413119651595289485765",
        );
        assert_eq!(info.media_type, "multipart/form-data");
        assert_eq!(
            info.boundary,
            Some("---------------------------1003363413119651595289485765".to_string())
        );
        assert!(info.charset.is_none());
    }

    #[test]
    fn quoted_boundary() {
        let info = parse_content_type(r#"multipart/form-data; boundary="simple boundary""#);
        assert_eq!(info.boundary, Some("simple boundary".to_string()));
    }

    #[test]
    fn with_charset() {
        let info = parse_content_type("text/html;charset=utf-8");
        assert_eq!(info.media_type, "text/html");
        assert_eq!(info.charset, Some("utf-8".to_string()));
        assert!(info.boundary.is_none());
    }

    #[test]
    fn parameter_order_and_case_do_not_matter() {
        let first = parse_content_type("multipart/form-data; charset=UTF-8; boundary=aba");
        let second = parse_content_type("multipart/form-data; BOUNDARY=aba; Charset=UTF-8");
        assert_eq!(first, second, "Parameter order and case should not matter");
        assert_eq!(first.boundary, Some("aba".to_string()));
        assert_eq!(first.charset, Some("UTF-8".to_string()));
    }

    #[test]
    fn malformed_parameters_are_skipped() {
        let info = parse_content_type("multipart/form-data; garbage; boundary=; x=y");
        assert_eq!(info.media_type, "multipart/form-data");
        assert!(
            info.boundary.is_none(),
            "An empty boundary should not be treated as declared"
        );
    }
}
