use log::warn;

use crate::config::ParserConfig;
use crate::request::params::percent_decode;
use crate::request::types::{Cookie, Degradation, HTTPHeaders};

#[derive(Debug, Default, PartialEq)]
pub struct ExtractedCookies {
    pub cookies: Vec<Cookie>,
    pub session_id: String,
    pub degradations: Vec<Degradation>,
}

/// Reads the cookie carried by one Cookie header line: the first
/// `name=value` segment. Other `;`-separated segments are ignored.
pub fn parse_cookie(line: &str) -> Option<Cookie> {
    line.split(';')
        .filter_map(|segment| segment.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .find(|(name, _)| !name.is_empty())
        .map(|(name, value)| Cookie {
            name: name.to_string(),
            value: value.to_string(),
        })
}

/// One cookie per Cookie header line, in arrival order. The last cookie
/// named `config.session_cookie_name` provides the session id.
pub fn extract_cookies(headers: &HTTPHeaders, config: &ParserConfig) -> ExtractedCookies {
    let mut extracted = ExtractedCookies::default();
    for line in headers.get_all_ignore_ascii_case("Cookie") {
        let Some(mut cookie) = parse_cookie(line) else {
            warn!(target: "parser", "Ignoring unreadable Cookie header \"{line}\"");
            extracted
                .degradations
                .push(Degradation::MalformedCookie(line.clone()));
            continue;
        };

        if config.percent_decode {
            cookie.value = percent_decode(&cookie.value, false);
        }
        if cookie.name == config.session_cookie_name {
            extracted.session_id = cookie.value.clone();
        }
        extracted.cookies.push(cookie);
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_headers(lines: &[&str]) -> HTTPHeaders {
        lines.iter().map(|l| ("Cookie", l.to_string())).collect()
    }

    #[test]
    fn parse_simple_cookie() {
        assert_eq!(
            parse_cookie("sessionId=abc123"),
            Some(Cookie {
                name: "sessionId".to_string(),
                value: "abc123".to_string()
            })
        );
    }

    #[test]
    fn parse_takes_first_pair() {
        let cookie = parse_cookie(" theme = dark ; lang=en").expect("A cookie should be read");
        assert_eq!(cookie.name, "theme");
        assert_eq!(cookie.value, "dark");

        let cookie = parse_cookie("Secure; id=7").expect("Flags without values should be skipped");
        assert_eq!(cookie.name, "id");
    }

    #[test]
    fn parse_keeps_equals_in_value() {
        let cookie = parse_cookie("token=YWJj==").expect("A cookie should be read");
        assert_eq!(cookie.value, "YWJj==");
    }

    #[test]
    fn parse_garbage() {
        assert!(parse_cookie("").is_none());
        assert!(parse_cookie("nothing here").is_none());
        assert!(parse_cookie("=value").is_none(), "A cookie needs a name");
    }

    #[test]
    fn session_id_is_extracted() {
        let extracted = extract_cookies(
            &cookie_headers(&["theme=dark", "sessionId=abc123"]),
            &ParserConfig::default(),
        );
        assert_eq!(extracted.cookies.len(), 2);
        assert_eq!(extracted.cookies[0].name, "theme");
        assert_eq!(extracted.session_id, "abc123");
    }

    #[test]
    fn later_session_cookie_wins() {
        let extracted = extract_cookies(
            &cookie_headers(&["sessionId=first", "sessionId=second"]),
            &ParserConfig::default(),
        );
        assert_eq!(extracted.session_id, "second");
    }

    #[test]
    fn session_cookie_name_is_case_sensitive() {
        let extracted = extract_cookies(
            &cookie_headers(&["sessionid=abc"]),
            &ParserConfig::default(),
        );
        assert_eq!(extracted.session_id, "");
        assert_eq!(extracted.cookies.len(), 1);
    }

    #[test]
    fn custom_session_cookie_and_decoding() {
        let config = ParserConfig::default()
            .with_session_cookie_name("SID")
            .with_percent_decode(true);
        let extracted = extract_cookies(&cookie_headers(&["SID=a%20b"]), &config);
        assert_eq!(extracted.session_id, "a b");
    }

    #[test]
    fn unreadable_cookie_is_flagged() {
        let extracted = extract_cookies(&cookie_headers(&["junk"]), &ParserConfig::default());
        assert!(extracted.cookies.is_empty());
        assert_eq!(
            extracted.degradations,
            [Degradation::MalformedCookie("junk".to_string())]
        );
    }
}
