use log::{debug, warn};
use percent_encoding::percent_decode_str;

use super::types::{Degradation, ParameterSource, Parameters};

/// Decodes `%XX` escapes, replacing invalid UTF-8. Only allocates a new
/// string when there is something to decode.
pub fn percent_decode(value: &str, plus_as_space: bool) -> String {
    let value = if plus_as_space && value.contains('+') {
        value.replace('+', " ")
    } else {
        value.to_string()
    };
    if value.contains('%') {
        percent_decode_str(&value).decode_utf8_lossy().into_owned()
    } else {
        value
    }
}

/// Parses `key=value&key=value` into `params`.
///
/// A pair with no `=` is stored with an empty value, including the empty
/// pair of `a=1&&b=2` or a trailing `&`, which becomes `"" -> ""`. A pair
/// with more than one `=` is dropped and reported.
pub fn parse_pairs(
    input: &str,
    source: ParameterSource,
    decode: bool,
    params: &mut Parameters,
) -> Vec<Degradation> {
    let mut degradations = Vec::new();
    for pair in input.split('&') {
        let tokens: Vec<&str> = pair.split('=').collect();
        let (key, value) = match tokens.as_slice() {
            [key] => (*key, ""),
            [key, value] => (*key, *value),
            _ => {
                warn!(target: "parser", "Dropping malformed {source} parameter \"{pair}\"");
                degradations.push(Degradation::MalformedParameter {
                    source,
                    pair: pair.to_string(),
                });
                continue;
            }
        };

        if decode {
            params.insert(percent_decode(key, true), percent_decode(value, true));
        } else {
            params.insert(key, value.to_string());
        }
    }
    degradations
}

pub struct ParsedTarget {
    pub path: String,
    pub query: Parameters,
    pub degradations: Vec<Degradation>,
}

/// Splits a request target into its path and query parameters.
///
/// Only targets containing both `?` and `=` are split; anything else is
/// returned as the path unchanged, so `/search?flag` keeps its query string.
pub fn parse_target(target: &str, decode: bool) -> ParsedTarget {
    let mut query = Parameters::new();
    let (path, degradations) = match target.split_once('?') {
        Some((path, query_string)) if target.contains('=') => {
            debug!(target: "parser", "Parsing query string \"{query_string}\"");
            let degradations = parse_pairs(query_string, ParameterSource::Query, decode, &mut query);
            (path, degradations)
        }
        _ => (target, Vec::new()),
    };

    ParsedTarget {
        path: path.to_string(),
        query,
        degradations,
    }
}

/// Parses an `application/x-www-form-urlencoded` body.
pub fn parse_form_body(body: &[u8], decode: bool, params: &mut Parameters) -> Vec<Degradation> {
    let body = String::from_utf8_lossy(body);
    parse_pairs(&body, ParameterSource::Body, decode, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_with_query() {
        let parsed = parse_target("/search?q=cats&empty", false);
        assert_eq!(parsed.path, "/search");
        assert_eq!(parsed.query.get_all("q"), ["cats"]);
        assert_eq!(parsed.query.get_all("empty"), [""]);
        assert!(parsed.degradations.is_empty());
    }

    #[test]
    fn target_without_query() {
        let parsed = parse_target("/echo/falls/spring", false);
        assert_eq!(parsed.path, "/echo/falls/spring");
        assert!(parsed.query.is_empty());
    }

    #[test]
    fn target_query_without_equals_is_untouched() {
        let parsed = parse_target("/search?flag", false);
        assert_eq!(
            parsed.path, "/search?flag",
            "A query string with no '=' should not be split"
        );
        assert!(parsed.query.is_empty());
    }

    #[test]
    fn target_splits_on_first_question_mark() {
        let parsed = parse_target("/a?next=/b?c", false);
        assert_eq!(parsed.path, "/a");
        assert_eq!(parsed.query.get_all("next"), ["/b?c"]);
    }

    #[test]
    fn duplicate_keys_are_preserved() {
        let parsed = parse_target("/list?tag=a&tag=b&tag=c", false);
        assert_eq!(parsed.query.get_all("tag"), ["a", "b", "c"]);
    }

    #[test]
    fn malformed_pairs_are_dropped() {
        let mut params = Parameters::new();
        let degradations = parse_pairs("a=1&b=2=3&c=4", ParameterSource::Body, false, &mut params);
        assert_eq!(params.len(), 2);
        assert!(!params.contains_key("b"));
        assert_eq!(
            degradations,
            [Degradation::MalformedParameter {
                source: ParameterSource::Body,
                pair: "b=2=3".to_string()
            }]
        );
    }

    #[test]
    fn empty_pairs_become_empty_keys() {
        let mut params = Parameters::new();
        let degradations = parse_pairs("a=1&&b=2&", ParameterSource::Body, false, &mut params);
        assert_eq!(params.keys().collect::<Vec<_>>(), ["a", "", "b"]);
        assert_eq!(params.get_all(""), ["", ""]);
        assert!(degradations.is_empty());
    }

    #[test]
    fn empty_form_body() {
        let mut params = Parameters::new();
        parse_form_body(b"", false, &mut params);
        assert_eq!(params.get_all(""), [""]);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn empty_query_pair() {
        let parsed = parse_target("/s?a=1&&b=2", false);
        assert_eq!(parsed.path, "/s");
        assert_eq!(parsed.query.keys().collect::<Vec<_>>(), ["a", "", "b"]);
    }

    #[test]
    fn form_body_single_pair() {
        let mut params = Parameters::new();
        parse_form_body(b"name=value", false, &mut params);
        assert_eq!(params.get_all("name"), ["value"]);
    }

    #[test]
    fn form_body_raw_by_default() {
        let mut params = Parameters::new();
        parse_form_body(b"greeting=hello+world%21", false, &mut params);
        assert_eq!(params.get_all("greeting"), ["hello+world%21"]);
    }

    #[test]
    fn form_body_decoded() {
        let mut params = Parameters::new();
        parse_form_body(b"greeting=hello+world%21&caf%C3%A9=1", true, &mut params);
        assert_eq!(params.get_all("greeting"), ["hello world!"]);
        assert_eq!(params.get_all("café"), ["1"]);
    }

    #[test]
    fn percent_decode_invalid_sequences() {
        assert_eq!(percent_decode("100%", false), "100%");
        assert_eq!(percent_decode("%zz", false), "%zz");
        assert_eq!(percent_decode("a+b", false), "a+b");
        assert_eq!(percent_decode("a+b", true), "a b");
    }
}
