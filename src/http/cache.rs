//! HTTP cache validation helpers
//!
//! `ETag` comparison for `If-None-Match`, and HTTP-date parsing/formatting for
//! `Last-Modified` / `If-Modified-Since`.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// IMF-fixdate layout, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete RFC 850 layout, e.g. `Sunday, 06-Nov-94 08:49:37 GMT`
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// ANSI C `asctime()` layout, e.g. `Sun Nov  6 08:49:37 1994`
const ASCTIME_DATE: &str = "%a %b %e %H:%M:%S %Y";

/// Strip surrounding whitespace, an optional weak prefix and one pair of quotes.
fn strip_etag(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag)
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Quotes are ignored on both sides, so a bare hex tag and its quoted form
/// compare equal. Supports:
/// - Single `ETag`: `"abc123"` or `abc123`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
///
/// An empty tag never matches.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let etag = strip_etag(etag);
    if etag.is_empty() {
        return false;
    }
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || strip_etag(e) == etag
        })
    })
}

/// Format a timestamp as an IMF-fixdate HTTP date
pub fn format_http_date(time: &DateTime<Utc>) -> String {
    time.format(IMF_FIXDATE).to_string()
}

/// Parse an HTTP date in any of the three forms HTTP/1.1 allows
///
/// Returns `None` for anything unparsable; callers treat that as an absent header.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    [RFC850_DATE, ASCTIME_DATE]
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .map(|naive| naive.and_utc())
}

/// Drop sub-second precision; HTTP dates carry whole seconds only
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(0)
}

/// Check whether `If-Modified-Since` is at or after the resource's modification time
///
/// Both sides are compared in whole seconds. A missing or malformed header never matches.
pub fn check_not_modified_since(if_modified_since: Option<&str>, last_modified: &DateTime<Utc>) -> bool {
    if_modified_since
        .and_then(parse_http_date)
        .is_some_and(|since| since.timestamp() >= last_modified.timestamp())
}

/// Build a `Cache-Control` value for publicly cacheable content
pub fn public_max_age(max_age: u64) -> String {
    format!("public, max-age={max_age}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_check_etag_match() {
        let etag = "abc123";
        assert!(check_etag_match(Some("abc123"), etag));
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_empty_etag_never_matches() {
        assert!(!check_etag_match(Some("\"\""), ""));
        assert!(!check_etag_match(Some(""), ""));
    }

    #[test]
    fn test_http_date_roundtrip_forms() {
        let expected = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
        assert_eq!(format_http_date(&expected), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_malformed_date() {
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn test_not_modified_since() {
        let modified = Utc.with_ymd_and_hms(2013, 1, 18, 20, 50, 19).unwrap();
        assert!(check_not_modified_since(Some("Fri, 18 Jan 2013 20:50:19 GMT"), &modified));
        assert!(check_not_modified_since(Some("Sat, 19 Jan 2013 00:00:00 GMT"), &modified));
        assert!(!check_not_modified_since(Some("Fri, 18 Jan 2013 20:50:18 GMT"), &modified));
        assert!(!check_not_modified_since(Some("garbage"), &modified));
        assert!(!check_not_modified_since(None, &modified));
    }

    #[test]
    fn test_truncate_to_seconds() {
        let precise = Utc.timestamp_opt(1_000, 999_000_000).unwrap();
        let truncated = truncate_to_seconds(precise);
        assert_eq!(truncated.timestamp(), 1_000);
        assert_eq!(truncated.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_public_max_age() {
        assert_eq!(public_max_age(3600), "public, max-age=3600");
    }
}
