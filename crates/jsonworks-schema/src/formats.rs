//! Format validators for the `format` keyword.
//!
//! Formats apply to string instances only; any other kind passes, as does
//! any format name the engine does not know.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$"
        ).unwrap()
    })
}

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[-0-9a-z]{0,61}[0-9a-z])?)*\.?$",
        )
        .unwrap()
    })
}

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)$")
            .unwrap()
    })
}

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-(?:[0-9a-f]{4}-){3}[0-9a-f]{12}$").unwrap()
    })
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // ISO 8601 duration; a lone "P" or a "T" with no components is out.
        Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?)$")
            .unwrap()
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap())
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(z|([+-])(\d{2}):(\d{2}))?$").unwrap()
    })
}

const DAYS: [u32; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn is_date(s: &str) -> bool {
    let caps = match date_regex().captures(s) {
        Some(c) => c,
        None => return false,
    };
    let year: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    if !(1..=12).contains(&month) {
        return false;
    }
    let max_day = if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[month as usize]
    };
    (1..=max_day).contains(&day)
}

fn is_time(s: &str) -> bool {
    let caps = match time_regex().captures(s) {
        Some(c) => c,
        None => return false,
    };
    // An offset (or `Z`) is required for RFC 3339 full-time.
    if caps.get(4).is_none() {
        return false;
    }
    let hr: u32 = caps[1].parse().unwrap_or(99);
    let min: u32 = caps[2].parse().unwrap_or(99);
    let sec: f64 = caps[3].parse().unwrap_or(99.0);
    let tz_h: u32 = caps.get(6).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let tz_m: u32 = caps.get(7).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    if tz_h > 23 || tz_m > 59 {
        return false;
    }
    if hr <= 23 && min <= 59 && sec < 60.0 {
        return true;
    }
    // Leap second: 23:59:60 in UTC terms.
    let sign: i32 = if caps.get(5).map(|m| m.as_str()) == Some("-") {
        -1
    } else {
        1
    };
    let utc_min = min as i32 - tz_m as i32 * sign;
    let utc_hr = hr as i32 - tz_h as i32 * sign - if utc_min < 0 { 1 } else { 0 };
    (utc_hr == 23 || utc_hr == -1) && (utc_min == 59 || utc_min == -1) && sec < 61.0
}

fn is_date_time(s: &str) -> bool {
    let parts: Vec<&str> = s
        .splitn(2, |c: char| c == 't' || c == 'T' || c == ' ')
        .collect();
    parts.len() == 2 && is_date(parts[0]) && is_time(parts[1])
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<std::net::Ipv6Addr>().is_ok()
}

fn is_uri(s: &str) -> bool {
    Url::parse(s).is_ok() && !s.contains(char::is_whitespace)
}

fn is_uri_reference(s: &str) -> bool {
    if s.contains(char::is_whitespace) {
        return false;
    }
    match Url::parse(s) {
        Ok(_) => true,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            static BASE: OnceLock<Url> = OnceLock::new();
            let base = BASE.get_or_init(|| Url::parse("https://example.com/").unwrap());
            base.join(s).is_ok()
        }
        Err(_) => false,
    }
}

fn is_json_pointer(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if !s.starts_with('/') {
        return false;
    }
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.peek(), Some('0') | Some('1')) {
            return false;
        }
    }
    true
}

fn is_relative_json_pointer(s: &str) -> bool {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return false;
    }
    let rest = &s[digits.len()..];
    rest.is_empty() || rest == "#" || is_json_pointer(rest)
}

/// Checks an instance against a named format.
///
/// Returns `true` for non-string instances and for unknown format names.
pub fn check(format: &str, instance: &Value) -> bool {
    let s = match instance {
        Value::String(s) => s,
        _ => return true,
    };
    match format {
        "date" => is_date(s),
        "time" => is_time(s),
        "date-time" => is_date_time(s),
        "duration" => duration_regex().is_match(s) && s != "P" && !s.ends_with('T'),
        "email" => email_regex().is_match(s),
        "hostname" => s.len() <= 253 && hostname_regex().is_match(s),
        "ipv4" => ipv4_regex().is_match(s),
        "ipv6" => is_ipv6(s),
        "uri" => is_uri(s),
        "uri-reference" => is_uri_reference(s),
        "uuid" => uuid_regex().is_match(s),
        "regex" => Regex::new(s).is_ok(),
        "json-pointer" => is_json_pointer(s),
        "relative-json-pointer" => is_relative_json_pointer(s),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(format: &str, s: &str) -> bool {
        check(format, &json!(s))
    }

    #[test]
    fn test_date() {
        assert!(ok("date", "2024-02-29"));
        assert!(!ok("date", "2023-02-29"));
        assert!(!ok("date", "2023-13-01"));
        assert!(!ok("date", "not-a-date"));
    }

    #[test]
    fn test_time() {
        assert!(ok("time", "23:59:59Z"));
        assert!(ok("time", "10:05:08.123+01:00"));
        assert!(!ok("time", "10:05:08"));
        assert!(!ok("time", "24:00:00Z"));
    }

    #[test]
    fn test_date_time() {
        assert!(ok("date-time", "2023-06-01T10:05:08Z"));
        assert!(!ok("date-time", "2023-06-01"));
    }

    #[test]
    fn test_duration() {
        assert!(ok("duration", "P1Y2M3DT4H5M6S"));
        assert!(ok("duration", "P4W"));
        assert!(!ok("duration", "P"));
        assert!(!ok("duration", "P1DT"));
    }

    #[test]
    fn test_network_formats() {
        assert!(ok("ipv4", "192.168.0.1"));
        assert!(!ok("ipv4", "256.0.0.1"));
        assert!(ok("ipv6", "::1"));
        assert!(!ok("ipv6", "12345::"));
        assert!(ok("hostname", "example.com"));
        assert!(!ok("hostname", "-bad-.com"));
        assert!(ok("email", "a@example.com"));
        assert!(!ok("email", "not an email"));
    }

    #[test]
    fn test_uri_formats() {
        assert!(ok("uri", "https://example.com/a?b=c#d"));
        assert!(!ok("uri", "/relative/only"));
        assert!(ok("uri-reference", "/relative/only"));
        assert!(ok("uuid", "f81d4fae-7dec-11d0-a765-00a0c91e6bf6"));
        assert!(!ok("uuid", "f81d4fae"));
    }

    #[test]
    fn test_pointer_formats() {
        assert!(ok("json-pointer", ""));
        assert!(ok("json-pointer", "/a/~0b/~1c"));
        assert!(!ok("json-pointer", "a/b"));
        assert!(!ok("json-pointer", "/a~2"));
        assert!(ok("relative-json-pointer", "0"));
        assert!(ok("relative-json-pointer", "1/foo"));
        assert!(ok("relative-json-pointer", "2#"));
        assert!(!ok("relative-json-pointer", "01"));
        assert!(!ok("relative-json-pointer", "/foo"));
    }

    #[test]
    fn test_non_strings_and_unknown_formats_pass() {
        assert!(check("date", &json!(42)));
        assert!(check("no-such-format", &json!("anything")));
    }
}
