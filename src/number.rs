//! Phone number helpers.
//!
//! Comparison here is deliberately formatting-insensitive: the same logical
//! number shows up in the call log as "555-123-4567", "(555) 123-4567" or
//! "+15551234567" depending on the carrier, and grouping must treat those
//! as one caller.

/// Caller-id sentinel for an unknown number.
pub const UNKNOWN_NUMBER: &str = "-1";
/// Caller-id sentinel for a withheld (private) number.
pub const PRIVATE_NUMBER: &str = "-2";
/// Caller-id sentinel for a payphone.
pub const PAYPHONE_NUMBER: &str = "-3";

/// Minimum count of trailing digits that must match before two numbers of
/// different length are considered the same line.
const MIN_SUFFIX_MATCH: usize = 7;

/// Whether the "number" is really a URI-style address (e.g. a SIP address)
/// rather than a dialable phone number.
pub fn is_uri_address(number: &str) -> bool {
    number.contains('@') || number.contains("%40")
}

/// Whether this number can never be dialed or looked up: empty, or one of
/// the caller-id sentinels.
pub fn is_unreachable(number: &str) -> bool {
    matches!(number, "" | UNKNOWN_NUMBER | PRIVATE_NUMBER | PAYPHONE_NUMBER)
}

/// The dialable digits of a number, separators stripped.
fn significant_digits(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Formatting-insensitive phone number equivalence.
///
/// URI addresses compare case-insensitively as strings. Dialable numbers
/// compare by digits: an exact digit match, or a trailing match of at
/// least [`MIN_SUFFIX_MATCH`] digits when one side carries a country
/// prefix the other lacks.
pub fn numbers_equal(a: &str, b: &str) -> bool {
    if is_uri_address(a) || is_uri_address(b) {
        return a.eq_ignore_ascii_case(b);
    }

    let da = significant_digits(a);
    let db = significant_digits(b);
    if da.is_empty() || db.is_empty() {
        return da == db && a.trim() == b.trim();
    }
    if da == db {
        return true;
    }

    let (shorter, longer) = if da.len() < db.len() { (&da, &db) } else { (&db, &da) };
    shorter.len() >= MIN_SUFFIX_MATCH && longer.ends_with(shorter.as_str())
}

/// Pick the better-qualified of the caller-id number and the number the
/// directory matched against it.
///
/// The caller-id number wins unless the matched one carries an
/// international prefix or is longer (roaming carriers often strip or
/// truncate the incoming caller id).
pub fn better_number<'a>(number: &'a str, matched: Option<&'a str>) -> &'a str {
    match matched {
        Some(m) if !m.is_empty() && (m.starts_with('+') || m.len() > number.len()) => m,
        _ => number,
    }
}

/// Whether the number is the configured voicemail number.
pub fn is_voicemail(number: &str, voicemail_number: Option<&str>) -> bool {
    voicemail_number.is_some_and(|v| numbers_equal(number, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_address_detection() {
        assert!(is_uri_address("alice@example.com"));
        assert!(is_uri_address("bob%40sip.example.org"));
        assert!(!is_uri_address("+15551234567"));
        assert!(!is_uri_address("555-1234"));
    }

    #[test]
    fn test_unreachable_sentinels() {
        assert!(is_unreachable(""));
        assert!(is_unreachable(UNKNOWN_NUMBER));
        assert!(is_unreachable(PRIVATE_NUMBER));
        assert!(is_unreachable(PAYPHONE_NUMBER));
        assert!(!is_unreachable("411"));
    }

    #[test]
    fn test_equal_ignores_formatting() {
        assert!(numbers_equal("555-123-4567", "5551234567"));
        assert!(numbers_equal("(555) 123-4567", "555.123.4567"));
    }

    #[test]
    fn test_equal_matches_country_prefix_suffix() {
        assert!(numbers_equal("+15551234567", "5551234567"));
        assert!(numbers_equal("5551234567", "+15551234567"));
    }

    #[test]
    fn test_short_numbers_require_exact_match() {
        assert!(numbers_equal("411", "411"));
        assert!(!numbers_equal("411", "511"));
        // Too few digits for a suffix match
        assert!(!numbers_equal("1234567890", "67890"));
    }

    #[test]
    fn test_different_lines_do_not_match() {
        assert!(!numbers_equal("5551234567", "5557654321"));
    }

    #[test]
    fn test_uri_addresses_compare_case_insensitively() {
        assert!(numbers_equal("Alice@Example.COM", "alice@example.com"));
        assert!(!numbers_equal("alice@example.com", "bob@example.com"));
        // A URI address never equals a dialable number
        assert!(!numbers_equal("alice@example.com", "5551234567"));
    }

    #[test]
    fn test_empty_numbers() {
        assert!(numbers_equal("", ""));
        assert!(!numbers_equal("", "5551234567"));
    }

    #[test]
    fn test_better_number_prefers_international_prefix() {
        assert_eq!(better_number("5551234567", Some("+15551234567")), "+15551234567");
        assert_eq!(better_number("1234567", Some("5551234567")), "5551234567");
        assert_eq!(better_number("5551234567", Some("4567")), "5551234567");
        assert_eq!(better_number("5551234567", Some("")), "5551234567");
        assert_eq!(better_number("5551234567", None), "5551234567");
    }

    #[test]
    fn test_voicemail_detection() {
        assert!(is_voicemail("+1555000", Some("+1555000")));
        assert!(!is_voicemail("+1555000", Some("+1555001")));
        assert!(!is_voicemail("+1555000", None));
    }
}
