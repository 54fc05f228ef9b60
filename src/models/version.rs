//! Schedule version allocation.
//!
//! Organizers name schedule releases with free-text versions ("0.1",
//! "v2.0", "sloth"). When a new release is prepared we try to suggest the
//! next version by incrementing a trailing numeric suffix of the previous
//! one. The heuristic is deliberately conservative: anything not ending in
//! an ASCII digit is not guessable and the caller has to ask for manual
//! input instead.

/// Compute the next schedule version from the previously released one.
///
/// Returns `"0.1"` when no schedule has ever been released. Otherwise the
/// maximal trailing run of ASCII digits is incremented by one and spliced
/// back, preserving all preceding characters verbatim (including whatever
/// separator precedes the digits). Returns the empty string when the
/// previous version does not end in a digit, signaling that no suggestion
/// can be made.
///
/// # Examples
///
/// ```
/// use confsched::models::next_version;
///
/// assert_eq!(next_version(None), "0.1");
/// assert_eq!(next_version(Some("0.1")), "0.2");
/// assert_eq!(next_version(Some("v1.3")), "v1.4");
/// assert_eq!(next_version(Some("sloth")), "");
/// ```
pub fn next_version(previous: Option<&str>) -> String {
    let Some(previous) = previous else {
        return "0.1".to_string();
    };

    let digits = previous
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return String::new();
    }

    let (prefix, suffix) = previous.split_at(previous.len() - digits);
    // A digit run too long for u128 is not a version counter; treat it as
    // unguessable rather than erroring.
    match suffix.parse::<u128>().ok().and_then(|n| n.checked_add(1)) {
        Some(next) => format!("{}{}", prefix, next),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::next_version;

    #[test]
    fn test_first_version() {
        assert_eq!(next_version(None), "0.1");
    }

    #[test]
    fn test_increments_trailing_digits() {
        assert_eq!(next_version(Some("0.1")), "0.2");
        assert_eq!(next_version(Some("1.0.1")), "1.0.2");
        assert_eq!(next_version(Some("something.1")), "something.2");
    }

    #[test]
    fn test_separator_is_preserved_verbatim() {
        assert_eq!(next_version(Some("0,2")), "0,3");
        assert_eq!(next_version(Some("0-3")), "0-4");
        assert_eq!(next_version(Some("0_4")), "0_5");
    }

    #[test]
    fn test_prefix_text_is_preserved() {
        assert_eq!(next_version(Some("v1.3")), "v1.4");
        assert_eq!(next_version(Some("2024 edition 2")), "2024 edition 3");
    }

    #[test]
    fn test_digit_run_spans_multiple_digits() {
        assert_eq!(next_version(Some("0.9")), "0.10");
        assert_eq!(next_version(Some("1.99")), "1.100");
    }

    #[test]
    fn test_leading_zeros_collapse() {
        assert_eq!(next_version(Some("v09")), "v10");
    }

    #[test]
    fn test_not_guessable_without_trailing_digit() {
        assert_eq!(next_version(Some("Nichtnumerisch")), "");
        assert_eq!(next_version(Some("1.something")), "");
        assert_eq!(next_version(Some("")), "");
    }

    #[test]
    fn test_purely_numeric_version() {
        assert_eq!(next_version(Some("41")), "42");
    }

    #[test]
    fn test_overlong_digit_run_is_not_guessable() {
        let previous = "1".repeat(60);
        assert_eq!(next_version(Some(&previous)), "");
    }

    #[test]
    fn test_non_ascii_prefix_is_kept() {
        assert_eq!(next_version(Some("Fahrplan β 1")), "Fahrplan β 2");
    }
}
