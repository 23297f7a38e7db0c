//! Centralized validation and normalization helpers.

/// Maximum number of records accepted from a single import file
pub const MAX_RECORDS: usize = 100_000;

/// Maximum length of a title or author accepted on import
pub const MAX_FIELD_LENGTH: usize = 1_000;

/// Normalize free text for use as a lookup key: trimmed, lowercased, and with
/// internal whitespace collapsed to single spaces.
///
/// # Examples
///
/// ```
/// use series_matcher::utils::validation::normalize_text;
///
/// assert_eq!(normalize_text("  The   Stand "), "the stand");
/// assert_eq!(normalize_text(""), "");
/// ```
#[must_use]
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check that a threshold lies on the 0-100 score scale.
///
/// Returns an error message naming the setting if it does not.
#[must_use]
pub fn check_threshold(name: &str, value: u8) -> Option<String> {
    if value > 100 {
        Some(format!("{name} must be between 0 and 100, got {value}"))
    } else {
        None
    }
}

/// Check if adding another record would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_RECORDS {
        Some(format!(
            "Too many records: adding another would exceed maximum of {MAX_RECORDS}"
        ))
    } else {
        None
    }
}
