//! Series extraction from title text.
//!
//! Titles often carry their series in one of two shapes: a trailing
//! parenthetical ("Stormbreaker (Alex Rider, Book 1)") or an inline suffix
//! ("Discworld: Book 3", "Harry Potter #3", "The Expanse - 4"). Parenthetical
//! patterns are tried first, then inline ones; the first pattern that matches
//! wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Position;

/// Series name and position recovered from a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSeries {
    pub name: String,
    pub position: Position,
}

/// Series bound inside parentheses. Group 1 is the name, group 2 the number.
static PARENTHETICAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\(([^,()]+?),?\s*Book\s+(\d+)\)").unwrap(),
        Regex::new(r"(?i)\(([^,()]+?),?\s*#\s*(\d+)\)").unwrap(),
        Regex::new(r"(?i)\(([^,()]+?),?\s*Vol\.?\s+(\d+)\)").unwrap(),
        Regex::new(r"(?i)\(([^,()]+?),?\s*Volume\s+(\d+)\)").unwrap(),
    ]
});

/// Series given by the leading part of the title. Group 1 is the name, group 2 the number.
static INLINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(.+?)\s*[,:-]\s*Book\s+(\d+)").unwrap(),
        Regex::new(r"(?i)^(.+?)\s*[,:-]\s*Vol\.?\s+(\d+)").unwrap(),
        Regex::new(r"(?i)^(.+?)\s*[,:-]\s*Volume\s+(\d+)").unwrap(),
        Regex::new(r"(?i)^(.+?)\s*\(Book\s+(\d+)\)").unwrap(),
        Regex::new(r"(?i)^(.+?)\s*#(\d+)").unwrap(),
        // Whitespace before the dash keeps hyphenated titles like "Catch-22" out
        Regex::new(r"(?i)^(.+?)\s+-\s*(\d+)").unwrap(),
    ]
});

/// Extract a series name and position from a title.
///
/// Returns `None` for titles that carry no recognizable series marker, which
/// is the common case.
///
/// # Examples
///
/// ```
/// use series_matcher::matching::pattern::extract_series;
///
/// let found = extract_series("Stormbreaker (Alex Rider, Book 1)").unwrap();
/// assert_eq!(found.name, "Alex Rider");
/// assert_eq!(found.position.as_str(), "1");
///
/// assert!(extract_series("The Stand").is_none());
/// ```
#[must_use]
pub fn extract_series(title: &str) -> Option<ExtractedSeries> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    PARENTHETICAL_PATTERNS
        .iter()
        .chain(INLINE_PATTERNS.iter())
        .find_map(|pattern| {
            let captures = pattern.captures(title)?;
            let name = clean_series_name(captures.get(1)?.as_str());
            let position = Position::parse(captures.get(2)?.as_str())?;
            (!name.is_empty()).then_some(ExtractedSeries { name, position })
        })
}

/// Position token only, for stages that already know the series
#[must_use]
pub fn extract_position(title: &str) -> Option<Position> {
    extract_series(title).map(|found| found.position)
}

/// Trim whitespace and separator punctuation from both ends of a captured name
fn clean_series_name(raw: &str) -> String {
    raw.trim_matches(|c: char| {
        c.is_whitespace()
            || matches!(
                c,
                ',' | ':' | ';' | '-' | '–' | '—' | '.' | '(' | ')' | '[' | ']' | '"'
            )
    })
    .to_string()
}
