//! Approximate string similarity on a 0-100 scale.

/// Convert a 0.0-1.0 similarity to a rounded 0-100 score
#[inline]
fn to_score(similarity: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to 0-100
    {
        (similarity.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Full-string similarity, case-insensitive.
///
/// Based on normalized Levenshtein distance; two empty strings score 100.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    to_score(strsim::normalized_levenshtein(&a, &b))
}

/// Substring-tolerant similarity, case-insensitive.
///
/// The shorter string is compared against every window of the same length in
/// the longer one and the best window wins, so a series name that appears
/// (approximately) anywhere inside a title scores high. Returns 0 if either
/// string is blank.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.trim().to_lowercase().chars().collect();
    let b: Vec<char> = b.trim().to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let needle: String = shorter.iter().collect();

    let mut best = 0.0_f64;
    for window in longer.windows(shorter.len()) {
        let candidate: String = window.iter().collect();
        let similarity = strsim::normalized_levenshtein(&needle, &candidate);
        if similarity > best {
            best = similarity;
            if best >= 1.0 {
                break;
            }
        }
    }

    to_score(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("Anthony Horowitz", "anthony horowitz"), 100);
        assert_eq!(ratio("abcdefghij", "abcdezzzzz"), 50);
        assert_eq!(ratio("", ""), 100);
        assert!(ratio("Terry Pratchett", "Stephen King") < 50);
    }

    #[test]
    fn test_partial_ratio_substring() {
        assert_eq!(partial_ratio("Stormbreaker Alex Rider Adventure", "Alex Rider"), 100);
        assert_eq!(partial_ratio("alex rider", "ALEX RIDER: Book 9"), 100);
    }

    #[test]
    fn test_partial_ratio_equal_length() {
        assert_eq!(partial_ratio("abcdefghij", "abcdezzzzz"), 50);
    }

    #[test]
    fn test_partial_ratio_approximate() {
        // One substitution in a ten-character window
        assert_eq!(partial_ratio("The Alex Ryder Files", "Alex Rider"), 90);
    }

    #[test]
    fn test_partial_ratio_blank() {
        assert_eq!(partial_ratio("", "Alex Rider"), 0);
        assert_eq!(partial_ratio("Alex Rider", "  "), 0);
    }
}
