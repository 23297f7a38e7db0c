use tracing::debug;

use crate::core::record::{non_blank, Record};
use crate::core::series::Series;
use crate::matching::scoring::{partial_ratio, ratio};

/// Default minimum score for a fuzzy match
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 70;

/// Added to a candidate's score when record and series authors agree
pub const AUTHOR_BONUS: u32 = 10;

/// Author similarity must exceed this for the bonus to apply
pub const AUTHOR_SIMILARITY_FLOOR: u8 = 80;

/// Best fuzzy candidate for a record
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub series: Series,

    /// Reported score, clamped to 100
    pub score: u8,
}

/// Scores records against already-known series names
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Raw score of one candidate: title/name partial similarity plus the author bonus.
    ///
    /// Not clamped; may exceed 100.
    #[must_use]
    pub fn score(&self, record: &Record, series: &Series) -> u32 {
        let mut score = u32::from(partial_ratio(&record.title, &series.name));

        if let (Some(record_author), Some(series_author)) =
            (record.author(), non_blank(series.author.as_deref()))
        {
            if ratio(record_author, series_author) > AUTHOR_SIMILARITY_FLOOR {
                score += AUTHOR_BONUS;
            }
        }

        score
    }

    /// Find the best candidate at or above the threshold.
    ///
    /// Candidates are ranked on the unclamped score; on a tie the first one
    /// seen wins.
    #[must_use]
    pub fn match_existing(&self, record: &Record, candidates: &[Series]) -> Option<FuzzyMatch> {
        let threshold = u32::from(self.threshold);
        let mut best: Option<(&Series, u32)> = None;

        for series in candidates {
            let score = self.score(record, series);
            if score < threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((series, score));
            }
        }

        best.map(|(series, score)| {
            debug!(
                title = %record.title,
                series = %series.name,
                score,
                "Fuzzy candidate selected"
            );
            FuzzyMatch {
                series: series.clone(),
                score: u8::try_from(score.min(100)).unwrap_or(100),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SeriesId;

    fn series(id: u64, name: &str, author: Option<&str>) -> Series {
        Series::new(SeriesId(id), name, author.map(str::to_string))
    }

    #[test]
    fn test_matches_series_inside_title() {
        let matcher = FuzzyMatcher::default();
        let record = Record::new("1", "Alex Rider: Point Blanc");
        let candidates = vec![
            series(1, "Discworld", None),
            series(2, "Alex Rider", None),
        ];

        let found = matcher.match_existing(&record, &candidates).unwrap();
        assert_eq!(found.series.name, "Alex Rider");
        assert_eq!(found.score, 100);
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        // Scores exactly 50 against the only candidate
        let record = Record::new("1", "abcdefghij");
        let candidates = vec![series(1, "abcdezzzzz", None)];

        assert!(FuzzyMatcher::new(70).match_existing(&record, &candidates).is_none());

        let found = FuzzyMatcher::new(45).match_existing(&record, &candidates).unwrap();
        assert_eq!(found.score, 50);
    }

    #[test]
    fn test_author_bonus() {
        let matcher = FuzzyMatcher::new(55);
        let record = Record::new("1", "abcdefghij").with_author("Anthony Horowitz");

        let same_author = series(1, "abcdezzzzz", Some("anthony horowitz"));
        assert_eq!(matcher.score(&record, &same_author), 60);

        let other_author = series(2, "abcdezzzzz", Some("Terry Pratchett"));
        assert_eq!(matcher.score(&record, &other_author), 50);

        let found = matcher
            .match_existing(&record, &[other_author, same_author])
            .unwrap();
        assert_eq!(found.series.id, SeriesId(1));
        assert_eq!(found.score, 60);
    }

    #[test]
    fn test_bonus_is_clamped_but_ranks_higher() {
        let matcher = FuzzyMatcher::default();
        let record = Record::new("1", "Alex Rider Returns").with_author("Anthony Horowitz");
        let candidates = vec![
            series(1, "Alex Rider", None),
            series(2, "Alex Rider", Some("Anthony Horowitz")),
        ];

        assert_eq!(matcher.score(&record, &candidates[1]), 110);
        let found = matcher.match_existing(&record, &candidates).unwrap();
        assert_eq!(found.series.id, SeriesId(2));
        assert_eq!(found.score, 100);
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let matcher = FuzzyMatcher::default();
        let record = Record::new("1", "Alex Rider Returns");
        let candidates = vec![series(7, "Alex Rider", None), series(3, "Alex Rider", None)];

        let found = matcher.match_existing(&record, &candidates).unwrap();
        assert_eq!(found.series.id, SeriesId(7));
    }

    #[test]
    fn test_no_candidates() {
        let record = Record::new("1", "The Stand");
        assert!(FuzzyMatcher::default().match_existing(&record, &[]).is_none());
    }
}
