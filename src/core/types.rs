use serde::{Deserialize, Serialize};

/// External identifier of a record, as assigned by the media server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generated identifier of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u64);

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generated identifier of a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage that produced a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    EmbeddedMetadata,
    ExternalLookup,
    TitlePattern,
    Fuzzy,
}

impl MatchMethod {
    pub const ALL: [MatchMethod; 4] = [
        Self::ExternalLookup,
        Self::EmbeddedMetadata,
        Self::TitlePattern,
        Self::Fuzzy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmbeddedMetadata => "embedded-metadata",
            Self::ExternalLookup => "external-lookup",
            Self::TitlePattern => "title-pattern",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state derived from a membership's two flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Filter for membership queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl StatusFilter {
    #[must_use]
    pub fn accepts(self, status: ReviewStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == ReviewStatus::Pending,
            Self::Approved => status == ReviewStatus::Approved,
            Self::Rejected => status == ReviewStatus::Rejected,
        }
    }
}

/// Sentinel used for works that belong to a series but have no number
pub const COMPANION: &str = "Companion";

/// A record's place within its series
///
/// Numbers are kept as text so that "01" or "2.5" survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    Number(String),
    Companion,
}

impl Position {
    /// Parse a position token: a digit string (optionally with one decimal part)
    /// or the companion sentinel, case-insensitive. Anything else is rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case(COMPANION) {
            return Some(Self::Companion);
        }

        let mut parts = token.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next();
        let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

        if digits(whole) && fraction.map_or(true, digits) {
            Some(Self::Number(token.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Number(n) => n,
            Self::Companion => COMPANION,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid series position: '{value}'"))
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parse() {
        assert_eq!(Position::parse("3"), Some(Position::Number("3".to_string())));
        assert_eq!(Position::parse(" 01 "), Some(Position::Number("01".to_string())));
        assert_eq!(Position::parse("2.5"), Some(Position::Number("2.5".to_string())));
        assert_eq!(Position::parse("companion"), Some(Position::Companion));
        assert_eq!(Position::parse("Companion"), Some(Position::Companion));
        assert_eq!(Position::parse(""), None);
        assert_eq!(Position::parse("three"), None);
        assert_eq!(Position::parse("3."), None);
        assert_eq!(Position::parse("1-2"), None);
    }

    #[test]
    fn test_position_serde() {
        let json = serde_json::to_string(&Position::Companion).unwrap();
        assert_eq!(json, "\"Companion\"");

        let parsed: Position = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(parsed, Position::Number("7".to_string()));

        assert!(serde_json::from_str::<Position>("\"seven\"").is_err());
    }

    #[test]
    fn test_method_serde_names() {
        for method in MatchMethod::ALL {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn test_status_filter() {
        assert!(StatusFilter::All.accepts(ReviewStatus::Rejected));
        assert!(StatusFilter::Pending.accepts(ReviewStatus::Pending));
        assert!(!StatusFilter::Pending.accepts(ReviewStatus::Approved));
        assert!(!StatusFilter::Approved.accepts(ReviewStatus::Rejected));
    }
}
