use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{MatchId, MatchMethod, RecordId, ReviewStatus, SeriesId};

/// An inferred grouping of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Number of memberships pointing at this series
    #[serde(default)]
    pub book_count: u32,

    pub created_at: DateTime<Utc>,
}

impl Series {
    pub fn new(id: SeriesId, name: impl Into<String>, author: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            author,
            book_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive containment used to reuse an existing series
    #[must_use]
    pub fn name_contains(&self, candidate: &str) -> bool {
        self.name
            .to_lowercase()
            .contains(&candidate.trim().to_lowercase())
    }
}

/// A scored, reviewable link between one record and one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MatchId,

    pub record_id: RecordId,

    pub series_id: SeriesId,

    /// Confidence, 0-100
    pub score: u8,

    pub method: MatchMethod,

    #[serde(default)]
    pub approved: bool,

    #[serde(default)]
    pub rejected: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(
        id: MatchId,
        record_id: RecordId,
        series_id: SeriesId,
        score: u8,
        method: MatchMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            record_id,
            series_id,
            score: score.min(100),
            method,
            approved: false,
            rejected: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> ReviewStatus {
        if self.approved {
            ReviewStatus::Approved
        } else if self.rejected {
            ReviewStatus::Rejected
        } else {
            ReviewStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == ReviewStatus::Pending
    }
}
