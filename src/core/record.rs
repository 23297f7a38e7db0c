use serde::{Deserialize, Serialize};

use crate::core::types::{Position, RecordId};

/// One audiobook scanned from the media library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by the media server; unique across the library
    pub external_id: RecordId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Series name carried in the media server's own metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_series_hint: Option<String>,

    /// Series position carried in the media server's own metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_position: Option<String>,

    /// Position assigned by the matching engine once a series is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Record {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: RecordId::new(external_id),
            title: title.into(),
            author: None,
            embedded_series_hint: None,
            embedded_position: None,
            position: None,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn with_series_hint(mut self, hint: impl Into<String>) -> Self {
        self.embedded_series_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_embedded_position(mut self, position: impl Into<String>) -> Self {
        self.embedded_position = Some(position.into());
        self
    }

    /// Author if present and not blank
    pub fn author(&self) -> Option<&str> {
        non_blank(self.author.as_deref())
    }

    /// Embedded series hint if present and not blank
    pub fn series_hint(&self) -> Option<&str> {
        non_blank(self.embedded_series_hint.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
