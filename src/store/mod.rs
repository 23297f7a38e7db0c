//! Entity storage for records, series and memberships.
//!
//! The matching engine and the review board only talk to the [`EntityStore`]
//! trait. [`MemoryStore`] is the bundled implementation: it keeps everything
//! in memory with lookup indexes and persists to a versioned JSON library
//! file between runs.
//!
//! The store is expected to give read-your-writes within one run: a series
//! inserted while matching one record is visible when matching the next.
//!
//! [`MemoryStore`]: memory::MemoryStore

use thiserror::Error;

use crate::core::record::Record;
use crate::core::series::{Membership, Series};
use crate::core::types::{MatchId, MatchMethod, Position, RecordId, SeriesId};

pub mod memory;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read or write library: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse library: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown record: {0}")]
    UnknownRecord(RecordId),

    #[error("Unknown series: {0}")]
    UnknownSeries(SeriesId),

    #[error("Record {0} is already linked to series {1}")]
    DuplicateMembership(RecordId, SeriesId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary used by the matching engine and review board
pub trait EntityStore {
    /// All records in scan order
    fn records(&self) -> Result<Vec<Record>, StoreError>;

    fn record(&self, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Insert or replace a record by external id. Returns `true` when inserted.
    ///
    /// A replaced record keeps the position previously assigned by matching.
    fn upsert_record(&mut self, record: Record) -> Result<bool, StoreError>;

    fn set_position(&mut self, id: &RecordId, position: Position) -> Result<(), StoreError>;

    /// All series in creation order
    fn all_series(&self) -> Result<Vec<Series>, StoreError>;

    fn series(&self, id: SeriesId) -> Result<Option<Series>, StoreError>;

    fn insert_series(&mut self, name: &str, author: Option<&str>) -> Result<Series, StoreError>;

    /// All memberships in creation order
    fn memberships(&self) -> Result<Vec<Membership>, StoreError>;

    fn membership(&self, id: MatchId) -> Result<Option<Membership>, StoreError>;

    fn find_membership(
        &self,
        record: &RecordId,
        series: SeriesId,
    ) -> Result<Option<Membership>, StoreError>;

    /// Insert a new membership in the pending state.
    ///
    /// Fails with [`StoreError::DuplicateMembership`] if the pair already exists.
    fn insert_membership(
        &mut self,
        record: &RecordId,
        series: SeriesId,
        score: u8,
        method: MatchMethod,
    ) -> Result<Membership, StoreError>;

    /// Overwrite a stored membership. Returns `false` if the id is unknown.
    fn update_membership(&mut self, membership: &Membership) -> Result<bool, StoreError>;

    fn remove_membership(&mut self, id: MatchId) -> Result<Option<Membership>, StoreError>;

    /// First series (lowest id) whose name contains `name`, ignoring case
    fn find_series_containing(&self, name: &str) -> Result<Option<Series>, StoreError> {
        Ok(self
            .all_series()?
            .into_iter()
            .find(|series| series.name_contains(name)))
    }
}
