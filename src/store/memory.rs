use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::core::record::Record;
use crate::core::series::{Membership, Series};
use crate::core::types::{MatchId, MatchMethod, Position, RecordId, SeriesId};
use crate::store::{EntityStore, StoreError};

/// Library file version for compatibility checking
pub const LIBRARY_VERSION: &str = "1.0.0";

/// Serializable library format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryData {
    pub version: String,
    pub saved_at: String,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

/// In-memory entity store with lookup indexes
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Records in scan order
    records: Vec<Record>,

    /// Index: external id -> position in `records`
    record_index: HashMap<RecordId, usize>,

    series: BTreeMap<SeriesId, Series>,

    memberships: BTreeMap<MatchId, Membership>,

    /// Index: (record, series) -> membership id
    pair_index: HashMap<(RecordId, SeriesId), MatchId>,

    next_series_id: u64,

    next_match_id: u64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            next_series_id: 1,
            next_match_id: 1,
            ..Self::default()
        }
    }

    /// Load a library from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a library file, or start empty if it does not exist yet
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "Library file not found, starting empty");
            Ok(Self::new())
        }
    }

    /// Parse a library from a JSON string
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let data: LibraryData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != LIBRARY_VERSION {
            warn!(
                expected = LIBRARY_VERSION,
                found = %data.version,
                "Library version mismatch"
            );
        }

        let mut store = Self::new();
        for record in data.records {
            store.upsert_record(record)?;
        }

        for mut series in data.series {
            series.book_count = 0;
            store.next_series_id = store.next_series_id.max(series.id.0 + 1);
            store.series.insert(series.id, series);
        }

        for membership in data.memberships {
            let key = (membership.record_id.clone(), membership.series_id);
            if store.pair_index.contains_key(&key) {
                warn!(
                    record = %membership.record_id,
                    series = %membership.series_id,
                    "Dropping duplicate membership from library file"
                );
                continue;
            }
            if let Some(series) = store.series.get_mut(&membership.series_id) {
                series.book_count += 1;
            }
            store.next_match_id = store.next_match_id.max(membership.id.0 + 1);
            store.pair_index.insert(key, membership.id);
            store.memberships.insert(membership.id, membership);
        }

        Ok(store)
    }

    /// Export the library to JSON
    pub fn to_json(&self) -> Result<String, StoreError> {
        let data = LibraryData {
            version: LIBRARY_VERSION.to_string(),
            saved_at: Utc::now().to_rfc3339(),
            records: self.records.clone(),
            series: self.series.values().cloned().collect(),
            memberships: self.memberships.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Write the library to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "Saved library");
        Ok(())
    }

    /// Number of records in the library
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the library has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EntityStore for MemoryStore {
    fn records(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.clone())
    }

    fn record(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.record_index.get(id).map(|&idx| self.records[idx].clone()))
    }

    fn upsert_record(&mut self, mut record: Record) -> Result<bool, StoreError> {
        if let Some(&idx) = self.record_index.get(&record.external_id) {
            let existing = &mut self.records[idx];
            if record.position.is_none() {
                record.position = existing.position.take();
            }
            *existing = record;
            return Ok(false);
        }

        self.record_index
            .insert(record.external_id.clone(), self.records.len());
        self.records.push(record);
        Ok(true)
    }

    fn set_position(&mut self, id: &RecordId, position: Position) -> Result<(), StoreError> {
        let idx = *self
            .record_index
            .get(id)
            .ok_or_else(|| StoreError::UnknownRecord(id.clone()))?;
        self.records[idx].position = Some(position);
        Ok(())
    }

    fn all_series(&self) -> Result<Vec<Series>, StoreError> {
        Ok(self.series.values().cloned().collect())
    }

    fn series(&self, id: SeriesId) -> Result<Option<Series>, StoreError> {
        Ok(self.series.get(&id).cloned())
    }

    fn insert_series(&mut self, name: &str, author: Option<&str>) -> Result<Series, StoreError> {
        let id = SeriesId(self.next_series_id);
        self.next_series_id += 1;

        let series = Series::new(id, name.trim(), author.map(str::to_string));
        self.series.insert(id, series.clone());
        Ok(series)
    }

    fn memberships(&self) -> Result<Vec<Membership>, StoreError> {
        Ok(self.memberships.values().cloned().collect())
    }

    fn membership(&self, id: MatchId) -> Result<Option<Membership>, StoreError> {
        Ok(self.memberships.get(&id).cloned())
    }

    fn find_membership(
        &self,
        record: &RecordId,
        series: SeriesId,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .pair_index
            .get(&(record.clone(), series))
            .and_then(|id| self.memberships.get(id))
            .cloned())
    }

    fn insert_membership(
        &mut self,
        record: &RecordId,
        series: SeriesId,
        score: u8,
        method: MatchMethod,
    ) -> Result<Membership, StoreError> {
        if !self.record_index.contains_key(record) {
            return Err(StoreError::UnknownRecord(record.clone()));
        }
        let Some(target) = self.series.get_mut(&series) else {
            return Err(StoreError::UnknownSeries(series));
        };

        let key = (record.clone(), series);
        if self.pair_index.contains_key(&key) {
            return Err(StoreError::DuplicateMembership(record.clone(), series));
        }

        let id = MatchId(self.next_match_id);
        self.next_match_id += 1;

        let membership = Membership::new(id, record.clone(), series, score, method);
        target.book_count += 1;
        self.pair_index.insert(key, id);
        self.memberships.insert(id, membership.clone());
        Ok(membership)
    }

    fn update_membership(&mut self, membership: &Membership) -> Result<bool, StoreError> {
        match self.memberships.get_mut(&membership.id) {
            Some(stored) => {
                // Record and series are fixed for the lifetime of a membership
                stored.score = membership.score.min(100);
                stored.method = membership.method;
                stored.approved = membership.approved;
                stored.rejected = membership.rejected;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_membership(&mut self, id: MatchId) -> Result<Option<Membership>, StoreError> {
        let Some(membership) = self.memberships.remove(&id) else {
            return Ok(None);
        };

        self.pair_index
            .remove(&(membership.record_id.clone(), membership.series_id));
        if let Some(series) = self.series.get_mut(&membership.series_id) {
            series.book_count = series.book_count.saturating_sub(1);
        }
        Ok(Some(membership))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_record() -> (MemoryStore, RecordId) {
        let mut store = MemoryStore::new();
        let record = Record::new("plex-1", "Stormbreaker").with_author("Anthony Horowitz");
        store.upsert_record(record).unwrap();
        (store, RecordId::new("plex-1"))
    }

    #[test]
    fn test_upsert_record_by_external_id() {
        let (mut store, id) = store_with_record();
        store
            .set_position(&id, Position::Number("1".to_string()))
            .unwrap();

        let inserted = store
            .upsert_record(Record::new("plex-1", "Stormbreaker (Unabridged)"))
            .unwrap();
        assert!(!inserted);
        assert_eq!(store.len(), 1);

        let record = store.record(&id).unwrap().unwrap();
        assert_eq!(record.title, "Stormbreaker (Unabridged)");
        assert_eq!(record.position, Some(Position::Number("1".to_string())));
    }

    #[test]
    fn test_find_series_containing_first_wins() {
        let mut store = MemoryStore::new();
        store.insert_series("Alex Rider", None).unwrap();
        store.insert_series("Spider Rider", None).unwrap();

        let found = store.find_series_containing("rider").unwrap().unwrap();
        assert_eq!(found.name, "Alex Rider");

        let found = store.find_series_containing("SPIDER").unwrap().unwrap();
        assert_eq!(found.name, "Spider Rider");

        assert!(store.find_series_containing("Discworld").unwrap().is_none());
    }

    #[test]
    fn test_membership_pair_is_unique() {
        let (mut store, id) = store_with_record();
        let series = store.insert_series("Alex Rider", None).unwrap();

        store
            .insert_membership(&id, series.id, 85, MatchMethod::TitlePattern)
            .unwrap();
        let err = store
            .insert_membership(&id, series.id, 90, MatchMethod::Fuzzy)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMembership(_, _)));

        assert_eq!(store.series(series.id).unwrap().unwrap().book_count, 1);
    }

    #[test]
    fn test_insert_membership_unknown_record() {
        let mut store = MemoryStore::new();
        let series = store.insert_series("Alex Rider", None).unwrap();
        let err = store
            .insert_membership(&RecordId::new("missing"), series.id, 90, MatchMethod::Fuzzy)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownRecord(_)));
    }

    #[test]
    fn test_remove_membership_updates_indexes() {
        let (mut store, id) = store_with_record();
        let series = store.insert_series("Alex Rider", None).unwrap();
        let membership = store
            .insert_membership(&id, series.id, 95, MatchMethod::EmbeddedMetadata)
            .unwrap();

        let removed = store.remove_membership(membership.id).unwrap();
        assert!(removed.is_some());
        assert!(store.find_membership(&id, series.id).unwrap().is_none());
        assert_eq!(store.series(series.id).unwrap().unwrap().book_count, 0);

        // Orphaned series are kept
        assert_eq!(store.all_series().unwrap().len(), 1);
        assert!(store.remove_membership(membership.id).unwrap().is_none());
    }

    #[test]
    fn test_json_round_trip_preserves_ids() {
        let (mut store, id) = store_with_record();
        let series = store.insert_series("Alex Rider", Some("Anthony Horowitz")).unwrap();
        let mut membership = store
            .insert_membership(&id, series.id, 98, MatchMethod::ExternalLookup)
            .unwrap();
        membership.approved = true;
        store.update_membership(&membership).unwrap();

        let json = store.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("external-lookup"));

        let mut reloaded = MemoryStore::from_json(&json).unwrap();
        let stored = reloaded.membership(membership.id).unwrap().unwrap();
        assert!(stored.approved);
        assert_eq!(reloaded.series(series.id).unwrap().unwrap().book_count, 1);

        // Generated ids continue after the loaded ones
        let next = reloaded.insert_series("Discworld", None).unwrap();
        assert!(next.id > series.id);
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let empty = MemoryStore::open(&path).unwrap();
        assert!(empty.is_empty());

        let (store, _) = store_with_record();
        store.save_to_file(&path).unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }
}
