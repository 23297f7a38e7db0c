//! Series matching pipeline and review workflow.
//!
//! - [`MatchingEngine`]: runs every record through the matching stages
//! - [`FuzzyMatcher`]: scores a record against known series
//! - [`ReviewBoard`]: approve, reject and remove memberships
//!
//! ## Matching Algorithm
//!
//! Each record is tried against the following stages in order, and the first
//! stage that names a series wins:
//!
//! 1. **External lookup**: ask a configured provider (confidence 98)
//! 2. **Embedded metadata**: the media server's own series field (confidence 95)
//! 3. **Title pattern**: `Title (Series, Book 3)`, `Series: Book 3`, ... (confidence 85)
//! 4. **Fuzzy**: similarity of the title to already known series names
//!
//! The winning series name is resolved against existing series by
//! case-insensitive containment, so "Rider" joins an existing "Alex Rider".
//!
//! ## Example
//!
//! ```rust
//! use series_matcher::core::record::Record;
//! use series_matcher::matching::engine::{MatchingConfig, MatchingEngine};
//! use series_matcher::store::memory::MemoryStore;
//! use series_matcher::store::EntityStore;
//!
//! let mut store = MemoryStore::new();
//! store.upsert_record(Record::new("1", "Stormbreaker (Alex Rider, Book 1)")).unwrap();
//!
//! let summary = MatchingEngine::new(&mut store, MatchingConfig::default()).run().unwrap();
//! assert_eq!(summary.matched, 1);
//! ```
//!
//! [`MatchingEngine`]: engine::MatchingEngine
//! [`FuzzyMatcher`]: fuzzy::FuzzyMatcher
//! [`ReviewBoard`]: review::ReviewBoard

pub mod engine;
pub mod fuzzy;
pub mod pattern;
pub mod review;
pub mod scoring;
