//! # series-matcher
//!
//! A library for grouping audiobooks into series.
//!
//! Media servers rarely know that "Stormbreaker" and "Point Blanc" are books
//! one and two of the same series. Sometimes the title says so, as in
//! "Point Blanc (Alex Rider, Book 2)", sometimes the library metadata carries
//! a series field, and sometimes only an outside source knows.
//!
//! `series-matcher` runs every record through a short pipeline and stores each
//! inferred link as a reviewable match.
//!
//! ## Features
//!
//! - **External lookup**: ask an AI model or a book catalog, cached and rate limited
//! - **Embedded metadata**: trust the series field the library already has
//! - **Title patterns**: recognize `(Series, Book 3)`, `Series #3` and friends
//! - **Fuzzy matching**: attach titles to series already known
//! - **Review workflow**: approve, reject, bulk-approve and remove matches
//!
//! ## Example
//!
//! ```rust
//! use series_matcher::{EntityStore, MatchingConfig, MatchingEngine, MemoryStore, Record};
//!
//! let mut store = MemoryStore::new();
//! store.upsert_record(Record::new("1", "Foundation").with_series_hint("Foundation")).unwrap();
//! store.upsert_record(Record::new("2", "Point Blanc (Alex Rider, Book 2)")).unwrap();
//!
//! let summary = MatchingEngine::new(&mut store, MatchingConfig::default()).run().unwrap();
//! assert_eq!(summary.matched, 2);
//! assert_eq!(store.all_series().unwrap().len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Records, series, memberships and their identifiers
//! - [`store`]: Entity storage and the JSON library file
//! - [`matching`]: Matching engine, fuzzy scoring and review
//! - [`lookup`]: External providers with caching and rate limiting
//! - [`parsing`]: Record import from JSON and TSV/CSV
//! - [`config`]: Runtime configuration
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod config;
pub mod core;
pub mod lookup;
pub mod matching;
pub mod parsing;
pub mod store;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use core::record::Record;
pub use core::series::{Membership, Series};
pub use core::types::*;
pub use lookup::cache::CachedLookup;
pub use lookup::{LookupProvider, SeriesInfo, SeriesLookup};
pub use matching::engine::{MatchSummary, MatchingConfig, MatchingEngine};
pub use matching::review::{ReviewBoard, ReviewOutcome};
pub use store::memory::MemoryStore;
pub use store::{EntityStore, StoreError};
