//! Core data types for series matching.
//!
//! - [`Record`]: one audiobook scanned from the media library
//! - [`Series`]: an inferred grouping of records
//! - [`Membership`]: a scored link between a record and a series, with review flags
//! - [`Position`]: a record's place in its series, numeric or `Companion`
//! - [`MatchMethod`], [`ReviewStatus`]: provenance and review classification
//!
//! [`Record`]: record::Record
//! [`Series`]: series::Series
//! [`Membership`]: series::Membership
//! [`Position`]: types::Position
//! [`MatchMethod`]: types::MatchMethod
//! [`ReviewStatus`]: types::ReviewStatus

pub mod record;
pub mod series;
pub mod types;
