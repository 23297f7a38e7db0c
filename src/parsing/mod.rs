//! Parsers for record import files.
//!
//! Records stand in for a media-server library scan and can be supplied as:
//!
//! - **JSON**: an array of objects with `external_id`, `title` and optional
//!   `author`, `series`, `position`
//! - **TSV/CSV**: columns `external_id, title, author, series, position`,
//!   with an optional header line and `#` comments
//!
//! ## Example
//!
//! ```rust
//! use series_matcher::parsing::records::parse_records_text;
//!
//! let tsv = "external_id\ttitle\tauthor\n1\tStormbreaker\tAnthony Horowitz\n";
//! let records = parse_records_text(tsv).unwrap();
//! assert_eq!(records[0].title, "Stormbreaker");
//! ```

use thiserror::Error;

pub mod records;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record file: {0}")]
    InvalidFormat(String),

    #[error("Too many records: {0} exceeds maximum allowed (100000)")]
    TooManyRecords(usize),
}
