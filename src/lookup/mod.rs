//! External series lookups.
//!
//! Two providers sit behind the [`SeriesLookup`] capability:
//!
//! - [`OpenAiLookup`]: asks a chat model whether a title belongs to a series,
//!   constrained to a strict JSON answer
//! - [`GoogleBooksLookup`]: searches a public book catalog and reads structured
//!   series metadata from the top hit
//!
//! Which one is active is decided once, when a [`LookupProvider`] is built
//! from configuration. Callers should go through [`CachedLookup`], which adds
//! the per-provider cache, request spacing and the cooldown after a
//! rate-limit signal, and turns every provider error into "no result".
//!
//! [`OpenAiLookup`]: openai::OpenAiLookup
//! [`GoogleBooksLookup`]: google_books::GoogleBooksLookup
//! [`CachedLookup`]: cache::CachedLookup

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::types::Position;

pub mod cache;
pub mod google_books;
pub mod openai;
pub mod rate_limit;

use google_books::GoogleBooksLookup;
use openai::OpenAiLookup;

/// Series answer from an external provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub name: String,
    pub position: Option<Position>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Provider rate limit reached")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Which external provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    AiSemantic,
    BibliographicCatalog,
}

impl ProviderKind {
    /// Stable identifier, also used in cache keys
    pub fn id(self) -> &'static str {
        match self {
            Self::AiSemantic => "ai-semantic",
            Self::BibliographicCatalog => "bibliographic-catalog",
        }
    }

    /// Minimum spacing between requests
    pub fn default_min_interval(self) -> Duration {
        match self {
            Self::AiSemantic => Duration::from_millis(100),
            // Public quota is strict
            Self::BibliographicCatalog => Duration::from_secs(2),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Maps a title (and author, if known) to an optional series
pub trait SeriesLookup {
    fn kind(&self) -> ProviderKind;

    /// Query the provider.
    ///
    /// `Ok(None)` means the provider answered and found no series.
    fn lookup(&self, title: &str, author: Option<&str>) -> Result<Option<SeriesInfo>, LookupError>;
}

/// The configured provider
#[derive(Debug)]
pub enum LookupProvider {
    AiSemantic(OpenAiLookup),
    BibliographicCatalog(GoogleBooksLookup),
}

impl SeriesLookup for LookupProvider {
    fn kind(&self) -> ProviderKind {
        match self {
            Self::AiSemantic(_) => ProviderKind::AiSemantic,
            Self::BibliographicCatalog(_) => ProviderKind::BibliographicCatalog,
        }
    }

    fn lookup(&self, title: &str, author: Option<&str>) -> Result<Option<SeriesInfo>, LookupError> {
        match self {
            Self::AiSemantic(provider) => provider.lookup(title, author),
            Self::BibliographicCatalog(provider) => provider.lookup(title, author),
        }
    }
}

/// Map a transport failure onto the lookup error taxonomy
pub(crate) fn transport_error(err: &reqwest::Error) -> LookupError {
    match err.status() {
        Some(status) if status.as_u16() == 429 => LookupError::RateLimited,
        Some(status) => LookupError::Api(status.as_u16(), err.to_string()),
        None => LookupError::Network(err.to_string()),
    }
}
