//! Runtime configuration.
//!
//! Settings are read from an optional JSON file with camelCase keys. Every
//! field has a default, so an empty object (or no file at all) is a valid
//! configuration:
//!
//! ```json
//! {
//!   "matching": { "confidenceThreshold": 70, "autoApproveThreshold": 95 },
//!   "externalApi": { "enabled": true, "provider": "bibliographic-catalog" }
//! }
//! ```
//!
//! The OpenAI key may also come from the `SERIES_MATCHER_OPENAI_API_KEY`
//! environment variable, which takes priority over the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::lookup::cache::CachedLookup;
use crate::lookup::google_books::GoogleBooksLookup;
use crate::lookup::openai::{OpenAiLookup, DEFAULT_MODEL};
use crate::lookup::rate_limit::DEFAULT_COOLDOWN;
use crate::lookup::{LookupError, LookupProvider, ProviderKind};
use crate::matching::engine::MatchingConfig;
use crate::matching::fuzzy::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::matching::review::DEFAULT_AUTO_APPROVE_THRESHOLD;
use crate::utils::validation::check_threshold;

/// Environment variable holding the OpenAI API key
pub const OPENAI_KEY_ENV: &str = "SERIES_MATCHER_OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to set up external lookup: {0}")]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub matching: MatchingSettings,
    pub external_api: ExternalApiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingSettings {
    /// Minimum fuzzy score for a membership
    pub confidence_threshold: u8,
    /// Score at or above which `review approve-all` approves
    pub auto_approve_threshold: u8,
    pub fuzzy_match_enabled: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            auto_approve_threshold: DEFAULT_AUTO_APPROVE_THRESHOLD,
            fuzzy_match_enabled: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalApiSettings {
    pub enabled: bool,
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub google_books_api_key: Option<String>,
    /// Overrides the provider's default request spacing
    pub min_interval_ms: Option<u64>,
    pub cooldown_secs: u64,
}

impl Default for ExternalApiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: ProviderKind::default(),
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            google_books_api_key: None,
            min_interval_ms: None,
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
        }
    }
}

impl std::fmt::Debug for ExternalApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalApiSettings")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_model", &self.openai_model)
            .field(
                "google_books_api_key",
                &self.google_books_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("min_interval_ms", &self.min_interval_ms)
            .field("cooldown_secs", &self.cooldown_secs)
            .finish()
    }
}

impl Config {
    /// Load and validate a config file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults; environment
    /// overrides apply either way
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a given file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Parse and validate a JSON config without touching the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON or
    /// `ConfigError::Invalid` for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let matching = &self.matching;
        for (name, value) in [
            ("matching.confidenceThreshold", matching.confidence_threshold),
            ("matching.autoApproveThreshold", matching.auto_approve_threshold),
        ] {
            if let Some(msg) = check_threshold(name, value) {
                return Err(ConfigError::Invalid(msg));
            }
        }
        if self.external_api.openai_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "externalApi.openaiModel must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        self.override_openai_key(std::env::var(OPENAI_KEY_ENV).ok());
    }

    /// Replace the configured OpenAI key with `env_key` when it is non-blank
    pub fn override_openai_key(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
            if self.external_api.openai_api_key.as_deref().is_some_and(is_valid_key) {
                warn!("OpenAI API key set in both config file and environment, using environment");
            }
            self.external_api.openai_api_key = Some(key);
        }
    }

    pub fn matching_config(&self) -> MatchingConfig {
        MatchingConfig {
            confidence_threshold: self.matching.confidence_threshold,
            fuzzy_enabled: self.matching.fuzzy_match_enabled,
        }
    }

    /// Provider that will actually be used, after the missing-key fallback
    pub fn effective_provider(&self) -> ProviderKind {
        let api = &self.external_api;
        match api.provider {
            ProviderKind::AiSemantic
                if !api.openai_api_key.as_deref().is_some_and(is_valid_key) =>
            {
                ProviderKind::BibliographicCatalog
            }
            kind => kind,
        }
    }

    /// Build the cached external lookup, or `None` when lookups are disabled.
    ///
    /// Selecting the AI provider without an API key falls back to the book
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Lookup` if the HTTP client cannot be created.
    pub fn build_lookup(&self) -> Result<Option<CachedLookup<LookupProvider>>, ConfigError> {
        let api = &self.external_api;
        if !api.enabled {
            return Ok(None);
        }

        let kind = self.effective_provider();
        if kind != api.provider {
            warn!(
                requested = %api.provider,
                using = %kind,
                "No OpenAI API key configured, falling back to book catalog lookup"
            );
        }

        let provider = match kind {
            ProviderKind::AiSemantic => {
                let key = api.openai_api_key.clone().unwrap_or_default();
                LookupProvider::AiSemantic(OpenAiLookup::new(key, api.openai_model.clone())?)
            }
            ProviderKind::BibliographicCatalog => LookupProvider::BibliographicCatalog(
                GoogleBooksLookup::new(api.google_books_api_key.clone())?,
            ),
        };

        let min_interval = api
            .min_interval_ms
            .map_or_else(|| kind.default_min_interval(), Duration::from_millis);
        let cooldown = Duration::from_secs(api.cooldown_secs);

        info!(
            provider = %kind,
            min_interval_ms = min_interval.as_millis(),
            cooldown_secs = api.cooldown_secs,
            "External lookup enabled"
        );
        Ok(Some(CachedLookup::with_limits(provider, min_interval, cooldown)))
    }
}

/// Non-empty, non-whitespace
fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
