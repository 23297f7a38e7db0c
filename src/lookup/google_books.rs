use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::core::types::Position;
use crate::lookup::{transport_error, LookupError, ProviderKind, SeriesInfo, SeriesLookup};

pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";

const USER_AGENT: &str = concat!("series-matcher/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Volumes search response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub series_info: Option<VolumeSeriesInfo>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSeriesInfo {
    pub book_display_number: Option<String>,
    #[serde(default)]
    pub volume_series: Vec<VolumeSeries>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSeries {
    pub series_id: Option<String>,
    pub order_number: Option<u32>,
}

/// Series lookup through the Google Books volumes search
pub struct GoogleBooksLookup {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl std::fmt::Debug for GoogleBooksLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooksLookup")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GoogleBooksLookup {
    /// Create a client; the API key is optional for low request volumes.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Network` if the HTTP client cannot be built.
    pub fn new(api_key: Option<String>) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: GOOGLE_BOOKS_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl SeriesLookup for GoogleBooksLookup {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BibliographicCatalog
    }

    fn lookup(&self, title: &str, author: Option<&str>) -> Result<Option<SeriesInfo>, LookupError> {
        let query = build_query(title, author);
        debug!(query = %query, "Querying book catalog");

        let mut params = vec![("q", query), ("maxResults", "1".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), error_text));
        }

        let volumes: VolumesResponse = response
            .json()
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        Ok(interpret_volumes(&volumes))
    }
}

/// Build the catalog search query: `intitle:"..."` plus `inauthor:"..."` when known
#[must_use]
pub fn build_query(title: &str, author: Option<&str>) -> String {
    let clean = |s: &str| s.replace('"', "").trim().to_string();

    let mut query = format!("intitle:\"{}\"", clean(title));
    if let Some(author) = author.map(clean).filter(|a| !a.is_empty()) {
        query.push_str(&format!(" inauthor:\"{author}\""));
    }
    query
}

/// Read structured series metadata from the top search result.
///
/// Only `seriesInfo` counts. Category strings that look like series hints are
/// logged and otherwise ignored.
#[must_use]
pub fn interpret_volumes(response: &VolumesResponse) -> Option<SeriesInfo> {
    if response.total_items == 0 {
        return None;
    }
    let info = &response.items.first()?.volume_info;

    for category in &info.categories {
        if category.to_lowercase().contains("book") && category.chars().any(|c| c.is_ascii_digit()) {
            debug!(category = %category, "Possible series hint in category (not used)");
        }
    }

    let series_info = info.series_info.as_ref()?;
    let volume_series = series_info.volume_series.first()?;
    let name = volume_series
        .series_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())?
        .to_string();

    let position = series_info
        .book_display_number
        .as_deref()
        .and_then(Position::parse)
        .or_else(|| {
            volume_series
                .order_number
                .map(|n| Position::Number(n.to_string()))
        });

    Some(SeriesInfo { name, position })
}
