use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::record::Record;
use crate::core::series::{Membership, Series};
use crate::core::types::{MatchMethod, Position};
use crate::lookup::cache::{CachedLookup, LookupStats};
use crate::lookup::{LookupProvider, SeriesLookup};
use crate::matching::fuzzy::{FuzzyMatcher, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::matching::pattern::{extract_position, extract_series};
use crate::store::{EntityStore, StoreError};

/// Confidence assigned to a series named by the external provider
pub const EXTERNAL_LOOKUP_CONFIDENCE: u8 = 98;

/// Confidence assigned to the media server's own series metadata
pub const EMBEDDED_METADATA_CONFIDENCE: u8 = 95;

/// Confidence assigned to a series parsed out of the title
pub const TITLE_PATTERN_CONFIDENCE: u8 = 85;

/// Configuration for the matching engine
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Minimum fuzzy score for a membership
    pub confidence_threshold: u8,
    /// Whether the fuzzy fallback runs at all
    pub fuzzy_enabled: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fuzzy_enabled: true,
        }
    }
}

/// Outcome of matching one record
#[derive(Debug, Clone)]
pub struct RecordMatch {
    pub membership: Membership,
    pub series: Series,
    pub position: Option<Position>,
}

/// Totals for one pipeline run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MatchSummary {
    /// Records examined
    pub processed: usize,
    /// Records for which any stage produced a membership
    pub matched: usize,
    /// Matched records per stage
    pub by_method: BTreeMap<String, usize>,
    /// Series created during the run
    pub series_created: usize,
}

impl MatchSummary {
    pub fn unmatched(&self) -> usize {
        self.processed - self.matched
    }

    pub fn count(&self, method: MatchMethod) -> usize {
        self.by_method.get(method.as_str()).copied().unwrap_or(0)
    }

    fn tally(&mut self, outcome: Option<&RecordMatch>) {
        self.processed += 1;
        if let Some(found) = outcome {
            self.matched += 1;
            *self
                .by_method
                .entry(found.membership.method.as_str().to_string())
                .or_default() += 1;
        }
    }
}

/// A run stopped by a store failure. Memberships from the `processed`
/// records finished before it stay committed.
#[derive(Error, Debug)]
#[error("Matching aborted after {processed} records: {source}")]
pub struct MatchRunError {
    pub processed: usize,
    #[source]
    pub source: StoreError,
}

fn aborted(processed: usize) -> impl FnOnce(StoreError) -> MatchRunError {
    move |source| MatchRunError { processed, source }
}

/// Candidate produced by one pipeline stage before it is stored
struct Candidate {
    name: String,
    method: MatchMethod,
    score: u8,
    position: Option<Position>,
    /// Set when the stage already resolved an existing series
    series: Option<Series>,
}

/// The matching pipeline.
///
/// For each record the stages run in a fixed order and the first one that
/// succeeds decides the membership:
///
/// 1. external lookup (when a provider is configured)
/// 2. the record's embedded series hint
/// 3. series pattern in the title
/// 4. fuzzy match against all known series
pub struct MatchingEngine<'a, S, P = LookupProvider> {
    store: &'a mut S,
    lookup: Option<CachedLookup<P>>,
    fuzzy: FuzzyMatcher,
    config: MatchingConfig,
}

impl<'a, S: EntityStore> MatchingEngine<'a, S, LookupProvider> {
    /// Create an engine with no external lookup
    pub fn new(store: &'a mut S, config: MatchingConfig) -> Self {
        Self {
            store,
            lookup: None,
            fuzzy: FuzzyMatcher::new(config.confidence_threshold),
            config,
        }
    }
}

impl<'a, S: EntityStore, P: SeriesLookup> MatchingEngine<'a, S, P> {
    /// Attach an external lookup; it is tried before every other stage
    pub fn with_lookup<Q: SeriesLookup>(self, lookup: CachedLookup<Q>) -> MatchingEngine<'a, S, Q> {
        MatchingEngine {
            store: self.store,
            lookup: Some(lookup),
            fuzzy: self.fuzzy,
            config: self.config,
        }
    }

    /// Attach an external lookup if one is configured
    pub fn with_optional_lookup(mut self, lookup: Option<CachedLookup<P>>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn lookup_stats(&self) -> Option<LookupStats> {
        self.lookup.as_ref().map(CachedLookup::stats)
    }

    /// Match every record in the store.
    ///
    /// The first three stages run over all records before any fuzzy match,
    /// so the fuzzy fallback compares against every series this run creates
    /// regardless of scan order.
    ///
    /// # Errors
    ///
    /// Returns `MatchRunError` if the store fails; memberships written for
    /// earlier records are kept.
    pub fn run(&mut self) -> Result<MatchSummary, MatchRunError> {
        let records = self.store.records().map_err(aborted(0))?;
        let series_before = self.store.all_series().map_err(aborted(0))?.len();

        let mut summary = MatchSummary::default();
        let mut deferred = Vec::new();
        for record in &records {
            let candidate = self
                .direct_candidate(record)
                .map_err(aborted(summary.processed))?;
            match candidate {
                Some(candidate) => {
                    let found = self
                        .apply(record, candidate)
                        .map_err(aborted(summary.processed))?;
                    summary.tally(Some(&found));
                }
                None if self.config.fuzzy_enabled => deferred.push(record),
                None => {
                    debug!(title = %record.title, "No series found");
                    summary.tally(None);
                }
            }
        }

        if !deferred.is_empty() {
            let known = self
                .store
                .all_series()
                .map_err(aborted(summary.processed))?;
            for record in deferred {
                let outcome = match self.fuzzy_candidate(record, &known) {
                    Some(candidate) => Some(
                        self.apply(record, candidate)
                            .map_err(aborted(summary.processed))?,
                    ),
                    None => {
                        debug!(title = %record.title, "No series found");
                        None
                    }
                };
                summary.tally(outcome.as_ref());
            }
        }

        summary.series_created = self
            .store
            .all_series()
            .map_err(aborted(summary.processed))?
            .len()
            .saturating_sub(series_before);

        info!(
            processed = summary.processed,
            matched = summary.matched,
            series_created = summary.series_created,
            "Matched {} of {} records to series",
            summary.matched,
            summary.processed
        );
        Ok(summary)
    }

    /// Run the pipeline for one record and store the result.
    ///
    /// Returns `None` when no stage finds a series, which is not an error.
    pub fn match_record(&mut self, record: &Record) -> Result<Option<RecordMatch>, StoreError> {
        let mut candidate = self.direct_candidate(record)?;
        if candidate.is_none() && self.config.fuzzy_enabled {
            let known = self.store.all_series()?;
            candidate = self.fuzzy_candidate(record, &known);
        }

        match candidate {
            Some(candidate) => self.apply(record, candidate).map(Some),
            None => {
                debug!(title = %record.title, "No series found");
                Ok(None)
            }
        }
    }

    /// Store the membership and position for a candidate
    fn apply(&mut self, record: &Record, candidate: Candidate) -> Result<RecordMatch, StoreError> {
        let series = match candidate.series {
            Some(series) => series,
            None => self.resolve_series(&candidate.name, record.author())?,
        };
        let membership =
            self.upsert_membership(record, &series, candidate.score, candidate.method)?;

        if let Some(position) = &candidate.position {
            self.store
                .set_position(&record.external_id, position.clone())?;
        }

        debug!(
            title = %record.title,
            series = %series.name,
            method = %candidate.method,
            score = candidate.score,
            "Matched record"
        );

        Ok(RecordMatch {
            membership,
            series,
            position: candidate.position,
        })
    }

    /// Lookup, embedded hint and title pattern, in that order
    fn direct_candidate(&self, record: &Record) -> Result<Option<Candidate>, StoreError> {
        if let Some(lookup) = &self.lookup {
            if let Some(info) = lookup.lookup(&record.title, record.author()) {
                // Only the position is salvaged from the title here
                let position = info.position.or_else(|| extract_position(&record.title));
                return Ok(Some(Candidate {
                    name: info.name,
                    method: MatchMethod::ExternalLookup,
                    score: EXTERNAL_LOOKUP_CONFIDENCE,
                    position,
                    series: None,
                }));
            }
        }

        if let Some(hint) = record.series_hint() {
            return Ok(Some(Candidate {
                name: hint.to_string(),
                method: MatchMethod::EmbeddedMetadata,
                score: EMBEDDED_METADATA_CONFIDENCE,
                position: None,
                series: None,
            }));
        }

        if let Some(found) = extract_series(&record.title) {
            return Ok(Some(Candidate {
                name: found.name,
                method: MatchMethod::TitlePattern,
                score: TITLE_PATTERN_CONFIDENCE,
                position: Some(found.position),
                series: None,
            }));
        }

        Ok(None)
    }

    fn fuzzy_candidate(&self, record: &Record, known: &[Series]) -> Option<Candidate> {
        let found = self.fuzzy.match_existing(record, known)?;
        Some(Candidate {
            name: found.series.name.clone(),
            method: MatchMethod::Fuzzy,
            score: found.score,
            position: extract_position(&record.title),
            series: Some(found.series),
        })
    }

    /// Reuse the first series whose name contains `name`, or create one
    fn resolve_series(&mut self, name: &str, author: Option<&str>) -> Result<Series, StoreError> {
        if let Some(existing) = self.store.find_series_containing(name)? {
            return Ok(existing);
        }

        let series = self.store.insert_series(name, author)?;
        info!(series = %series.name, id = %series.id, "Created new series");
        Ok(series)
    }

    /// Insert a membership, or update score and method of the existing one
    fn upsert_membership(
        &mut self,
        record: &Record,
        series: &Series,
        score: u8,
        method: MatchMethod,
    ) -> Result<Membership, StoreError> {
        match self.store.find_membership(&record.external_id, series.id)? {
            Some(mut existing) => {
                existing.score = score;
                existing.method = method;
                self.store.update_membership(&existing)?;
                Ok(existing)
            }
            None => self
                .store
                .insert_membership(&record.external_id, series.id, score, method),
        }
    }
}
