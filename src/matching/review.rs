use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::record::Record;
use crate::core::series::{Membership, Series};
use crate::core::types::{MatchId, MatchMethod, ReviewStatus, StatusFilter};
use crate::store::{EntityStore, StoreError};

/// Default score at or above which pending memberships are bulk-approved
pub const DEFAULT_AUTO_APPROVE_THRESHOLD: u8 = 95;

/// Result of a point review operation
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Updated(Membership),
    NotFound,
}

impl ReviewOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// A membership joined with its record and series, as shown to reviewers
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub id: MatchId,
    pub record: Record,
    pub series: Series,
    pub score: u8,
    pub method: MatchMethod,
    pub approved: bool,
    pub rejected: bool,
}

impl MatchView {
    pub fn status(&self) -> ReviewStatus {
        match (self.approved, self.rejected) {
            (true, _) => ReviewStatus::Approved,
            (false, true) => ReviewStatus::Rejected,
            (false, false) => ReviewStatus::Pending,
        }
    }
}

/// Library-wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub records: usize,
    pub series: usize,
    pub memberships: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Records without any membership
    pub unmatched: usize,
}

/// Review operations over stored memberships.
///
/// Approving clears the rejected flag and rejecting clears the approved flag,
/// so a membership is always in exactly one of the three review states.
pub struct ReviewBoard<'a, S> {
    store: &'a mut S,
}

impl<'a, S: EntityStore> ReviewBoard<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Memberships in the given review state, oldest first.
    ///
    /// Memberships whose record or series has disappeared from the store are
    /// skipped.
    pub fn list(&self, filter: StatusFilter) -> Result<Vec<MatchView>, StoreError> {
        let mut views = Vec::new();
        for membership in self.store.memberships()? {
            if !filter.accepts(membership.status()) {
                continue;
            }
            if let Some(view) = self.view(membership)? {
                views.push(view);
            }
        }
        Ok(views)
    }

    pub fn pending(&self) -> Result<Vec<MatchView>, StoreError> {
        self.list(StatusFilter::Pending)
    }

    pub fn approve(&mut self, id: MatchId) -> Result<ReviewOutcome, StoreError> {
        self.set_flags(id, true)
    }

    pub fn reject(&mut self, id: MatchId) -> Result<ReviewOutcome, StoreError> {
        self.set_flags(id, false)
    }

    /// Approve every pending membership scoring at least `threshold`.
    ///
    /// Returns the number approved. Already reviewed memberships are left alone.
    pub fn approve_all(&mut self, threshold: u8) -> Result<usize, StoreError> {
        let targets: Vec<MatchId> = self
            .store
            .memberships()?
            .into_iter()
            .filter(|m| m.is_pending() && m.score >= threshold)
            .map(|m| m.id)
            .collect();

        let count = self.apply(&targets, true)?;
        info!(count, threshold, "Approved pending matches");
        Ok(count)
    }

    /// Reject every pending membership. Returns the number rejected.
    pub fn reject_all_pending(&mut self) -> Result<usize, StoreError> {
        let targets: Vec<MatchId> = self
            .store
            .memberships()?
            .into_iter()
            .filter(Membership::is_pending)
            .map(|m| m.id)
            .collect();

        let count = self.apply(&targets, false)?;
        info!(count, "Rejected pending matches");
        Ok(count)
    }

    /// Delete a membership; its series is kept even if it becomes empty
    pub fn remove(&mut self, id: MatchId) -> Result<ReviewOutcome, StoreError> {
        match self.store.remove_membership(id)? {
            Some(removed) => {
                debug!(id = %id, "Removed match");
                Ok(ReviewOutcome::Updated(removed))
            }
            None => Ok(ReviewOutcome::NotFound),
        }
    }

    /// Records that no membership points at
    pub fn unmatched_records(&self) -> Result<Vec<Record>, StoreError> {
        let matched: HashSet<_> = self
            .store
            .memberships()?
            .into_iter()
            .map(|m| m.record_id)
            .collect();

        Ok(self
            .store
            .records()?
            .into_iter()
            .filter(|r| !matched.contains(&r.external_id))
            .collect())
    }

    pub fn summary(&self) -> Result<LibraryStats, StoreError> {
        let records = self.store.records()?;
        let memberships = self.store.memberships()?;
        let matched: HashSet<_> = memberships.iter().map(|m| &m.record_id).collect();

        let mut stats = LibraryStats {
            records: records.len(),
            series: self.store.all_series()?.len(),
            memberships: memberships.len(),
            unmatched: records
                .iter()
                .filter(|r| !matched.contains(&r.external_id))
                .count(),
            ..LibraryStats::default()
        };
        for membership in &memberships {
            match membership.status() {
                ReviewStatus::Pending => stats.pending += 1,
                ReviewStatus::Approved => stats.approved += 1,
                ReviewStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }

    fn apply(&mut self, ids: &[MatchId], approve: bool) -> Result<usize, StoreError> {
        let mut count = 0;
        for &id in ids {
            if self.set_flags(id, approve)?.is_updated() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn set_flags(&mut self, id: MatchId, approve: bool) -> Result<ReviewOutcome, StoreError> {
        let Some(mut membership) = self.store.membership(id)? else {
            debug!(id = %id, "Match not found");
            return Ok(ReviewOutcome::NotFound);
        };

        membership.approved = approve;
        membership.rejected = !approve;
        if !self.store.update_membership(&membership)? {
            return Ok(ReviewOutcome::NotFound);
        }
        Ok(ReviewOutcome::Updated(membership))
    }

    fn view(&self, membership: Membership) -> Result<Option<MatchView>, StoreError> {
        let Some(record) = self.store.record(&membership.record_id)? else {
            return Ok(None);
        };
        let Some(series) = self.store.series(membership.series_id)? else {
            return Ok(None);
        };

        Ok(Some(MatchView {
            id: membership.id,
            record,
            series,
            score: membership.score,
            method: membership.method,
            approved: membership.approved,
            rejected: membership.rejected,
        }))
    }
}
