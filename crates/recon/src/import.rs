use smeta_core::{normalize_name, prices_equal, round2, RateScope};

use crate::error::{SessionError, StoreError};
use crate::model::{
    CommitError, CommitErrorKind, CommitResult, ConflictItem, Decision, ImportReport,
    RateCandidate, RateRecord,
};

/// Persistence seam for the import workflow.
///
/// Deliberately blocking and called strictly one candidate at a time:
/// sequential per-row calls are what make per-row success/failure
/// attribution possible without a transactional multi-row upsert on the
/// store side.
pub trait RateStore {
    /// Case-insensitive lookup by normalized name within a scope.
    fn find(&self, scope: RateScope, name_norm: &str) -> Result<Option<RateRecord>, StoreError>;
    /// Insert a new rate; fails with `UniqueConstraint` on a
    /// (scope, normalized name) collision.
    fn insert(&mut self, scope: RateScope, candidate: &RateCandidate) -> Result<i64, StoreError>;
    /// Overwrite the price of an existing rate.
    fn update_price(&mut self, id: i64, price: f64) -> Result<(), StoreError>;
    /// Remove rates by id, returning how many rows went away.
    fn delete(&mut self, ids: &[i64]) -> Result<usize, StoreError>;
}

/// Classify parsed candidates against the persisted rate table.
///
/// One independent lookup per candidate; a failed lookup skips that
/// candidate into `lookup_errors` and analysis continues. Safe to re-run:
/// already-merged candidates come back as `same` and are skipped on
/// commit.
pub fn analyze(
    candidates: &[RateCandidate],
    scope: RateScope,
    store: &dyn RateStore,
    source_file: &str,
) -> ImportReport {
    let mut report = ImportReport {
        source_file: source_file.to_string(),
        scope,
        total_parsed: candidates.len(),
        new_items: Vec::new(),
        same_items: Vec::new(),
        conflicts: Vec::new(),
        lookup_errors: Vec::new(),
    };

    for candidate in candidates {
        let existing = match store.find(scope, &normalize_name(&candidate.name)) {
            Ok(found) => found,
            Err(e) => {
                report
                    .lookup_errors
                    .push(format!("'{}': {e}", candidate.name));
                continue;
            }
        };

        match existing {
            None => report.new_items.push(candidate.clone()),
            Some(record) if prices_equal(record.price, candidate.price) => {
                report.same_items.push(candidate.clone());
            }
            Some(record) => {
                // percentage comes from the raw delta; rounding the
                // difference first would understate small changes
                let raw = candidate.price - record.price;
                let difference = round2(raw);
                let percent_diff = if record.price > 0.0 {
                    round2(raw / record.price * 100.0)
                } else {
                    0.0
                };
                report.conflicts.push(ConflictItem {
                    candidate: candidate.clone(),
                    existing_id: record.id,
                    existing_price: record.price,
                    new_price: candidate.price,
                    difference,
                    percent_diff,
                    decision: Decision::Keep,
                });
            }
        }
    }

    report
}

/// Apply a reviewed report to the store.
///
/// Inserts every `new` candidate, updates conflicts decided `Update`,
/// skips `same` items and kept conflicts. Each write is attempted
/// independently; failures are recorded per item and the batch runs to
/// completion. The tally is always complete, even in partial failure.
pub fn commit(report: &ImportReport, store: &mut dyn RateStore) -> CommitResult {
    let mut result = CommitResult {
        skipped: report.same_items.len(),
        ..CommitResult::default()
    };

    for candidate in &report.new_items {
        match store.insert(report.scope, candidate) {
            Ok(_) => result.inserted += 1,
            Err(e) => result.errors.push(commit_error(&candidate.name, e)),
        }
    }

    for conflict in &report.conflicts {
        match conflict.decision {
            Decision::Keep => result.skipped += 1,
            Decision::Update => {
                match store.update_price(conflict.existing_id, conflict.new_price) {
                    Ok(()) => result.updated += 1,
                    Err(e) => result.errors.push(commit_error(&conflict.candidate.name, e)),
                }
            }
        }
    }

    result
}

fn commit_error(name: &str, error: StoreError) -> CommitError {
    let kind = match error {
        StoreError::UniqueConstraint(_) => CommitErrorKind::UniqueConstraint,
        StoreError::Write(_) | StoreError::Lookup(_) => CommitErrorKind::Write,
    };
    CommitError { name: name.to_string(), kind, message: error.to_string() }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Analyzed,
    Reviewing,
}

/// Review workflow around analyze/commit:
/// Idle → Analyzed → Reviewing → (commit) → Idle, with `cancel` dropping
/// the pending report from either active state without touching the
/// store.
#[derive(Debug, Default)]
pub struct ImportSession {
    report: Option<ImportReport>,
    reviewing: bool,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match (&self.report, self.reviewing) {
            (None, _) => SessionState::Idle,
            (Some(_), false) => SessionState::Analyzed,
            (Some(_), true) => SessionState::Reviewing,
        }
    }

    pub fn report(&self) -> Option<&ImportReport> {
        self.report.as_ref()
    }

    pub fn analyze(
        &mut self,
        candidates: &[RateCandidate],
        scope: RateScope,
        store: &dyn RateStore,
        source_file: &str,
    ) -> Result<&ImportReport, SessionError> {
        if self.report.is_some() {
            return Err(SessionError::AlreadyAnalyzed);
        }
        self.reviewing = false;
        Ok(self.report.insert(analyze(candidates, scope, store, source_file)))
    }

    /// Decide one conflict. Moves the session into `Reviewing`.
    pub fn set_decision(&mut self, index: usize, decision: Decision) -> Result<(), SessionError> {
        let report = self.report.as_mut().ok_or(SessionError::NotAnalyzed)?;
        let conflict = report
            .conflicts
            .get_mut(index)
            .ok_or(SessionError::BadConflictIndex(index))?;
        conflict.decision = decision;
        self.reviewing = true;
        Ok(())
    }

    /// Decide every conflict at once.
    pub fn set_all_decisions(&mut self, decision: Decision) -> Result<(), SessionError> {
        let report = self.report.as_mut().ok_or(SessionError::NotAnalyzed)?;
        for conflict in &mut report.conflicts {
            conflict.decision = decision;
        }
        self.reviewing = true;
        Ok(())
    }

    /// Run the batch commit and return to `Idle`, consuming the report.
    pub fn commit(&mut self, store: &mut dyn RateStore) -> Result<CommitResult, SessionError> {
        let report = self.report.take().ok_or(SessionError::NotAnalyzed)?;
        self.reviewing = false;
        Ok(commit(&report, store))
    }

    /// Drop the pending report. Zero persisted side effects.
    pub fn cancel(&mut self) {
        self.report = None;
        self.reviewing = false;
    }
}
