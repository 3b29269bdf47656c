use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::domain::{
    Application, ApplicationAttempt, ApplicationId, ApplicationStatus, CandidateId, JobId,
    JobPosting,
};
use super::store::{ApplicationFilter, ApplicationStore, StoreError};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// How strictly status updates follow the lifecycle graph. Transitions out
/// of a terminal state are rejected under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Only terminal states are locked; stage skips (e.g. applied straight
    /// to accepted) are allowed. Matches how recruiters actually report.
    #[default]
    TerminalOnly,
    /// Full adjacency table enforcement.
    Strict,
}

/// Error raised by tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Time window for statistics queries, filtering on `applied_at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl StatisticsWindow {
    /// The trailing `days` ending now.
    pub fn last_days(days: i64) -> Self {
        let until = Utc::now();
        Self {
            from: until - chrono::Duration::days(days),
            until,
        }
    }
}

/// Derived aggregate over the application collection. Never persisted;
/// recomputed from a consistent snapshot on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub response_rate: f64,
    pub interview_rate: f64,
    pub success_rate: f64,
}

/// Owns the application lifecycle: record creation on successful dispatch,
/// the status state machine, hard deletes, and the derived statistics.
pub struct ApplicationTracker {
    store: Arc<dyn ApplicationStore>,
    policy: TransitionPolicy,
}

impl ApplicationTracker {
    pub fn new(store: Arc<dyn ApplicationStore>, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store_available(&self) -> bool {
        self.store.available()
    }

    /// Whether a non-terminal application exists for the pair. Used by the
    /// dispatcher's fast-fail guard; the authoritative check happens inside
    /// the store's insert.
    pub fn active_exists(&self, job: &JobId, candidate: &CandidateId) -> Result<bool, TrackerError> {
        Ok(self.store.active_exists(job, candidate)?)
    }

    /// Records a new application in the initial `applied` state. The store
    /// insert is atomic with the active-uniqueness check, so the loser of a
    /// concurrent dispatch race sees `StoreError::ActiveConflict`.
    pub fn record_applied(
        &self,
        posting: &JobPosting,
        candidate: &CandidateId,
        attempt: ApplicationAttempt,
    ) -> Result<Application, TrackerError> {
        let now = Utc::now();
        let application = Application {
            application_id: next_application_id(),
            job_id: posting.job_id.clone(),
            candidate_id: candidate.clone(),
            job_title: posting.title.clone(),
            company: posting.company.clone(),
            status: ApplicationStatus::Applied,
            applied_at: now,
            last_updated: now,
            notes: String::new(),
            attempt,
        };
        let stored = self.store.insert_active(application)?;
        info!(
            application_id = %stored.application_id.0,
            job_id = %stored.job_id.0,
            "application recorded"
        );
        Ok(stored)
    }

    /// Applies a status transition, rejecting any move out of a terminal
    /// state and, under the strict policy, any non-adjacent move. Notes
    /// replace the stored notes only when provided.
    pub fn update_status(
        &self,
        id: &ApplicationId,
        new_status: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application, TrackerError> {
        let mut application = self.store.fetch(id)?.ok_or(TrackerError::NotFound)?;
        let current = application.status;

        if current.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: current.label(),
                to: new_status.label(),
            });
        }
        if self.policy == TransitionPolicy::Strict
            && !current.successors().contains(&new_status)
        {
            return Err(TrackerError::InvalidTransition {
                from: current.label(),
                to: new_status.label(),
            });
        }

        application.status = new_status;
        application.last_updated = Utc::now();
        if let Some(notes) = notes {
            application.notes = notes;
        }
        self.store.update(application.clone())?;
        info!(
            application_id = %id.0,
            from = current.label(),
            to = new_status.label(),
            "status updated"
        );
        Ok(application)
    }

    /// Hard delete, outside the state machine. No undo.
    pub fn remove(&self, id: &ApplicationId) -> Result<(), TrackerError> {
        match self.store.remove(id) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(TrackerError::NotFound),
            Err(other) => Err(other.into()),
        }
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, TrackerError> {
        self.store.fetch(id)?.ok_or(TrackerError::NotFound)
    }

    pub fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, TrackerError> {
        Ok(self.store.list(filter)?)
    }

    /// Recomputes the aggregate statistics for applications whose
    /// `applied_at` falls inside the window. All rates are 0 for an empty
    /// window.
    pub fn statistics(&self, window: StatisticsWindow) -> Result<Statistics, TrackerError> {
        let filter = ApplicationFilter {
            applied_after: Some(window.from),
            applied_before: Some(window.until),
            ..ApplicationFilter::default()
        };
        let snapshot = self.store.list(&filter)?;

        let total = snapshot.len();
        let mut by_status = BTreeMap::new();
        let mut responses = 0usize;
        let mut interviews = 0usize;
        let mut successes = 0usize;

        for application in &snapshot {
            *by_status
                .entry(application.status.label().to_string())
                .or_insert(0) += 1;
            if application.status != ApplicationStatus::Applied {
                responses += 1;
            }
            if application.status.reached_interview() {
                interviews += 1;
            }
            if matches!(
                application.status,
                ApplicationStatus::Accepted | ApplicationStatus::OfferAccepted
            ) {
                successes += 1;
            }
        }

        let rate = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        Ok(Statistics {
            total,
            by_status,
            response_rate: rate(responses),
            interview_rate: rate(interviews),
            success_rate: rate(successes),
        })
    }
}
