use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::channels::{ApplicationChannel, ValidationError};
use super::domain::{
    Application, ApplicationAttempt, CandidateProfile, ChannelAttempt, ChannelKind,
    ChannelOutcome, DispatchOutcome, JobPosting,
};
use super::store::StoreError;
use super::tracker::{ApplicationTracker, TrackerError};

/// Dispatcher knobs. The timeout bounds a single channel's transport call;
/// an expiry counts as a channel failure and the next channel is tried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub channel_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(30),
        }
    }
}

/// Error raised when a dispatch cannot produce an attempt record.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An application for this (job, candidate) pair is still in flight.
    #[error("application already in progress for job {job_id}")]
    DuplicateInProgress { job_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// What a successful dispatch call hands back: the full diagnostic trail and
/// the created record, when one exists.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub attempt: ApplicationAttempt,
    pub application: Option<Application>,
}

/// Tries each applicable channel in fixed priority order (mail, form,
/// manual) until one submits, preserving every sub-result for diagnostics.
pub struct AutoApplyDispatcher {
    channels: Vec<Arc<dyn ApplicationChannel>>,
    tracker: Arc<ApplicationTracker>,
    config: DispatcherConfig,
}

impl AutoApplyDispatcher {
    pub fn new(
        mut channels: Vec<Arc<dyn ApplicationChannel>>,
        tracker: Arc<ApplicationTracker>,
        config: DispatcherConfig,
    ) -> Self {
        channels.sort_by_key(|channel| channel.kind());
        Self {
            channels,
            tracker,
            config,
        }
    }

    pub fn channel_health(&self) -> Vec<(ChannelKind, bool)> {
        self.channels
            .iter()
            .map(|channel| (channel.kind(), channel.healthy()))
            .collect()
    }

    /// One end-to-end application attempt for a posting. Fails fast with
    /// `DuplicateInProgress` before touching any channel when an active
    /// application already exists; the same error is returned to the loser
    /// of a concurrent race, whose winning peer created the record first.
    pub async fn dispatch(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<DispatchResult, DispatchError> {
        if self
            .tracker
            .active_exists(&posting.job_id, &profile.candidate_id)?
        {
            return Err(DispatchError::DuplicateInProgress {
                job_id: posting.job_id.0.clone(),
            });
        }

        let mut trail: Vec<ChannelAttempt> = Vec::new();
        let mut winner: Option<ChannelKind> = None;

        for channel in &self.channels {
            if !channel.can_handle(posting) {
                continue;
            }
            let kind = channel.kind();
            let outcome = self.attempt_with_timeout(channel, posting, profile).await?;

            match &outcome {
                ChannelOutcome::Submitted { target } => {
                    info!(job_id = %posting.job_id.0, channel = kind.label(), %target, "application submitted");
                    winner = Some(kind);
                }
                ChannelOutcome::Failed { reason } => {
                    warn!(job_id = %posting.job_id.0, channel = kind.label(), %reason, "channel failed, falling through");
                }
                ChannelOutcome::ManualActionRequired => {
                    info!(job_id = %posting.job_id.0, "flagged for manual application");
                }
            }

            trail.push(ChannelAttempt {
                channel: kind,
                outcome,
            });
            if winner.is_some() {
                break;
            }
        }

        let outcome = match winner {
            Some(kind) => DispatchOutcome::Applied(kind),
            None if trail
                .iter()
                .any(|a| a.outcome == ChannelOutcome::ManualActionRequired) =>
            {
                DispatchOutcome::ManualFollowUp
            }
            None => DispatchOutcome::Failed,
        };

        let attempt = ApplicationAttempt {
            job_id: posting.job_id.clone(),
            candidate_id: profile.candidate_id.clone(),
            channels: trail,
            outcome,
            attempted_at: Utc::now(),
        };

        // Only a submitted channel creates a record; failed and manual
        // outcomes leave the job eligible for a future dispatch.
        let application = match outcome {
            DispatchOutcome::Applied(_) => {
                match self
                    .tracker
                    .record_applied(posting, &profile.candidate_id, attempt.clone())
                {
                    Ok(application) => Some(application),
                    Err(TrackerError::Store(StoreError::ActiveConflict)) => {
                        return Err(DispatchError::DuplicateInProgress {
                            job_id: posting.job_id.0.clone(),
                        });
                    }
                    Err(other) => return Err(other.into()),
                }
            }
            _ => None,
        };

        Ok(DispatchResult {
            attempt,
            application,
        })
    }

    /// Runs a blocking channel attempt on a worker thread under the
    /// configured timeout. Timeouts and runtime failures degrade to a
    /// channel failure so the fallback chain continues.
    async fn attempt_with_timeout(
        &self,
        channel: &Arc<dyn ApplicationChannel>,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<ChannelOutcome, ValidationError> {
        let channel = Arc::clone(channel);
        let posting = posting.clone();
        let profile = profile.clone();
        let attempt =
            tokio::task::spawn_blocking(move || channel.attempt(&posting, &profile));

        match tokio::time::timeout(self.config.channel_timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Ok(ChannelOutcome::Failed {
                reason: format!("channel task failed: {join_error}"),
            }),
            Err(_) => Ok(ChannelOutcome::Failed {
                reason: format!(
                    "timed out after {}s",
                    self.config.channel_timeout.as_secs()
                ),
            }),
        }
    }
}
