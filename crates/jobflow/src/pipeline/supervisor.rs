use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::dispatcher::{AutoApplyDispatcher, DispatchError};
use super::domain::{CandidateId, ChannelKind, DispatchOutcome, JobId, JobPosting};
use super::scoring::MatchScorer;
use super::store::{CandidateDirectory, JobQuery, JobSource};
use super::tracker::ApplicationTracker;

/// Supervisor knobs. The cooldown bounds load on external collaborators
/// between cycles; the dispatch cap mirrors the daily application limit of
/// the original workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub candidate_id: CandidateId,
    pub min_score: f32,
    pub max_jobs: usize,
    pub max_concurrent_dispatches: usize,
    pub max_applications_per_cycle: usize,
    pub cooldown: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            candidate_id: CandidateId("default".to_string()),
            min_score: 40.0,
            max_jobs: 50,
            max_concurrent_dispatches: 4,
            max_applications_per_cycle: 10,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Scheduler lifecycle. Cooldown expires lazily: the next reservation
/// attempt after the deadline observes idle.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Running,
    Cooldown { until: std::time::Instant },
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Cooldown { .. } => "cooldown",
        }
    }
}

/// Error raised by supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// A cycle is already running or cooling down; the trigger is rejected,
    /// never queued.
    #[error("cycle already {state}")]
    CycleBusy { state: &'static str },
}

/// Per-job disposition inside a cycle summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum JobResult {
    Applied { channel: ChannelKind },
    ManualFollowUp { trail: String },
    Failed { trail: String },
    Duplicate,
    Error { detail: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub title: String,
    pub company: String,
    pub score: f32,
    #[serde(flatten)]
    pub result: JobResult,
}

/// Best-effort summary of one fetch → score → select → dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub query: Option<JobQuery>,
    pub fetched: usize,
    pub scored: usize,
    pub selected: usize,
    pub applied: usize,
    pub manual: usize,
    pub failed: usize,
    pub outcomes: Vec<JobOutcome>,
    /// Set when an external collaborator failure aborted the cycle step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub cancelled: bool,
}

/// Status payload for external monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStatus {
    pub state: &'static str,
    pub auto_mode_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelHealth {
    pub channel: &'static str,
    pub healthy: bool,
}

/// Read-only reachability report for external collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub job_source: bool,
    pub store: bool,
    pub channels: Vec<ChannelHealth>,
}

/// The scheduler tying the pipeline together: pulls postings, scores them,
/// selects above-threshold matches, and dispatches each with bounded
/// concurrency. One cycle runs at a time system-wide.
pub struct Supervisor {
    source: Arc<dyn JobSource>,
    directory: Arc<dyn CandidateDirectory>,
    scorer: MatchScorer,
    dispatcher: Arc<AutoApplyDispatcher>,
    tracker: Arc<ApplicationTracker>,
    config: SupervisorConfig,
    phase: Mutex<Phase>,
    auto_mode: AtomicBool,
    stop_requested: AtomicBool,
    last_summary: Mutex<Option<CycleSummary>>,
}

impl Supervisor {
    pub fn new(
        source: Arc<dyn JobSource>,
        directory: Arc<dyn CandidateDirectory>,
        scorer: MatchScorer,
        dispatcher: Arc<AutoApplyDispatcher>,
        tracker: Arc<ApplicationTracker>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            source,
            directory,
            scorer,
            dispatcher,
            tracker,
            config,
            phase: Mutex::new(Phase::Idle),
            auto_mode: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            last_summary: Mutex::new(None),
        }
    }

    /// Runs one full cycle inline. Rejected immediately with `CycleBusy`
    /// when another cycle holds the lock or the cooldown has not elapsed.
    pub async fn run_cycle(self: &Arc<Self>, query: JobQuery) -> Result<CycleSummary, SupervisorError> {
        self.reserve()?;
        Ok(self.execute(Some(query), None).await)
    }

    /// Reserves the scheduler and runs the cycle on a background task,
    /// returning as soon as the reservation is made. Busy rejection is
    /// still immediate.
    pub fn spawn_cycle(self: &Arc<Self>, query: JobQuery) -> Result<(), SupervisorError> {
        self.reserve()?;
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            supervisor.execute(Some(query), None).await;
        });
        Ok(())
    }

    /// Targeted re-dispatch of specific postings under the same one-cycle
    /// guard.
    pub async fn dispatch_jobs(self: &Arc<Self>, job_ids: Vec<JobId>) -> Result<CycleSummary, SupervisorError> {
        self.reserve()?;
        Ok(self.execute(None, Some(job_ids)).await)
    }

    /// Timer loop for auto mode. Busy ticks are skipped; the loop exits
    /// when auto mode is disabled.
    pub async fn run_auto(self: Arc<Self>, query: JobQuery, interval: Duration) {
        self.auto_mode.store(true, Ordering::Release);
        info!(interval_secs = interval.as_secs(), "auto mode enabled");
        while self.auto_mode.load(Ordering::Acquire) {
            tokio::time::sleep(interval).await;
            if !self.auto_mode.load(Ordering::Acquire) {
                break;
            }
            match self.run_cycle(query.clone()).await {
                Ok(summary) => {
                    info!(applied = summary.applied, failed = summary.failed, "scheduled cycle complete");
                }
                Err(SupervisorError::CycleBusy { state }) => {
                    warn!(state, "scheduled tick skipped");
                }
            }
        }
        info!("auto mode disabled");
    }

    pub fn disable_auto(&self) {
        self.auto_mode.store(false, Ordering::Release);
    }

    /// Cooperative cancellation: in-flight dispatches finish, queued jobs
    /// are recorded as skipped.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn status(&self) -> SupervisorStatus {
        let phase = *self.phase.lock().expect("phase mutex poisoned");
        let state = match phase {
            Phase::Cooldown { until } if std::time::Instant::now() >= until => "idle",
            other => other.label(),
        };
        SupervisorStatus {
            state,
            auto_mode_enabled: self.auto_mode.load(Ordering::Acquire),
            last_cycle: self.last_summary.lock().expect("summary mutex poisoned").clone(),
        }
    }

    /// Reachability of external collaborators. Does not mutate state.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            job_source: self.source.available(),
            store: self.tracker.store_available(),
            channels: self
                .dispatcher
                .channel_health()
                .into_iter()
                .map(|(kind, healthy)| ChannelHealth {
                    channel: kind.label(),
                    healthy,
                })
                .collect(),
        }
    }

    fn reserve(&self) -> Result<(), SupervisorError> {
        let mut phase = self.phase.lock().expect("phase mutex poisoned");
        match *phase {
            Phase::Running => Err(SupervisorError::CycleBusy { state: "running" }),
            Phase::Cooldown { until } if std::time::Instant::now() < until => {
                Err(SupervisorError::CycleBusy { state: "cooldown" })
            }
            _ => {
                *phase = Phase::Running;
                Ok(())
            }
        }
    }

    fn finish(&self, summary: CycleSummary) -> CycleSummary {
        *self.last_summary.lock().expect("summary mutex poisoned") = Some(summary.clone());
        *self.phase.lock().expect("phase mutex poisoned") = Phase::Cooldown {
            until: std::time::Instant::now() + self.config.cooldown,
        };
        summary
    }

    /// The cycle body. Assumes the scheduler is reserved; always releases
    /// it into cooldown, even when an external collaborator is down.
    async fn execute(self: &Arc<Self>, query: Option<JobQuery>, job_ids: Option<Vec<JobId>>) -> CycleSummary {
        self.stop_requested.store(false, Ordering::Release);
        let started_at = Utc::now();
        let mut summary = CycleSummary {
            started_at,
            finished_at: started_at,
            query: query.clone(),
            fetched: 0,
            scored: 0,
            selected: 0,
            applied: 0,
            manual: 0,
            failed: 0,
            outcomes: Vec::new(),
            aborted: None,
            cancelled: false,
        };

        let profile = match self.directory.profile(&self.config.candidate_id) {
            Ok(Some(profile)) => {
                let mut profile = profile;
                profile.normalize_skills();
                profile
            }
            Ok(None) => {
                summary.aborted = Some(format!(
                    "candidate profile {} not found",
                    self.config.candidate_id.0
                ));
                summary.finished_at = Utc::now();
                return self.finish(summary);
            }
            Err(err) => {
                error!(%err, "candidate directory unreachable");
                summary.aborted = Some(format!("candidate directory unavailable: {err}"));
                summary.finished_at = Utc::now();
                return self.finish(summary);
            }
        };

        let postings = match (&query, job_ids) {
            (_, Some(ids)) => self.source.fetch(&ids),
            (Some(query), None) => self.source.search(query),
            (None, None) => Ok(Vec::new()),
        };
        let mut postings = match postings {
            Ok(postings) => postings,
            Err(err) => {
                error!(%err, "job source unreachable, aborting cycle");
                summary.aborted = Some(format!("job source unavailable: {err}"));
                summary.finished_at = Utc::now();
                return self.finish(summary);
            }
        };
        postings.truncate(self.config.max_jobs);
        summary.fetched = postings.len();

        // Score, filter to the threshold, best matches first.
        let mut selected: Vec<(JobPosting, f32)> = postings
            .into_iter()
            .map(|posting| {
                let score = self.scorer.score(&profile, &posting).composite;
                (posting, score)
            })
            .filter(|(_, score)| *score >= self.config.min_score)
            .collect();
        selected.sort_by(|a, b| b.1.total_cmp(&a.1));
        summary.scored = summary.fetched;
        summary.selected = selected.len();
        info!(
            fetched = summary.fetched,
            selected = summary.selected,
            threshold = self.config.min_score,
            "cycle selection complete"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_dispatches.max(1)));
        let applied_count = Arc::new(AtomicUsize::new(0));
        let profile = Arc::new(profile);
        let mut tasks = JoinSet::new();

        for (posting, score) in selected {
            let this = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let applied_count = Arc::clone(&applied_count);
            let profile = Arc::clone(&profile);
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                // Both guards run after the permit is acquired: a stop
                // request issued mid-cycle skips every job still queued,
                // and the cap slot is reserved before the dispatch rather
                // than counted after it.
                if this.stop_requested.load(Ordering::Acquire) {
                    return JobOutcome {
                        job_id: posting.job_id,
                        title: posting.title,
                        company: posting.company,
                        score,
                        result: JobResult::Skipped {
                            reason: "cycle cancelled".to_string(),
                        },
                    };
                }
                let cap = this.config.max_applications_per_cycle;
                let reserved = applied_count
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                        (count < cap).then_some(count + 1)
                    })
                    .is_ok();
                if !reserved {
                    return JobOutcome {
                        job_id: posting.job_id,
                        title: posting.title,
                        company: posting.company,
                        score,
                        result: JobResult::Skipped {
                            reason: "application cap reached".to_string(),
                        },
                    };
                }
                let result = match this.dispatcher.dispatch(&posting, &profile).await {
                    Ok(result) => match result.attempt.outcome {
                        DispatchOutcome::Applied(channel) => JobResult::Applied { channel },
                        DispatchOutcome::ManualFollowUp => {
                            applied_count.fetch_sub(1, Ordering::AcqRel);
                            JobResult::ManualFollowUp {
                                trail: result.attempt.diagnostic_trail(),
                            }
                        }
                        DispatchOutcome::Failed => {
                            applied_count.fetch_sub(1, Ordering::AcqRel);
                            JobResult::Failed {
                                trail: result.attempt.diagnostic_trail(),
                            }
                        }
                    },
                    Err(DispatchError::DuplicateInProgress { .. }) => {
                        applied_count.fetch_sub(1, Ordering::AcqRel);
                        JobResult::Duplicate
                    }
                    Err(err) => {
                        applied_count.fetch_sub(1, Ordering::AcqRel);
                        JobResult::Error {
                            detail: err.to_string(),
                        }
                    }
                };
                JobOutcome {
                    job_id: posting.job_id,
                    title: posting.title,
                    company: posting.company,
                    score,
                    result,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        JobResult::Applied { .. } => summary.applied += 1,
                        JobResult::ManualFollowUp { .. } => summary.manual += 1,
                        JobResult::Failed { .. } | JobResult::Error { .. } => summary.failed += 1,
                        JobResult::Duplicate | JobResult::Skipped { .. } => {}
                    }
                    summary.outcomes.push(outcome);
                }
                Err(join_error) => {
                    error!(%join_error, "dispatch task panicked");
                    summary.failed += 1;
                }
            }
        }

        summary.cancelled = self.stop_requested.load(Ordering::Acquire);
        summary.finished_at = Utc::now();
        info!(
            applied = summary.applied,
            manual = summary.manual,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "cycle complete"
        );
        self.finish(summary)
    }
}
