//! The application automation pipeline: match scoring, multi-channel
//! auto-apply dispatch with ordered fallback, application lifecycle
//! tracking, and the cycle supervisor.

pub mod channels;
pub mod dispatcher;
pub mod domain;
pub mod router;
pub mod scoring;
pub mod store;
pub mod supervisor;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use channels::{
    ApplicationChannel, FormChannel, FormGateway, FormSubmission, MailChannel, MailTransport,
    ManualChannel, OutboundMessage, TransportError, ValidationError,
};
pub use dispatcher::{AutoApplyDispatcher, DispatchError, DispatchResult, DispatcherConfig};
pub use domain::{
    Application, ApplicationAttempt, ApplicationId, ApplicationStatus, ApplicationStatusView,
    ApplyTarget, CandidateId, CandidateProfile, ChannelAttempt, ChannelKind, ChannelOutcome,
    DegreeLevel, DispatchOutcome, EducationRecord, ExperienceLevel, JobId, JobPosting,
    ResumeHandle, SalaryRange,
};
pub use router::{pipeline_router, PipelineHandle};
pub use scoring::{FitClassification, MatchScorer, ScoreResult, ScoringWeights, SectionScores};
pub use store::{
    ApplicationFilter, ApplicationStore, CandidateDirectory, JobQuery, JobSource, SourceError,
    StoreError,
};
pub use supervisor::{
    CycleSummary, HealthReport, JobOutcome, JobResult, Supervisor, SupervisorConfig,
    SupervisorError, SupervisorStatus,
};
pub use tracker::{
    ApplicationTracker, Statistics, StatisticsWindow, TrackerError, TransitionPolicy,
};
