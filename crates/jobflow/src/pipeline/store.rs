use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, CandidateId, CandidateProfile, JobId,
    JobPosting,
};

/// Query parameters the supervisor hands to the job source. A bounded,
/// synchronous call returning zero or more normalized postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQuery {
    pub search_query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    pub max_jobs: usize,
}

/// External collaborator failure while fetching postings or profiles.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("job source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed source record: {0}")]
    Malformed(String),
}

/// Job discovery seam. Crawling itself is out of scope; the pipeline only
/// consumes normalized records.
pub trait JobSource: Send + Sync {
    fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>, SourceError>;
    fn fetch(&self, ids: &[JobId]) -> Result<Vec<JobPosting>, SourceError>;
    fn available(&self) -> bool {
        true
    }
}

/// Candidate profile and resume store seam.
pub trait CandidateDirectory: Send + Sync {
    fn profile(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, SourceError>;
}

/// Error enumeration for application store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An active application already exists for the (job, candidate) pair.
    #[error("active application already exists for this job and candidate")]
    ActiveConflict,
    #[error("application not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for record listing and statistics queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub applied_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applied_before: Option<DateTime<Utc>>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        if let Some(status) = self.status {
            if application.status != status {
                return false;
            }
        }
        if let Some(company) = &self.company {
            if !application.company.eq_ignore_ascii_case(company) {
                return false;
            }
        }
        if let Some(after) = self.applied_after {
            if application.applied_at < after {
                return false;
            }
        }
        if let Some(before) = self.applied_before {
            if application.applied_at >= before {
                return false;
            }
        }
        true
    }
}

/// Persistent record store seam. Implementations must make `insert_active`
/// atomic with respect to the active-uniqueness check: of two concurrent
/// inserts for the same (job, candidate) pair, exactly one succeeds and the
/// loser sees `ActiveConflict`.
pub trait ApplicationStore: Send + Sync {
    fn insert_active(&self, application: Application) -> Result<Application, StoreError>;
    fn update(&self, application: Application) -> Result<(), StoreError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn remove(&self, id: &ApplicationId) -> Result<(), StoreError>;
    /// Consistent snapshot of matching records; never a dirty read of a
    /// partially written record.
    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError>;
    /// Whether a non-terminal application exists for the pair.
    fn active_exists(&self, job: &JobId, candidate: &CandidateId) -> Result<bool, StoreError>;
    fn available(&self) -> bool {
        true
    }
}
