use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::pipeline::channels::{
    FormGateway, FormSubmission, MailTransport, OutboundMessage, TransportError,
};
use crate::pipeline::domain::{
    Application, ApplicationAttempt, ApplicationId, ApplyTarget, CandidateId, CandidateProfile,
    ChannelKind, DegreeLevel, DispatchOutcome, EducationRecord, ExperienceLevel, JobId, JobPosting,
    ResumeHandle, SalaryRange,
};
use crate::pipeline::store::{
    ApplicationFilter, ApplicationStore, CandidateDirectory, JobQuery, JobSource, SourceError,
    StoreError,
};

/// Store fixture mirroring the production in-memory store: one mutex spans
/// the uniqueness check and the insert.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl MemoryStore {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }
}

impl ApplicationStore for MemoryStore {
    fn insert_active(&self, application: Application) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let conflict = guard.values().any(|existing| {
            existing.job_id == application.job_id
                && existing.candidate_id == application.candidate_id
                && !existing.status.is_terminal()
        });
        if conflict {
            return Err(StoreError::ActiveConflict);
        }
        guard.insert(application.application_id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.application_id) {
            guard.insert(application.application_id.clone(), application);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &ApplicationId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect())
    }

    fn active_exists(&self, job: &JobId, candidate: &CandidateId) -> Result<bool, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.values().any(|existing| {
            existing.job_id == *job
                && existing.candidate_id == *candidate
                && !existing.status.is_terminal()
        }))
    }
}

/// Store whose every call fails, for unavailability paths.
pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn insert_active(&self, _application: Application) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn update(&self, _application: Application) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn remove(&self, _id: &ApplicationId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn list(&self, _filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn active_exists(&self, _job: &JobId, _candidate: &CandidateId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("store down".to_string()))
    }

    fn available(&self) -> bool {
        false
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMail {
    pub(super) sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MailTransport for MemoryMail {
    fn deliver(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.sent.lock().expect("mail mutex poisoned").push(message);
        Ok(())
    }
}

pub(super) struct FailingMail;

impl MailTransport for FailingMail {
    fn deliver(&self, _message: OutboundMessage) -> Result<(), TransportError> {
        Err(TransportError::Rejected("mailbox unavailable".to_string()))
    }

    fn ready(&self) -> bool {
        false
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryForms {
    pub(super) submitted: Arc<Mutex<Vec<FormSubmission>>>,
}

impl FormGateway for MemoryForms {
    fn submit(&self, submission: FormSubmission) -> Result<(), TransportError> {
        self.submitted
            .lock()
            .expect("form mutex poisoned")
            .push(submission);
        Ok(())
    }
}

pub(super) struct FailingForms;

impl FormGateway for FailingForms {
    fn submit(&self, _submission: FormSubmission) -> Result<(), TransportError> {
        Err(TransportError::Unavailable("endpoint timeout".to_string()))
    }
}

/// Job source over a fixed posting list.
#[derive(Default, Clone)]
pub(super) struct FixedSource {
    pub(super) postings: Vec<JobPosting>,
}

impl JobSource for FixedSource {
    fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>, SourceError> {
        let mut postings = self.postings.clone();
        postings.truncate(query.max_jobs);
        Ok(postings)
    }

    fn fetch(&self, ids: &[JobId]) -> Result<Vec<JobPosting>, SourceError> {
        Ok(self
            .postings
            .iter()
            .filter(|posting| ids.contains(&posting.job_id))
            .cloned()
            .collect())
    }
}

pub(super) struct DownSource;

impl JobSource for DownSource {
    fn search(&self, _query: &JobQuery) -> Result<Vec<JobPosting>, SourceError> {
        Err(SourceError::Unavailable("board unreachable".to_string()))
    }

    fn fetch(&self, _ids: &[JobId]) -> Result<Vec<JobPosting>, SourceError> {
        Err(SourceError::Unavailable("board unreachable".to_string()))
    }

    fn available(&self) -> bool {
        false
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    pub(super) profiles: Arc<Mutex<HashMap<CandidateId, CandidateProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn with_profile(profile: CandidateProfile) -> Self {
        let directory = Self::default();
        directory
            .profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.candidate_id.clone(), profile);
        directory
    }
}

impl CandidateDirectory for MemoryDirectory {
    fn profile(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, SourceError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) fn profile() -> CandidateProfile {
    CandidateProfile {
        candidate_id: CandidateId("cand-1".to_string()),
        full_name: "Robin Larsen".to_string(),
        email: Some("robin@example.com".to_string()),
        skills: vec![
            "Python".to_string(),
            "SQL".to_string(),
            "Docker".to_string(),
        ],
        experience_level: ExperienceLevel::Senior,
        education: vec![EducationRecord {
            degree: DegreeLevel::Bachelor,
            field: "Computer Science".to_string(),
        }],
        resume: Some(ResumeHandle("resumes/robin.pdf".to_string())),
    }
}

pub(super) fn posting(id: &str, target: ApplyTarget) -> JobPosting {
    JobPosting {
        job_id: JobId(id.to_string()),
        title: "Senior Backend Engineer".to_string(),
        company: "Nordic Cloud".to_string(),
        location: "Copenhagen".to_string(),
        description: "Backend services in Python with SQL storage.".to_string(),
        requirements: "Senior role. Python, SQL, Docker. Bachelor degree required.".to_string(),
        salary: SalaryRange::new(60_000, 80_000),
        apply_target: target,
        source: "test".to_string(),
        posted_at: Utc::now(),
    }
}

pub(super) fn mail_posting(id: &str) -> JobPosting {
    posting(id, ApplyTarget::Mailto("jobs@nordiccloud.example".to_string()))
}

pub(super) fn form_posting(id: &str) -> JobPosting {
    posting(id, ApplyTarget::Url("https://nordiccloud.example/apply".to_string()))
}

pub(super) fn manual_posting(id: &str) -> JobPosting {
    posting(id, ApplyTarget::None)
}

/// Attempt record for a dispatch the mail channel won.
pub(super) fn applied_attempt(job: &str) -> ApplicationAttempt {
    ApplicationAttempt {
        job_id: JobId(job.to_string()),
        candidate_id: CandidateId("cand-1".to_string()),
        channels: Vec::new(),
        outcome: DispatchOutcome::Applied(ChannelKind::Mail),
        attempted_at: Utc::now(),
    }
}
