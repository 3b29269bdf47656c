use chrono::Utc;
use jobflow::pipeline::{
    Application, ApplicationFilter, ApplicationId, ApplicationStore, ApplyTarget,
    CandidateDirectory, CandidateId, CandidateProfile, DegreeLevel, EducationRecord,
    ExperienceLevel, FormGateway, FormSubmission, JobId, JobPosting, JobQuery, JobSource,
    MailTransport, OutboundMessage, ResumeHandle, SalaryRange, SourceError, StoreError,
    TransportError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Application store backed by a single mutex. The lock spans the
/// active-uniqueness check and the insert, which is what makes
/// `insert_active` atomic.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationStore for InMemoryApplicationStore {
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
        let mut matching: Vec<Application> = guard
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(matching)
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

/// Job source serving a fixed posting set. Stands in for a crawler or a
/// job-board API integration.
#[derive(Default, Clone)]
pub(crate) struct StubJobSource {
    postings: Arc<Mutex<Vec<JobPosting>>>,
}

impl StubJobSource {
    pub(crate) fn with_postings(postings: Vec<JobPosting>) -> Self {
        Self {
            postings: Arc::new(Mutex::new(postings)),
        }
    }
}

impl JobSource for StubJobSource {
    fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>, SourceError> {
        let guard = self.postings.lock().expect("source mutex poisoned");
        let needle = query.search_query.to_ascii_lowercase();
        let mut matching: Vec<JobPosting> = guard
            .iter()
            .filter(|posting| {
                needle.is_empty()
                    || posting.title.to_ascii_lowercase().contains(&needle)
                    || posting.description.to_ascii_lowercase().contains(&needle)
            })
            .filter(|posting| match &query.location {
                Some(location) => posting.location.eq_ignore_ascii_case(location),
                None => true,
            })
            .cloned()
            .collect();
        matching.truncate(query.max_jobs);
        Ok(matching)
    }

    fn fetch(&self, ids: &[JobId]) -> Result<Vec<JobPosting>, SourceError> {
        let guard = self.postings.lock().expect("source mutex poisoned");
        Ok(guard
            .iter()
            .filter(|posting| ids.contains(&posting.job_id))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDirectory {
    profiles: Arc<Mutex<HashMap<CandidateId, CandidateProfile>>>,
}

impl InMemoryDirectory {
    pub(crate) fn with_profile(profile: CandidateProfile) -> Self {
        let directory = Self::default();
        directory
            .profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.candidate_id.clone(), profile);
        directory
    }
}

impl CandidateDirectory for InMemoryDirectory {
    fn profile(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, SourceError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Mail transport that records instead of sending. Swap for an SMTP-backed
/// implementation in a real deployment.
#[derive(Default, Clone)]
pub(crate) struct RecordingMailTransport {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingMailTransport {
    pub(crate) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("mail mutex poisoned").clone()
    }
}

impl MailTransport for RecordingMailTransport {
    fn deliver(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let mut guard = self.sent.lock().expect("mail mutex poisoned");
        guard.push(message);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct RecordingFormGateway {
    submitted: Arc<Mutex<Vec<FormSubmission>>>,
}

impl RecordingFormGateway {
    pub(crate) fn submitted(&self) -> Vec<FormSubmission> {
        self.submitted.lock().expect("form mutex poisoned").clone()
    }
}

impl FormGateway for RecordingFormGateway {
    fn submit(&self, submission: FormSubmission) -> Result<(), TransportError> {
        let mut guard = self.submitted.lock().expect("form mutex poisoned");
        guard.push(submission);
        Ok(())
    }
}

pub(crate) fn sample_profile(candidate_id: CandidateId) -> CandidateProfile {
    CandidateProfile {
        candidate_id,
        full_name: "Alex Jensen".to_string(),
        email: Some("alex.jensen@example.com".to_string()),
        skills: vec![
            "Rust".to_string(),
            "Python".to_string(),
            "SQL".to_string(),
            "Docker".to_string(),
            "AWS".to_string(),
        ],
        experience_level: ExperienceLevel::Senior,
        education: vec![EducationRecord {
            degree: DegreeLevel::Bachelor,
            field: "Computer Science".to_string(),
        }],
        resume: Some(ResumeHandle("resumes/alex-jensen.pdf".to_string())),
    }
}

pub(crate) fn sample_postings() -> Vec<JobPosting> {
    vec![
        JobPosting {
            job_id: JobId("job-backend-001".to_string()),
            title: "Senior Backend Engineer".to_string(),
            company: "Nordic Cloud".to_string(),
            location: "Copenhagen".to_string(),
            description: "Build resilient services in Rust and Python on AWS.".to_string(),
            requirements: "5+ years experience in a senior role. Rust, Python, SQL, Docker, \
                           AWS. Bachelor degree required."
                .to_string(),
            salary: SalaryRange::new(65_000, 85_000),
            apply_target: ApplyTarget::Mailto("jobs@nordiccloud.example".to_string()),
            source: "stub".to_string(),
            posted_at: Utc::now(),
        },
        JobPosting {
            job_id: JobId("job-platform-002".to_string()),
            title: "Platform Engineer".to_string(),
            company: "Fjord Analytics".to_string(),
            location: "Oslo".to_string(),
            description: "Own the data platform: Python pipelines, SQL warehousing, Kubernetes."
                .to_string(),
            requirements: "Mid-level. Python, SQL, Kubernetes, Docker.".to_string(),
            salary: SalaryRange::new(55_000, 70_000),
            apply_target: ApplyTarget::Url("https://fjord.example/careers/apply".to_string()),
            source: "stub".to_string(),
            posted_at: Utc::now(),
        },
        JobPosting {
            job_id: JobId("job-frontend-003".to_string()),
            title: "Frontend Developer".to_string(),
            company: "Pixel Harbor".to_string(),
            location: "Remote".to_string(),
            description: "React and TypeScript product work.".to_string(),
            requirements: "Entry level. React, TypeScript, CSS.".to_string(),
            salary: None,
            apply_target: ApplyTarget::None,
            source: "stub".to_string(),
            posted_at: Utc::now(),
        },
    ]
}
