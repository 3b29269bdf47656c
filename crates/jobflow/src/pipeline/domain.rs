use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for ingested job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for tracked applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Opaque handle to a resume artifact owned by an external store. The mail
/// channel attaches it without inspecting the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeHandle(pub String);

/// Candidate seniority used by the experience sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    pub const fn ordinal(self) -> u8 {
        match self {
            ExperienceLevel::Entry => 0,
            ExperienceLevel::Mid => 1,
            ExperienceLevel::Senior => 2,
            ExperienceLevel::Lead => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Lead => "lead",
        }
    }
}

/// Degree tiers recognized by the education sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

/// One education entry on a candidate profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub degree: DegreeLevel,
    pub field: String,
}

/// Candidate snapshot used for scoring and dispatch. Immutable for the
/// duration of a cycle; profile edits happen outside the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: CandidateId,
    pub full_name: String,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub education: Vec<EducationRecord>,
    pub resume: Option<ResumeHandle>,
}

impl CandidateProfile {
    /// Deduplicates skills case-insensitively while keeping first-seen order.
    pub fn normalize_skills(&mut self) {
        let mut seen = Vec::new();
        self.skills.retain(|skill| {
            let lowered = skill.trim().to_ascii_lowercase();
            if lowered.is_empty() || seen.contains(&lowered) {
                false
            } else {
                seen.push(lowered);
                true
            }
        });
    }
}

/// Salary band attached to a posting when the source provides one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
}

impl SalaryRange {
    pub fn new(min: u32, max: u32) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }
}

/// Where an application for this posting should be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ApplyTarget {
    /// `mailto:` contact published by the posting.
    Mailto(String),
    /// Structured web endpoint accepting form submissions.
    Url(String),
    /// The source exposed no automatable target.
    None,
}

/// Normalized job record produced by the external job source. Immutable once
/// ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_id: JobId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: String,
    pub salary: Option<SalaryRange>,
    pub apply_target: ApplyTarget,
    pub source: String,
    pub posted_at: DateTime<Utc>,
}

/// Closed set of application channels, ordered by decreasing automation
/// confidence. The discriminant order is the dispatch priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Mail,
    Form,
    Manual,
}

impl ChannelKind {
    pub const fn label(self) -> &'static str {
        match self {
            ChannelKind::Mail => "mail",
            ChannelKind::Form => "form",
            ChannelKind::Manual => "manual",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one channel's attempt within a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ChannelOutcome {
    /// The transport accepted the application.
    Submitted { target: String },
    /// The channel could not complete; the dispatcher falls through.
    Failed { reason: String },
    /// The terminal fallback: a human has to apply.
    ManualActionRequired,
}

/// One entry in the per-dispatch diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttempt {
    pub channel: ChannelKind,
    pub outcome: ChannelOutcome,
}

/// Final disposition of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A channel submitted the application; an Application record exists.
    Applied(ChannelKind),
    /// Only the manual fallback remained; no record was created.
    ManualFollowUp,
    /// Every automated channel failed; no record was created.
    Failed,
}

/// Append-only record of one dispatch invocation. Created exactly once per
/// call; earlier channel failures are never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    pub channels: Vec<ChannelAttempt>,
    pub outcome: DispatchOutcome,
    pub attempted_at: DateTime<Utc>,
}

impl ApplicationAttempt {
    pub fn winning_channel(&self) -> Option<ChannelKind> {
        match self.outcome {
            DispatchOutcome::Applied(kind) => Some(kind),
            _ => None,
        }
    }

    /// Human-readable trail for callers whose only recourse is a manual
    /// application.
    pub fn diagnostic_trail(&self) -> String {
        self.channels
            .iter()
            .map(|attempt| match &attempt.outcome {
                ChannelOutcome::Submitted { target } => {
                    format!("{}: submitted to {target}", attempt.channel.label())
                }
                ChannelOutcome::Failed { reason } => {
                    format!("{}: {reason}", attempt.channel.label())
                }
                ChannelOutcome::ManualActionRequired => {
                    format!("{}: requires manual action", attempt.channel.label())
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Lifecycle states for a tracked application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Interview,
    SecondInterview,
    FinalInterview,
    Accepted,
    Rejected,
    Withdrawn,
    OfferAccepted,
    OfferDeclined,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::SecondInterview => "second_interview",
            ApplicationStatus::FinalInterview => "final_interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::OfferAccepted => "offer_accepted",
            ApplicationStatus::OfferDeclined => "offer_declined",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::Withdrawn
                | ApplicationStatus::OfferAccepted
                | ApplicationStatus::OfferDeclined
        )
    }

    /// Adjacency table for the strict transition policy.
    pub const fn successors(self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[Interview, SecondInterview, FinalInterview, Rejected, Withdrawn],
            Interview => &[SecondInterview, FinalInterview, Accepted, Rejected, Withdrawn],
            SecondInterview => &[FinalInterview, Accepted, Rejected, Withdrawn],
            FinalInterview => &[Accepted, Rejected, Withdrawn],
            Accepted => &[OfferAccepted, OfferDeclined],
            Rejected | Withdrawn | OfferAccepted | OfferDeclined => &[],
        }
    }

    /// Counts toward the interview rate statistic.
    pub const fn reached_interview(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Interview
                | ApplicationStatus::SecondInterview
                | ApplicationStatus::FinalInterview
                | ApplicationStatus::Accepted
                | ApplicationStatus::OfferAccepted
                | ApplicationStatus::OfferDeclined
        )
    }
}

/// Tracked application entity. Created only by a successful dispatch and
/// mutated by status transitions until a terminal state or a hard delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    /// Denormalized from the posting so store filters and statistics work
    /// without a posting lookup.
    pub job_title: String,
    pub company: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub notes: String,
    pub attempt: ApplicationAttempt,
}

impl Application {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            job_id: self.job_id.clone(),
            status: self.status.label(),
            applied_at: self.applied_at,
            last_updated: self.last_updated,
            winning_channel: self.attempt.winning_channel().map(ChannelKind::label),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub status: &'static str,
    pub applied_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_channel: Option<&'static str>,
}
