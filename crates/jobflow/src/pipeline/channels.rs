use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    ApplyTarget, CandidateProfile, ChannelKind, ChannelOutcome, JobPosting, ResumeHandle,
};

/// Malformed input detected before any transport is touched. Never retried;
/// the dispatcher surfaces it to the caller immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid input for {channel} channel: {reason}")]
pub struct ValidationError {
    pub channel: ChannelKind,
    pub reason: String,
}

/// Transport-level delivery failure. Recovered locally by falling through to
/// the next channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport rejected the message: {0}")]
    Rejected(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Message the mail channel hands to its transport. The resume artifact is
/// attached as an opaque handle; the channel never inspects its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
    pub attachment: ResumeHandle,
}

/// Payload the form channel submits to a posting's web endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub endpoint: String,
    pub candidate_name: String,
    pub candidate_email: Option<String>,
    pub cover_note: String,
    pub resume: Option<ResumeHandle>,
}

/// Outbound mail seam. Implementations may block on network I/O; the
/// dispatcher runs attempts on a blocking task under a timeout.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, message: OutboundMessage) -> Result<(), TransportError>;
    fn ready(&self) -> bool {
        true
    }
}

/// Web-form submission seam.
pub trait FormGateway: Send + Sync {
    fn submit(&self, submission: FormSubmission) -> Result<(), TransportError>;
    fn ready(&self) -> bool {
        true
    }
}

/// Uniform capability contract every channel satisfies. `attempt` is not
/// idempotent: the dispatcher invokes it at most once per channel per
/// dispatch.
pub trait ApplicationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;
    fn can_handle(&self, posting: &JobPosting) -> bool;
    fn attempt(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<ChannelOutcome, ValidationError>;
    fn healthy(&self) -> bool {
        true
    }
}

/// Applies by composing a message to the posting's published contact address
/// with the candidate's resume attached.
pub struct MailChannel {
    transport: Arc<dyn MailTransport>,
}

impl MailChannel {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    fn compose(posting: &JobPosting, profile: &CandidateProfile) -> String {
        format!(
            "Dear {} hiring team,\n\nPlease consider my application for the {} role. \
             My resume is attached.\n\nKind regards,\n{}",
            posting.company, posting.title, profile.full_name
        )
    }
}

impl ApplicationChannel for MailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Mail
    }

    fn can_handle(&self, posting: &JobPosting) -> bool {
        matches!(posting.apply_target, ApplyTarget::Mailto(_))
    }

    fn attempt(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<ChannelOutcome, ValidationError> {
        let ApplyTarget::Mailto(address) = &posting.apply_target else {
            return Ok(ChannelOutcome::Failed {
                reason: "posting has no mail contact".to_string(),
            });
        };
        let reply_to = profile.email.clone().ok_or_else(|| ValidationError {
            channel: ChannelKind::Mail,
            reason: "candidate has no contact email".to_string(),
        })?;
        let attachment = profile.resume.clone().ok_or_else(|| ValidationError {
            channel: ChannelKind::Mail,
            reason: "candidate has no resume artifact".to_string(),
        })?;

        let message = OutboundMessage {
            to: address.clone(),
            reply_to,
            subject: format!("Application: {} at {}", posting.title, posting.company),
            body: Self::compose(posting, profile),
            attachment,
        };

        match self.transport.deliver(message) {
            Ok(()) => Ok(ChannelOutcome::Submitted {
                target: address.clone(),
            }),
            Err(err) => Ok(ChannelOutcome::Failed {
                reason: err.to_string(),
            }),
        }
    }

    fn healthy(&self) -> bool {
        self.transport.ready()
    }
}

/// Applies through a posting's structured web endpoint.
pub struct FormChannel {
    gateway: Arc<dyn FormGateway>,
}

impl FormChannel {
    pub fn new(gateway: Arc<dyn FormGateway>) -> Self {
        Self { gateway }
    }
}

impl ApplicationChannel for FormChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Form
    }

    fn can_handle(&self, posting: &JobPosting) -> bool {
        matches!(posting.apply_target, ApplyTarget::Url(_))
    }

    fn attempt(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<ChannelOutcome, ValidationError> {
        let ApplyTarget::Url(endpoint) = &posting.apply_target else {
            return Ok(ChannelOutcome::Failed {
                reason: "posting has no web endpoint".to_string(),
            });
        };

        let submission = FormSubmission {
            endpoint: endpoint.clone(),
            candidate_name: profile.full_name.clone(),
            candidate_email: profile.email.clone(),
            cover_note: format!(
                "Application for {} at {} via automated submission.",
                posting.title, posting.company
            ),
            resume: profile.resume.clone(),
        };

        match self.gateway.submit(submission) {
            Ok(()) => Ok(ChannelOutcome::Submitted {
                target: endpoint.clone(),
            }),
            Err(err) => Ok(ChannelOutcome::Failed {
                reason: err.to_string(),
            }),
        }
    }

    fn healthy(&self) -> bool {
        self.gateway.ready()
    }
}

/// Terminal fallback. Handles every posting and never fails, so a dispatch
/// always has a deterministic last resort: flag the job for a human.
#[derive(Debug, Default)]
pub struct ManualChannel;

impl ApplicationChannel for ManualChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Manual
    }

    fn can_handle(&self, _posting: &JobPosting) -> bool {
        true
    }

    fn attempt(
        &self,
        _posting: &JobPosting,
        _profile: &CandidateProfile,
    ) -> Result<ChannelOutcome, ValidationError> {
        Ok(ChannelOutcome::ManualActionRequired)
    }
}
