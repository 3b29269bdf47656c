mod config;
mod rules;

pub use config::ScoringWeights;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CandidateProfile, JobId, JobPosting};

/// Fit bands exposed to callers and dashboards. The thresholds are fixed so
/// that UI and tests agree on the labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitClassification {
    ExcellentFit,
    GoodFit,
    FairFit,
    PoorFit,
}

impl FitClassification {
    pub fn from_score(score: f32) -> Self {
        if score >= 80.0 {
            FitClassification::ExcellentFit
        } else if score >= 65.0 {
            FitClassification::GoodFit
        } else if score >= 40.0 {
            FitClassification::FairFit
        } else {
            FitClassification::PoorFit
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FitClassification::ExcellentFit => "Excellent Fit",
            FitClassification::GoodFit => "Good Fit",
            FitClassification::FairFit => "Fair Fit",
            FitClassification::PoorFit => "Poor Fit",
        }
    }
}

/// Section scores in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionScores {
    pub skills: f32,
    pub experience: f32,
    pub education: f32,
}

/// One scoring computation for a (candidate, job) pair. Recomputed, never
/// patched; `scored_at` supports staleness checks downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub job_id: JobId,
    pub composite: f32,
    pub sections: SectionScores,
    pub classification: FitClassification,
    pub explanation: String,
    pub scored_at: DateTime<Utc>,
}

/// Stateless scorer applying the configured section weights to a
/// (profile, posting) pair. Deterministic and side-effect free.
#[derive(Debug, Clone)]
pub struct MatchScorer {
    weights: ScoringWeights,
}

impl MatchScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(&self, profile: &CandidateProfile, posting: &JobPosting) -> ScoreResult {
        let skills = rules::skills_score(profile, posting);
        let experience = rules::experience_score(profile, posting);
        let education = rules::education_score(profile, posting);

        let sections = SectionScores {
            skills: skills.score,
            experience,
            education,
        };

        let composite = (self.weights.skills * sections.skills
            + self.weights.experience * sections.experience
            + self.weights.education * sections.education)
            .clamp(0.0, 100.0);

        let classification = FitClassification::from_score(composite);
        let explanation = build_explanation(&sections, classification, &skills);

        ScoreResult {
            job_id: posting.job_id.clone(),
            composite,
            sections,
            classification,
            explanation,
            scored_at: Utc::now(),
        }
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

fn alignment(score: f32) -> &'static str {
    if score >= 80.0 {
        "strong"
    } else if score >= 60.0 {
        "good"
    } else if score >= 30.0 {
        "moderate"
    } else {
        "limited"
    }
}

fn build_explanation(
    sections: &SectionScores,
    classification: FitClassification,
    skills: &rules::SkillsBreakdown,
) -> String {
    let mut parts = vec![
        format!(
            "{} skills alignment ({:.1}%)",
            alignment(sections.skills),
            sections.skills
        ),
        format!(
            "{} experience match ({:.1}%)",
            alignment(sections.experience),
            sections.experience
        ),
        format!(
            "{} education match ({:.1}%)",
            alignment(sections.education),
            sections.education
        ),
    ];
    if !skills.missing.is_empty() {
        parts.push(format!("missing skills: {}", skills.missing.join(", ")));
    }
    format!(
        "Overall classification: {}. {}.",
        classification.label(),
        parts.join(". ")
    )
}
