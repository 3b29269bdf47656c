use serde::{Deserialize, Serialize};

/// Section weights for the composite match score. These are configuration,
/// not business logic: deployments tune them without touching the rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skills: f32,
    pub experience: f32,
    pub education: f32,
}

impl ScoringWeights {
    /// Rescales the weights so they sum to 1.0, preserving their ratios.
    /// A degenerate all-zero set falls back to the defaults.
    pub fn normalized(self) -> Self {
        let total = self.skills + self.experience + self.education;
        if total <= f32::EPSILON {
            return Self::default();
        }
        if (total - 1.0).abs() < 0.01 {
            return self;
        }
        Self {
            skills: self.skills / total,
            experience: self.experience / total,
            education: self.education / total,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.5,
            experience: 0.3,
            education: 0.2,
        }
    }
}
