//! Quality report types produced by the validator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Coarse quality bucket derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    /// Overall score >= 0.8.
    Excellent,
    /// Overall score >= 0.6.
    Good,
    /// Overall score >= 0.4.
    Acceptable,
    /// Anything below.
    Poor,
}

impl QualityLevel {
    /// Buckets an overall score.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.6 {
            Self::Good
        } else if score >= 0.4 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

/// Per-region quality assessment.
///
/// The overall score is a fixed weighted sum of the five sub-scores
/// (0.2 dimension, 0.3 content, 0.2 transparency, 0.15 edge, 0.15 color).
/// Recommendations are advisory strings keyed by the sub-score they refer
/// to, emitted for any sub-score below 0.7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Dimension plausibility score in [0, 1].
    pub dimension_score: f32,
    /// Opaque-content coverage score in [0, 1].
    pub content_score: f32,
    /// Transparency balance score in [0, 1].
    pub transparency_score: f32,
    /// Edge sharpness score in [0, 1].
    pub edge_score: f32,
    /// Color variety score in [0, 1].
    pub color_score: f32,
    /// Weighted overall score in [0, 1].
    pub overall_score: f32,
    /// Bucketed overall quality.
    pub quality_level: QualityLevel,
    /// Advisory improvement hints keyed by sub-score name.
    pub recommendations: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(QualityLevel::from_score(0.8), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(0.79), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(0.6), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(0.4), QualityLevel::Acceptable);
        assert_eq!(QualityLevel::from_score(0.39), QualityLevel::Poor);
        assert_eq!(QualityLevel::from_score(0.0), QualityLevel::Poor);
    }
}
