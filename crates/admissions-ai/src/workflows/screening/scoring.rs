use serde::Serialize;

use super::domain::{SchoolType, StudentProfile};

/// Best possible grade on the inverted 1-9 scale.
pub const SCORE_FLOOR: f64 = 1.0;
/// Weakest possible grade on the inverted 1-9 scale.
pub const SCORE_CEILING: f64 = 9.0;

const MATCH_LOWER_RATIO: f64 = 0.9;
const SAFE_LOWER_RATIO: f64 = 1.1;

pub fn adjust(raw_score: f64, school_type: &SchoolType) -> f64 {
    (raw_score * school_type.multiplier()).max(SCORE_FLOOR)
}

/// Tier boundaries derived from one student's adjusted score.
///
/// Lower numbers are stronger: reach covers `[high, match_lower)`, match
/// covers `[match_lower, safe_lower)` and safe covers `[safe_lower, low]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierThresholds {
    pub raw: f64,
    pub adjusted: f64,
    pub high: f64,
    pub low: f64,
    pub match_lower: f64,
    pub safe_lower: f64,
}

impl TierThresholds {
    pub fn derive(
        raw_score: f64,
        school_type: &SchoolType,
        high_factor: f64,
        low_factor: f64,
    ) -> Self {
        let adjusted = adjust(raw_score, school_type);
        Self {
            raw: raw_score,
            adjusted,
            high: (adjusted * high_factor).max(SCORE_FLOOR),
            low: (adjusted * low_factor).min(SCORE_CEILING),
            match_lower: adjusted * MATCH_LOWER_RATIO,
            safe_lower: adjusted * SAFE_LOWER_RATIO,
        }
    }

    pub fn for_profile(profile: &StudentProfile) -> Self {
        Self::derive(
            profile.score,
            &profile.school_type,
            profile.high_factor,
            profile.low_factor,
        )
    }
}
