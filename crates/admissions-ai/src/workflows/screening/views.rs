use chrono::{DateTime, Utc};
use serde::Serialize;

use super::criteria::FilterWarning;
use super::domain::StudentProfile;
use super::pipeline::Stage;
use super::repository::{ScreeningSession, SessionId};
use super::scoring::TierThresholds;
use super::tiering::{ScoredProgram, TierPartition};
use crate::workflows::catalog::domain::{AdmissionTrack, ProgramId, YesNo};

#[derive(Debug, Clone, Serialize)]
pub struct ProgramSummaryView {
    pub id: ProgramId,
    pub university: String,
    pub track: AdmissionTrack,
    pub track_label: String,
    pub unit: String,
    pub entry_score: f64,
    pub competition_2024: Option<f64>,
    pub fill_rate_2024: Option<f64>,
    pub quota: Option<f64>,
    pub newly_established: Option<YesNo>,
    pub min_test_summary: Option<String>,
}

impl ProgramSummaryView {
    pub fn from_program(program: &ScoredProgram) -> Self {
        let record = &program.record;
        Self {
            id: record.id,
            university: record.university.clone(),
            track: record.track.clone(),
            track_label: record.track.label().to_string(),
            unit: record.unit.clone(),
            entry_score: program.entry_score,
            competition_2024: record.competition.ratio.latest(),
            fill_rate_2024: record.fill.rate.latest(),
            quota: record.quota_current,
            newly_established: record.eligibility.newly_established,
            min_test_summary: record.eligibility.min_test_summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierViews {
    pub thresholds: TierThresholds,
    pub reach: Vec<ProgramSummaryView>,
    #[serde(rename = "match")]
    pub matched: Vec<ProgramSummaryView>,
    pub safe: Vec<ProgramSummaryView>,
}

impl TierViews {
    pub fn from_partition(partition: &TierPartition) -> Self {
        let convert = |programs: &[ScoredProgram]| {
            programs
                .iter()
                .map(ProgramSummaryView::from_program)
                .collect::<Vec<_>>()
        };
        Self {
            thresholds: partition.thresholds,
            reach: convert(&partition.reach),
            matched: convert(&partition.matched),
            safe: convert(&partition.safe),
        }
    }
}

/// Sanitized representation of a session's current stage.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub stage: Stage,
    pub stage_label: &'static str,
    pub profile: StudentProfile,
    pub tiers: TierViews,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FilterWarning>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    pub fn from_session(session: &ScreeningSession) -> Self {
        let pipeline = &session.pipeline;
        let stage = pipeline.stage();
        Self {
            session_id: session.id.clone(),
            stage,
            stage_label: stage.label(),
            profile: pipeline.profile().clone(),
            tiers: TierViews::from_partition(pipeline.current_partition()),
            warnings: pipeline.warnings().to_vec(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
