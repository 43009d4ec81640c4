use crate::workflows::catalog::domain::ProgramId;
use crate::workflows::screening::tiering::Tier;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummaryView {
    pub school_type: String,
    pub categories: Vec<String>,
    pub detail_interests: Vec<String>,
    pub score: f64,
    pub adjusted_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackCandidatesView {
    pub track_label: &'static str,
    pub programs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateLineView {
    pub tier: Tier,
    pub tier_label: &'static str,
    pub tracks: Vec<TrackCandidatesView>,
}

/// One bullet of a reach analysis: the program's value next to its peer average.
#[derive(Debug, Clone, Serialize)]
pub struct MetricLineView {
    pub label: &'static str,
    pub value: Option<f64>,
    pub peer_average: Option<f64>,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReachAnalysisView {
    pub rank: usize,
    pub program_id: ProgramId,
    pub title: String,
    pub track_label: &'static str,
    pub competition: Vec<MetricLineView>,
    pub entry_score: Vec<MetricLineView>,
    pub fill_rate: Vec<MetricLineView>,
    pub narrative: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailRowView {
    pub program_id: ProgramId,
    pub tier_label: &'static str,
    pub university: String,
    pub track_label: String,
    pub track_name: Option<String>,
    pub unit: String,
    pub quota: Option<f64>,
    pub min_test_summary: Option<String>,
    pub competition_2024: Option<f64>,
    pub competition_2023: Option<f64>,
    pub entry_score_70: Option<f64>,
    pub fill_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailTableView {
    pub track_label: &'static str,
    pub rows: Vec<DetailRowView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniversitySummaryView {
    pub university: String,
    pub track_name: String,
    pub summary: String,
}

/// Summaries of one admission track, one entry per university and track name.
#[derive(Debug, Clone, Serialize)]
pub struct UniversitySummaryGroupView {
    pub track_label: &'static str,
    pub entries: Vec<UniversitySummaryView>,
}

/// Structured form of a report, serialized alongside the Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSections {
    pub profile: ProfileSummaryView,
    pub candidate_lines: Vec<CandidateLineView>,
    pub overall_opinion: String,
    pub reach_strategy: String,
    pub reach_analyses: Vec<ReachAnalysisView>,
    pub detail_tables: Vec<DetailTableView>,
    /// Empty when no summary dataset is loaded.
    pub university_summaries: Vec<UniversitySummaryGroupView>,
}
