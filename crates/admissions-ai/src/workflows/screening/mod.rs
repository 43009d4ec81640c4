//! Student screening: score adjustment, tiering, cascading criteria,
//! shortlisting and the session service built on top of them.

pub mod criteria;
pub mod domain;
pub mod pipeline;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod tiering;
pub mod views;

#[cfg(test)]
mod tests;

pub use criteria::{
    run_cascade, CascadeOutcome, CascadePlan, CriteriaFilter, CriterionKey, CriterionValue,
    FilterCriteria, FilterError, FilterWarning, MajorFilter, ThresholdOption, ThresholdOptions,
    TierCriteria,
};
pub use domain::{Gender, SchoolType, SearchScope, StudentProfile};
pub use pipeline::{
    PipelineError, ScreeningPipeline, SelectionRequest, SortSpec, Stage, TierSorts,
};
pub use ranking::{SortCriterion, SortMetric, SortOrder, SHORTLIST_LIMIT};
pub use repository::{RepositoryError, ScreeningSession, SessionId, SessionRepository};
pub use router::screening_router;
pub use scoring::TierThresholds;
pub use service::{
    ReportRequest, ReportResponse, ScreeningDatasets, ScreeningService, ScreeningServiceError,
};
pub use tiering::{ScoredProgram, Tier, TierPartition, TieringFilter};
pub use views::{ProgramSummaryView, SessionView, TierViews};
