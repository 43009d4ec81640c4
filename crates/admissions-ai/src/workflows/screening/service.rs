use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::criteria::CascadePlan;
use super::domain::StudentProfile;
use super::pipeline::{PipelineError, ScreeningPipeline, SelectionRequest, Stage, TierSorts};
use super::repository::{RepositoryError, ScreeningSession, SessionId, SessionRepository};
use super::scoring::{SCORE_CEILING, SCORE_FLOOR};
use super::views::TierViews;
use crate::workflows::catalog::bands::ScoreBandTable;
use crate::workflows::catalog::summaries::UniversitySummaries;
use crate::workflows::catalog::taxonomy::CategoryTaxonomy;
use crate::workflows::catalog::ProgramCatalog;
use crate::workflows::report::{NarrativeGenerator, ReportAssembler, ScreeningReport};

/// Reference data shared by every session: the catalog plus its lookups.
#[derive(Debug, Clone)]
pub struct ScreeningDatasets {
    pub catalog: Arc<ProgramCatalog>,
    pub taxonomy: CategoryTaxonomy,
    pub bands: Option<ScoreBandTable>,
    pub expert_notes: Option<String>,
    pub summaries: Option<UniversitySummaries>,
}

impl ScreeningDatasets {
    pub fn new(catalog: Arc<ProgramCatalog>) -> Self {
        Self {
            catalog,
            taxonomy: CategoryTaxonomy::standard().clone(),
            bands: None,
            expert_notes: None,
            summaries: None,
        }
    }

    pub fn with_taxonomy(mut self, taxonomy: CategoryTaxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn with_bands(mut self, bands: Option<ScoreBandTable>) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_expert_notes(mut self, notes: Option<String>) -> Self {
        self.expert_notes = notes;
        self
    }

    pub fn with_summaries(mut self, summaries: Option<UniversitySummaries>) -> Self {
        self.summaries = summaries;
        self
    }

    pub fn start(&self, profile: StudentProfile) -> ScreeningPipeline {
        ScreeningPipeline::start(
            Arc::clone(&self.catalog),
            &self.taxonomy,
            profile,
            self.bands.as_ref(),
        )
    }

    /// Run every requested stage in order without persisting anything.
    pub fn run(&self, request: &ReportRequest) -> Result<ScreeningPipeline, PipelineError> {
        let mut pipeline = self.start(request.profile.clone());
        if let Some(plan) = &request.plan {
            pipeline = pipeline.filter(plan.clone(), &self.taxonomy);
        }
        if let Some(sorts) = &request.sorts {
            pipeline = pipeline.shortlist(sorts.clone());
        }
        if let Some(selection) = &request.selection {
            pipeline = pipeline.select(selection)?;
        }
        Ok(pipeline)
    }

    pub fn report(
        &self,
        pipeline: &ScreeningPipeline,
        narrator: &dyn NarrativeGenerator,
    ) -> ScreeningReport {
        ReportAssembler::new(narrator)
            .with_expert_notes(self.expert_notes.as_deref())
            .with_university_summaries(self.summaries.as_ref())
            .assemble(
                pipeline.profile(),
                pipeline.current_partition(),
                pipeline.warnings(),
            )
    }
}

/// Whole-pipeline request used by the one-shot report endpoint and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub profile: StudentProfile,
    #[serde(default)]
    pub plan: Option<CascadePlan>,
    #[serde(default)]
    pub sorts: Option<TierSorts>,
    #[serde(default)]
    pub selection: Option<SelectionRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub stage: Stage,
    pub tiers: TierViews,
    pub report: ScreeningReport,
}

/// Service composing the shared datasets, the session store and the narrator.
pub struct ScreeningService<R, N> {
    repository: Arc<R>,
    narrator: Arc<N>,
    datasets: Arc<ScreeningDatasets>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("scr-{id:06}"))
}

impl<R, N> ScreeningService<R, N>
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    pub fn new(repository: Arc<R>, narrator: Arc<N>, datasets: Arc<ScreeningDatasets>) -> Self {
        Self {
            repository,
            narrator,
            datasets,
        }
    }

    pub fn datasets(&self) -> &ScreeningDatasets {
        &self.datasets
    }

    /// Tier the catalog for a new student and store the session.
    pub fn start(
        &self,
        profile: StudentProfile,
    ) -> Result<ScreeningSession, ScreeningServiceError> {
        validate_profile(&profile)?;
        let pipeline = self.datasets.start(profile);
        let session = ScreeningSession::new(next_session_id(), pipeline, Utc::now());
        let stored = self.repository.insert(session)?;
        info!(
            session = %stored.id,
            programs = stored.pipeline.current_partition().len(),
            "started screening session"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<ScreeningSession, ScreeningServiceError> {
        let session = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    /// Re-run the criteria stage from the tiered result.
    pub fn apply_criteria(
        &self,
        id: &SessionId,
        plan: CascadePlan,
    ) -> Result<ScreeningSession, ScreeningServiceError> {
        let session = self.get(id)?;
        let pipeline = session.pipeline.filter(plan, &self.datasets.taxonomy);
        self.store(session.advance(pipeline, Utc::now()))
    }

    pub fn shortlist(
        &self,
        id: &SessionId,
        sorts: TierSorts,
    ) -> Result<ScreeningSession, ScreeningServiceError> {
        let session = self.get(id)?;
        let pipeline = session.pipeline.shortlist(sorts);
        self.store(session.advance(pipeline, Utc::now()))
    }

    /// Finalize the session; an unknown program id leaves it unchanged.
    pub fn select(
        &self,
        id: &SessionId,
        request: &SelectionRequest,
    ) -> Result<ScreeningSession, ScreeningServiceError> {
        let session = self.get(id)?;
        let pipeline = session.pipeline.select(request)?;
        self.store(session.advance(pipeline, Utc::now()))
    }

    /// Report over the latest stage of a stored session.
    pub fn session_report(&self, id: &SessionId) -> Result<ScreeningReport, ScreeningServiceError> {
        let session = self.get(id)?;
        Ok(self.datasets.report(&session.pipeline, self.narrator.as_ref()))
    }

    /// Run the whole pipeline for one request and report on it.
    pub fn report(&self, request: &ReportRequest) -> Result<ReportResponse, ScreeningServiceError> {
        validate_profile(&request.profile)?;
        let pipeline = self.datasets.run(request)?;
        let report = self.datasets.report(&pipeline, self.narrator.as_ref());
        Ok(ReportResponse {
            stage: pipeline.stage(),
            tiers: TierViews::from_partition(pipeline.current_partition()),
            report,
        })
    }

    fn store(&self, session: ScreeningSession) -> Result<ScreeningSession, ScreeningServiceError> {
        self.repository.update(session.clone())?;
        Ok(session)
    }
}

fn validate_profile(profile: &StudentProfile) -> Result<(), ScreeningServiceError> {
    if !profile.score.is_finite() || !(SCORE_FLOOR..=SCORE_CEILING).contains(&profile.score) {
        return Err(ScreeningServiceError::InvalidProfile(format!(
            "score must be between {SCORE_FLOOR} and {SCORE_CEILING}, found {}",
            profile.score
        )));
    }
    for (name, factor) in [
        ("high_factor", profile.high_factor),
        ("low_factor", profile.low_factor),
    ] {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ScreeningServiceError::InvalidProfile(format!(
                "{name} must be a positive number, found {factor}"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error("invalid student profile: {0}")]
    InvalidProfile(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
