use admissions_ai::config::DataConfig;
use admissions_ai::error::AppError;
use admissions_ai::workflows::catalog::bands::ScoreBandTable;
use admissions_ai::workflows::catalog::domain::AdmissionTrack;
use admissions_ai::workflows::catalog::taxonomy::CategoryTaxonomy;
use admissions_ai::workflows::catalog::summaries::UniversitySummaries;
use admissions_ai::workflows::catalog::CatalogCache;
use admissions_ai::workflows::report::{
    NarrativeError, NarrativeGenerator, NarrativeKind, NarrativeRequest,
};
use admissions_ai::workflows::screening::{
    RepositoryError, SchoolType, ScreeningDatasets, ScreeningSession, SessionId,
    SessionRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) datasets: Arc<ScreeningDatasets>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, ScreeningSession>>>,
}

impl InMemorySessionRepository {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, ScreeningSession>>, RepositoryError>
    {
        self.sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store mutex poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: ScreeningSession) -> Result<ScreeningSession, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: ScreeningSession) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&session.id) {
            guard.insert(session.id.clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }
}

/// Template narrator used when no language model backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineNarrator;

impl NarrativeGenerator for OfflineNarrator {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        let text = match request.kind {
            NarrativeKind::OverallOpinion => {
                "자동 종합 의견은 오프라인 모드에서 제공되지 않습니다. 지원 가능선 표와 전형별 후보를 기준으로 검토해 주세요."
            }
            NarrativeKind::ReachStrategy => {
                "상향 지원 후보의 경쟁률과 충원율 추이를 확인하고, 계열 평균보다 유리한 지표를 가진 모집단위를 우선 검토해 주세요."
            }
            NarrativeKind::ProgramAnalysis => {
                "해당 모집단위의 입결과 경쟁률을 계열 평균과 비교해 지원 여부를 판단해 주세요."
            }
        };
        Ok(text.to_string())
    }
}

/// Load the catalog and the optional lookup tables named by the configuration.
/// The catalog goes through the process-wide cache, so reloading an
/// unchanged export reuses the parsed snapshot.
pub(crate) fn load_datasets(config: &DataConfig) -> Result<ScreeningDatasets, AppError> {
    let catalog = CatalogCache::shared().load_path(&config.catalog_path)?;

    let taxonomy = match &config.taxonomy {
        Some(paths) => CategoryTaxonomy::from_paths(&paths.detail_to_mid, &paths.mid_to_main)?,
        None => CategoryTaxonomy::standard().clone(),
    };

    let bands = config
        .score_bands_path
        .as_ref()
        .map(ScoreBandTable::from_path)
        .transpose()?;

    let expert_notes = config
        .expert_notes_path
        .as_ref()
        .map(std::fs::read_to_string)
        .transpose()?;

    let summaries = config
        .university_summary_path
        .as_ref()
        .map(UniversitySummaries::from_path)
        .transpose()?;

    info!(
        catalog = %config.catalog_path.display(),
        programs = catalog.len(),
        custom_taxonomy = config.taxonomy.is_some(),
        score_bands = bands.is_some(),
        expert_notes = expert_notes.is_some(),
        university_summaries = summaries.as_ref().map_or(0, UniversitySummaries::len),
        "screening datasets loaded"
    );

    Ok(ScreeningDatasets::new(catalog)
        .with_taxonomy(taxonomy)
        .with_bands(bands)
        .with_expert_notes(expert_notes)
        .with_summaries(summaries))
}

pub(crate) fn parse_school_type(raw: &str) -> Result<SchoolType, String> {
    if raw.trim().is_empty() {
        return Err("school type must not be empty".to_string());
    }
    Ok(SchoolType::parse(raw))
}

pub(crate) fn parse_track(raw: &str) -> Result<AdmissionTrack, String> {
    match AdmissionTrack::parse(raw) {
        AdmissionTrack::Other(label) => Err(format!(
            "unknown admission track '{label}' (expected 종합, 교과 or 논술)"
        )),
        track => Ok(track),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admissions_ai::workflows::catalog::CatalogImporter;
    use admissions_ai::workflows::screening::StudentProfile;
    use chrono::Utc;
    use std::path::PathBuf;

    fn session(id: &str) -> ScreeningSession {
        let catalog = Arc::new(
            CatalogImporter::from_reader(crate::demo::SAMPLE_CATALOG.as_bytes())
                .expect("sample catalog imports"),
        );
        let datasets = ScreeningDatasets::new(catalog);
        let pipeline = datasets.start(StudentProfile::new(2.0, SchoolType::General));
        ScreeningSession::new(SessionId(id.to_string()), pipeline, Utc::now())
    }

    #[test]
    fn repository_rejects_duplicates_and_unknown_updates() {
        let repository = InMemorySessionRepository::default();
        repository.insert(session("scr-1")).expect("first insert");

        assert!(matches!(
            repository.insert(session("scr-1")),
            Err(RepositoryError::Conflict)
        ));
        assert!(matches!(
            repository.update(session("scr-2")),
            Err(RepositoryError::NotFound)
        ));
        assert!(repository
            .fetch(&SessionId("scr-1".to_string()))
            .expect("fetch")
            .is_some());
    }

    #[test]
    fn offline_narrator_answers_every_kind() {
        for kind in [
            NarrativeKind::OverallOpinion,
            NarrativeKind::ReachStrategy,
            NarrativeKind::ProgramAnalysis,
        ] {
            let request = NarrativeRequest {
                kind,
                system: String::new(),
                prompt: "prompt".to_string(),
            };
            let text = OfflineNarrator.generate(&request).expect("offline text");
            assert!(!text.trim().is_empty());
        }
    }

    #[test]
    fn track_parser_rejects_unknown_labels() {
        assert_eq!(parse_track("교과"), Ok(AdmissionTrack::SubjectGrade));
        assert!(parse_track("실기").is_err());
        assert_eq!(parse_school_type("외고"), Ok(SchoolType::ForeignLanguage));
        assert!(parse_school_type("  ").is_err());
    }

    fn data_config(catalog_path: PathBuf) -> DataConfig {
        DataConfig {
            catalog_path,
            score_bands_path: None,
            taxonomy: None,
            expert_notes_path: None,
            university_summary_path: None,
        }
    }

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write scratch file");
        path
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let error = load_datasets(&data_config("does/not/exist.csv".into()))
            .expect_err("missing catalog");
        assert!(error.to_string().starts_with("catalog error:"));
    }

    #[test]
    fn reloading_an_unchanged_catalog_reuses_the_snapshot() {
        let catalog = scratch_file("programs.csv", crate::demo::SAMPLE_CATALOG);
        let summaries = scratch_file(
            "summaries.csv",
            "대학명,전형구분,전형명,2025학년도_핵심정리\n성균관대학교,종합,계열모집,서류 100%\n",
        );
        let mut config = data_config(catalog.clone());
        config.university_summary_path = Some(summaries.clone());

        let first = load_datasets(&config).expect("first load");
        let second = load_datasets(&config).expect("second load");
        assert!(Arc::ptr_eq(&first.catalog, &second.catalog));
        assert_eq!(first.catalog.len(), 10);
        assert_eq!(first.summaries.as_ref().map(UniversitySummaries::len), Some(1));
        assert!(!CatalogCache::shared().is_empty());

        std::fs::remove_file(catalog).ok();
        std::fs::remove_file(summaries).ok();
    }
}
