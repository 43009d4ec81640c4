use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::catalog::domain::{AdmissionTrack, ProgramRecord};
use crate::workflows::catalog::schema::SchemaCapabilities;
use crate::workflows::catalog::ProgramCatalog;
use crate::workflows::report::{NarrativeError, NarrativeGenerator, NarrativeRequest};
use crate::workflows::screening::domain::{SchoolType, StudentProfile};
use crate::workflows::screening::repository::{
    RepositoryError, ScreeningSession, SessionId, SessionRepository,
};
use crate::workflows::screening::service::{ScreeningDatasets, ScreeningService};

fn program(
    university: &str,
    track: AdmissionTrack,
    unit: &str,
    entry_70: Option<f64>,
    fill: (f64, f64),
) -> ProgramRecord {
    let mut record = ProgramRecord::new(0, university, track, unit);
    record.entry.p70.0[2] = entry_70;
    record.competition.ratio.0 = [Some(7.2), Some(8.4), Some(9.1)];
    record.fill.rate.0[2] = Some(fill.0);
    record.fill.average_3y = Some(fill.1);
    record.quota_current = Some(12.0);
    record
}

/// Raw 1.5 at a general high school tiers this catalog as reach {0, 1},
/// match {2} and safe {3}; rows 4 and 5 never tier.
pub(super) fn catalog() -> Arc<ProgramCatalog> {
    let records = vec![
        program("연세대학교", AdmissionTrack::Comprehensive, "경영학과", Some(1.10), (60.0, 55.0)),
        program("고려대학교", AdmissionTrack::Comprehensive, "경제학과", Some(1.20), (20.0, 15.0)),
        program("한양대학교", AdmissionTrack::SubjectGrade, "기계공학부", Some(1.40), (80.0, 70.0)),
        program("건국대학교", AdmissionTrack::SubjectGrade, "화학과", Some(1.90), (10.0, 5.0)),
        program("서울대학교", AdmissionTrack::Comprehensive, "의예과", Some(0.90), (5.0, 5.0)),
        program("중앙대학교", AdmissionTrack::Essay, "철학과", None, (30.0, 30.0)),
    ];
    Arc::new(ProgramCatalog::from_records(records, SchemaCapabilities::complete()))
}

pub(super) fn profile() -> StudentProfile {
    StudentProfile::new(1.5, SchoolType::General)
}

pub(super) fn datasets() -> Arc<ScreeningDatasets> {
    Arc::new(ScreeningDatasets::new(catalog()))
}

pub(super) fn build_service() -> (
    ScreeningService<MemoryRepository, StubNarrator>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = ScreeningService::new(repository.clone(), Arc::new(StubNarrator), datasets());
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, ScreeningSession>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: ScreeningSession) -> Result<ScreeningSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: ScreeningSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: ScreeningSession) -> Result<ScreeningSession, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _session: ScreeningSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) struct StubNarrator;

impl NarrativeGenerator for StubNarrator {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Ok(format!("{} 초안", request.kind.label()))
    }
}

pub(super) fn json_post(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize payload")))
        .expect("build request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
