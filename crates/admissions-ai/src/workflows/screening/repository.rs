use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pipeline::ScreeningPipeline;
use super::views::SessionView;

/// Identifier wrapper for consultant screening sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repository record holding the pipeline state of one student session.
#[derive(Debug, Clone)]
pub struct ScreeningSession {
    pub id: SessionId,
    pub pipeline: ScreeningPipeline,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScreeningSession {
    pub fn new(id: SessionId, pipeline: ScreeningPipeline, now: DateTime<Utc>) -> Self {
        Self {
            id,
            pipeline,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the pipeline with the result of a stage transition.
    pub fn advance(mut self, pipeline: ScreeningPipeline, now: DateTime<Utc>) -> Self {
        self.pipeline = pipeline;
        self.updated_at = now;
        self
    }

    pub fn view(&self) -> SessionView {
        SessionView::from_session(self)
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: ScreeningSession) -> Result<ScreeningSession, RepositoryError>;
    fn update(&self, session: ScreeningSession) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
