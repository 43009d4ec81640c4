use serde::Serialize;
use std::sync::Arc;

/// Which part of the report a narrative paragraph is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    OverallOpinion,
    ReachStrategy,
    ProgramAnalysis,
}

impl NarrativeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OverallOpinion => "종합 의견",
            Self::ReachStrategy => "상향 지원 전략",
            Self::ProgramAnalysis => "심층 분석",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRequest {
    pub kind: NarrativeKind,
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("narrative backend unavailable: {0}")]
    Unavailable(String),
    #[error("narrative backend returned an empty response")]
    Empty,
}

/// Text generator behind the free-form report sections.
///
/// Implementations may call out to a language model; the assembler treats
/// every failure as recoverable.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}

impl<T> NarrativeGenerator for Arc<T>
where
    T: NarrativeGenerator + ?Sized,
{
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        (**self).generate(request)
    }
}
