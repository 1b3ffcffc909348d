use std::fmt::{Display, Formatter};

use crate::artifact::ArtifactKind;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by controller commands, handle bookkeeping and the backend.
#[derive(Debug)]
pub enum EngineError {
    AlreadyProcessing,
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    TornDown,
    HandleNotLive {
        handle_id: u64,
    },
    UnknownArtifactKind {
        name: String,
    },
    EmptyArtifactProfile,
    Retrieval {
        kind: ArtifactKind,
        source: analysis_http::AnalysisHttpError,
    },
    Http(analysis_http::AnalysisHttpError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyProcessing => write!(f, "an analysis is already processing"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid status transition {from} -> {to}")
            }
            Self::TornDown => write!(f, "result view has been torn down"),
            Self::HandleNotLive { handle_id } => {
                write!(f, "media handle {handle_id} is not live")
            }
            Self::UnknownArtifactKind { name } => write!(f, "unknown artifact kind: {name}"),
            Self::EmptyArtifactProfile => write!(f, "artifact profile is empty"),
            Self::Retrieval { kind, source } => {
                write!(f, "failed to retrieve {kind} artifact: {source}")
            }
            Self::Http(err) => write!(f, "analysis service error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Retrieval { source, .. } => Some(source),
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<analysis_http::AnalysisHttpError> for EngineError {
    fn from(value: analysis_http::AnalysisHttpError) -> Self {
        Self::Http(value)
    }
}
