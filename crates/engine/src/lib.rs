//! UI-agnostic result controller for the echo viewer.

pub mod api;
pub mod artifact;
pub mod backend;
pub mod error;
pub mod handle;
pub mod report;
pub mod status;
pub mod sync;

pub use analysis_http::AnalysisHttpError;
pub use api::{
    ArtifactCell, CellState, Command, Controller, ControllerErrorEvent, EngineErrorKind, Event,
    FetchRequest, ResultSnapshot,
};
pub use artifact::{ArtifactKind, ArtifactProfile};
pub use backend::{AnalysisBackend, HttpAnalysisBackend};
pub use error::{EngineError, Result};
pub use handle::{FetchedMedia, HandleId, InMemoryMediaStore, MediaHandle, MediaStore, MediaView};
pub use report::{DiagnosisSummary, MetricsSummary};
pub use status::{AnalysisResult, ProcessingStatus, StatusTracker};
pub use sync::{
    PlaybackRejected, PlaybackSynchronizer, PrimaryEvent, SYNC_TOLERANCE_SECONDS,
    SecondaryPosition, SyncCommand, SyncGroup, VideoElement, plan_sync,
};
