use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::artifact::{ArtifactKind, ArtifactProfile};
use crate::error::{EngineError, Result};
use crate::handle::{FetchedMedia, InMemoryMediaStore, MediaHandle, MediaStore, MediaView};
use crate::status::{AnalysisResult, ProcessingStatus, StatusTracker};

/// Commands accepted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A new video was submitted; clears every artifact of the previous run.
    StartProcessing {
        order: u64,
    },
    /// The analysis finished. Issues one retrieval per configured kind.
    Complete {
        result: AnalysisResult,
    },
    /// The submission was refused after processing started.
    AbortProcessing,
    /// Outcome of a retrieval issued by [`Event::FetchRequested`].
    ///
    /// Responses whose `generation` is not the current one are dropped.
    ArtifactFetched {
        generation: u64,
        kind: ArtifactKind,
        outcome: std::result::Result<FetchedMedia, String>,
    },
    /// The presentation surface is going away; revokes all live handles.
    Teardown,
}

/// Events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ResultChanged(ResultSnapshot),
    FetchRequested(FetchRequest),
    TornDown,
    Error(ControllerErrorEvent),
}

/// One artifact retrieval the driver must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub kind: ArtifactKind,
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    InvalidTransition,
    Upload,
    Retrieval,
    TornDown,
    Other,
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::AlreadyProcessing | EngineError::InvalidTransition { .. } => {
                Self::InvalidTransition
            }
            EngineError::Http(_) => Self::Upload,
            EngineError::Retrieval { .. } => Self::Retrieval,
            EngineError::TornDown => Self::TornDown,
            _ => Self::Other,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl ControllerErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Render state of one artifact cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState {
    Loading,
    Ready(MediaView),
    /// Nothing to show: no run yet, or the retrieval failed.
    Empty,
}

/// Snapshot representation of one artifact cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactCell {
    pub kind: ArtifactKind,
    pub state: CellState,
}

/// Immutable result snapshot consumed by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSnapshot {
    pub status: ProcessingStatus,
    pub order: u64,
    pub generation: u64,
    pub cells: Vec<ArtifactCell>,
}

impl ResultSnapshot {
    /// Analysis result, present iff the status is `Complete`.
    pub fn report(&self) -> Option<&AnalysisResult> {
        self.status.result()
    }

    pub fn cell(&self, kind: ArtifactKind) -> Option<&ArtifactCell> {
        self.cells.iter().find(|cell| cell.kind == kind)
    }

    /// Ready artifacts whose media is a video.
    pub fn ready_videos(&self) -> impl Iterator<Item = &MediaView> {
        self.cells.iter().filter_map(|cell| match &cell.state {
            CellState::Ready(view) if view.is_video() => Some(view),
            _ => None,
        })
    }
}

/// Tracks processing status and owns the media handles derived from it.
///
/// Every transition bumps `generation`; retrieval results carry the
/// generation they were issued for and are ignored once it is superseded.
#[derive(Debug)]
pub struct Controller<S>
where
    S: MediaStore,
{
    store: S,
    profile: ArtifactProfile,
    tracker: StatusTracker,
    generation: u64,
    handles: BTreeMap<ArtifactKind, MediaHandle>,
    pending: BTreeSet<ArtifactKind>,
    torn_down: bool,
}

impl<S> Controller<S>
where
    S: MediaStore,
{
    /// Creates a controller that fetches `profile` for every completed run.
    ///
    /// # Example
    /// ```
    /// use engine::{ArtifactProfile, Command, Controller, InMemoryMediaStore};
    ///
    /// let mut controller = Controller::new(InMemoryMediaStore::new(), ArtifactProfile::default());
    /// let events = controller
    ///     .handle_command(Command::StartProcessing { order: 1 })
    ///     .expect("start processing");
    /// assert_eq!(events.len(), 1);
    /// ```
    pub fn new(store: S, profile: ArtifactProfile) -> Self {
        Self {
            store,
            profile,
            tracker: StatusTracker::new(),
            generation: 0,
            handles: BTreeMap::new(),
            pending: BTreeSet::new(),
            torn_down: false,
        }
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        if self.torn_down {
            if let Command::ArtifactFetched {
                generation, kind, ..
            } = &command
            {
                debug!(generation, %kind, "discarding artifact response after teardown");
                return Ok(Vec::new());
            }
            return Err(EngineError::TornDown);
        }

        match command {
            Command::StartProcessing { order } => self.start_processing(order),
            Command::Complete { result } => self.complete(result),
            Command::AbortProcessing => self.abort(),
            Command::ArtifactFetched {
                generation,
                kind,
                outcome,
            } => self.artifact_fetched(generation, kind, outcome),
            Command::Teardown => self.teardown(),
        }
    }

    pub fn status(&self) -> &ProcessingStatus {
        self.tracker.status()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Builds the current render snapshot.
    pub fn snapshot(&self) -> ResultSnapshot {
        let processing = self.tracker.status().is_processing();
        let cells = self
            .profile
            .kinds()
            .iter()
            .map(|&kind| {
                let state = if processing {
                    CellState::Loading
                } else if let Some(handle) = self.handles.get(&kind) {
                    CellState::Ready(handle.view())
                } else if self.pending.contains(&kind) {
                    CellState::Loading
                } else {
                    CellState::Empty
                };
                ArtifactCell { kind, state }
            })
            .collect();

        ResultSnapshot {
            status: self.tracker.status().clone(),
            order: self.tracker.order(),
            generation: self.generation,
            cells,
        }
    }

    fn start_processing(&mut self, order: u64) -> Result<Vec<Event>> {
        self.tracker.begin_processing(order)?;
        self.advance_generation();
        self.pending.clear();
        self.revoke_all();

        Ok(vec![Event::ResultChanged(self.snapshot())])
    }

    fn complete(&mut self, result: AnalysisResult) -> Result<Vec<Event>> {
        self.tracker.complete(result)?;
        self.advance_generation();
        self.revoke_all();
        self.pending = self.profile.kinds().iter().copied().collect();

        let mut events = vec![Event::ResultChanged(self.snapshot())];
        events.extend(self.profile.kinds().iter().map(|&kind| {
            Event::FetchRequested(FetchRequest {
                generation: self.generation,
                kind,
            })
        }));
        info!(
            generation = self.generation,
            artifacts = self.pending.len(),
            "artifact retrieval issued"
        );
        Ok(events)
    }

    fn abort(&mut self) -> Result<Vec<Event>> {
        self.tracker.abort()?;
        self.advance_generation();
        self.pending.clear();
        self.revoke_all();

        Ok(vec![Event::ResultChanged(self.snapshot())])
    }

    fn artifact_fetched(
        &mut self,
        generation: u64,
        kind: ArtifactKind,
        outcome: std::result::Result<FetchedMedia, String>,
    ) -> Result<Vec<Event>> {
        if generation != self.generation || !self.pending.remove(&kind) {
            debug!(
                generation,
                current = self.generation,
                %kind,
                "discarding stale artifact response"
            );
            return Ok(Vec::new());
        }

        match outcome {
            Ok(media) => self.replace_handle(kind, media),
            Err(message) => warn!(generation, %kind, %message, "artifact retrieval failed"),
        }

        Ok(vec![Event::ResultChanged(self.snapshot())])
    }

    fn teardown(&mut self) -> Result<Vec<Event>> {
        self.torn_down = true;
        self.advance_generation();
        self.pending.clear();
        self.revoke_all();
        info!("result view torn down");

        Ok(vec![Event::TornDown])
    }

    fn replace_handle(&mut self, kind: ArtifactKind, media: FetchedMedia) {
        if let Some(previous) = self.handles.remove(&kind) {
            self.revoke(kind, previous);
        }
        let handle = self.store.create(kind, media);
        self.handles.insert(kind, handle);
    }

    /// Revokes every live handle. A failing revoke is logged and never
    /// blocks the transition that triggered it.
    fn revoke_all(&mut self) {
        for (kind, handle) in std::mem::take(&mut self.handles) {
            self.revoke(kind, handle);
        }
    }

    fn revoke(&mut self, kind: ArtifactKind, handle: MediaHandle) {
        let id = handle.id();
        if let Err(error) = self.store.revoke(handle) {
            warn!(%kind, %id, %error, "failed to revoke media handle");
        }
    }

    fn advance_generation(&mut self) {
        self.generation += 1;
    }
}

impl<S> Drop for Controller<S>
where
    S: MediaStore,
{
    fn drop(&mut self) {
        if !self.torn_down {
            if let Err(error) = self.teardown() {
                warn!(%error, "teardown on drop failed");
            }
        }
    }
}

impl Controller<InMemoryMediaStore> {
    /// Creates a controller backed by the in-memory handle store.
    pub fn in_memory(profile: ArtifactProfile) -> Self {
        Self::new(InMemoryMediaStore::new(), profile)
    }
}
