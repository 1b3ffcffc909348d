use std::path::PathBuf;

use engine::{
    AnalysisBackend, ArtifactProfile, Command, Controller, ControllerErrorEvent, Event,
    FetchRequest, HttpAnalysisBackend, MediaStore,
};
use iced::futures::SinkExt;
use iced::{Subscription, stream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 32;
const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 32;

/// Sender used by the UI to reach the controller task.
pub type BridgeSender = mpsc::Sender<BridgeRequest>;

/// Receiver used by the UI to read events emitted by the controller task.
pub type BridgeReceiver = mpsc::Receiver<BridgeEvent>;

/// Requests accepted by the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    Submit { path: PathBuf },
    Teardown,
}

/// Messages emitted by the bridge.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    Ready(BridgeSender),
    Event(Event),
    /// The ingress refused a submission; the message is user-facing.
    UploadFailed(String),
    Disconnected,
}

enum WorkerMessage {
    Command(Command),
    UploadFailed(String),
}

/// Builds a subscription that starts the controller task and forwards events.
pub fn bridge_subscription() -> Subscription<BridgeEvent> {
    Subscription::run(bridge_worker_stream)
}

fn bridge_worker_stream() -> impl iced::futures::Stream<Item = BridgeEvent> {
    stream::channel(
        SUBSCRIPTION_CHANNEL_CAPACITY,
        move |mut output| async move {
            let (request_tx, mut event_rx) = match spawn_http_bridge() {
                Ok(bridge) => bridge,
                Err(error) => {
                    warn!(%error, "failed to start analysis bridge");
                    let _ = output
                        .send(BridgeEvent::Event(Event::Error(
                            ControllerErrorEvent::from_error(&error),
                        )))
                        .await;
                    let _ = output.send(BridgeEvent::Disconnected).await;
                    return;
                }
            };
            let _ = output.send(BridgeEvent::Ready(request_tx)).await;

            while let Some(event) = event_rx.recv().await {
                if output.send(event).await.is_err() {
                    return;
                }
            }
            let _ = output.send(BridgeEvent::Disconnected).await;
        },
    )
}

/// Spawns the production bridge wired to the HTTP backend and env config.
pub fn spawn_http_bridge() -> engine::Result<(BridgeSender, BridgeReceiver)> {
    let backend = HttpAnalysisBackend::from_env()?;
    let profile = ArtifactProfile::from_env()?;
    Ok(spawn_controller_bridge(
        Controller::in_memory(profile),
        backend,
    ))
}

/// Spawns a controller task around any store and backend.
///
/// Must be called from within a tokio runtime.
pub fn spawn_controller_bridge<S, B>(
    controller: Controller<S>,
    backend: B,
) -> (BridgeSender, BridgeReceiver)
where
    S: MediaStore + Send + 'static,
    B: AnalysisBackend + Clone + Send + Sync + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();

    let worker = Worker {
        controller,
        backend,
        events: event_tx,
        internal: internal_tx,
        next_order: 0,
    };
    tokio::spawn(worker.run(request_rx, internal_rx));

    (request_tx, event_rx)
}

struct Worker<S, B>
where
    S: MediaStore,
{
    controller: Controller<S>,
    backend: B,
    events: mpsc::Sender<BridgeEvent>,
    internal: mpsc::UnboundedSender<WorkerMessage>,
    next_order: u64,
}

impl<S, B> Worker<S, B>
where
    S: MediaStore + Send + 'static,
    B: AnalysisBackend + Clone + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<BridgeRequest>,
        mut internal: mpsc::UnboundedReceiver<WorkerMessage>,
    ) {
        loop {
            let open = tokio::select! {
                request = requests.recv() => match request {
                    Some(BridgeRequest::Submit { path }) => self.submit(path).await,
                    Some(BridgeRequest::Teardown) | None => {
                        let _ = self.apply(Command::Teardown).await;
                        break;
                    }
                },
                Some(message) = internal.recv() => match message {
                    WorkerMessage::Command(command) => self.apply(command).await,
                    WorkerMessage::UploadFailed(message) => {
                        self.emit(BridgeEvent::UploadFailed(message)).await
                            && self.apply(Command::AbortProcessing).await
                    }
                },
            };
            if !open {
                let _ = self.controller.handle_command(Command::Teardown);
                break;
            }
        }
        debug!("analysis bridge stopped");
    }

    async fn submit(&mut self, path: PathBuf) -> bool {
        if let Err(error) = self.backend.check_upload(&path) {
            return self.emit(BridgeEvent::UploadFailed(error.to_string())).await;
        }

        let order = self.next_order + 1;
        let started = self
            .controller
            .handle_command(Command::StartProcessing { order });
        let accepted = started.is_ok();
        if !self.forward(started).await {
            return false;
        }
        if accepted {
            self.next_order = order;
            self.spawn_upload(path);
        }
        true
    }

    async fn apply(&mut self, command: Command) -> bool {
        let result = self.controller.handle_command(command);
        self.forward(result).await
    }

    async fn forward(&mut self, result: engine::Result<Vec<Event>>) -> bool {
        match result {
            Ok(events) => {
                for event in events {
                    if let Event::FetchRequested(request) = &event {
                        self.spawn_fetch(*request);
                    }
                    if !self.emit(BridgeEvent::Event(event)).await {
                        return false;
                    }
                }
                true
            }
            Err(error) => {
                warn!(%error, "controller command failed");
                self.emit(BridgeEvent::Event(Event::Error(
                    ControllerErrorEvent::from_error(&error),
                )))
                .await
            }
        }
    }

    async fn emit(&mut self, event: BridgeEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    fn spawn_upload(&self, path: PathBuf) {
        let backend = self.backend.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let message = match backend.submit_video(path).await {
                Ok(result) => WorkerMessage::Command(Command::Complete { result }),
                Err(error) => WorkerMessage::UploadFailed(error.to_string()),
            };
            let _ = internal.send(message);
        });
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let backend = self.backend.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let outcome = backend
                .fetch_artifact(request.kind)
                .await
                .map_err(|error| error.to_string());
            let _ = internal.send(WorkerMessage::Command(Command::ArtifactFetched {
                generation: request.generation,
                kind: request.kind,
                outcome,
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use engine::{
        AnalysisBackend, AnalysisHttpError, AnalysisResult, ArtifactKind, ArtifactProfile,
        CellState, Controller, EngineError, Event, FetchedMedia, InMemoryMediaStore,
        ProcessingStatus, ResultSnapshot,
    };
    use tokio::time::timeout;

    use super::{BridgeEvent, BridgeReceiver, BridgeRequest, spawn_controller_bridge};

    #[tokio::test]
    async fn submit_runs_through_processing_to_rendered_artifacts() {
        let (request_tx, mut event_rx) = spawn_controller_bridge(
            Controller::in_memory(ArtifactProfile::mask_and_ecg()),
            MockBackend::default(),
        );

        request_tx
            .send(BridgeRequest::Submit {
                path: PathBuf::from("echo.mp4"),
            })
            .await
            .expect("send submit request");

        let processing =
            next_snapshot(&mut event_rx, |snapshot| snapshot.status.is_processing()).await;
        assert_eq!(processing.order, 1);
        assert!(processing.report().is_none());

        let complete = next_snapshot(&mut event_rx, |snapshot| {
            snapshot
                .cells
                .iter()
                .all(|cell| matches!(cell.state, CellState::Ready(_)))
        })
        .await;
        assert_eq!(
            complete.report().map(|result| result.problem.as_str()),
            Some("Reduced EF")
        );
    }

    #[tokio::test]
    async fn invalid_upload_is_reported_without_changing_status() {
        let (request_tx, mut event_rx) = spawn_controller_bridge(
            Controller::in_memory(ArtifactProfile::segmented_video()),
            MockBackend::default(),
        );

        request_tx
            .send(BridgeRequest::Submit {
                path: PathBuf::from("notes.txt"),
            })
            .await
            .expect("send submit request");

        let event = recv(&mut event_rx).await;
        let BridgeEvent::UploadFailed(message) = event else {
            panic!("expected UploadFailed, got {event:?}");
        };
        assert!(message.contains("notes.txt"));
        assert!(
            timeout(Duration::from_millis(100), event_rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn rejected_upload_returns_status_to_idle() {
        let backend = MockBackend {
            reject_upload: Some("File too large".to_owned()),
            ..MockBackend::default()
        };
        let (request_tx, mut event_rx) = spawn_controller_bridge(
            Controller::in_memory(ArtifactProfile::segmented_video()),
            backend,
        );

        request_tx
            .send(BridgeRequest::Submit {
                path: PathBuf::from("echo.mp4"),
            })
            .await
            .expect("send submit request");

        let mut upload_message = None;
        loop {
            match recv(&mut event_rx).await {
                BridgeEvent::UploadFailed(message) => upload_message = Some(message),
                BridgeEvent::Event(Event::ResultChanged(snapshot))
                    if snapshot.status == ProcessingStatus::Idle =>
                {
                    break;
                }
                _ => {}
            }
        }
        assert!(upload_message.expect("upload failure").contains("File too large"));
    }

    #[tokio::test]
    async fn failed_artifact_leaves_sibling_rendered() {
        let backend = MockBackend {
            failing: vec![ArtifactKind::Mask],
            ..MockBackend::default()
        };
        let (request_tx, mut event_rx) = spawn_controller_bridge(
            Controller::in_memory(ArtifactProfile::mask_and_ecg()),
            backend,
        );

        request_tx
            .send(BridgeRequest::Submit {
                path: PathBuf::from("echo.mp4"),
            })
            .await
            .expect("send submit request");

        let settled = next_snapshot(&mut event_rx, |snapshot| {
            snapshot.report().is_some()
                && snapshot
                    .cells
                    .iter()
                    .all(|cell| cell.state != CellState::Loading)
        })
        .await;
        assert_eq!(
            settled.cell(ArtifactKind::Mask).map(|cell| &cell.state),
            Some(&CellState::Empty)
        );
        assert!(matches!(
            settled.cell(ArtifactKind::Ecg).map(|cell| &cell.state),
            Some(CellState::Ready(_))
        ));
    }

    #[tokio::test]
    async fn teardown_emits_torn_down_and_closes_channel() {
        let (request_tx, mut event_rx) = spawn_controller_bridge(
            Controller::new(InMemoryMediaStore::new(), ArtifactProfile::segmented_video()),
            MockBackend::default(),
        );

        request_tx
            .send(BridgeRequest::Teardown)
            .await
            .expect("send teardown request");

        assert!(matches!(
            recv(&mut event_rx).await,
            BridgeEvent::Event(Event::TornDown)
        ));
        let closed = timeout(Duration::from_secs(1), event_rx.recv())
            .await
            .expect("channel should close");
        assert!(closed.is_none());
    }

    async fn recv(event_rx: &mut BridgeReceiver) -> BridgeEvent {
        timeout(Duration::from_secs(1), event_rx.recv())
            .await
            .expect("bridge event within timeout")
            .expect("bridge channel open")
    }

    async fn next_snapshot(
        event_rx: &mut BridgeReceiver,
        matches: impl Fn(&ResultSnapshot) -> bool,
    ) -> ResultSnapshot {
        loop {
            if let BridgeEvent::Event(Event::ResultChanged(snapshot)) = recv(event_rx).await {
                if matches(&snapshot) {
                    return snapshot;
                }
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct MockBackend {
        failing: Vec<ArtifactKind>,
        reject_upload: Option<String>,
    }

    impl AnalysisBackend for MockBackend {
        fn check_upload(&self, path: &Path) -> engine::Result<()> {
            if path.extension().is_some_and(|ext| ext == "mp4") {
                return Ok(());
            }
            Err(EngineError::Http(AnalysisHttpError::InvalidUpload {
                path: path.to_path_buf(),
                reason: "unsupported file type".to_owned(),
            }))
        }

        fn submit_video(
            &self,
            _path: PathBuf,
        ) -> impl Future<Output = engine::Result<AnalysisResult>> + Send {
            let rejection = self.reject_upload.clone();
            async move {
                match rejection {
                    Some(message) => Err(EngineError::Http(AnalysisHttpError::UploadRejected {
                        status: 400,
                        message,
                    })),
                    None => Ok(AnalysisResult {
                        ejection_fraction: 55.3,
                        problem: "Reduced EF".to_owned(),
                        cause: "cause".to_owned(),
                        cure: "cure".to_owned(),
                    }),
                }
            }
        }

        fn fetch_artifact(
            &self,
            kind: ArtifactKind,
        ) -> impl Future<Output = engine::Result<FetchedMedia>> + Send {
            let fail = self.failing.contains(&kind);
            async move {
                if fail {
                    return Err(EngineError::Retrieval {
                        kind,
                        source: AnalysisHttpError::UnexpectedStatus {
                            url: kind.route().to_owned(),
                            status: 500,
                        },
                    });
                }
                Ok(FetchedMedia {
                    content_type: "image/png".to_owned(),
                    bytes: Arc::from(vec![1_u8; 4]),
                })
            }
        }
    }
}
