use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use engine::{
    ArtifactKind, CellState, Event, HandleId, PlaybackSynchronizer, PrimaryEvent, ResultSnapshot,
    SyncGroup, VideoElement,
};
use iced::widget::{Row, button, column, image, row, text, text_input};
use iced::{Element, Length, Subscription, Task};
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::bridge::{BridgeEvent, BridgeRequest, BridgeSender, bridge_subscription};
use crate::player::ClockPlayer;
use crate::widgets::{artifact, report};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// UI messages handled by the iced app update loop.
#[derive(Debug, Clone)]
pub enum Message {
    InputPathChanged(String),
    ProcessPressed,
    PlayPausePressed,
    Seeked(f64),
    Tick(Instant),
    Bridge(BridgeEvent),
}

struct SecondaryPlayer {
    handle_id: HandleId,
    player: ClockPlayer,
}

/// Root UI state.
pub struct AppState {
    bridge_tx: Option<BridgeSender>,
    input_path: String,
    submitted_input: Option<PathBuf>,
    /// Sent to the bridge but not yet accepted into processing.
    pending_input: Option<PathBuf>,
    snapshot: Option<ResultSnapshot>,
    primary: ClockPlayer,
    secondaries: BTreeMap<ArtifactKind, SecondaryPlayer>,
    images: BTreeMap<ArtifactKind, (HandleId, image::Handle)>,
    synchronizer: PlaybackSynchronizer,
    last_tick: Option<Instant>,
    notice: Option<String>,
    status: String,
}

impl AppState {
    /// Boots the app; the bridge is started by the subscription.
    pub fn boot() -> (Self, Task<Message>) {
        (Self::with_sender(None, "starting analysis bridge"), Task::none())
    }

    fn with_sender(bridge_tx: Option<BridgeSender>, status: &str) -> Self {
        Self {
            bridge_tx,
            input_path: String::new(),
            submitted_input: None,
            pending_input: None,
            snapshot: None,
            primary: ClockPlayer::primary(false),
            secondaries: BTreeMap::new(),
            images: BTreeMap::new(),
            synchronizer: PlaybackSynchronizer::new(),
            last_tick: None,
            notice: None,
            status: status.to_owned(),
        }
    }

    /// Handles one UI message.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputPathChanged(path) => {
                self.input_path = path;
            }
            Message::ProcessPressed => self.submit(),
            Message::PlayPausePressed => {
                let event = if self.primary.is_playing() {
                    self.primary.pause();
                    PrimaryEvent::Pause
                } else {
                    if let Err(rejected) = self.primary.play() {
                        self.status = format!("cannot play: {rejected}");
                        return Task::none();
                    }
                    PrimaryEvent::Play
                };
                self.last_tick = None;
                self.mirror(event);
            }
            Message::Seeked(position) => {
                self.primary.seek(position);
                self.mirror(PrimaryEvent::TimeUpdate {
                    position: self.primary.current_time(),
                });
            }
            Message::Tick(now) => self.tick(now),
            Message::Bridge(BridgeEvent::Ready(sender)) => {
                self.bridge_tx = Some(sender);
                self.status = String::from("ready");
            }
            Message::Bridge(BridgeEvent::Event(event)) => self.apply_event(event),
            Message::Bridge(BridgeEvent::UploadFailed(message)) => {
                self.pending_input = None;
                self.notice = Some(format!("Upload failed: {message}"));
            }
            Message::Bridge(BridgeEvent::Disconnected) => {
                self.status = String::from("analysis bridge closed");
                self.bridge_tx = None;
            }
        }

        Task::none()
    }

    fn is_processing(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.status.is_processing())
    }

    fn submit(&mut self) {
        if self.is_processing() {
            return;
        }
        let path = self.input_path.trim();
        if path.is_empty() {
            self.notice = Some(String::from("Choose a video file first"));
            return;
        }
        let path = PathBuf::from(path);
        if self.send_request(BridgeRequest::Submit { path: path.clone() }) {
            self.notice = None;
            self.status = format!("submitting {}", path.display());
            self.pending_input = Some(path);
        }
    }

    /// Swaps in the submitted input once the run has started.
    fn adopt_pending_input(&mut self) {
        let Some(path) = self.pending_input.take() else {
            return;
        };
        self.submitted_input = Some(path);
        self.primary = ClockPlayer::primary(true).with_duration(artifact::SCRUB_RANGE_SECONDS);
        self.last_tick = None;
    }

    fn send_request(&mut self, request: BridgeRequest) -> bool {
        let Some(sender) = &self.bridge_tx else {
            self.status = String::from("analysis bridge is not ready");
            return false;
        };
        match sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.status = String::from("analysis request queue is full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.status = String::from("analysis bridge closed");
                self.bridge_tx = None;
                false
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);

        self.primary.advance(elapsed);
        for secondary in self.secondaries.values_mut() {
            secondary.player.advance(elapsed);
        }
        if self.primary.is_playing() {
            self.mirror(PrimaryEvent::TimeUpdate {
                position: self.primary.current_time(),
            });
        }
    }

    fn mirror(&mut self, event: PrimaryEvent) {
        let mut players: BTreeMap<ArtifactKind, ClockPlayer> = self
            .secondaries
            .iter()
            .map(|(kind, secondary)| (*kind, secondary.player.clone()))
            .collect();
        let issued = self.synchronizer.dispatch(event, &mut players);
        if issued == 0 {
            return;
        }
        for (kind, player) in players {
            if let Some(secondary) = self.secondaries.get_mut(&kind) {
                secondary.player = player;
            }
        }
    }

    fn apply_event(&mut self, event: Event) {
        match event {
            Event::ResultChanged(snapshot) => {
                self.status = snapshot.status.name().to_owned();
                if snapshot.status.is_processing() {
                    self.adopt_pending_input();
                }
                self.reconcile_media(&snapshot);
                let _ = self
                    .synchronizer
                    .refresh(SyncGroup::resolve(self.primary.has_media(), &snapshot));
                self.snapshot = Some(snapshot);
            }
            Event::FetchRequested(request) => {
                debug!(generation = request.generation, kind = %request.kind, "artifact fetch requested");
            }
            Event::TornDown => {
                self.synchronizer.detach();
                self.pending_input = None;
                self.secondaries.clear();
                self.images.clear();
                self.status = String::from("torn down");
            }
            Event::Error(error) => {
                self.notice = Some(error.message);
            }
        }
    }

    /// Keeps players and decoded images in step with the live handles.
    fn reconcile_media(&mut self, snapshot: &ResultSnapshot) {
        let mut videos = BTreeMap::new();
        let mut pictures = BTreeMap::new();
        for cell in &snapshot.cells {
            if let CellState::Ready(media) = &cell.state {
                if media.is_video() {
                    videos.insert(cell.kind, (media.id, !media.is_empty()));
                } else if media.is_image() {
                    pictures.insert(cell.kind, media);
                }
            }
        }

        self.secondaries.retain(|kind, secondary| {
            videos
                .get(kind)
                .is_some_and(|(id, _)| *id == secondary.handle_id)
        });
        for (kind, (handle_id, has_media)) in videos {
            self.secondaries.entry(kind).or_insert_with(|| SecondaryPlayer {
                handle_id,
                player: ClockPlayer::secondary(
                    has_media,
                    self.primary.current_time(),
                    self.primary.is_playing(),
                ),
            });
        }

        self.images
            .retain(|kind, (id, _)| pictures.get(kind).is_some_and(|media| media.id == *id));
        for (kind, media) in pictures {
            self.images.entry(kind).or_insert_with(|| {
                (media.id, image::Handle::from_bytes(media.bytes.to_vec()))
            });
        }
    }

    /// Renders the UI tree.
    pub fn view(&self) -> Element<'_, Message> {
        let processing = self.is_processing();
        let input_row = row![
            text_input("video path", &self.input_path)
                .on_input(Message::InputPathChanged)
                .on_submit(Message::ProcessPressed),
            button(if processing { "Processing..." } else { "Process Video" })
                .on_press_maybe((!processing).then_some(Message::ProcessPressed)),
        ]
        .spacing(12);

        let mut cells = vec![artifact::input_view(
            self.submitted_input.as_deref(),
            &self.primary,
            Message::PlayPausePressed,
            Message::Seeked,
        )];
        match &self.snapshot {
            Some(snapshot) => cells.extend(snapshot.cells.iter().map(|cell| {
                artifact::view(
                    cell,
                    self.images.get(&cell.kind).map(|(_, handle)| handle),
                    self.secondaries
                        .get(&cell.kind)
                        .map(|secondary| &secondary.player),
                )
            })),
            None => cells.push(
                column![text(artifact::IDLE_PROMPT)]
                    .width(Length::FillPortion(1))
                    .into(),
            ),
        }
        let grid = Row::with_children(cells).spacing(16);

        let mut content = column![input_row].spacing(16).padding(16);
        if let Some(notice) = &self.notice {
            content = content.push(text(notice.as_str()));
        }
        content = content.push(grid);
        if let Some(result) = self.snapshot.as_ref().and_then(ResultSnapshot::report) {
            content = content
                .push(report::metrics_view(result))
                .push(report::diagnosis_view(result));
        }
        content = content.push(text(format!("Status: {}", self.status)));

        content.into()
    }

    /// Subscribes to bridge events and the playback clock.
    pub fn subscription(&self) -> Subscription<Message> {
        let bridge = bridge_subscription().map(Message::Bridge);
        let clock_running = self.primary.is_playing()
            || self
                .secondaries
                .values()
                .any(|secondary| secondary.player.is_playing());
        if clock_running {
            Subscription::batch([bridge, iced::time::every(TICK_INTERVAL).map(Message::Tick)])
        } else {
            bridge
        }
    }

    #[cfg(test)]
    fn from_sender_for_test(bridge_tx: BridgeSender) -> Self {
        Self::with_sender(Some(bridge_tx), "idle")
    }
}
