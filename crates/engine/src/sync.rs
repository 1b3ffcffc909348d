//! One-directional playback mirroring from the input video onto derived
//! video artifacts.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::api::ResultSnapshot;
use crate::artifact::ArtifactKind;
use crate::handle::HandleId;

/// Largest tolerated drift between primary and secondary positions.
pub const SYNC_TOLERANCE_SECONDS: f64 = 0.1;

/// Events raised by the primary (input) video element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryEvent {
    Play,
    Pause,
    TimeUpdate { position: f64 },
}

/// Current playback position of one secondary element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryPosition {
    pub kind: ArtifactKind,
    pub position: f64,
}

/// Command for one secondary element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncCommand {
    Play(ArtifactKind),
    Pause(ArtifactKind),
    Seek { kind: ArtifactKind, position: f64 },
}

/// Maps one primary event onto commands for the secondaries.
///
/// # Example
/// ```
/// use engine::{ArtifactKind, PrimaryEvent, SecondaryPosition, SyncCommand, plan_sync};
///
/// let commands = plan_sync(
///     PrimaryEvent::TimeUpdate { position: 5.0 },
///     &[SecondaryPosition { kind: ArtifactKind::Video, position: 4.85 }],
/// );
/// assert_eq!(
///     commands,
///     vec![SyncCommand::Seek { kind: ArtifactKind::Video, position: 5.0 }]
/// );
/// ```
pub fn plan_sync(event: PrimaryEvent, secondaries: &[SecondaryPosition]) -> Vec<SyncCommand> {
    match event {
        PrimaryEvent::Play => secondaries
            .iter()
            .map(|secondary| SyncCommand::Play(secondary.kind))
            .collect(),
        PrimaryEvent::Pause => secondaries
            .iter()
            .map(|secondary| SyncCommand::Pause(secondary.kind))
            .collect(),
        PrimaryEvent::TimeUpdate { position } => secondaries
            .iter()
            .filter(|secondary| (secondary.position - position).abs() > SYNC_TOLERANCE_SECONDS)
            .map(|secondary| SyncCommand::Seek {
                kind: secondary.kind,
                position,
            })
            .collect(),
    }
}

/// Returned when an element refuses to start playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRejected {
    pub reason: String,
}

impl Display for PlaybackRejected {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "playback rejected: {}", self.reason)
    }
}

impl std::error::Error for PlaybackRejected {}

/// Minimal control surface of a rendered video element.
pub trait VideoElement {
    fn current_time(&self) -> f64;

    fn play(&mut self) -> Result<(), PlaybackRejected>;

    fn pause(&mut self);

    fn seek(&mut self, position: f64);
}

/// Derived video elements currently eligible for mirroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroup {
    members: Vec<(ArtifactKind, HandleId)>,
}

impl SyncGroup {
    /// Resolves the group for a snapshot.
    ///
    /// Returns `None` unless the primary element is mounted and at least one
    /// ready artifact is a video.
    pub fn resolve(primary_mounted: bool, snapshot: &ResultSnapshot) -> Option<Self> {
        if !primary_mounted {
            return None;
        }
        let members: Vec<_> = snapshot
            .ready_videos()
            .map(|view| (view.kind, view.id))
            .collect();
        (!members.is_empty()).then_some(Self { members })
    }

    pub fn kinds(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.members.iter().map(|(kind, _)| *kind)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.members.iter().any(|(member, _)| *member == kind)
    }
}

/// Holds the attached [`SyncGroup`] and forwards primary events to it.
///
/// Listeners are bound to the exact member set (kinds and handle ids); any
/// change detaches them before the new set is attached.
#[derive(Debug, Default)]
pub struct PlaybackSynchronizer {
    attached: Option<SyncGroup>,
}

impl PlaybackSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-binds to `group`. Returns true when the attachment changed.
    pub fn refresh(&mut self, group: Option<SyncGroup>) -> bool {
        if self.attached == group {
            return false;
        }
        if self.attached.is_some() {
            debug!("playback sync listeners detached");
        }
        if let Some(group) = &group {
            debug!(members = group.members.len(), "playback sync listeners attached");
        }
        self.attached = group;
        true
    }

    pub fn detach(&mut self) {
        let _ = self.refresh(None);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Applies one primary event to attached secondaries and returns the
    /// number of commands issued. Play rejections are logged and swallowed.
    pub fn dispatch<E>(&self, event: PrimaryEvent, elements: &mut BTreeMap<ArtifactKind, E>) -> usize
    where
        E: VideoElement,
    {
        let Some(group) = &self.attached else {
            return 0;
        };

        let secondaries: Vec<SecondaryPosition> = elements
            .iter()
            .filter(|(kind, _)| group.contains(**kind))
            .map(|(kind, element)| SecondaryPosition {
                kind: *kind,
                position: element.current_time(),
            })
            .collect();

        let commands = plan_sync(event, &secondaries);
        for command in &commands {
            match *command {
                SyncCommand::Play(kind) => {
                    if let Some(element) = elements.get_mut(&kind) {
                        if let Err(rejected) = element.play() {
                            debug!(%kind, %rejected, "secondary play rejected");
                        }
                    }
                }
                SyncCommand::Pause(kind) => {
                    if let Some(element) = elements.get_mut(&kind) {
                        element.pause();
                    }
                }
                SyncCommand::Seek { kind, position } => {
                    if let Some(element) = elements.get_mut(&kind) {
                        element.seek(position);
                    }
                }
            }
        }
        commands.len()
    }
}
