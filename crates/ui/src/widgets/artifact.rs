use std::path::Path;

use engine::{ArtifactCell, CellState, MediaView, VideoElement};
use iced::widget::{button, column, container, image, row, slider, text};
use iced::{ContentFit, Element, Length};

use crate::player::ClockPlayer;

/// Placeholder shown before any run and for artifacts that never arrived.
pub const IDLE_PROMPT: &str = "Click \"Process Video\" to start";

const LOADING_LABEL: &str = "Analyzing...";
const CELL_HEIGHT: f32 = 240.0;
/// Upper bound of the input scrubber; the input clock loops at this point.
pub const SCRUB_RANGE_SECONDS: f64 = 60.0;

/// Renders the input video cell with the primary transport controls.
pub fn input_view<'a, Message>(
    path: Option<&Path>,
    player: &ClockPlayer,
    on_toggle: Message,
    on_seek: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    let body: Element<'a, Message> = match path {
        Some(path) => column![
            text(path.display().to_string()),
            text(playback_label(player)),
            row![
                button(if player.is_playing() { "Pause" } else { "Play" }).on_press(on_toggle),
                slider(
                    0.0..=SCRUB_RANGE_SECONDS,
                    player.current_time().min(SCRUB_RANGE_SECONDS),
                    on_seek
                )
                .step(0.1),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .into(),
        None => text("No input video").into(),
    };

    cell_frame("Input Video", body)
}

/// Renders one derived artifact cell in its loading, media or idle state.
pub fn view<'a, Message>(
    cell: &ArtifactCell,
    image_handle: Option<&image::Handle>,
    player: Option<&ClockPlayer>,
) -> Element<'a, Message>
where
    Message: 'a,
{
    let body: Element<'a, Message> = match (&cell.state, image_handle) {
        (CellState::Ready(media), Some(handle)) if media.is_image() => image(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        _ => text(caption(cell, player)).into(),
    };

    cell_frame(cell.kind.title(), body)
}

/// Text shown for a cell that is not rendered as an image.
pub fn caption(cell: &ArtifactCell, player: Option<&ClockPlayer>) -> String {
    match &cell.state {
        CellState::Loading => LOADING_LABEL.to_owned(),
        CellState::Empty => IDLE_PROMPT.to_owned(),
        CellState::Ready(media) => match player {
            Some(player) if media.is_video() => {
                format!("{} | {}", media_label(media), playback_label(player))
            }
            _ => media_label(media),
        },
    }
}

fn media_label(media: &MediaView) -> String {
    format!("{} ({})", media.content_type, format_size(media.len()))
}

fn playback_label(player: &ClockPlayer) -> String {
    let state = if player.is_playing() { "playing" } else { "paused" };
    let mut label = format!("{state} {}", format_position(player.current_time()));
    if player.is_muted() {
        label.push_str(" muted");
    }
    if player.is_looping() {
        label.push_str(" loop");
    }
    label
}

pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes >= KIB * KIB {
        format!("{:.1} MB", bytes / (KIB * KIB))
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats seconds as `MM:SS.s`.
pub fn format_position(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    format!("{minutes:02}:{:02}.{}", rest / 10, rest % 10)
}

fn cell_frame<'a, Message>(title: &'a str, body: Element<'a, Message>) -> Element<'a, Message>
where
    Message: 'a,
{
    column![
        text(title).size(16),
        container(body)
            .center_x(Length::Fill)
            .center_y(Length::Fixed(CELL_HEIGHT))
            .width(Length::Fill),
    ]
    .spacing(8)
    .width(Length::FillPortion(1))
    .into()
}
