use std::time::Duration;

use engine::{PlaybackRejected, VideoElement};

/// Clock-driven stand-in for a rendered video element.
///
/// Tracks position and play state only; frames are not decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockPlayer {
    position: f64,
    playing: bool,
    muted: bool,
    looping: bool,
    duration: Option<f64>,
    has_media: bool,
}

impl ClockPlayer {
    /// Player for the input video: autoplays muted and loops.
    pub fn primary(has_media: bool) -> Self {
        Self {
            position: 0.0,
            playing: has_media,
            muted: true,
            looping: true,
            duration: None,
            has_media,
        }
    }

    /// Player for a derived video. Secondaries never drive the primary.
    pub fn secondary(has_media: bool, start_at: f64, playing: bool) -> Self {
        Self {
            position: start_at.max(0.0),
            playing: playing && has_media,
            muted: true,
            looping: true,
            duration: None,
            has_media,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = (seconds > 0.0).then_some(seconds);
        self
    }

    pub fn has_media(&self) -> bool {
        self.has_media
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Advances the clock by `elapsed` while playing.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }
        self.position += elapsed.as_secs_f64();
        let Some(duration) = self.duration else {
            return;
        };
        if self.position >= duration {
            if self.looping {
                self.position %= duration;
            } else {
                self.position = duration;
                self.playing = false;
            }
        }
    }
}

impl VideoElement for ClockPlayer {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn play(&mut self) -> Result<(), PlaybackRejected> {
        if !self.has_media {
            return Err(PlaybackRejected {
                reason: "no media loaded".to_owned(),
            });
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, position: f64) {
        let upper = self.duration.unwrap_or(f64::MAX);
        self.position = position.clamp(0.0, upper);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use engine::VideoElement;

    use super::ClockPlayer;

    #[test]
    fn advance_moves_only_while_playing() {
        let mut player = ClockPlayer::primary(true);
        player.advance(Duration::from_millis(500));
        assert!((player.current_time() - 0.5).abs() < 1e-9);

        player.pause();
        player.advance(Duration::from_secs(1));
        assert!((player.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn looping_player_wraps_at_duration() {
        let mut player = ClockPlayer::secondary(true, 1.5, true).with_duration(2.0);

        player.advance(Duration::from_secs(1));

        assert!((player.current_time() - 0.5).abs() < 1e-9);
        assert!(player.is_playing());
        assert!(player.is_muted());
    }

    #[test]
    fn play_without_media_is_rejected() {
        let mut player = ClockPlayer::secondary(false, 0.0, true);

        assert!(!player.is_playing());
        assert!(player.play().is_err());
    }

    #[test]
    fn seek_clamps_to_known_duration() {
        let mut player = ClockPlayer::primary(true).with_duration(3.0);

        player.seek(10.0);
        assert_eq!(player.current_time(), 3.0);
        player.seek(-1.0);
        assert_eq!(player.current_time(), 0.0);
    }
}
