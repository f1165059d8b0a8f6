//! Playlist transport controller.
//!
//! [`Transport`] owns the playlist, the current index and the transport state
//! machine. It drives a [`MediaPlayer`] host and reconciles the host's
//! asynchronous play resolutions against its own state: a resolution only
//! counts if the controller is still waiting on that exact request.

use crate::audio::{MediaEvent, MediaPlayer, PlayRequest, PlayTicket, PlaybackError, known_duration};
use crate::model::TrackDescriptor;
use tracing::debug;

pub const KEYBOARD_SEEK_SECONDS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No track loaded.
    Idle,
    LoadedPaused,
    LoadedPlaying,
    /// Play requested, awaiting the host's answer.
    PendingPlay,
}

/// Maps any integer into `[0, len)` using mathematical modulo.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(index.rem_euclid(len as i64) as usize)
}

/// Formats seconds as `m:ss`. Non-finite, negative and zero input give `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::from("0:00");
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Target time for a pointer at `fraction` of the seek bar's width.
pub fn seek_target(fraction: f64, duration: Option<f64>) -> Option<f64> {
    let duration = known_duration(duration)?;
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(fraction * duration)
}

pub fn keyboard_seek_target(current: f64, delta: f64, duration: Option<f64>) -> Option<f64> {
    let duration = known_duration(duration)?;
    let current = if current.is_finite() { current } else { 0.0 };
    Some((current + delta).clamp(0.0, duration))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: f64,
    pub duration: Option<f64>,
    pub percent: f64,
}

impl Progress {
    pub const ZERO: Self = Self {
        elapsed: 0.0,
        duration: None,
        percent: 0.0,
    };

    pub fn at(elapsed: f64, duration: Option<f64>) -> Self {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let divisor = known_duration(duration).unwrap_or(1.0);
        Self {
            elapsed,
            duration,
            percent: elapsed / divisor * 100.0,
        }
    }

    pub fn elapsed_label(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn duration_label(&self) -> String {
        format_time(self.duration.unwrap_or(0.0))
    }

    /// Fill ratio for a progress gauge.
    pub fn ratio(&self) -> f64 {
        (self.percent / 100.0).clamp(0.0, 1.0)
    }

    /// Whole-number percentage, as announced by the seek bar.
    pub fn value_now(&self) -> u8 {
        self.percent.clamp(0.0, 100.0).floor() as u8
    }
}

/// Linear volume slider in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSlider {
    value: u8,
}

impl VolumeSlider {
    pub const DEFAULT: u8 = 10;
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Self {
        Self {
            value: value.min(Self::MAX),
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn volume(&self) -> f32 {
        f32::from(self.value) / 100.0
    }

    pub fn set(&mut self, value: u8, player: &mut dyn MediaPlayer) {
        self.value = value.min(Self::MAX);
        player.set_volume(self.volume());
    }

    pub fn adjust(&mut self, delta: i16, player: &mut dyn MediaPlayer) {
        let next = (i16::from(self.value) + delta).clamp(0, i16::from(Self::MAX));
        self.set(next as u8, player);
    }
}

impl Default for VolumeSlider {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

#[derive(Debug)]
pub struct Transport {
    tracks: Vec<TrackDescriptor>,
    current_index: usize,
    state: TransportState,
    pending: Option<PlayTicket>,
    next_request_id: u64,
    has_user_interacted: bool,
    progress: Progress,
}

impl Transport {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            tracks,
            current_index: 0,
            state: TransportState::Idle,
            pending: None,
            next_request_id: 0,
            has_user_interacted: false,
            progress: Progress::ZERO,
        }
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::LoadedPlaying
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&TrackDescriptor> {
        if self.state == TransportState::Idle {
            return None;
        }
        self.tracks.get(self.current_index)
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn has_user_interacted(&self) -> bool {
        self.has_user_interacted
    }

    pub fn note_user_interaction(&mut self) {
        self.has_user_interacted = true;
    }

    /// Loads the track at `index` (wrapped into range), stopping playback and
    /// clearing progress. Returns `false` for an empty playlist.
    pub fn load_at(&mut self, index: i64, player: &mut dyn MediaPlayer) -> bool {
        let Some(index) = normalize_index(index, self.tracks.len()) else {
            return false;
        };

        self.current_index = index;
        self.state = TransportState::LoadedPaused;
        self.pending = None;
        self.progress = Progress::ZERO;
        player.set_source(&self.tracks[index].media_source);
        debug!("loaded track {index}");
        true
    }

    pub fn request_play(&mut self, player: &mut dyn MediaPlayer) {
        if !matches!(
            self.state,
            TransportState::LoadedPaused | TransportState::PendingPlay
        ) {
            return;
        }

        self.next_request_id += 1;
        let ticket = PlayTicket {
            request_id: self.next_request_id,
            track_index: self.current_index,
        };
        self.state = TransportState::PendingPlay;
        self.pending = Some(ticket);
        player.play(PlayRequest {
            ticket,
            user_gesture: self.has_user_interacted,
        });
    }

    pub fn request_pause(&mut self, player: &mut dyn MediaPlayer) {
        if !matches!(
            self.state,
            TransportState::LoadedPlaying | TransportState::PendingPlay
        ) {
            return;
        }

        player.pause();
        self.state = TransportState::LoadedPaused;
        self.pending = None;
    }

    pub fn toggle_play(&mut self, player: &mut dyn MediaPlayer) {
        match self.state {
            TransportState::Idle => {}
            TransportState::LoadedPlaying | TransportState::PendingPlay => {
                self.request_pause(player)
            }
            TransportState::LoadedPaused => self.request_play(player),
        }
    }

    pub fn next(&mut self, player: &mut dyn MediaPlayer) {
        self.step(1, player);
    }

    pub fn previous(&mut self, player: &mut dyn MediaPlayer) {
        self.step(-1, player);
    }

    fn step(&mut self, delta: i64, player: &mut dyn MediaPlayer) {
        let was_playing = self.is_playing();
        if self.load_at(self.current_index as i64 + delta, player) && was_playing {
            self.request_play(player);
        }
    }

    /// Seeks to `fraction` of the track. No-op until the duration is known.
    pub fn seek_to_fraction(&mut self, fraction: f64, player: &mut dyn MediaPlayer) {
        if self.state == TransportState::Idle {
            return;
        }
        if let Some(target) = seek_target(fraction, self.known_length(player)) {
            self.seek_to(target, player);
        }
    }

    pub fn seek_by(&mut self, delta: f64, player: &mut dyn MediaPlayer) {
        if self.state == TransportState::Idle {
            return;
        }
        let current = player.current_time();
        if let Some(target) = keyboard_seek_target(current, delta, self.known_length(player)) {
            self.seek_to(target, player);
        }
    }

    /// Seeks to an absolute time, clamped to the known duration.
    pub fn seek_to_time(&mut self, seconds: f64, player: &mut dyn MediaPlayer) {
        if self.state == TransportState::Idle {
            return;
        }
        if let Some(target) = keyboard_seek_target(0.0, seconds, self.known_length(player)) {
            self.seek_to(target, player);
        }
    }

    fn known_length(&self, player: &dyn MediaPlayer) -> Option<f64> {
        self.progress.duration.or_else(|| player.duration())
    }

    fn seek_to(&mut self, target: f64, player: &mut dyn MediaPlayer) {
        player.set_current_time(target);
        self.progress = Progress::at(target, self.progress.duration);
    }

    pub fn handle_event(&mut self, event: MediaEvent, player: &mut dyn MediaPlayer) {
        match event {
            MediaEvent::MetadataLoaded(duration) => {
                if self.state != TransportState::Idle {
                    self.progress = Progress::at(self.progress.elapsed, known_duration(duration));
                }
            }
            MediaEvent::TimeUpdate(current) => {
                if self.state != TransportState::Idle {
                    self.progress = Progress::at(current, self.progress.duration);
                }
            }
            MediaEvent::Ended => self.on_ended(player),
            MediaEvent::PlayResolved { ticket, outcome } => {
                self.on_play_resolved(ticket, outcome, player)
            }
        }
    }

    fn on_ended(&mut self, player: &mut dyn MediaPlayer) {
        if self.state == TransportState::Idle {
            return;
        }
        if self.load_at(self.current_index as i64 + 1, player) {
            self.request_play(player);
        }
    }

    fn on_play_resolved(
        &mut self,
        ticket: PlayTicket,
        outcome: Result<(), PlaybackError>,
        player: &mut dyn MediaPlayer,
    ) {
        let current = self.state == TransportState::PendingPlay && self.pending == Some(ticket);
        if !current {
            debug!(?ticket, "ignoring stale play resolution");
            if outcome.is_ok()
                && matches!(
                    self.state,
                    TransportState::LoadedPaused | TransportState::Idle
                )
            {
                player.pause();
            }
            return;
        }

        self.pending = None;
        match outcome {
            Ok(()) => self.state = TransportState::LoadedPlaying,
            Err(err) => {
                debug!("play request rejected: {err}");
                player.pause();
                self.state = TransportState::LoadedPaused;
            }
        }
    }
}
