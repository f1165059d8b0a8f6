use super::{MediaEvent, MediaPlayer, PlayRequest, PlaybackError, known_duration};
use rodio::{Decoder, Source};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How the null host answers play requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    #[default]
    Allow,
    /// Refuse requests made before the user has interacted.
    RequireGesture,
    Deny,
}

/// A silent media host driven by a logical clock.
///
/// Used when no output device can be opened, and as the host in tests where
/// [`NullMediaPlayer::advance`] moves the clock deterministically.
pub struct NullMediaPlayer {
    paused: bool,
    current: Option<PathBuf>,
    volume: f32,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    fallback_duration: Option<Duration>,
    policy: AutoplayPolicy,
    ended_reported: bool,
    pending: VecDeque<MediaEvent>,
}

impl NullMediaPlayer {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            volume: 1.0,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            fallback_duration: None,
            policy: AutoplayPolicy::Allow,
            ended_reported: false,
            pending: VecDeque::new(),
        }
    }

    pub fn with_policy(mut self, policy: AutoplayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Duration reported for sources that cannot be probed.
    pub fn with_fallback_duration(mut self, duration: Duration) -> Self {
        self.fallback_duration = Some(duration);
        self
    }

    pub fn set_policy(&mut self, policy: AutoplayPolicy) {
        self.policy = policy;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_source(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Moves the logical clock forward as if `by` had been played.
    pub fn advance(&mut self, by: Duration) {
        if self.paused || self.current.is_none() {
            return;
        }
        self.position_offset = self.position_offset.saturating_add(by);
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }
}

impl Default for NullMediaPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayer for NullMediaPlayer {
    fn set_source(&mut self, source: &Path) {
        self.paused = true;
        self.current = Some(source.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.ended_reported = false;
        self.track_duration = Self::estimate_duration(source).or(self.fallback_duration);
        if let Some(duration) = self.track_duration {
            self.pending
                .push_back(MediaEvent::MetadataLoaded(Some(duration.as_secs_f64())));
        }
    }

    fn play(&mut self, request: PlayRequest) {
        let outcome = if self.current.is_none() {
            Err(PlaybackError::NoSource)
        } else {
            match self.policy {
                AutoplayPolicy::Allow => Ok(()),
                AutoplayPolicy::RequireGesture if request.user_gesture => Ok(()),
                AutoplayPolicy::RequireGesture => Err(PlaybackError::AutoplayBlocked),
                AutoplayPolicy::Deny => Err(PlaybackError::Refused),
            }
        };

        if outcome.is_ok() && self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
        self.pending.push_back(MediaEvent::PlayResolved {
            ticket: request.ticket,
            outcome,
        });
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn current_time(&self) -> f64 {
        self.current_position().as_secs_f64()
    }

    fn set_current_time(&mut self, seconds: f64) {
        if self.current.is_none() || !seconds.is_finite() {
            return;
        }
        let position = Duration::from_secs_f64(seconds.max(0.0));
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        self.ended_reported = false;
    }

    fn duration(&self) -> Option<f64> {
        known_duration(self.track_duration.map(|d| d.as_secs_f64()))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events: Vec<MediaEvent> = self.pending.drain(..).collect();
        if self.current.is_none() || self.paused {
            return events;
        }

        events.push(MediaEvent::TimeUpdate(self.current_time()));
        if self.is_finished() && !self.ended_reported {
            self.ended_reported = true;
            self.pause();
            events.push(MediaEvent::Ended);
        }
        events
    }

    fn output_name(&self) -> String {
        String::from("Null audio output")
    }
}
