//! Host media playback capability.
//!
//! The transport controller never talks to an audio backend directly. It
//! drives a [`MediaPlayer`], which accepts a source, play/pause/seek and
//! volume requests, and reports back through [`MediaEvent`]s drained by the
//! application loop. Play requests resolve asynchronously: the outcome is
//! only observable on a later [`MediaPlayer::poll_events`] call.

mod null;
mod output;

pub use null::{AutoplayPolicy, NullMediaPlayer};
pub use output::RodioMediaPlayer;

use std::path::Path;
use thiserror::Error;

/// Identifies one play request so that late resolutions can be told apart
/// from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayTicket {
    pub request_id: u64,
    pub track_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayRequest {
    pub ticket: PlayTicket,
    /// Whether the user has interacted with the player before this request.
    pub user_gesture: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("no media source loaded")]
    NoSource,
    #[error("autoplay blocked until the user interacts")]
    AutoplayBlocked,
    #[error("playback refused by host policy")]
    Refused,
    #[error("failed to open media: {0}")]
    Media(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Source metadata is available; `None` when the duration is unknown.
    MetadataLoaded(Option<f64>),
    TimeUpdate(f64),
    Ended,
    PlayResolved {
        ticket: PlayTicket,
        outcome: Result<(), PlaybackError>,
    },
}

pub trait MediaPlayer {
    /// Replaces the current source. The player is left paused at zero.
    fn set_source(&mut self, source: &Path);
    /// Requests playback. The outcome arrives later as
    /// [`MediaEvent::PlayResolved`] carrying the request's ticket.
    fn play(&mut self, request: PlayRequest);
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// Length of the current source when the host already knows it.
    fn duration(&self) -> Option<f64>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn poll_events(&mut self) -> Vec<MediaEvent>;
    fn output_name(&self) -> String;
}

/// Filters a host-reported duration down to a usable, positive length.
pub(crate) fn known_duration(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|value| value.is_finite() && *value > 0.0)
}

#[cfg(test)]
mod tests {
    use super::known_duration;

    #[test]
    fn only_positive_finite_durations_are_known() {
        assert_eq!(known_duration(Some(12.5)), Some(12.5));
        assert_eq!(known_duration(Some(0.0)), None);
        assert_eq!(known_duration(Some(f64::NAN)), None);
        assert_eq!(known_duration(Some(f64::INFINITY)), None);
        assert_eq!(known_duration(None), None);
    }
}
