use super::{MediaEvent, MediaPlayer, PlayRequest, PlaybackError, known_duration};
use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Plays sources through the system output device.
pub struct RodioMediaPlayer {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    load_error: Option<PlaybackError>,
    track_duration: Option<Duration>,
    volume: f32,
    playing: bool,
    pending: VecDeque<MediaEvent>,
    last_time_update: Option<Instant>,
}

impl RodioMediaPlayer {
    pub fn new() -> Result<Self> {
        let stream = open_output_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        Ok(Self {
            stream,
            sink,
            current: None,
            load_error: None,
            track_duration: None,
            volume: 1.0,
            playing: false,
            pending: VecDeque::new(),
            last_time_update: None,
        })
    }

    fn open_source(&mut self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = source.total_duration().filter(|d| !d.is_zero());
        self.sink.append(source);
        Ok(())
    }
}

impl MediaPlayer for RodioMediaPlayer {
    fn set_source(&mut self, source: &Path) {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.sink.set_volume(self.volume);
        self.current = Some(source.to_path_buf());
        self.track_duration = None;
        self.load_error = None;
        self.playing = false;
        self.last_time_update = None;

        match self.open_source(source) {
            Ok(()) => {
                let duration = self.track_duration.map(|d| d.as_secs_f64());
                self.pending.push_back(MediaEvent::MetadataLoaded(duration));
            }
            Err(err) => {
                debug!("source {} is unplayable: {err:#}", source.display());
                self.load_error = Some(PlaybackError::Media(format!("{err:#}")));
            }
        }
    }

    fn play(&mut self, request: PlayRequest) {
        let outcome = if self.current.is_none() {
            Err(PlaybackError::NoSource)
        } else if let Some(err) = self.load_error.clone() {
            Err(err)
        } else {
            self.sink.play();
            self.playing = true;
            Ok(())
        };
        self.pending.push_back(MediaEvent::PlayResolved {
            ticket: request.ticket,
            outcome,
        });
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.playing = false;
    }

    fn current_time(&self) -> f64 {
        if self.current.is_none() {
            return 0.0;
        }
        self.sink.get_pos().as_secs_f64()
    }

    fn set_current_time(&mut self, seconds: f64) {
        if self.current.is_none() || self.load_error.is_some() || !seconds.is_finite() {
            return;
        }
        let target = Duration::from_secs_f64(seconds.max(0.0));
        if let Err(err) = self.sink.try_seek(target) {
            debug!("seek to {seconds:.1}s failed: {err:?}");
        }
        self.last_time_update = None;
    }

    fn duration(&self) -> Option<f64> {
        known_duration(self.track_duration.map(|d| d.as_secs_f64()))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events: Vec<MediaEvent> = self.pending.drain(..).collect();
        if !self.playing {
            return events;
        }

        if self.sink.empty() {
            self.playing = false;
            events.push(MediaEvent::TimeUpdate(self.current_time()));
            events.push(MediaEvent::Ended);
            return events;
        }

        let due = self
            .last_time_update
            .is_none_or(|last| last.elapsed() >= TIME_UPDATE_INTERVAL);
        if due {
            self.last_time_update = Some(Instant::now());
            events.push(MediaEvent::TimeUpdate(self.current_time()));
        }
        events
    }

    fn output_name(&self) -> String {
        String::from("System default output")
    }
}

fn open_output_stream() -> Result<OutputStream> {
    let mut stream = with_silenced_stderr(|| {
        match OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            }) {
            Ok(stream) => Ok(stream),
            Err(default_err) => {
                let host = rodio::cpal::default_host();
                let mut candidates: Vec<String> = host
                    .output_devices()
                    .ok()
                    .into_iter()
                    .flatten()
                    .filter_map(|device| device.name().ok())
                    .collect();
                candidates.sort_by_cached_key(|name| {
                    let lower = name.to_ascii_lowercase();
                    let rank = if lower.contains("pulse") {
                        0_u8
                    } else if lower.contains("pipewire") {
                        1_u8
                    } else if lower.contains("default") {
                        2_u8
                    } else {
                        3_u8
                    };
                    (rank, lower)
                });
                candidates.dedup();

                for candidate in candidates {
                    let Some(device) = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .find(|entry| entry.name().ok().as_deref() == Some(candidate.as_str()))
                    else {
                        continue;
                    };
                    let opened = OutputStreamBuilder::from_device(device)
                        .context("failed to open fallback output device")
                        .and_then(|builder| {
                            builder
                                .with_error_callback(|_| {})
                                .open_stream_or_fallback()
                                .context("failed to start fallback output stream")
                        });
                    if let Ok(stream) = opened {
                        return Ok(stream);
                    }
                }

                Err(anyhow::anyhow!(
                    "unable to start any audio output stream after default failed: {default_err:#}"
                ))
            }
        }
    })?;
    stream.log_on_drop(false);
    Ok(stream)
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}
