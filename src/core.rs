use crate::audio::{MediaEvent, MediaPlayer};
use crate::cover::{COVER_COLUMNS, COVER_ROWS, CoverArt};
use crate::model::TrackDescriptor;
use crate::presence::PresenceDisplay;
use crate::transport::{KEYBOARD_SEEK_SECONDS, Transport, TransportState, VolumeSlider};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::path::PathBuf;

pub const VOLUME_STEP: i16 = 5;
pub const HELP_TEXT: &str =
    "Commands: play <n>, pause, next, prev, vol <0-100>, seek <m:ss|NN%>, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Controls,
    SeekBar,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeekArg {
    Seconds(f64),
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HubCommand {
    Help,
    /// 1-based playlist position; `None` resumes the current track.
    Play(Option<usize>),
    Pause,
    Next,
    Previous,
    Volume(u8),
    Seek(SeekArg),
    Quit,
}

impl HubCommand {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(String::from("Empty command"));
        };
        let arg = parts.next();

        match (name, arg) {
            ("help" | "h" | "?", _) => Ok(Self::Help),
            ("play" | "p", None) => Ok(Self::Play(None)),
            ("play" | "p", Some(raw)) => match raw.parse::<usize>() {
                Ok(number) if number >= 1 => Ok(Self::Play(Some(number))),
                _ => Err(format!("Invalid track number: {raw}")),
            },
            ("pause", _) => Ok(Self::Pause),
            ("next" | "n", _) => Ok(Self::Next),
            ("prev" | "previous", _) => Ok(Self::Previous),
            ("vol" | "volume", Some(raw)) => match raw.parse::<u8>() {
                Ok(value) if value <= VolumeSlider::MAX => Ok(Self::Volume(value)),
                _ => Err(format!("Volume must be 0-100, got {raw}")),
            },
            ("vol" | "volume", None) => Err(String::from("Usage: vol <0-100>")),
            ("seek", Some(raw)) => parse_seek_arg(raw)
                .map(Self::Seek)
                .ok_or_else(|| format!("Invalid seek position: {raw}")),
            ("seek", None) => Err(String::from("Usage: seek <m:ss|NN%>")),
            ("quit" | "q", _) => Ok(Self::Quit),
            (other, _) => Err(format!("Unknown command: {other}")),
        }
    }
}

fn parse_seek_arg(raw: &str) -> Option<SeekArg> {
    if let Some(percent) = raw.strip_suffix('%') {
        let value = percent.parse::<f64>().ok()?;
        return (value.is_finite() && (0.0..=100.0).contains(&value))
            .then_some(SeekArg::Percent(value));
    }

    if let Some((minutes, seconds)) = raw.split_once(':') {
        let minutes = minutes.parse::<u64>().ok()?;
        let seconds = seconds.parse::<u64>().ok()?;
        if seconds >= 60 {
            return None;
        }
        let total = minutes.checked_mul(60)?.checked_add(seconds)?;
        return Some(SeekArg::Seconds(total as f64));
    }

    let seconds = raw.parse::<f64>().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then_some(SeekArg::Seconds(seconds))
}

/// Everything the renderer observes, plus the user-facing operations that
/// mutate it.
pub struct HubCore {
    pub transport: Transport,
    pub volume: VolumeSlider,
    pub presence: PresenceDisplay,
    pub focus: Focus,
    pub status: String,
    pub dirty: bool,
    cover: Option<CoverArt>,
    cover_index: Option<usize>,
    default_cover: PathBuf,
    rng: SmallRng,
}

impl HubCore {
    pub fn new(tracks: Vec<TrackDescriptor>, volume: u8, default_cover: PathBuf) -> Self {
        Self {
            transport: Transport::new(tracks),
            volume: VolumeSlider::new(volume),
            presence: PresenceDisplay::NotConfigured,
            focus: Focus::Controls,
            status: String::from("Ready"),
            dirty: true,
            cover: None,
            cover_index: None,
            default_cover,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Applies the startup volume, loads the first track and optionally
    /// requests autoplay.
    pub fn start(&mut self, player: &mut dyn MediaPlayer, random_on_load: bool, autoplay: bool) {
        let value = self.volume.value();
        self.volume.set(value, player);

        if self.transport.is_empty() {
            self.set_status("No songs found");
            return;
        }

        let index = self.initial_index(random_on_load);
        self.transport.load_at(index as i64, player);
        if autoplay {
            self.transport.request_play(player);
        }
        self.after_transport_change();
    }

    pub fn initial_index(&mut self, random: bool) -> usize {
        let len = self.transport.tracks().len();
        if !random || len == 0 {
            return 0;
        }
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        order.first().copied().unwrap_or(0)
    }

    pub fn cover(&self) -> Option<&CoverArt> {
        self.cover.as_ref()
    }

    pub fn toggle_play(&mut self, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        self.transport.toggle_play(player);
        self.after_transport_change();
    }

    pub fn next(&mut self, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        self.transport.next(player);
        self.after_transport_change();
    }

    pub fn previous(&mut self, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        self.transport.previous(player);
        self.after_transport_change();
    }

    pub fn seek_fraction(&mut self, fraction: f64, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        self.transport.seek_to_fraction(fraction, player);
        self.dirty = true;
    }

    pub fn seek_step(&mut self, forward: bool, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        let delta = if forward {
            KEYBOARD_SEEK_SECONDS
        } else {
            -KEYBOARD_SEEK_SECONDS
        };
        self.transport.seek_by(delta, player);
        self.dirty = true;
    }

    pub fn adjust_volume(&mut self, delta: i16, player: &mut dyn MediaPlayer) {
        self.transport.note_user_interaction();
        self.volume.adjust(delta, player);
        self.set_status(&format!("Volume {}%", self.volume.value()));
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Controls => Focus::SeekBar,
            Focus::SeekBar => Focus::Controls,
        };
        self.dirty = true;
    }

    /// Runs a command-line command. Returns `true` when the app should quit.
    pub fn run_command(&mut self, command: HubCommand, player: &mut dyn MediaPlayer) -> bool {
        self.transport.note_user_interaction();
        match command {
            HubCommand::Help => self.set_status(HELP_TEXT),
            HubCommand::Play(None) => {
                self.transport.request_play(player);
                self.after_transport_change();
            }
            HubCommand::Play(Some(number)) => {
                let len = self.transport.tracks().len();
                if number > len {
                    self.set_status(&format!("No track {number} (playlist has {len})"));
                    return false;
                }
                self.transport.load_at(number as i64 - 1, player);
                self.transport.request_play(player);
                self.after_transport_change();
            }
            HubCommand::Pause => {
                self.transport.request_pause(player);
                self.after_transport_change();
            }
            HubCommand::Next => self.next(player),
            HubCommand::Previous => self.previous(player),
            HubCommand::Volume(value) => {
                self.volume.set(value, player);
                self.set_status(&format!("Volume {value}%"));
            }
            HubCommand::Seek(SeekArg::Percent(percent)) => {
                self.seek_fraction(percent / 100.0, player)
            }
            HubCommand::Seek(SeekArg::Seconds(seconds)) => {
                self.transport.seek_to_time(seconds, player);
                self.dirty = true;
            }
            HubCommand::Quit => return true,
        }
        false
    }

    pub fn handle_media_event(&mut self, event: MediaEvent, player: &mut dyn MediaPlayer) {
        self.transport.handle_event(event, player);
        self.after_transport_change();
    }

    pub fn set_presence(&mut self, presence: PresenceDisplay) {
        if self.presence != presence {
            self.presence = presence;
            self.dirty = true;
        }
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }

    fn after_transport_change(&mut self) {
        self.dirty = true;
        if self.transport.state() == TransportState::Idle {
            return;
        }

        let index = self.transport.current_index();
        if self.cover_index == Some(index) {
            return;
        }
        self.cover_index = Some(index);
        self.cover = self.transport.current_track().and_then(|track| {
            CoverArt::load_with_fallback(
                &track.cover_image,
                &self.default_cover,
                COVER_COLUMNS,
                COVER_ROWS,
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AutoplayPolicy, NullMediaPlayer};
    use proptest::prop_assert;
    use std::time::Duration;

    fn tracks(len: usize) -> Vec<TrackDescriptor> {
        (0..len)
            .map(|n| TrackDescriptor {
                title: format!("track {n}"),
                artist: String::from("artist"),
                media_source: PathBuf::from(format!("track_{n}.mp3")),
                cover_image: PathBuf::from(format!("cover_{n}.jpg")),
            })
            .collect()
    }

    fn pump(core: &mut HubCore, player: &mut NullMediaPlayer) {
        for event in player.poll_events() {
            core.handle_media_event(event, player);
        }
    }

    #[test]
    fn empty_playlist_reports_no_songs() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(Vec::new(), 10, PathBuf::from("default.jpg"));
        core.start(&mut player, true, true);

        assert_eq!(core.status, "No songs found");
        assert_eq!(core.transport.state(), TransportState::Idle);
        core.toggle_play(&mut player);
        assert_eq!(core.transport.state(), TransportState::Idle);
    }

    #[test]
    fn start_applies_volume_and_autoplays() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(tracks(3), 10, PathBuf::from("default.jpg"));
        core.start(&mut player, false, true);

        assert_eq!(player.volume(), 0.1);
        assert_eq!(core.transport.current_index(), 0);
        assert_eq!(core.transport.state(), TransportState::PendingPlay);
        pump(&mut core, &mut player);
        assert!(core.transport.is_playing());
    }

    #[test]
    fn blocked_autoplay_waits_for_the_user() {
        let mut player = NullMediaPlayer::new().with_policy(AutoplayPolicy::RequireGesture);
        let mut core = HubCore::new(tracks(2), 10, PathBuf::from("default.jpg"));
        core.start(&mut player, false, true);
        pump(&mut core, &mut player);
        assert_eq!(core.transport.state(), TransportState::LoadedPaused);
        assert_eq!(core.status, "Ready");

        core.toggle_play(&mut player);
        pump(&mut core, &mut player);
        assert!(core.transport.is_playing());
    }

    #[test]
    fn without_autoplay_start_is_paused() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(tracks(2), 40, PathBuf::from("default.jpg"));
        core.start(&mut player, false, false);
        pump(&mut core, &mut player);
        assert_eq!(core.transport.state(), TransportState::LoadedPaused);
        assert_eq!(player.volume(), 0.4);
    }

    #[test]
    fn command_parsing() {
        assert_eq!(HubCommand::parse("play 3"), Ok(HubCommand::Play(Some(3))));
        assert_eq!(HubCommand::parse("play"), Ok(HubCommand::Play(None)));
        assert!(HubCommand::parse("play 0").is_err());
        assert_eq!(HubCommand::parse("vol 55"), Ok(HubCommand::Volume(55)));
        assert!(HubCommand::parse("vol 101").is_err());
        assert_eq!(
            HubCommand::parse("seek 1:30"),
            Ok(HubCommand::Seek(SeekArg::Seconds(90.0)))
        );
        assert_eq!(
            HubCommand::parse("seek 25%"),
            Ok(HubCommand::Seek(SeekArg::Percent(25.0)))
        );
        assert!(HubCommand::parse("seek 1:75").is_err());
        assert!(HubCommand::parse("seek 307445734561825861:00").is_err());
        assert!(HubCommand::parse("seek").is_err());
        assert_eq!(HubCommand::parse("  next "), Ok(HubCommand::Next));
        assert!(HubCommand::parse("").is_err());
        assert!(HubCommand::parse("shuffle").is_err());
    }

    #[test]
    fn play_command_is_one_based() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(tracks(4), 10, PathBuf::from("default.jpg"));
        core.start(&mut player, false, false);

        assert!(!core.run_command(HubCommand::Play(Some(4)), &mut player));
        assert_eq!(core.transport.current_index(), 3);
        pump(&mut core, &mut player);
        assert!(core.transport.is_playing());

        core.run_command(HubCommand::Play(Some(9)), &mut player);
        assert_eq!(core.transport.current_index(), 3);
        assert!(core.status.starts_with("No track 9"));

        assert!(core.run_command(HubCommand::Quit, &mut player));
    }

    #[test]
    fn seek_commands_use_known_duration() {
        let mut player = NullMediaPlayer::new().with_fallback_duration(Duration::from_secs(200));
        let mut core = HubCore::new(tracks(1), 10, PathBuf::from("default.jpg"));
        core.start(&mut player, false, false);
        pump(&mut core, &mut player);

        core.run_command(HubCommand::Seek(SeekArg::Percent(25.0)), &mut player);
        assert_eq!(player.current_time(), 50.0);
        core.run_command(HubCommand::Seek(SeekArg::Seconds(500.0)), &mut player);
        assert_eq!(player.current_time(), 200.0);

        core.seek_step(false, &mut player);
        assert_eq!(player.current_time(), 195.0);
    }

    #[test]
    fn volume_keys_step_by_five() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(tracks(1), 10, PathBuf::from("default.jpg"));
        core.adjust_volume(VOLUME_STEP, &mut player);
        assert_eq!(core.volume.value(), 15);
        assert_eq!(core.status, "Volume 15%");
        assert!(core.transport.has_user_interacted());
    }

    #[test]
    fn focus_cycles_between_controls_and_seek_bar() {
        let mut core = HubCore::new(tracks(1), 10, PathBuf::from("default.jpg"));
        core.cycle_focus();
        assert_eq!(core.focus, Focus::SeekBar);
        core.cycle_focus();
        assert_eq!(core.focus, Focus::Controls);
    }

    #[test]
    fn identical_presence_updates_do_not_redraw() {
        let mut core = HubCore::new(tracks(1), 10, PathBuf::from("default.jpg"));
        core.dirty = false;
        core.set_presence(PresenceDisplay::NotConfigured);
        assert!(!core.dirty);
        core.set_presence(PresenceDisplay::Unavailable);
        assert!(core.dirty);
    }

    proptest::proptest! {
        #[test]
        fn random_initial_index_is_in_range(len in 1usize..64) {
            let mut core = HubCore::new(tracks(len), 10, PathBuf::from("default.jpg"));
            let index = core.initial_index(true);
            prop_assert!(index < len);
            proptest::prop_assert_eq!(core.initial_index(false), 0);
        }
    }
}
