use crate::model::{PresenceSnapshot, PresenceStatus};
use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use ureq::Agent;

const LANYARD_USERS_URL: &str = "https://api.lanyard.rest/v1/users";
const AVATAR_CDN_URL: &str = "https://cdn.discordapp.com/avatars";
pub const FALLBACK_AVATAR: &str = "assets/icons/discord.svg";
pub const NOT_CONFIGURED_TEXT: &str = "Add your Discord ID to linkhub.json";
pub const UNAVAILABLE_TEXT: &str = "Unavailable";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("presence request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("presence response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("presence service rejected the lookup")]
    Rejected,
}

pub trait PresenceSource: Send + 'static {
    fn fetch_status(&self, id: &str) -> Result<PresenceSnapshot, PresenceError>;
}

/// What the presence card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceDisplay {
    NotConfigured,
    /// Configured, first answer not in yet.
    Pending,
    Available(PresenceSnapshot),
    Unavailable,
}

impl PresenceDisplay {
    pub fn from_result(result: Result<PresenceSnapshot, PresenceError>) -> Self {
        match result {
            Ok(snapshot) => Self::Available(snapshot),
            Err(err) => {
                warn!("presence lookup failed: {err}");
                Self::Unavailable
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::NotConfigured => NOT_CONFIGURED_TEXT,
            Self::Pending => "Loading…",
            Self::Available(snapshot) => &snapshot.display_name,
            Self::Unavailable => UNAVAILABLE_TEXT,
        }
    }

    pub fn activity(&self) -> &str {
        match self {
            Self::Available(snapshot) => &snapshot.activity_text,
            _ => "",
        }
    }

    pub fn status(&self) -> PresenceStatus {
        match self {
            Self::Available(snapshot) => snapshot.status,
            _ => PresenceStatus::Offline,
        }
    }

    pub fn avatar_uri(&self) -> &str {
        match self {
            Self::Available(snapshot) => &snapshot.avatar_uri,
            _ => FALLBACK_AVATAR,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LanyardEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<LanyardPresence>,
}

#[derive(Debug, Default, Deserialize)]
struct LanyardPresence {
    #[serde(default)]
    discord_user: Option<LanyardUser>,
    #[serde(default)]
    discord_status: Option<String>,
    #[serde(default)]
    activities: Vec<LanyardActivity>,
    #[serde(default)]
    listening_to_spotify: bool,
    #[serde(default)]
    spotify: Option<LanyardSpotify>,
}

#[derive(Debug, Default, Deserialize)]
struct LanyardUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    discriminator: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LanyardActivity {
    #[serde(default, rename = "type")]
    kind: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LanyardSpotify {
    #[serde(default)]
    song: String,
    #[serde(default)]
    artist: String,
}

pub fn parse_lanyard_response(id: &str, body: &str) -> Result<PresenceSnapshot, PresenceError> {
    let envelope: LanyardEnvelope = serde_json::from_str(body)?;
    match envelope.data {
        Some(data) if envelope.success => Ok(summarize(id, &data)),
        _ => Err(PresenceError::Rejected),
    }
}

fn summarize(id: &str, data: &LanyardPresence) -> PresenceSnapshot {
    let user = data.discord_user.as_ref();
    let username = user
        .and_then(|user| non_empty(user.username.as_deref()))
        .unwrap_or("Unknown");
    let display_name = match user.and_then(|user| non_empty(user.discriminator.as_deref())) {
        Some(discriminator) if discriminator != "0" => format!("{username}#{discriminator}"),
        _ => username.to_string(),
    };

    let avatar_uri = match user.and_then(|user| non_empty(user.avatar.as_deref())) {
        Some(hash) => format!("{AVATAR_CDN_URL}/{id}/{hash}.png?size=128"),
        None => FALLBACK_AVATAR.to_string(),
    };

    let raw_status = non_empty(data.discord_status.as_deref()).unwrap_or("offline");
    let status = PresenceStatus::parse(raw_status);

    PresenceSnapshot {
        display_name,
        status,
        activity_text: activity_text(data, status),
        avatar_uri,
    }
}

fn activity_text(data: &LanyardPresence, status: PresenceStatus) -> String {
    if data.activities.is_empty() {
        return status.label().to_string();
    }

    if data.listening_to_spotify
        && let Some(spotify) = &data.spotify
    {
        return format!("{} — {}", spotify.song, spotify.artist);
    }

    let activity = data
        .activities
        .iter()
        .find(|activity| activity.kind == 0 || activity.kind == 4)
        .or_else(|| data.activities.first());
    let Some(activity) = activity else {
        return status.label().to_string();
    };

    let name = non_empty(activity.name.as_deref());
    match (name, non_empty(activity.details.as_deref())) {
        (_, Some(details)) => format!("{} • {details}", name.unwrap_or_default()),
        (Some(name), None) => name.to_string(),
        (None, None) => status.label().to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Looks users up on the Lanyard REST API.
pub struct LanyardClient {
    agent: Agent,
}

impl LanyardClient {
    pub fn new() -> Self {
        Self {
            agent: Agent::config_builder()
                .timeout_global(Some(REQUEST_TIMEOUT))
                .build()
                .into(),
        }
    }
}

impl Default for LanyardClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceSource for LanyardClient {
    fn fetch_status(&self, id: &str) -> Result<PresenceSnapshot, PresenceError> {
        let url = format!("{LANYARD_USERS_URL}/{id}");
        let mut response = self.agent.get(&url).call()?;
        let body = response.body_mut().read_to_string()?;
        parse_lanyard_response(id, &body)
    }
}

enum PollerCommand {
    Shutdown,
}

/// Background thread fetching presence on a fixed interval.
///
/// The first lookup runs immediately. Every finished lookup is sent as a
/// [`PresenceDisplay`]; the latest one received is the one to show.
pub struct PresencePoller {
    cmd_tx: Sender<PollerCommand>,
    update_rx: Receiver<PresenceDisplay>,
}

impl PresencePoller {
    pub fn start(source: impl PresenceSource, id: String, interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (update_tx, update_rx) = mpsc::channel();
        let interval = interval.max(Duration::from_secs(1));

        thread::spawn(move || poll_loop(source, id, interval, cmd_rx, update_tx));

        Self { cmd_tx, update_rx }
    }

    /// Drains pending updates and returns the newest.
    pub fn latest(&self) -> Option<PresenceDisplay> {
        self.update_rx.try_iter().last()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(PollerCommand::Shutdown);
    }
}

impl Drop for PresencePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(
    source: impl PresenceSource,
    id: String,
    interval: Duration,
    cmd_rx: Receiver<PollerCommand>,
    update_tx: Sender<PresenceDisplay>,
) {
    loop {
        let display = PresenceDisplay::from_result(source.fetch_status(&id));
        if update_tx.send(display).is_err() {
            return;
        }

        match cmd_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(PollerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                debug!("presence poller stopped");
                return;
            }
        }
    }
}
