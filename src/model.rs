use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PLACEHOLDER_PRESENCE_ID: &str = "YOUR_DISCORD_ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub media_source: PathBuf,
    pub cover_image: PathBuf,
}

impl TrackDescriptor {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Unknown"
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(rename = "src")]
    pub media_source: PathBuf,
    #[serde(rename = "cover", default)]
    pub cover_image: Option<PathBuf>,
}

impl TrackEntry {
    fn sample(title: &str, artist: &str, n: u8) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            media_source: PathBuf::from(format!("assets/songs/song{n}.mp3")),
            cover_image: Some(PathBuf::from(format!("assets/covers/song{n}.jpg"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    #[serde(default)]
    pub presence_id: String,
    #[serde(default = "default_true")]
    pub random_on_load: bool,
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default = "default_presence_poll_seconds")]
    pub presence_poll_seconds: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
    #[serde(default)]
    pub media_root: Option<PathBuf>,
    #[serde(default = "default_cover")]
    pub default_cover: PathBuf,
    #[serde(default = "default_tracks")]
    pub tracks: Vec<TrackEntry>,
}

fn default_true() -> bool {
    true
}

fn default_presence_poll_seconds() -> u64 {
    20
}

fn default_initial_volume() -> u8 {
    10
}

fn default_cover() -> PathBuf {
    PathBuf::from("assets/covers/song1.jpg")
}

fn default_tracks() -> Vec<TrackEntry> {
    vec![
        TrackEntry::sample("Come As You Are", "Nirvana", 1),
        TrackEntry::sample("All Apologies", "Nirvana", 2),
        TrackEntry::sample("Come Together", "The Beatles", 3),
        TrackEntry::sample("Buddy Holly", "Weezer", 4),
        TrackEntry::sample("Piano Man", "Billy Joel", 5),
    ]
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            presence_id: String::new(),
            random_on_load: default_true(),
            autoplay: default_true(),
            presence_poll_seconds: default_presence_poll_seconds(),
            initial_volume: default_initial_volume(),
            media_root: None,
            default_cover: default_cover(),
            tracks: default_tracks(),
        }
    }
}

impl HubConfig {
    /// Presence lookups are only attempted for a real, non-placeholder id.
    pub fn presence_id(&self) -> Option<&str> {
        let id = self.presence_id.trim();
        (!id.is_empty() && id != PLACEHOLDER_PRESENCE_ID).then_some(id)
    }

    pub fn playlist(&self, fallback_root: &Path) -> Vec<TrackDescriptor> {
        let root = self.media_root.as_deref().unwrap_or(fallback_root);
        self.tracks
            .iter()
            .map(|entry| TrackDescriptor {
                title: entry.title.clone(),
                artist: entry.artist.clone(),
                media_source: resolve(root, &entry.media_source),
                cover_image: resolve(
                    root,
                    entry.cover_image.as_deref().unwrap_or(&self.default_cover),
                ),
            })
            .collect()
    }

    pub fn default_cover_path(&self, fallback_root: &Path) -> PathBuf {
        let root = self.media_root.as_deref().unwrap_or(fallback_root);
        resolve(root, &self.default_cover)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
}

impl PresenceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" => Self::Dnd,
            _ => Self::Offline,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub display_name: String,
    pub status: PresenceStatus,
    pub activity_text: String,
    pub avatar_uri: String,
}
