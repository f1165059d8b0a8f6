use crate::model::HubConfig;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "linkhub";
const CONFIG_FILE: &str = "linkhub.json";
const LOG_FILE: &str = "linkhub.log";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("LINKHUB_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

/// Reads the config file at `path`, or the defaults when it does not exist.
pub fn load_config_from(path: &Path) -> Result<HubConfig> {
    if !path.exists() {
        return Ok(HubConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: HubConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Directory relative media paths resolve against when `media_root` is unset.
pub fn media_base_for(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn written_config_loads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);

        let config = HubConfig {
            presence_id: String::from("1234"),
            autoplay: false,
            initial_volume: 35,
            ..HubConfig::default()
        };
        let json = serde_json::to_string_pretty(&config).expect("serialize");
        fs::write(&path, json).expect("write");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_config_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, HubConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").expect("write");
        let err = load_config_from(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn media_base_is_config_directory() {
        assert_eq!(
            media_base_for(Path::new("/etc/linkhub/linkhub.json")),
            PathBuf::from("/etc/linkhub")
        );
        assert_eq!(media_base_for(Path::new("linkhub.json")), PathBuf::from("."));
    }
}
