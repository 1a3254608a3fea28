//! Configuration file support for ani-tui.
//!
//! User preferences live in a TOML file loaded once at startup. Theme
//! colors are part of the config value; there is no hot reload. A default
//! file is written on first run so users have a template to edit.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// User configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Video player command (overrides bundled/platform default)
    #[serde(default)]
    pub player: Option<String>,

    /// Additional arguments to pass to the video player
    #[serde(default)]
    pub player_args: Vec<String>,

    /// Directory for downloads
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// UI colors
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Named colors for the UI, parsed by ratatui at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeConfig {
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default = "default_border")]
    pub border: String,
    #[serde(default = "default_highlight")]
    pub highlight: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            accent: default_accent(),
            border: default_border(),
            highlight: default_highlight(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_download_dir() -> String {
    ".".to_string()
}

fn default_accent() -> String {
    "magenta".to_string()
}

fn default_border() -> String {
    "cyan".to_string()
}

fn default_highlight() -> String {
    "yellow".to_string()
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self {
            player: None,
            player_args: Vec::new(),
            download_dir: default_download_dir(),
            theme: ThemeConfig::default(),
        }
    }

    /// Get the path to the config file,
    /// e.g. `~/.config/ani-tui/config.toml` on Linux.
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
            })?
            .join("ani-tui");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk. Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;

        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Write a default config file on first run so users have a template
    /// to edit. An existing file is never touched.
    pub fn create_default_if_missing() -> Result<()> {
        Self::write_default_if_missing(&Self::get_config_path()?)
    }

    fn write_default_if_missing(path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        Self::new().save_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_has_defaults() {
        let config = Config::new();
        assert!(config.player.is_none());
        assert!(config.player_args.is_empty());
        assert_eq!(config.download_dir, ".");
        assert_eq!(config.theme.accent, "magenta");
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            player = "vlc"
            player_args = ["--fullscreen"]
            download_dir = "/downloads"

            [theme]
            accent = "red"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.player.as_deref(), Some("vlc"));
        assert_eq!(config.player_args, vec!["--fullscreen"]);
        assert_eq!(config.download_dir, "/downloads");
        assert_eq!(config.theme.accent, "red");
        assert_eq!(config.theme.border, "cyan"); // default
    }

    #[test]
    fn test_config_partial_deserialization() {
        // Only specify some fields, rest should use defaults
        let toml_str = r#"
            download_dir = "/tmp"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.download_dir, "/tmp");
        assert!(config.player.is_none());
        assert_eq!(config.theme, ThemeConfig::default());
    }

    #[test]
    fn test_write_default_creates_file_once() {
        let path = std::env::temp_dir().join(format!(
            "ani-tui-config-test-{}/config.toml",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        Config::write_default_if_missing(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&written).unwrap();
        assert_eq!(parsed.download_dir, ".");

        // A second call must leave user edits alone.
        fs::write(&path, "download_dir = \"/media\"\n").unwrap();
        Config::write_default_if_missing(&path).unwrap();
        let kept: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(kept.download_dir, "/media");

        let _ = fs::remove_file(&path);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent);
        }
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::new();
        config.player = Some("mpv".to_string());
        config.theme.highlight = "green".to_string();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.player.as_deref(), Some("mpv"));
        assert_eq!(parsed.theme.highlight, "green");
    }
}
