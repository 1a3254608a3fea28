//! Watch history tracking for ani-tui.
//!
//! Persists the last watched episode per anime as a flat JSON map so the
//! episode list can highlight it and offer a resume shortcut. The store is
//! write-through: every mark rewrites the whole file immediately.

use crate::error::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The remembered progress for a single anime. Only the most recent
/// episode is retained; marks overwrite, never merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    /// Last watched episode display number, as a string ("12", "12.5").
    pub episode: String,
    /// Display title of the anime.
    pub title: String,
    /// Unix timestamp of the last update.
    pub timestamp: u64,
}

/// Watch history: anime id -> last-watched entry.
#[derive(Debug, Clone, Default)]
pub struct WatchHistory {
    entries: HashMap<String, WatchEntry>,
    path: PathBuf,
}

impl WatchHistory {
    /// Create an empty in-memory history backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            entries: HashMap::new(),
            path,
        }
    }

    /// The default history file location,
    /// e.g. `~/.local/share/ani-tui/history.json` on Linux.
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find data directory")
            })?
            .join("ani-tui");
        Ok(data_dir.join("history.json"))
    }

    /// Load history from `path`. A missing or corrupt file degrades to an
    /// empty history rather than failing; a corrupt file is logged.
    pub fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("History file {} is corrupt ({}), starting empty", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { entries, path }
    }

    /// Record the last watched episode for an anime, overwriting any prior
    /// entry, and persist the full map immediately.
    pub fn mark_watched(&mut self, anime_id: &str, episode: &str, title: &str) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.entries.insert(
            anime_id.to_string(),
            WatchEntry {
                episode: episode.to_string(),
                title: title.to_string(),
                timestamp,
            },
        );
        self.save()
    }

    /// The stored episode display-number for an anime, if any.
    pub fn get_last_watched(&self, anime_id: &str) -> Option<&str> {
        self.entries.get(anime_id).map(|e| e.episode.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_history_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ani-tui-test-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = WatchHistory::new(temp_history_path("empty"));
        assert!(history.is_empty());
        assert!(history.get_last_watched("anything").is_none());
    }

    #[test]
    fn test_mark_watched_overwrites() {
        let path = temp_history_path("overwrite");
        let mut history = WatchHistory::new(path.clone());

        history.mark_watched("a1", "5", "Test Show").unwrap();
        history.mark_watched("a1", "6", "Test Show").unwrap();

        // only the latest episode is retrievable
        assert_eq!(history.get_last_watched("a1"), Some("6"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_history_persists_across_reload() {
        let path = temp_history_path("reload");
        let mut history = WatchHistory::new(path.clone());
        history.mark_watched("a2", "12.5", "Fractional").unwrap();

        let reloaded = WatchHistory::load(path.clone());
        assert_eq!(reloaded.get_last_watched("a2"), Some("12.5"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let history = WatchHistory::load(temp_history_path("does-not-exist"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let path = temp_history_path("corrupt");
        fs::write(&path, "{not valid json").unwrap();

        let history = WatchHistory::load(path.clone());
        assert!(history.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_entries_are_per_anime() {
        let path = temp_history_path("per-anime");
        let mut history = WatchHistory::new(path.clone());
        history.mark_watched("a1", "3", "One").unwrap();
        history.mark_watched("a2", "9", "Two").unwrap();

        assert_eq!(history.get_last_watched("a1"), Some("3"));
        assert_eq!(history.get_last_watched("a2"), Some("9"));
        let _ = fs::remove_file(path);
    }
}
