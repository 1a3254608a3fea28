//! Type definitions for the ani-tui application.
//!
//! This module contains all the core data structures used throughout the
//! application for representing catalog entries, episodes, quality options
//! and per-episode server maps.

use std::collections::HashMap;
use std::fmt;

/// A single anime entry as shown on the search results screen.
///
/// All numeric-looking fields are kept string-typed because the catalog
/// returns them as display strings with an `"N/A"` sentinel for absent
/// values. An empty `id` marks a record sourced from the aggregator feed
/// that has not been resolved against the primary catalog yet.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimeResult {
    /// Primary catalog identifier. Empty for unresolved aggregator records.
    pub id: String,
    /// English title.
    pub title_en: String,
    /// Native (Japanese) title.
    pub title_jp: String,
    /// Media type, e.g. "TV", "Movie".
    pub kind: String,
    /// Episode count as a display string ("12", "?", "N/A").
    pub episodes: String,
    /// Airing status.
    pub status: String,
    /// Genre list as a single display string.
    pub genres: String,
    /// MyAnimeList id as a string, "0" when unknown.
    pub mal_id: String,
    /// Score out of 10, or "N/A".
    pub score: String,
    /// Rank, or "N/A".
    pub rank: String,
    /// Popularity, or "N/A".
    pub popularity: String,
    /// Content rating.
    pub rating: String,
    /// Season/year display string.
    pub premiered: String,
    /// Studio list as a display string.
    pub studios: String,
    /// Per-episode duration display string.
    pub duration: String,
    /// Thumbnail URL.
    pub thumbnail: String,
}

impl AnimeResult {
    /// Whether this record still needs a bridge re-search against the
    /// primary catalog before episodes can be loaded.
    ///
    /// # Examples
    ///
    /// ```
    /// use ani_tui::types::AnimeResult;
    ///
    /// let mut anime = AnimeResult::placeholder("Frieren");
    /// assert!(anime.is_unresolved());
    /// anime.id = "1234".to_string();
    /// assert!(!anime.is_unresolved());
    /// ```
    pub fn is_unresolved(&self) -> bool {
        self.id.is_empty()
    }

    /// Build a minimal record with only a title, everything else defaulted.
    /// Useful in tests and for aggregator rows before mapping.
    pub fn placeholder(title: &str) -> Self {
        Self {
            id: String::new(),
            title_en: title.to_string(),
            title_jp: String::new(),
            kind: "TV".to_string(),
            episodes: "N/A".to_string(),
            status: "N/A".to_string(),
            genres: "N/A".to_string(),
            mal_id: "0".to_string(),
            score: "N/A".to_string(),
            rank: "N/A".to_string(),
            popularity: "N/A".to_string(),
            rating: "N/A".to_string(),
            premiered: "N/A".to_string(),
            studios: "N/A".to_string(),
            duration: "N/A".to_string(),
            thumbnail: String::new(),
        }
    }
}

/// The numeric episode number shown to the user.
///
/// Parsed from a possibly-fractional raw string ("12", "12.5"). This is
/// the value that sorting, jump matching and watch history key off, not
/// the raw string.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct EpisodeNumber(f64);

impl EpisodeNumber {
    /// Parse a raw episode-number string.
    ///
    /// Fractional strings keep their fraction, plain integers stay
    /// integral, and anything unparseable falls back to the 1-based
    /// position index.
    ///
    /// # Examples
    ///
    /// ```
    /// use ani_tui::types::EpisodeNumber;
    ///
    /// assert_eq!(EpisodeNumber::parse("12", 0).to_string(), "12");
    /// assert_eq!(EpisodeNumber::parse("12.5", 0).to_string(), "12.5");
    /// assert_eq!(EpisodeNumber::parse("special", 4).to_string(), "5");
    /// ```
    pub fn parse(raw: &str, position: usize) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => {
                if raw.contains('.') {
                    EpisodeNumber(n)
                } else {
                    EpisodeNumber(n.trunc())
                }
            }
            _ => EpisodeNumber((position + 1) as f64),
        }
    }

    /// The raw numeric value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Numeric-equality match: "12" matches "12.0".
    pub fn matches(&self, target: f64) -> bool {
        self.0 == target
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// An episode of an anime.
#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    /// Episode number exactly as the catalog sent it (may be fractional).
    pub raw_number: String,
    /// Episode kind label; "Episode" when the catalog left it blank.
    pub kind: String,
    /// Parsed display number used for sorting, jump and history matching.
    pub display: EpisodeNumber,
}

impl Episode {
    /// Build an episode from raw catalog fields plus its 0-based position.
    pub fn new(raw_number: &str, kind: &str, position: usize) -> Self {
        let kind = if kind.trim().is_empty() {
            "Episode".to_string()
        } else {
            kind.trim().to_string()
        };
        Self {
            raw_number: raw_number.to_string(),
            kind,
            display: EpisodeNumber::parse(raw_number, position),
        }
    }

    /// Format the episode for the list pane: the kind label is only shown
    /// when it is something other than a plain episode.
    ///
    /// # Examples
    ///
    /// ```
    /// use ani_tui::types::Episode;
    ///
    /// assert_eq!(Episode::new("3", "Episode", 0).to_display(), "3");
    /// assert_eq!(Episode::new("13.5", "OVA", 0).to_display(), "13.5 [OVA]");
    /// ```
    pub fn to_display(&self) -> String {
        if self.kind.eq_ignore_ascii_case("episode") {
            self.display.to_string()
        } else {
            format!("{} [{}]", self.display, self.kind)
        }
    }
}

/// A selectable quality tier on the quality screen.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityOption {
    /// Human label shown in the menu.
    pub label: &'static str,
    /// Key into the per-episode server map.
    pub server_key: &'static str,
    /// Style tag used by the renderer.
    pub style: &'static str,
}

/// The fixed quality ladder, ascending. The quality screen is always built
/// from this list filtered down to tiers the current episode actually has.
pub fn quality_ladder() -> Vec<QualityOption> {
    vec![
        QualityOption {
            label: "📱 480p (Low Quality)",
            server_key: "FRLowQ",
            style: "info",
        },
        QualityOption {
            label: "🎬 720p (Standard Quality)",
            server_key: "FRLink",
            style: "info",
        },
        QualityOption {
            label: "🎞️  1080p (Full HD)",
            server_key: "FRFhdQ",
            style: "info",
        },
    ]
}

/// Filter the ladder to tiers present in an episode's server map,
/// preserving ascending order.
pub fn available_qualities(servers: &EpisodeServers) -> Vec<QualityOption> {
    quality_ladder()
        .into_iter()
        .filter(|q| servers.get(q.server_key).is_some())
        .collect()
}

/// Per-episode server map: quality server-key -> storage link id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeServers {
    links: HashMap<String, String>,
}

impl EpisodeServers {
    /// Build from a raw key/value map, dropping empty entries.
    pub fn from_map(raw: HashMap<String, String>) -> Self {
        let links = raw
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { links }
    }

    /// Look up the storage id for a quality server key.
    pub fn get(&self, server_key: &str) -> Option<&str> {
        self.links.get(server_key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
