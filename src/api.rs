//! Remote catalog client.
//!
//! This module talks to three backends: the provisioning endpoint that
//! hands out catalog credentials at startup, the catalog itself (search,
//! episode lists, per-episode server maps), and the public Jikan API for
//! the seasonal feed. Storage ids returned by the catalog are turned into
//! playable direct links by scraping the file-host landing page.

use crate::error::{AppError, Result};
use crate::types::{AnimeResult, Episode, EpisodeServers};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Maximum number of retry attempts for failed requests.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds (doubles each retry).
const BASE_RETRY_DELAY_MS: u64 = 500;

const PROVISIONING_URL: &str = "https://ani-cli-arabic-analytics.talego4955.workers.dev";
const PROVISIONING_KEY: &str = "8GltlSgyTHwNJ-77n8R4T2glZ_EDQHcU4AB4Wjuu75M";
const SEASON_NOW_URL: &str = "https://api.jikan.moe/v4/seasons/now";
const STORAGE_PAGE_BASE: &str = "https://www.mediafire.com/file/";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Check if an error is retryable (network errors, timeouts, server errors).
fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.is_request()
        || error.status().map(|s| s.is_server_error()).unwrap_or(false)
}

/// Retry an async operation with exponential backoff.
///
/// Retries the operation up to `MAX_RETRIES` times on retryable errors,
/// with exponential backoff starting at `BASE_RETRY_DELAY_MS`.
async fn retry_with_backoff<T, F, Fut>(operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, reqwest::Error>>,
{
    let mut last_error = None;

    for attempt in 0..=MAX_RETRIES {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!("{} succeeded after {} attempts", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt < MAX_RETRIES && is_retryable_error(&e) {
                    let delay = Duration::from_millis(BASE_RETRY_DELAY_MS * 2_u64.pow(attempt));
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempt + 1,
                        MAX_RETRIES + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    last_error = Some(e);
                } else {
                    return Err(AppError::Network(format!("{} failed: {}", operation_name, e)));
                }
            }
        }
    }

    Err(AppError::Network(format!(
        "{} failed after {} attempts: {}",
        operation_name,
        MAX_RETRIES + 1,
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string())
    )))
}

/// Catalog credentials handed out by the provisioning endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "ANI_CLI_AR_API_BASE")]
    pub api_base: String,
    #[serde(rename = "ANI_CLI_AR_TOKEN")]
    pub token: String,
    #[serde(rename = "THUMBNAILS_BASE_URL")]
    pub thumbnails_base: String,
}

fn na() -> String {
    "N/A".to_string()
}

/// The catalog is loose about types: numeric fields arrive as numbers or
/// strings depending on the record, and some are null. Flatten them all
/// to display strings with an "N/A" sentinel.
fn flexible_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => na(),
        other => other.to_string(),
    })
}

// Response shape of the catalog search endpoint (an unwrapped array).
#[derive(Debug, Deserialize)]
struct RawCatalogEntry {
    #[serde(rename = "AnimeId", default, deserialize_with = "flexible_string")]
    anime_id: String,
    #[serde(rename = "EN_Title", default = "na", deserialize_with = "flexible_string")]
    title_en: String,
    #[serde(rename = "JP_Title", default, deserialize_with = "flexible_string")]
    title_jp: String,
    #[serde(rename = "Type", default = "na", deserialize_with = "flexible_string")]
    kind: String,
    #[serde(rename = "Episodes", default = "na", deserialize_with = "flexible_string")]
    episodes: String,
    #[serde(rename = "Status", default = "na", deserialize_with = "flexible_string")]
    status: String,
    #[serde(rename = "Genres", default = "na", deserialize_with = "flexible_string")]
    genres: String,
    #[serde(rename = "MalId", default, deserialize_with = "flexible_string")]
    mal_id: String,
    #[serde(rename = "Score", default = "na", deserialize_with = "flexible_string")]
    score: String,
    #[serde(rename = "Rank", default = "na", deserialize_with = "flexible_string")]
    rank: String,
    #[serde(rename = "Popularity", default = "na", deserialize_with = "flexible_string")]
    popularity: String,
    #[serde(rename = "Rating", default = "na", deserialize_with = "flexible_string")]
    rating: String,
    #[serde(rename = "Season", default = "na", deserialize_with = "flexible_string")]
    premiered: String,
    #[serde(rename = "Studios", default = "na", deserialize_with = "flexible_string")]
    studios: String,
    #[serde(rename = "Duration", default = "na", deserialize_with = "flexible_string")]
    duration: String,
    #[serde(rename = "Thumbnail", default, deserialize_with = "flexible_string")]
    thumbnail: String,
}

// Response shape of the episode list endpoint.
#[derive(Debug, Deserialize)]
struct RawEpisode {
    #[serde(rename = "Episode", default, deserialize_with = "flexible_string")]
    number: String,
    #[serde(rename = "Type", default, deserialize_with = "flexible_string")]
    kind: String,
}

// Response shape of the server-map endpoint.
#[derive(Debug, Deserialize)]
struct ServersResponse {
    #[serde(rename = "CurrentEpisode", default)]
    current_episode: HashMap<String, Value>,
}

// Jikan seasonal feed.
#[derive(Debug, Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    data: Vec<SeasonEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonEntry {
    #[serde(default)]
    mal_id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_english: Option<String>,
    #[serde(default)]
    title_japanese: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    episodes: Option<u32>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    rank: Option<u64>,
    #[serde(default)]
    popularity: Option<u64>,
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    genres: Vec<NamedEntity>,
    #[serde(default)]
    studios: Vec<NamedEntity>,
    #[serde(default)]
    images: SeasonImages,
}

#[derive(Debug, Default, Deserialize)]
struct NamedEntity {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonImages {
    #[serde(default)]
    jpg: JpgImages,
}

#[derive(Debug, Default, Deserialize)]
struct JpgImages {
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    large_image_url: Option<String>,
}

/// Extract a direct download link from a file-host landing page.
///
/// The host embeds the real file URL in the page markup; the first
/// `https://download...` quoted URL is the one the download button uses.
///
/// # Examples
///
/// ```
/// use ani_tui::api::extract_direct_link;
///
/// let html = r#"<a href="https://download2301.example.com/ep3.mp4" id="downloadButton">"#;
/// assert_eq!(
///     extract_direct_link(html).as_deref(),
///     Some("https://download2301.example.com/ep3.mp4")
/// );
/// assert!(extract_direct_link("<html>no links here</html>").is_none());
/// ```
pub fn extract_direct_link(html: &str) -> Option<String> {
    let re = Regex::new(r#"(https://download[^"]+)"#).unwrap();
    re.captures(html).map(|caps| caps[1].to_string())
}

/// Turn a storage id from the server map into the landing-page URL.
/// Ids that are already full URLs pass through untouched.
pub fn build_storage_url(server_id: &str) -> String {
    if server_id.starts_with("http") {
        server_id.to_string()
    } else {
        format!("{}{}", STORAGE_PAGE_BASE, server_id)
    }
}

/// Client for the remote catalog and its companion services.
///
/// Cheap to clone; the underlying HTTP client is reference-counted.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    creds: Credentials,
}

impl CatalogClient {
    /// Fetch credentials from the provisioning endpoint and build a ready
    /// client. Called once at startup; without credentials nothing else
    /// in the app can work, so a failure here is fatal.
    pub async fn connect() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        let url = format!("{}/credentials", PROVISIONING_URL);
        let resp = retry_with_backoff("Fetch credentials", || {
            let http = http.clone();
            let url = url.clone();
            async move {
                http.get(&url)
                    .header("X-Auth-Key", PROVISIONING_KEY)
                    .send()
                    .await?
                    .error_for_status()
            }
        })
        .await?;

        let creds: Credentials = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse credentials: {}", e)))?;

        debug!("Catalog credentials provisioned");
        Ok(Self { http, creds })
    }

    /// Build a client from known credentials. Used by tests.
    pub fn with_credentials(creds: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, creds })
    }

    /// Search the catalog for series matching a query.
    ///
    /// An empty result list is a normal outcome, not an error.
    pub async fn search(&self, query: &str) -> Result<Vec<AnimeResult>> {
        debug!("Searching catalog for '{}'", query);

        let url = format!("{}anime/load_anime_list_v2.php", self.creds.api_base);
        let form = [
            ("UserId", "0".to_string()),
            ("Language", "English".to_string()),
            ("FilterType", "SEARCH".to_string()),
            ("FilterData", query.to_string()),
            ("Type", "SERIES".to_string()),
            ("From", "0".to_string()),
            ("Token", self.creds.token.clone()),
        ];

        let resp = retry_with_backoff(&format!("Search for '{}'", query), || {
            let http = self.http.clone();
            let url = url.clone();
            let form = form.clone();
            async move { http.post(&url).form(&form).send().await?.error_for_status() }
        })
        .await?;

        let raw: Vec<RawCatalogEntry> = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse search results: {}", e)))?;

        let results: Vec<AnimeResult> = raw
            .into_iter()
            .map(|item| {
                let thumbnail = if item.thumbnail.is_empty() || item.thumbnail == "N/A" {
                    String::new()
                } else {
                    format!("{}{}", self.creds.thumbnails_base, item.thumbnail)
                };
                AnimeResult {
                    id: item.anime_id,
                    title_en: item.title_en,
                    title_jp: item.title_jp,
                    kind: item.kind,
                    episodes: item.episodes,
                    status: item.status,
                    genres: item.genres,
                    mal_id: item.mal_id,
                    score: item.score,
                    rank: item.rank,
                    popularity: item.popularity,
                    rating: item.rating,
                    premiered: item.premiered,
                    studios: item.studios,
                    duration: item.duration,
                    thumbnail,
                }
            })
            .collect();

        debug!("Found {} catalog entries for '{}'", results.len(), query);
        Ok(results)
    }

    /// Fetch the currently-airing season from the public aggregator.
    ///
    /// Returned records carry an empty `id`; they must be bridged to the
    /// catalog with [`CatalogClient::search`] before episodes can load.
    /// Adult-rated entries are dropped.
    pub async fn season_now(&self) -> Result<Vec<AnimeResult>> {
        debug!("Fetching current-season feed");

        let resp = retry_with_backoff("Fetch seasonal feed", || {
            let http = self.http.clone();
            async move {
                http.get(SEASON_NOW_URL)
                    .query(&[("sfw", "true")])
                    .send()
                    .await?
                    .error_for_status()
            }
        })
        .await?;

        let parsed: SeasonResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse seasonal feed: {}", e)))?;

        let results: Vec<AnimeResult> = parsed
            .data
            .into_iter()
            .filter(|item| !item.rating.as_deref().unwrap_or("").contains("Rx"))
            .map(|item| {
                let title = item
                    .title_english
                    .clone()
                    .or_else(|| item.title.clone())
                    .unwrap_or_default();
                let joined = |list: &[NamedEntity]| {
                    list.iter()
                        .map(|e| e.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let thumbnail = item
                    .images
                    .jpg
                    .large_image_url
                    .clone()
                    .or_else(|| item.images.jpg.image_url.clone())
                    .unwrap_or_default();
                let premiered = format!(
                    "{} {}",
                    item.season.as_deref().unwrap_or(""),
                    item.year.map(|y| y.to_string()).unwrap_or_default()
                )
                .trim()
                .to_string();

                AnimeResult {
                    id: String::new(),
                    title_en: title,
                    title_jp: item.title_japanese.clone().unwrap_or_default(),
                    kind: item.kind.clone().unwrap_or_else(|| "TV".to_string()),
                    episodes: item
                        .episodes
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    status: item.status.clone().unwrap_or_else(na),
                    genres: joined(&item.genres),
                    mal_id: item.mal_id.map(|id| id.to_string()).unwrap_or_default(),
                    score: item.score.map(|s| s.to_string()).unwrap_or_else(na),
                    rank: item.rank.map(|r| r.to_string()).unwrap_or_else(na),
                    popularity: item.popularity.map(|p| p.to_string()).unwrap_or_else(na),
                    rating: item.rating.clone().unwrap_or_else(na),
                    premiered,
                    studios: joined(&item.studios),
                    duration: item.duration.clone().unwrap_or_else(na),
                    thumbnail,
                }
            })
            .collect();

        debug!("Seasonal feed returned {} entries", results.len());
        Ok(results)
    }

    /// Fetch the episode list for a catalog entry, in catalog order.
    pub async fn load_episodes(&self, anime_id: &str) -> Result<Vec<Episode>> {
        debug!("Loading episodes for anime {}", anime_id);

        let url = format!("{}episodes/load_episodes.php", self.creds.api_base);
        let form = [
            ("AnimeID", anime_id.to_string()),
            ("Token", self.creds.token.clone()),
        ];

        let resp = retry_with_backoff("Load episodes", || {
            let http = self.http.clone();
            let url = url.clone();
            let form = form.clone();
            async move { http.post(&url).form(&form).send().await?.error_for_status() }
        })
        .await?;

        let raw: Vec<RawEpisode> = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse episode list: {}", e)))?;

        let episodes = raw
            .iter()
            .enumerate()
            .map(|(idx, ep)| {
                let number = if ep.number.is_empty() || ep.number == "N/A" {
                    (idx + 1).to_string()
                } else {
                    ep.number.clone()
                };
                Episode::new(&number, &ep.kind, idx)
            })
            .collect::<Vec<_>>();

        debug!("Loaded {} episodes for anime {}", episodes.len(), anime_id);
        Ok(episodes)
    }

    /// Fetch the per-episode server map (quality key -> storage id).
    ///
    /// An empty map means the episode has no playable sources right now.
    pub async fn load_servers(&self, anime_id: &str, episode_raw: &str) -> Result<EpisodeServers> {
        debug!("Loading servers for anime {} episode {}", anime_id, episode_raw);

        let url = format!("{}anime/load_servers.php", self.creds.api_base);
        let form = [
            ("UserId", "0".to_string()),
            ("AnimeId", anime_id.to_string()),
            ("Episode", episode_raw.to_string()),
            ("AnimeType", "SERIES".to_string()),
            ("Token", self.creds.token.clone()),
        ];

        let resp = retry_with_backoff("Load servers", || {
            let http = self.http.clone();
            let url = url.clone();
            let form = form.clone();
            async move { http.post(&url).form(&form).send().await?.error_for_status() }
        })
        .await?;

        let parsed: ServersResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse server map: {}", e)))?;

        let links: HashMap<String, String> = parsed
            .current_episode
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();

        Ok(EpisodeServers::from_map(links))
    }

    /// Resolve a storage id into a playable direct link by fetching the
    /// landing page and scraping the download URL out of it.
    pub async fn resolve_direct_link(&self, server_id: &str) -> Result<String> {
        let page_url = build_storage_url(server_id);
        debug!("Resolving direct link via {}", page_url);

        let resp = retry_with_backoff("Resolve direct link", || {
            let http = self.http.clone();
            let page_url = page_url.clone();
            async move { http.get(&page_url).send().await?.error_for_status() }
        })
        .await?;

        let html = resp
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read storage page: {}", e)))?;

        extract_direct_link(&html)
            .ok_or_else(|| AppError::NotFound("No direct link found on storage page".to_string()))
    }
}
