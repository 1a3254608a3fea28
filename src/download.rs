//! Download functionality for saving episodes to disk.
//!
//! Downloads stream a resolved direct link straight to a file; the URL
//! handed in here is already a plain HTTP video link, so no external
//! downloader is involved.

use crate::error::{AppError, Result};
use crate::types::EpisodeNumber;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Download a direct video link to a file.
///
/// Writes to the target path as chunks arrive. A partially written file
/// is removed on failure.
pub async fn download_file(url: &str, output_path: &Path) -> Result<()> {
    debug!("Downloading {} -> {}", url, output_path.display());

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let resp = reqwest::get(url)
        .await?
        .error_for_status()
        .map_err(|e| AppError::Download(format!("Download request failed: {}", e)))?;

    let mut file = File::create(output_path).await?;
    let mut resp = resp;
    let result: Result<()> = async {
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| AppError::Download(format!("Download interrupted: {}", e)))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(output_path).await;
    } else {
        info!("Saved {}", output_path.display());
    }
    result
}

/// Generate a safe filename for an episode.
pub fn generate_filename(anime_title: &str, episode: EpisodeNumber) -> String {
    // Sanitize title for filesystem
    let safe_name: String = anime_title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    format!("{} - Episode {}.mp4", safe_name, episode)
}

/// Get the full output path for a download.
pub fn get_output_path(download_dir: &Path, anime_title: &str, episode: EpisodeNumber) -> PathBuf {
    download_dir.join(generate_filename(anime_title, episode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(raw: &str) -> EpisodeNumber {
        EpisodeNumber::parse(raw, 0)
    }

    #[test]
    fn test_generate_filename_basic() {
        let filename = generate_filename("My Anime", ep("1"));
        assert_eq!(filename, "My Anime - Episode 1.mp4");
    }

    #[test]
    fn test_generate_filename_fractional_episode() {
        let filename = generate_filename("My Anime", ep("13.5"));
        assert_eq!(filename, "My Anime - Episode 13.5.mp4");
    }

    #[test]
    fn test_generate_filename_special_chars() {
        let filename = generate_filename("Test: The Show", ep("5"));
        assert_eq!(filename, "Test_ The Show - Episode 5.mp4");
    }

    #[test]
    fn test_generate_filename_all_special() {
        let filename = generate_filename("A/B\\C:D*E?F\"G<H>I|J", ep("10"));
        assert_eq!(filename, "A_B_C_D_E_F_G_H_I_J - Episode 10.mp4");
    }

    #[test]
    fn test_get_output_path() {
        let path = get_output_path(Path::new("/downloads"), "Test Show", ep("3"));
        assert_eq!(path, PathBuf::from("/downloads/Test Show - Episode 3.mp4"));
    }
}
