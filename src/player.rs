//! External video player launch.
//!
//! Player resolution order: explicit override (CLI flag or config), a
//! bundled player binary shipped next to the executable (staged out to a
//! temp directory before launch), then the platform default found on
//! PATH. Playback itself is a blocking subprocess call; the terminal UI
//! is suspended for its duration.

use crate::error::{AppError, Result};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const PLAYER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// How a playback attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Player exited with status 0.
    Completed,
    /// Player ran but exited non-zero; the stream likely never played.
    Failed(i32),
}

impl PlaybackOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PlaybackOutcome::Completed)
    }
}

/// Check if a command exists in the system PATH.
fn find_in_path(cmd: &str) -> bool {
    if let Ok(path_var) = env::var("PATH") {
        for dir in env::split_paths(&path_var) {
            let full = dir.join(cmd);
            if full.is_file() {
                return true;
            }
        }
    }
    false
}

/// Platform-default player command.
fn default_player() -> String {
    if cfg!(target_os = "macos") && find_in_path("iina") {
        "iina".to_string()
    } else if cfg!(target_os = "windows") {
        "mpv.exe".to_string()
    } else {
        "mpv".to_string()
    }
}

/// The bundled player binary shipped in a `mpv/` directory next to the
/// executable, if present.
fn bundled_player() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?;
    let name = if cfg!(target_os = "windows") {
        "mpv.exe"
    } else {
        "mpv"
    };
    let candidate = dir.join("mpv").join(name);
    candidate.is_file().then_some(candidate)
}

/// A resolved, launchable player.
///
/// When the bundled binary is used it gets staged to a temp directory
/// first; [`Player::cleanup`] (also run on drop) removes that directory.
#[derive(Debug)]
pub struct Player {
    command: PathBuf,
    extra_args: Vec<String>,
    staged_dir: Option<PathBuf>,
}

impl Player {
    /// Resolve the player to use.
    pub fn resolve(override_cmd: Option<&str>, extra_args: &[String]) -> Result<Self> {
        if let Some(cmd) = override_cmd {
            debug!("Using player override: {}", cmd);
            return Ok(Self {
                command: PathBuf::from(cmd),
                extra_args: extra_args.to_vec(),
                staged_dir: None,
            });
        }

        if let Some(bundled) = bundled_player() {
            let staged = Self::stage(&bundled)?;
            debug!("Staged bundled player to {}", staged.display());
            let dir = staged.parent().map(Path::to_path_buf);
            return Ok(Self {
                command: staged,
                extra_args: extra_args.to_vec(),
                staged_dir: dir,
            });
        }

        let cmd = default_player();
        debug!("Using platform default player: {}", cmd);
        Ok(Self {
            command: PathBuf::from(cmd),
            extra_args: extra_args.to_vec(),
            staged_dir: None,
        })
    }

    /// Copy the bundled binary into a fresh temp directory so it can run
    /// even if the install location is read-only or gets replaced.
    fn stage(bundled: &Path) -> Result<PathBuf> {
        let dir = env::temp_dir().join(format!("ani-tui-player-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let name = bundled
            .file_name()
            .ok_or_else(|| AppError::Player("Bundled player has no file name".to_string()))?;
        let target = dir.join(name);
        if !target.is_file() {
            fs::copy(bundled, &target)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&target, fs::Permissions::from_mode(0o755))?;
            }
        }
        Ok(target)
    }

    /// Play a stream URL, blocking until the player exits.
    ///
    /// A non-zero exit is reported as a [`PlaybackOutcome::Failed`], not
    /// an error; only failing to launch the player at all is an error.
    pub fn play(&self, url: &str, title: &str) -> Result<PlaybackOutcome> {
        debug!("Launching {} for '{}'", self.command.display(), title);

        let status = Command::new(&self.command)
            .args([
                "--fullscreen",
                "--keep-open=yes",
                "--force-window=immediate",
                "--cache=yes",
                "--demuxer-max-bytes=150M",
                "--demuxer-max-back-bytes=75M",
                "--cache-secs=10",
                "--hwdec=auto",
            ])
            .arg(format!("--user-agent={}", PLAYER_USER_AGENT))
            .arg(format!("--title={}", title))
            .args(&self.extra_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                AppError::Player(format!(
                    "Failed to launch player '{}': {}",
                    self.command.display(),
                    e
                ))
            })?;

        if status.success() {
            Ok(PlaybackOutcome::Completed)
        } else {
            let code = status.code().unwrap_or(-1);
            warn!("Player exited with code {}", code);
            Ok(PlaybackOutcome::Failed(code))
        }
    }

    /// Remove the staged temp directory, if any. Idempotent.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.staged_dir.take() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove staged player dir {}: {}", dir.display(), e);
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_outcome_success() {
        assert!(PlaybackOutcome::Completed.is_success());
        assert!(!PlaybackOutcome::Failed(2).is_success());
    }

    #[test]
    fn test_resolve_override_skips_staging() {
        let player = Player::resolve(Some("vlc"), &["--fullscreen".to_string()]).unwrap();
        assert_eq!(player.command, PathBuf::from("vlc"));
        assert!(player.staged_dir.is_none());
        assert_eq!(player.extra_args, vec!["--fullscreen"]);
    }

    #[test]
    fn test_default_player_is_platform_appropriate() {
        let cmd = default_player();
        if cfg!(target_os = "windows") {
            assert_eq!(cmd, "mpv.exe");
        } else {
            assert!(cmd == "mpv" || cmd == "iina");
        }
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut player = Player::resolve(Some("mpv"), &[]).unwrap();
        player.cleanup();
        player.cleanup();
    }
}
