//! Spinner-backed execution of background calls.
//!
//! Every remote call in the interactive flow goes through
//! [`run_with_loading`]: the future runs on a freshly spawned tokio task
//! while the calling screen animates a spinner and keeps the keyboard
//! responsive. The task's `JoinHandle` is the single hand-off point, so
//! to the caller the whole thing behaves like a synchronous call that
//! can be interrupted.

use crate::error::{AppError, Result};
use crate::keys::{self, Key};
use crate::ui::{self, Term, Theme};
use std::future::Future;
use std::time::Duration;

const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a future behind a spinner panel, blocking the current flow.
///
/// Ctrl-C, `q` or ESC while waiting aborts the task and surfaces
/// [`AppError::Interrupted`]; the aborted worker never outlives the call.
/// Task panics are reported as internal errors rather than unwinding
/// through the terminal teardown.
pub async fn run_with_loading<T, F>(
    terminal: &mut Term,
    theme: &Theme,
    message: &str,
    task: F,
) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let handle = tokio::spawn(task);
    let mut tick = 0usize;

    loop {
        let frame = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
        terminal.draw(|f| ui::draw_spinner(f, theme, message, frame))?;
        tick += 1;

        if handle.is_finished() {
            return match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(AppError::Interrupted),
                Err(e) => Err(AppError::Internal(format!("background task failed: {}", e))),
            };
        }

        if let Some(key) = keys::poll_key(POLL_INTERVAL)? {
            let cancel = matches!(key, Key::Interrupt | Key::Esc) || key.is_command('q');
            if cancel {
                handle.abort();
                // Wait the abort out so the worker is gone before we return.
                let _ = handle.await;
                return Err(AppError::Interrupted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_frames_distinct() {
        let mut frames: Vec<char> = SPINNER_FRAMES.to_vec();
        frames.sort();
        frames.dedup();
        assert_eq!(frames.len(), SPINNER_FRAMES.len());
    }
}
