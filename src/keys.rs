//! Single-keystroke reading for the menu loops.
//!
//! Decodes crossterm key events into the small symbolic alphabet the
//! selection menus understand. Reading is poll-based so a "no key yet"
//! condition returns promptly and never blocks the UI.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;

/// A decoded keystroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Esc,
    Backspace,
    /// Any printable character, original case preserved for text input.
    Char(char),
    /// Ctrl-C, treated as a session-ending interrupt everywhere.
    Interrupt,
}

impl Key {
    /// Case-insensitive test for a letter command (`b`, `g`, `l`, `d`, `q`).
    pub fn is_command(&self, letter: char) -> bool {
        matches!(self, Key::Char(c) if c.eq_ignore_ascii_case(&letter))
    }
}

/// Decode a crossterm key event. Returns `None` for events the UI ignores
/// (releases, modifier-only chords, unknown keys).
pub fn decode(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Key::Interrupt),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}

/// Poll for a keystroke with a timeout.
///
/// `Ok(None)` means no key was available within the timeout, which is a
/// normal no-op for the callers' loops, not an error.
pub fn poll_key(timeout: Duration) -> io::Result<Option<Key>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(decode(key));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_decode_arrows_and_enter() {
        assert_eq!(decode(press(KeyCode::Up)), Some(Key::Up));
        assert_eq!(decode(press(KeyCode::Down)), Some(Key::Down));
        assert_eq!(decode(press(KeyCode::Enter)), Some(Key::Enter));
        assert_eq!(decode(press(KeyCode::Esc)), Some(Key::Esc));
    }

    #[test]
    fn test_decode_letters_preserve_case() {
        assert_eq!(decode(press(KeyCode::Char('G'))), Some(Key::Char('G')));
        assert_eq!(decode(press(KeyCode::Char('b'))), Some(Key::Char('b')));
    }

    #[test]
    fn test_commands_match_case_insensitively() {
        assert!(Key::Char('G').is_command('g'));
        assert!(Key::Char('g').is_command('g'));
        assert!(Key::Char('D').is_command('d'));
        assert!(!Key::Char('x').is_command('g'));
        assert!(!Key::Enter.is_command('g'));
    }

    #[test]
    fn test_ctrl_c_is_interrupt() {
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(decode(ev), Some(Key::Interrupt));
    }

    #[test]
    fn test_release_events_ignored() {
        let mut ev = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        ev.kind = KeyEventKind::Release;
        assert_eq!(decode(ev), None);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        assert_eq!(decode(press(KeyCode::F(5))), None);
    }
}
