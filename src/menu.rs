//! Selection menu engine.
//!
//! The reusable list-navigation state machine behind every selection screen
//! (anime list, episode list, quality list, post-watch actions). It tracks
//! a selected row and a scroll offset for a window of `visible_rows` rows,
//! and knows nothing about what the items represent; rendering and key
//! polling live in the `ui` module.
//!
//! Invariants maintained by every transition:
//! - `selected < len`
//! - `scroll <= selected < scroll + visible_rows`
//! - `scroll` never exceeds `len - visible_rows` (and never underflows).

/// What the user chose to do with a selected item. `Download` is only
/// reachable on the quality screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectedAction {
    Watch,
    Download,
}

/// The tri-state result every selection screen resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuOutcome {
    /// The user chose item `index`.
    Selected {
        index: usize,
        action: SelectedAction,
    },
    /// Return to the previous screen.
    Back,
    /// Terminate the whole session immediately.
    Quit,
}

/// Navigation state for one menu invocation.
#[derive(Clone, Debug)]
pub struct SelectionMenu {
    selected: usize,
    scroll: usize,
    visible_rows: usize,
    len: usize,
}

impl SelectionMenu {
    /// Create a menu over `len` items (must be non-empty) showing
    /// `visible_rows` rows at a time.
    pub fn new(len: usize, visible_rows: usize) -> Self {
        debug_assert!(len > 0, "selection menus require a non-empty item list");
        Self {
            selected: 0,
            scroll: 0,
            visible_rows: visible_rows.max(1),
            len,
        }
    }

    /// Create a menu with an initial selection, re-centered into view.
    pub fn with_selected(len: usize, visible_rows: usize, selected: usize) -> Self {
        let mut menu = Self::new(len, visible_rows);
        menu.recenter_on(selected.min(len.saturating_sub(1)));
        menu
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The range of item indices currently in view.
    pub fn window(&self) -> std::ops::Range<usize> {
        self.scroll..(self.scroll + self.visible_rows).min(self.len)
    }

    /// Adjust the window height (terminal resize). Re-clamps the scroll so
    /// the selected row stays visible.
    pub fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows.max(1);
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.visible_rows {
            self.scroll = self.selected + 1 - self.visible_rows;
        }
        self.clamp_scroll();
    }

    /// Move the selection up one row. Returns whether the state changed
    /// (a no-op at the top row must not trigger a redraw).
    pub fn move_up(&mut self) -> bool {
        if self.selected == 0 {
            return false;
        }
        self.selected -= 1;
        if self.selected < self.scroll {
            self.scroll = self.selected;
        }
        true
    }

    /// Move the selection down one row. Returns whether the state changed.
    pub fn move_down(&mut self) -> bool {
        if self.selected + 1 >= self.len {
            return false;
        }
        self.selected += 1;
        if self.selected >= self.scroll + self.visible_rows {
            self.scroll = self.selected + 1 - self.visible_rows;
        }
        true
    }

    /// Jump to the item whose display number equals `target` numerically
    /// ("12" matches a target of 12.0). On a match the selection moves and
    /// the window re-centers; on no match the state is left untouched and
    /// `false` is returned so the caller can flash an error.
    pub fn jump_to_number(&mut self, target: f64, numbers: &[f64]) -> bool {
        match numbers.iter().position(|n| *n == target) {
            Some(idx) => {
                self.recenter_on(idx);
                true
            }
            None => false,
        }
    }

    /// Jump to the remembered last-watched number, if it is still present
    /// in the list. A missing target is a silent no-op.
    pub fn resume_to(&mut self, target: f64, numbers: &[f64]) -> bool {
        self.jump_to_number(target, numbers)
    }

    fn recenter_on(&mut self, index: usize) {
        self.selected = index;
        self.scroll = index.saturating_sub(self.visible_rows / 2);
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let max_scroll = self.len.saturating_sub(self.visible_rows);
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invariants_hold(menu: &SelectionMenu) -> bool {
        menu.selected() < menu.len()
            && menu.scroll() <= menu.selected()
            && menu.selected() < menu.scroll() + menu.visible_rows
            && menu.scroll() <= menu.len().saturating_sub(menu.visible_rows)
    }

    #[test]
    fn test_up_at_top_is_noop() {
        let mut menu = SelectionMenu::new(10, 5);
        assert!(!menu.move_up());
        assert_eq!(menu.selected(), 0);
        assert_eq!(menu.scroll(), 0);
    }

    #[test]
    fn test_down_at_bottom_is_noop() {
        let mut menu = SelectionMenu::new(3, 5);
        menu.move_down();
        menu.move_down();
        assert!(!menu.move_down());
        assert_eq!(menu.selected(), 2);
        assert_eq!(menu.scroll(), 0);
    }

    #[test]
    fn test_scroll_follows_selection_down() {
        let mut menu = SelectionMenu::new(10, 3);
        for _ in 0..4 {
            menu.move_down();
        }
        assert_eq!(menu.selected(), 4);
        // window must contain the selected row
        assert_eq!(menu.scroll(), 2);
        assert!(menu.window().contains(&4));
    }

    #[test]
    fn test_scroll_follows_selection_up() {
        let mut menu = SelectionMenu::new(10, 3);
        for _ in 0..6 {
            menu.move_down();
        }
        for _ in 0..6 {
            menu.move_up();
        }
        assert_eq!(menu.selected(), 0);
        assert_eq!(menu.scroll(), 0);
    }

    #[test]
    fn test_invariants_after_arbitrary_sequence() {
        let mut menu = SelectionMenu::new(25, 7);
        let moves = [1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 0, 0, 1, 1, 1, 1, 1, 0, 1];
        for m in moves {
            if m == 1 {
                menu.move_down();
            } else {
                menu.move_up();
            }
            assert!(invariants_hold(&menu));
        }
    }

    #[test]
    fn test_jump_matches_numerically() {
        let numbers = vec![1.0, 2.0, 3.0, 12.0, 12.5];
        let mut menu = SelectionMenu::new(numbers.len(), 3);

        // "3" typed as 3.0 must match the item displaying 3
        assert!(menu.jump_to_number("3.0".parse().unwrap(), &numbers));
        assert_eq!(menu.selected(), 2);

        assert!(menu.jump_to_number(12.5, &numbers));
        assert_eq!(menu.selected(), 4);
    }

    #[test]
    fn test_jump_no_match_leaves_state_unchanged() {
        let numbers = vec![1.0, 2.0, 3.0];
        let mut menu = SelectionMenu::new(numbers.len(), 2);
        menu.move_down();
        let (sel, scroll) = (menu.selected(), menu.scroll());

        assert!(!menu.jump_to_number(99.0, &numbers));
        assert_eq!(menu.selected(), sel);
        assert_eq!(menu.scroll(), scroll);
    }

    #[test]
    fn test_jump_recenters_window() {
        let numbers: Vec<f64> = (1..=50).map(|n| n as f64).collect();
        let mut menu = SelectionMenu::new(numbers.len(), 10);

        assert!(menu.jump_to_number(30.0, &numbers));
        assert_eq!(menu.selected(), 29);
        assert_eq!(menu.scroll(), 24); // selected - visible_rows / 2
        assert!(menu.window().contains(&29));
    }

    #[test]
    fn test_jump_near_end_clamps_scroll() {
        let numbers: Vec<f64> = (1..=12).map(|n| n as f64).collect();
        let mut menu = SelectionMenu::new(numbers.len(), 10);

        assert!(menu.jump_to_number(12.0, &numbers));
        assert_eq!(menu.selected(), 11);
        // scroll may not exceed len - visible_rows
        assert_eq!(menu.scroll(), 2);
        assert!(invariants_hold(&menu));
    }

    #[test]
    fn test_resume_to_missing_is_noop() {
        let numbers = vec![1.0, 2.0];
        let mut menu = SelectionMenu::new(numbers.len(), 5);
        assert!(!menu.resume_to(7.0, &numbers));
        assert_eq!(menu.selected(), 0);
    }

    #[test]
    fn test_resize_keeps_selection_visible() {
        let mut menu = SelectionMenu::new(30, 10);
        for _ in 0..15 {
            menu.move_down();
        }
        menu.set_visible_rows(4);
        assert!(invariants_hold(&menu));
        assert!(menu.window().contains(&menu.selected()));
    }

    #[test]
    fn test_with_selected_starts_centered() {
        let menu = SelectionMenu::with_selected(40, 10, 20);
        assert_eq!(menu.selected(), 20);
        assert!(menu.window().contains(&20));
    }
}
