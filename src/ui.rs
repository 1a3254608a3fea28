//! Terminal rendering and interactive screen drivers.
//!
//! Everything that touches the terminal lives here: the generic menu
//! driver on top of [`SelectionMenu`], the search prompt, message panels
//! and the jump popup. Screens poll the keyboard at 50ms and redraw only
//! when a key actually changed state; a quiet keyboard costs nothing.

use crate::error::{AppError, Result};
use crate::keys::{self, Key};
use crate::menu::{MenuOutcome, SelectedAction, SelectionMenu};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use std::io::Stdout;
use std::time::{Duration, Instant};

pub type Term = Terminal<CrosstermBackend<Stdout>>;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const TRANSIENT_ERROR_MS: u64 = 1200;

/// Resolved UI colors, parsed once from the config color names.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub accent: Color,
    pub border: Color,
    pub highlight: Color,
}

impl Theme {
    /// Parse color names, falling back to the stock palette on anything
    /// ratatui does not recognize.
    pub fn from_config(cfg: &crate::config::ThemeConfig) -> Self {
        Self {
            accent: cfg.accent.parse().unwrap_or(Color::Magenta),
            border: cfg.border.parse().unwrap_or(Color::Cyan),
            highlight: cfg.highlight.parse().unwrap_or(Color::Yellow),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Magenta,
            border: Color::Cyan,
            highlight: Color::Yellow,
        }
    }
}

/// One selection screen, described declaratively. The orchestrator builds
/// one of these per menu and hands it to [`run_menu`].
pub struct MenuScreen<'a, T> {
    /// Block title.
    pub title: String,
    /// Key-hint line shown at the bottom.
    pub hint: String,
    pub items: &'a [T],
    /// Renders one row; receives whether the row is the selected one.
    pub render_item: Box<dyn Fn(&T, bool) -> Line<'static> + 'a>,
    /// Optional right-hand detail pane for the selected item.
    pub render_detail: Option<Box<dyn Fn(&T) -> Vec<Line<'static>> + 'a>>,
    /// Display numbers aligned with `items`; enables the `g` jump prompt.
    pub numbers: Option<Vec<f64>>,
    /// Display number of the remembered row; enables the `l` shortcut.
    pub resume_target: Option<f64>,
    /// Offer `d` (download) in addition to ENTER (watch).
    pub allow_download: bool,
    /// Row to open the menu on.
    pub initial_selected: usize,
}

impl<'a, T> MenuScreen<'a, T> {
    /// A plain menu with no detail pane, jump or resume handling.
    pub fn simple(
        title: &str,
        hint: &str,
        items: &'a [T],
        render_item: Box<dyn Fn(&T, bool) -> Line<'static> + 'a>,
    ) -> Self {
        Self {
            title: title.to_string(),
            hint: hint.to_string(),
            items,
            render_item,
            render_detail: None,
            numbers: None,
            resume_target: None,
            allow_download: false,
            initial_selected: 0,
        }
    }
}

/// Rows available to the list widget given the full terminal height:
/// one footer line plus two border rows come off the top.
fn menu_rows(total_height: u16) -> usize {
    total_height.saturating_sub(3).max(1) as usize
}

/// Drive one selection screen to its outcome.
///
/// ENTER selects (watch), `d` selects for download where offered, `b`
/// and backspace go back, `q`/ESC quit, `g` opens the jump prompt when
/// display numbers were supplied, `l` jumps to the remembered row.
/// Letter commands match case-insensitively. Ctrl-C surfaces
/// [`AppError::Interrupted`].
pub fn run_menu<T>(
    terminal: &mut Term,
    theme: &Theme,
    screen: &MenuScreen<'_, T>,
) -> Result<MenuOutcome> {
    if screen.items.is_empty() {
        return Ok(MenuOutcome::Back);
    }

    let rows = menu_rows(terminal.size()?.height);
    let mut menu = SelectionMenu::with_selected(screen.items.len(), rows, screen.initial_selected);
    let mut dirty = true;

    loop {
        if dirty {
            let rows = menu_rows(terminal.size()?.height);
            menu.set_visible_rows(rows);
            terminal.draw(|f| draw_menu(f, theme, screen, &menu))?;
            dirty = false;
        }

        let Some(key) = keys::poll_key(POLL_INTERVAL)? else {
            continue;
        };

        match key {
            Key::Interrupt => return Err(AppError::Interrupted),
            Key::Up => dirty = menu.move_up(),
            Key::Down => dirty = menu.move_down(),
            Key::Enter => {
                return Ok(MenuOutcome::Selected {
                    index: menu.selected(),
                    action: SelectedAction::Watch,
                });
            }
            Key::Esc => return Ok(MenuOutcome::Quit),
            Key::Backspace => return Ok(MenuOutcome::Back),
            k if k.is_command('q') => return Ok(MenuOutcome::Quit),
            k if k.is_command('b') => return Ok(MenuOutcome::Back),
            k if k.is_command('d') && screen.allow_download => {
                return Ok(MenuOutcome::Selected {
                    index: menu.selected(),
                    action: SelectedAction::Download,
                });
            }
            k if k.is_command('g') && screen.numbers.is_some() => {
                let numbers = screen.numbers.as_deref().unwrap_or(&[]);
                if let Some(target) = prompt_jump(terminal, theme, screen, &menu)? {
                    if !menu.jump_to_number(target, numbers) {
                        show_transient_error(
                            terminal,
                            theme,
                            &format!("No episode {}", fmt_number(target)),
                        )?;
                    }
                }
                dirty = true;
            }
            k if k.is_command('l') => {
                if let (Some(target), Some(numbers)) =
                    (screen.resume_target, screen.numbers.as_deref())
                {
                    menu.resume_to(target, numbers);
                    dirty = true;
                }
            }
            _ => {}
        }
    }
}

/// The search prompt. Returns the typed query, or `None` when the user
/// backed out with ESC.
pub fn prompt_search(terminal: &mut Term, theme: &Theme) -> Result<Option<String>> {
    let mut buffer = String::new();
    let mut dirty = true;

    loop {
        if dirty {
            terminal.draw(|f| {
                draw_input(
                    f,
                    theme,
                    "Search",
                    &buffer,
                    "Type a title and press ENTER · 'featured' for this season · ESC to exit",
                );
            })?;
            dirty = false;
        }

        let Some(key) = keys::poll_key(POLL_INTERVAL)? else {
            continue;
        };

        match key {
            Key::Interrupt => return Err(AppError::Interrupted),
            Key::Esc => return Ok(None),
            Key::Enter => {
                let query = buffer.trim().to_string();
                if query.is_empty() {
                    continue;
                }
                return Ok(Some(query));
            }
            Key::Backspace => {
                buffer.pop();
                dirty = true;
            }
            Key::Char(c) => {
                buffer.push(c);
                dirty = true;
            }
            _ => {}
        }
    }
}

/// Dismissible message panel. Blocks until ENTER, ESC or `q`.
pub fn show_message(terminal: &mut Term, theme: &Theme, title: &str, body: &str) -> Result<()> {
    terminal.draw(|f| draw_message(f, theme, title, body))?;

    loop {
        let Some(key) = keys::poll_key(POLL_INTERVAL)? else {
            continue;
        };
        match key {
            Key::Interrupt => return Err(AppError::Interrupted),
            Key::Enter | Key::Esc => return Ok(()),
            k if k.is_command('q') => return Ok(()),
            _ => {}
        }
    }
}

/// Short-lived error popup that dismisses itself (or on any key).
fn show_transient_error(terminal: &mut Term, theme: &Theme, text: &str) -> Result<()> {
    terminal.draw(|f| draw_message(f, theme, "Not found", text))?;
    let deadline = Instant::now() + Duration::from_millis(TRANSIENT_ERROR_MS);
    while Instant::now() < deadline {
        if let Some(key) = keys::poll_key(POLL_INTERVAL)? {
            if key == Key::Interrupt {
                return Err(AppError::Interrupted);
            }
            break;
        }
    }
    Ok(())
}

/// Numeric input popup for the `g` jump. Returns the parsed target, or
/// `None` when cancelled or unparseable input was submitted empty.
fn prompt_jump<T>(
    terminal: &mut Term,
    theme: &Theme,
    screen: &MenuScreen<'_, T>,
    menu: &SelectionMenu,
) -> Result<Option<f64>> {
    let mut buffer = String::new();
    let mut dirty = true;

    loop {
        if dirty {
            terminal.draw(|f| {
                draw_menu(f, theme, screen, menu);
                draw_jump_popup(f, theme, &buffer);
            })?;
            dirty = false;
        }

        let Some(key) = keys::poll_key(POLL_INTERVAL)? else {
            continue;
        };

        match key {
            Key::Interrupt => return Err(AppError::Interrupted),
            Key::Esc => return Ok(None),
            Key::Enter => {
                if buffer.is_empty() {
                    return Ok(None);
                }
                match buffer.parse::<f64>() {
                    Ok(n) if n.is_finite() => return Ok(Some(n)),
                    _ => {
                        show_transient_error(terminal, theme, "Enter a number")?;
                        buffer.clear();
                        dirty = true;
                    }
                }
            }
            Key::Backspace => {
                buffer.pop();
                dirty = true;
            }
            Key::Char(c) if c.is_ascii_digit() || c == '.' => {
                buffer.push(c);
                dirty = true;
            }
            _ => {}
        }
    }
}

/// Spinner panel drawn by the task runner while a background call runs.
pub(crate) fn draw_spinner(f: &mut ratatui::Frame, theme: &Theme, message: &str, frame: char) {
    let area = centered_rect(50, 20, f.area());
    let text = Line::from(vec![
        Span::styled(
            format!("{} ", frame),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(message.to_string()),
    ]);
    let panel = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border)),
    );
    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn draw_menu<T>(
    f: &mut ratatui::Frame,
    theme: &Theme,
    screen: &MenuScreen<'_, T>,
    menu: &SelectionMenu,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let (list_area, detail_area) = if screen.render_detail.is_some() {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[0]);
        (panes[0], Some(panes[1]))
    } else {
        (chunks[0], None)
    };

    let items: Vec<ListItem> = menu
        .window()
        .map(|i| {
            let selected = i == menu.selected();
            let line = (screen.render_item)(&screen.items[i], selected);
            let item = ListItem::new(line);
            if selected {
                item.style(
                    Style::default()
                        .fg(theme.highlight)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                item
            }
        })
        .collect();

    let title = format!(
        " {} ({}/{}) ",
        screen.title,
        menu.selected() + 1,
        menu.len()
    );
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(list, list_area);

    if let (Some(area), Some(render_detail)) = (detail_area, screen.render_detail.as_ref()) {
        let lines = render_detail(&screen.items[menu.selected()]);
        let detail = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(" Details "),
        );
        f.render_widget(detail, area);
    }

    let footer = Paragraph::new(screen.hint.clone())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[1]);
}

fn draw_input(f: &mut ratatui::Frame, theme: &Theme, title: &str, buffer: &str, hint: &str) {
    let area = centered_rect(60, 25, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(area);

    let input = Paragraph::new(format!("> {}\u{2588}", buffer)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .title(Span::styled(
                format!(" {} ", title),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(Clear, area);
    f.render_widget(input, chunks[0]);

    let hint = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[1]);
}

fn draw_jump_popup(f: &mut ratatui::Frame, theme: &Theme, buffer: &str) {
    let area = centered_rect(30, 15, f.area());
    let popup = Paragraph::new(format!("Episode: {}\u{2588}", buffer)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.highlight))
            .title(" Jump "),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn draw_message(f: &mut ratatui::Frame, theme: &Theme, title: &str, body: &str) {
    let area = centered_rect(55, 30, f.area());
    let text = vec![
        Line::from(body.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press ENTER to continue",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let panel = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(Span::styled(
                    format!(" {} ", title),
                    Style::default()
                        .fg(theme.accent)
                        .add_modifier(Modifier::BOLD),
                )),
        );
    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

/// Create a centered rectangle with the given percentage of the area.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeConfig;

    #[test]
    fn test_theme_parses_known_colors() {
        let cfg = ThemeConfig {
            accent: "red".to_string(),
            border: "blue".to_string(),
            highlight: "green".to_string(),
        };
        let theme = Theme::from_config(&cfg);
        assert_eq!(theme.accent, Color::Red);
        assert_eq!(theme.border, Color::Blue);
        assert_eq!(theme.highlight, Color::Green);
    }

    #[test]
    fn test_theme_falls_back_on_unknown_color() {
        let cfg = ThemeConfig {
            accent: "not-a-color".to_string(),
            border: "cyan".to_string(),
            highlight: "yellow".to_string(),
        };
        let theme = Theme::from_config(&cfg);
        assert_eq!(theme.accent, Color::Magenta);
    }

    #[test]
    fn test_menu_rows_reserves_chrome() {
        assert_eq!(menu_rows(24), 21);
        assert_eq!(menu_rows(3), 1); // never zero
        assert_eq!(menu_rows(0), 1);
    }

    #[test]
    fn test_centered_rect_is_contained() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, outer);
        assert!(inner.width <= outer.width);
        assert!(inner.height <= outer.height);
        assert!(inner.x >= outer.x && inner.y >= outer.y);
    }
}
