//! Application orchestrator.
//!
//! Drives the whole session as a loop over screens:
//! search -> anime list -> episode list -> quality list -> playback ->
//! post-watch. Every screen resolves to a [`MenuOutcome`]; `Back` pops
//! exactly one level, `Quit` unwinds the session immediately. Remote
//! failures surface here as dismissible message panels; only interrupts
//! and genuinely unexpected errors escape to `main`.

use crate::api::CatalogClient;
use crate::config::Config;
use crate::download;
use crate::error::{AppError, Result};
use crate::history::WatchHistory;
use crate::loading::run_with_loading;
use crate::menu::{MenuOutcome, SelectedAction};
use crate::player::{PlaybackOutcome, Player};
use crate::types::{self, AnimeResult, Episode, QualityOption};
use crate::ui::{self, MenuScreen, Term, Theme};
use log::{debug, info, warn};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use std::path::PathBuf;

const ANIME_HINT: &str = "↑↓ move · ENTER select · b back · q quit";
const EPISODE_HINT: &str = "↑↓ move · ENTER watch · g jump to episode · l last watched · b back · q quit";
const QUALITY_HINT: &str = "ENTER watch · d download · b back · q quit";
const POST_WATCH_HINT: &str = "↑↓ move · ENTER select · b episode list · q quit";

/// What the user typed at the search prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchCommand {
    Query(String),
    Featured,
    Quit,
}

fn classify_query(raw: &str) -> SearchCommand {
    match raw.trim().to_lowercase().as_str() {
        "q" | "quit" | "exit" => SearchCommand::Quit,
        "featured" | "airing" => SearchCommand::Featured,
        _ => SearchCommand::Query(raw.trim().to_string()),
    }
}

/// Where a completed search call sends the Search screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// Non-empty results: open the list screen on them.
    Browse(Vec<AnimeResult>),
    /// Zero hits: show a message and stay on the prompt.
    NoResults,
}

/// Decide the next screen from a search result set. Zero hits are a
/// normal outcome, not an error.
pub fn search_step(results: Vec<AnimeResult>) -> SearchStep {
    if results.is_empty() {
        SearchStep::NoResults
    } else {
        SearchStep::Browse(results)
    }
}

/// The catalog hit a bridged feed record resolves to: the first match,
/// or `None` when the catalog has nothing under that title.
pub fn bridge_pick(matches: Vec<AnimeResult>) -> Option<AnimeResult> {
    matches.into_iter().next()
}

/// Post-watch menu rows, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostWatchChoice {
    Next,
    Previous,
    Replay,
    BackToList,
}

impl PostWatchChoice {
    const LABELS: [&'static str; 4] = [
        "Next episode",
        "Previous episode",
        "Replay",
        "Back to episode list",
    ];

    fn from_index(index: usize) -> Self {
        match index {
            0 => PostWatchChoice::Next,
            1 => PostWatchChoice::Previous,
            2 => PostWatchChoice::Replay,
            _ => PostWatchChoice::BackToList,
        }
    }
}

/// How a sub-flow hands control back to its parent.
enum Flow {
    Back,
    Quit,
}

/// Where the playback flow leaves the episode list: reopened on `0`'s
/// row, or the whole session ends.
enum PlayResult {
    Back(usize),
    Quit,
}

/// Catch the session-level errors: interrupts and I/O problems
/// propagate, everything else becomes a dismissible panel and a `None`.
fn dismiss_on_error<T>(terminal: &mut Term, theme: &Theme, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ (AppError::Interrupted | AppError::Io(_) | AppError::Internal(_))) => Err(e),
        Err(e) => {
            warn!("Recoverable error: {}", e);
            ui::show_message(terminal, theme, "Error", &e.to_string())?;
            Ok(None)
        }
    }
}

/// The orchestrator. All collaborators are constructed in `main` and
/// passed in; nothing here reaches for globals.
pub struct App {
    theme: Theme,
    api: CatalogClient,
    history: WatchHistory,
    player: Player,
    download_dir: PathBuf,
    start_featured: bool,
}

impl App {
    pub fn new(
        config: &Config,
        api: CatalogClient,
        history: WatchHistory,
        player: Player,
        start_featured: bool,
    ) -> Self {
        Self {
            theme: Theme::from_config(&config.theme),
            api,
            history,
            player,
            download_dir: PathBuf::from(&config.download_dir),
            start_featured,
        }
    }

    /// Run the session until the user quits.
    pub async fn run(&mut self, terminal: &mut Term) -> Result<()> {
        let mut open_featured = self.start_featured;

        loop {
            let results = if open_featured {
                open_featured = false;
                self.fetch_featured(terminal).await?
            } else {
                match ui::prompt_search(terminal, &self.theme)? {
                    None => return Ok(()),
                    Some(raw) => match classify_query(&raw) {
                        SearchCommand::Quit => return Ok(()),
                        SearchCommand::Featured => self.fetch_featured(terminal).await?,
                        SearchCommand::Query(query) => self.fetch_search(terminal, &query).await?,
                    },
                }
            };

            let Some(results) = results else {
                continue;
            };
            let results = match search_step(results) {
                SearchStep::NoResults => {
                    ui::show_message(
                        terminal,
                        &self.theme,
                        "No Results",
                        "Nothing matched. Try another title.",
                    )?;
                    continue;
                }
                SearchStep::Browse(results) => results,
            };

            match self.anime_flow(terminal, results).await? {
                Flow::Quit => return Ok(()),
                Flow::Back => continue,
            }
        }
    }

    async fn fetch_search(
        &mut self,
        terminal: &mut Term,
        query: &str,
    ) -> Result<Option<Vec<AnimeResult>>> {
        let api = self.api.clone();
        let query_owned = query.to_string();
        let result = run_with_loading(
            terminal,
            &self.theme,
            &format!("Searching for \"{}\"...", query),
            async move { api.search(&query_owned).await },
        )
        .await;
        dismiss_on_error(terminal, &self.theme, result)
    }

    async fn fetch_featured(&mut self, terminal: &mut Term) -> Result<Option<Vec<AnimeResult>>> {
        let api = self.api.clone();
        let result = run_with_loading(
            terminal,
            &self.theme,
            "Loading this season...",
            async move { api.season_now().await },
        )
        .await;
        dismiss_on_error(terminal, &self.theme, result)
    }

    /// The anime list screen. Selecting an unresolved (feed-sourced)
    /// record bridges it against the primary catalog by English title,
    /// taking the first hit.
    async fn anime_flow(&mut self, terminal: &mut Term, results: Vec<AnimeResult>) -> Result<Flow> {
        let mut current = 0usize;

        loop {
            let screen = anime_screen(&results, &self.theme, current);
            let index = match ui::run_menu(terminal, &self.theme, &screen)? {
                MenuOutcome::Quit => return Ok(Flow::Quit),
                MenuOutcome::Back => return Ok(Flow::Back),
                MenuOutcome::Selected { index, .. } => index,
            };
            current = index;

            let picked = results[index].clone();
            let anime = if picked.is_unresolved() {
                match self.bridge_record(terminal, &picked).await? {
                    Some(resolved) => resolved,
                    None => continue,
                }
            } else {
                picked
            };

            let api = self.api.clone();
            let anime_id = anime.id.clone();
            let loaded = run_with_loading(
                terminal,
                &self.theme,
                "Loading episodes...",
                async move { api.load_episodes(&anime_id).await },
            )
            .await;
            let Some(episodes) = dismiss_on_error(terminal, &self.theme, loaded)? else {
                continue;
            };
            if episodes.is_empty() {
                ui::show_message(
                    terminal,
                    &self.theme,
                    "No Episodes",
                    "This title has no episodes available yet.",
                )?;
                continue;
            }

            match self.episode_flow(terminal, &anime, episodes).await? {
                Flow::Quit => return Ok(Flow::Quit),
                Flow::Back => continue,
            }
        }
    }

    /// Re-search the primary catalog for a feed record that carries no
    /// id. The first match wins; titles are assumed close enough that
    /// the top hit is the right one.
    async fn bridge_record(
        &mut self,
        terminal: &mut Term,
        record: &AnimeResult,
    ) -> Result<Option<AnimeResult>> {
        debug!("Bridging feed record '{}'", record.title_en);
        let api = self.api.clone();
        let title = record.title_en.clone();
        let result = run_with_loading(
            terminal,
            &self.theme,
            &format!("Looking up \"{}\"...", record.title_en),
            async move { api.search(&title).await },
        )
        .await;
        let Some(matches) = dismiss_on_error(terminal, &self.theme, result)? else {
            return Ok(None);
        };
        match bridge_pick(matches) {
            Some(hit) => Ok(Some(hit)),
            None => {
                ui::show_message(
                    terminal,
                    &self.theme,
                    "Not Found",
                    &format!("\"{}\" is not in the catalog yet.", record.title_en),
                )?;
                Ok(None)
            }
        }
    }

    /// The episode list screen. The remembered last-watched episode (by
    /// display number) is marked and reachable with `l`.
    async fn episode_flow(
        &mut self,
        terminal: &mut Term,
        anime: &AnimeResult,
        episodes: Vec<Episode>,
    ) -> Result<Flow> {
        let numbers: Vec<f64> = episodes.iter().map(|e| e.display.value()).collect();
        let mut current = 0usize;

        loop {
            let resume = self
                .history
                .get_last_watched(&anime.id)
                .and_then(|s| s.parse::<f64>().ok());
            let screen = episode_screen(anime, &episodes, &numbers, resume, current);

            let index = match ui::run_menu(terminal, &self.theme, &screen)? {
                MenuOutcome::Quit => return Ok(Flow::Quit),
                MenuOutcome::Back => return Ok(Flow::Back),
                MenuOutcome::Selected { index, .. } => index,
            };

            match self.play_flow(terminal, anime, &episodes, index).await? {
                PlayResult::Quit => return Ok(Flow::Quit),
                PlayResult::Back(at) => {
                    current = at;
                    continue;
                }
            }
        }
    }

    /// Quality selection, link resolution, playback/download, and the
    /// post-watch menu, looping while the user steps between episodes.
    async fn play_flow(
        &mut self,
        terminal: &mut Term,
        anime: &AnimeResult,
        episodes: &[Episode],
        mut index: usize,
    ) -> Result<PlayResult> {
        'episode: loop {
            let episode = &episodes[index];

            let api = self.api.clone();
            let anime_id = anime.id.clone();
            let raw = episode.raw_number.clone();
            let loaded = run_with_loading(
                terminal,
                &self.theme,
                &format!("Loading servers for episode {}...", episode.display),
                async move { api.load_servers(&anime_id, &raw).await },
            )
            .await;
            let Some(servers) = dismiss_on_error(terminal, &self.theme, loaded)? else {
                return Ok(PlayResult::Back(index));
            };

            let qualities = types::available_qualities(&servers);
            if qualities.is_empty() {
                ui::show_message(
                    terminal,
                    &self.theme,
                    "No Sources",
                    &format!("Episode {} has no playable sources right now.", episode.display),
                )?;
                return Ok(PlayResult::Back(index));
            }

            let mut quality_cursor = 0usize;
            loop {
                let screen = quality_screen(anime, episode, &qualities, quality_cursor);
                let (choice, action) = match ui::run_menu(terminal, &self.theme, &screen)? {
                    MenuOutcome::Quit => return Ok(PlayResult::Quit),
                    MenuOutcome::Back => return Ok(PlayResult::Back(index)),
                    MenuOutcome::Selected { index, action } => (index, action),
                };
                quality_cursor = choice;

                // Present key guaranteed by available_qualities().
                let server_id = servers
                    .get(qualities[choice].server_key)
                    .ok_or_else(|| AppError::Internal("quality key vanished".to_string()))?
                    .to_string();

                let api = self.api.clone();
                let resolved = run_with_loading(
                    terminal,
                    &self.theme,
                    "Resolving stream link...",
                    async move { api.resolve_direct_link(&server_id).await },
                )
                .await;
                let Some(url) = dismiss_on_error(terminal, &self.theme, resolved)? else {
                    continue;
                };

                let completed = match action {
                    SelectedAction::Watch => self.watch(terminal, anime, episode, &url)?,
                    SelectedAction::Download => {
                        self.download(terminal, anime, episode, &url).await?
                    }
                };
                if !completed {
                    continue;
                }

                self.history
                    .mark_watched(&anime.id, &episode.display.to_string(), &anime.title_en)?;
                info!(
                    "Marked {} episode {} as watched",
                    anime.title_en, episode.display
                );

                match self.post_watch(terminal, episodes, index)? {
                    PostWatchStep::Continue(next) => {
                        index = next;
                        continue 'episode;
                    }
                    PostWatchStep::Back => return Ok(PlayResult::Back(index)),
                    PostWatchStep::Quit => return Ok(PlayResult::Quit),
                }
            }
        }
    }

    /// Launch the player and block until it exits. Returns whether the
    /// watch counts as completed (and so gets recorded).
    fn watch(
        &mut self,
        terminal: &mut Term,
        anime: &AnimeResult,
        episode: &Episode,
        url: &str,
    ) -> Result<bool> {
        let title = format!("{} - Episode {}", anime.title_en, episode.display);
        let outcome = match self.player.play(url, &title) {
            Ok(outcome) => outcome,
            Err(e @ AppError::Player(_)) => {
                ui::show_message(terminal, &self.theme, "Player Error", &e.to_string())?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        terminal.clear()?;
        match outcome {
            PlaybackOutcome::Completed => Ok(true),
            PlaybackOutcome::Failed(code) => {
                ui::show_message(
                    terminal,
                    &self.theme,
                    "Playback Failed",
                    &format!("The player exited with code {}.", code),
                )?;
                Ok(false)
            }
        }
    }

    /// Stream the resolved link to the download directory.
    async fn download(
        &mut self,
        terminal: &mut Term,
        anime: &AnimeResult,
        episode: &Episode,
        url: &str,
    ) -> Result<bool> {
        let path = download::get_output_path(&self.download_dir, &anime.title_en, episode.display);
        let url = url.to_string();
        let target = path.clone();
        let result = run_with_loading(
            terminal,
            &self.theme,
            &format!("Downloading episode {}...", episode.display),
            async move { download::download_file(&url, &target).await },
        )
        .await;
        // Download failures are recoverable even when they surface as IO.
        let ok = match result {
            Ok(()) => true,
            Err(AppError::Interrupted) => return Err(AppError::Interrupted),
            Err(e) => {
                warn!("Download failed: {}", e);
                ui::show_message(terminal, &self.theme, "Download Failed", &e.to_string())?;
                false
            }
        };
        if ok {
            ui::show_message(
                terminal,
                &self.theme,
                "Download Complete",
                &format!("Saved to {}", path.display()),
            )?;
        }
        Ok(ok)
    }

    fn post_watch(
        &mut self,
        terminal: &mut Term,
        episodes: &[Episode],
        index: usize,
    ) -> Result<PostWatchStep> {
        let labels = PostWatchChoice::LABELS;
        let screen = MenuScreen::simple(
            "What next?",
            POST_WATCH_HINT,
            &labels,
            Box::new(|label: &&str, _| Line::from(label.to_string())),
        );

        let choice = match ui::run_menu(terminal, &self.theme, &screen)? {
            MenuOutcome::Quit => return Ok(PostWatchStep::Quit),
            MenuOutcome::Back => return Ok(PostWatchStep::Back),
            MenuOutcome::Selected { index, .. } => PostWatchChoice::from_index(index),
        };

        if choice == PostWatchChoice::BackToList {
            return Ok(PostWatchStep::Back);
        }
        match step_target(choice, index, episodes.len()) {
            Some(next) => Ok(PostWatchStep::Continue(next)),
            None => {
                let (title, body) = if choice == PostWatchChoice::Next {
                    ("End of List", "That was the last episode.")
                } else {
                    ("Start of List", "Already at the first episode.")
                };
                ui::show_message(terminal, &self.theme, title, body)?;
                Ok(PostWatchStep::Back)
            }
        }
    }
}

/// Which episode index a post-watch choice moves to. `None` means the
/// move is blocked at a list boundary (or goes back to the list).
fn step_target(choice: PostWatchChoice, index: usize, len: usize) -> Option<usize> {
    match choice {
        PostWatchChoice::Next => (index + 1 < len).then(|| index + 1),
        PostWatchChoice::Previous => index.checked_sub(1),
        PostWatchChoice::Replay => Some(index),
        PostWatchChoice::BackToList => None,
    }
}

enum PostWatchStep {
    Continue(usize),
    Back,
    Quit,
}

fn anime_screen<'a>(
    results: &'a [AnimeResult],
    theme: &Theme,
    initial: usize,
) -> MenuScreen<'a, AnimeResult> {
    let accent = theme.accent;
    let mut screen = MenuScreen::simple(
        "Results",
        ANIME_HINT,
        results,
        Box::new(|a: &AnimeResult, _| {
            let mut spans = vec![Span::raw(a.title_en.clone())];
            if a.is_unresolved() {
                spans.push(Span::styled(
                    "  (seasonal)",
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
            Line::from(spans)
        }),
    );
    screen.initial_selected = initial;
    screen.render_detail = Some(Box::new(move |a: &AnimeResult| {
        let label = |text: &str| {
            Span::styled(
                format!("{:<12}", text),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            )
        };
        vec![
            Line::from(Span::styled(
                a.title_en.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(a.title_jp.clone()),
            Line::from(""),
            Line::from(vec![label("Type"), Span::raw(a.kind.clone())]),
            Line::from(vec![label("Episodes"), Span::raw(a.episodes.clone())]),
            Line::from(vec![label("Status"), Span::raw(a.status.clone())]),
            Line::from(vec![label("Genres"), Span::raw(a.genres.clone())]),
            Line::from(vec![label("Score"), Span::raw(a.score.clone())]),
            Line::from(vec![label("Rank"), Span::raw(a.rank.clone())]),
            Line::from(vec![label("Popularity"), Span::raw(a.popularity.clone())]),
            Line::from(vec![label("Rating"), Span::raw(a.rating.clone())]),
            Line::from(vec![label("Premiered"), Span::raw(a.premiered.clone())]),
            Line::from(vec![label("Studios"), Span::raw(a.studios.clone())]),
            Line::from(vec![label("Duration"), Span::raw(a.duration.clone())]),
        ]
    }));
    screen
}

fn episode_screen<'a>(
    anime: &AnimeResult,
    episodes: &'a [Episode],
    numbers: &[f64],
    resume: Option<f64>,
    initial: usize,
) -> MenuScreen<'a, Episode> {
    let mut screen = MenuScreen::simple(
        &format!("{} - Episodes", anime.title_en),
        EPISODE_HINT,
        episodes,
        Box::new(move |ep: &Episode, _| {
            let watched = resume.is_some_and(|t| ep.display.matches(t));
            if watched {
                Line::from(vec![
                    Span::raw(format!("Episode {}", ep.to_display())),
                    Span::styled(
                        "  👁 [Last Watched]",
                        Style::default().add_modifier(Modifier::DIM),
                    ),
                ])
            } else {
                Line::from(format!("Episode {}", ep.to_display()))
            }
        }),
    );
    screen.numbers = Some(numbers.to_vec());
    screen.resume_target = resume;
    screen.initial_selected = initial;
    screen
}

fn quality_screen<'a>(
    anime: &AnimeResult,
    episode: &Episode,
    qualities: &'a [QualityOption],
    initial: usize,
) -> MenuScreen<'a, QualityOption> {
    let mut screen = MenuScreen::simple(
        &format!("{} - Episode {} - Quality", anime.title_en, episode.display),
        QUALITY_HINT,
        qualities,
        Box::new(|q: &QualityOption, _| Line::from(q.label.to_string())),
    );
    screen.allow_download = true;
    screen.initial_selected = initial;
    screen
}
