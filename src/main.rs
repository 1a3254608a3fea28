//! Main entry point for the ani-tui application.

use ani_tui::api::CatalogClient;
use ani_tui::app::App;
use ani_tui::config::Config;
use ani_tui::error::{AppError, Result};
use ani_tui::history::WatchHistory;
use ani_tui::loading::run_with_loading;
use ani_tui::player::Player;
use ani_tui::ui::{self, Term, Theme};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, stdout};

/// Command-line arguments for the ani-tui application.
#[derive(Parser, Debug)]
#[command(
    name = "ani-tui",
    version,
    about = "A terminal anime streaming client",
    long_about = "Search, browse, and stream anime from the terminal: search or pick from \
                  the current season, choose an episode and quality, and watch or download."
)]
struct Args {
    /// Video player to use (overrides config and platform default)
    #[arg(short, long)]
    player: Option<String>,

    /// Directory for downloads
    #[arg(short, long, default_value = ".")]
    download_dir: String,

    /// Open on the currently-airing season instead of the search prompt
    #[arg(short, long)]
    featured: bool,

    /// Log verbosity level: 0=error, 1=warn, 2=info, 3=debug, 4=trace
    #[arg(short, long, default_value_t = 1)]
    log: u8,
}

/// Set up the terminal for TUI mode.
fn init_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}

async fn run(terminal: &mut Term, args: &Args, config: &Config) -> Result<()> {
    let theme = Theme::from_config(&config.theme);

    let api = run_with_loading(
        terminal,
        &theme,
        "Connecting to catalog...",
        CatalogClient::connect(),
    )
    .await?;

    let history = WatchHistory::load(WatchHistory::default_path()?);
    if !history.is_empty() {
        debug!("Loaded watch history from {}", history.path().display());
    }

    let player_override = args.player.clone().or_else(|| config.player.clone());
    let player = Player::resolve(player_override.as_deref(), &config.player_args)?;

    let mut app = App::new(config, api, history, player, args.featured);
    app.run(terminal).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    debug!("Log level set to {:?}", log_level);

    // Load config
    if let Err(e) = Config::create_default_if_missing() {
        warn!("Failed to write default config: {}", e);
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        Config::new()
    });

    // CLI args win over config
    if args.download_dir != "." {
        config.download_dir = args.download_dir.clone();
    }

    let mut terminal = init_terminal()?;
    let result = run(&mut terminal, &args, &config).await;

    // Show unexpected errors while the terminal is still ours, and wait
    // for an acknowledgement before tearing the screen down.
    if let Err(e) = &result {
        if !matches!(e, AppError::Interrupted) {
            let _ = ui::show_message(
                &mut terminal,
                &Theme::from_config(&config.theme),
                "Unexpected Error",
                &e.to_string(),
            );
        }
    }

    restore_terminal()?;

    match result {
        Ok(()) => {
            info!("Session ended");
            println!("Goodbye!");
            Ok(())
        }
        Err(AppError::Interrupted) => {
            println!("Interrupted. Goodbye!");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
