// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use opsboard_sync::{DataCache, Fetcher, FileStore, PollScheduler, SignalSource, SyncConfig};

mod app;
mod config;
mod data;
mod events;
mod source;
mod ui;

use app::{App, BoardUpdate, SyncSnapshot};
use config::{BoardConfig, Profile};
use data::Board;
use source::Source;

/// First screen row holding a record: header bar, table border, column header.
const CONTENT_START_ROW: u16 = 3;

#[derive(Parser, Debug)]
#[command(name = "opsboard")]
#[command(about = "Terminal dashboard for spreadsheet-backed work queues")]
struct Args {
    /// Config file (TOML). Defaults to ./opsboard.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board preset
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,

    /// Values API URL to poll
    #[arg(short, long, conflicts_with = "file")]
    url: Option<String>,

    /// Read a local JSON values file instead of the network
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory for last-known-good backups
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run one forced refresh, write the board as JSON and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    /// Flags win over file and environment settings.
    fn apply(&self, config: &mut BoardConfig) {
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if let Some(ref url) = self.url {
            config.source.url = Some(url.clone());
            config.source.file = None;
        }
        if let Some(ref file) = self.file {
            config.source.file = Some(file.clone());
        }
        if let Some(ref dir) = self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(ref path) = self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = BoardConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    init_logging(config.log_file.as_deref(), args.export.is_some())?;

    let sync_config = config.sync_config()?;
    let source = Source::from_config(&config.source)?;
    info!(source = source.description(), key = %sync_config.key, "Starting opsboard");

    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let cache = build_cache(source, sync_config, config.cache_dir.as_deref());

    if let Some(export_path) = args.export {
        return rt.block_on(export_board(cache, &config, &export_path));
    }

    run_tui(cache, &config)
}

/// Install the tracing subscriber.
///
/// Logs go to the configured file. Without one, export mode logs to stderr
/// and the interactive UI runs without logging.
fn init_logging(log_file: Option<&Path>, export: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None if export => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

/// Build the cache, with a file-backed fallback store when a cache dir is set.
fn build_cache(source: Source, sync_config: SyncConfig, cache_dir: Option<&Path>) -> DataCache<Source> {
    let builder = DataCache::builder(source).config(sync_config);
    match cache_dir {
        Some(dir) => builder.store(Arc::new(FileStore::new(dir))).build(),
        None => builder.build(),
    }
}

/// One forced refresh written to `export_path`.
///
/// Fails, and so exits non-zero, when no data could be obtained at all.
async fn export_board(cache: DataCache<Source>, config: &BoardConfig, export_path: &Path) -> Result<()> {
    let scheduler = PollScheduler::builder(cache).build();
    let dataset = scheduler.force_update().await?;

    let board = Board::build(&dataset, &config.priority_rules());
    let export = board.export(scheduler.cache().source_description(), scheduler.status());
    let json = serde_json::to_string_pretty(&export)?;
    tokio::fs::write(export_path, json)
        .await
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    if let Some(err) = scheduler.cache().last_error() {
        warn!(error = %err, "Exported data is not fresh");
    }
    println!(
        "Exported {} records ({}) to: {}",
        board.len(),
        scheduler.status(),
        export_path.display()
    );
    Ok(())
}

/// Run the TUI against a polling scheduler.
fn run_tui(cache: DataCache<Source>, config: &BoardConfig) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let signals = SignalSource::new();

    let update_tx = tx.clone();
    let scheduler = Arc::new(
        PollScheduler::builder(cache)
            .signals(signals.clone())
            .on_update(move |dataset| {
                let _ = update_tx.send(BoardUpdate::Dataset(dataset));
            })
            .build(),
    );

    let mut app = App::new(
        scheduler.cache().source_description(),
        config.priority_rules(),
        signals,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableFocusChange);
        original_hook(panic);
    }));

    scheduler.start();

    let result = run_app(&mut terminal, &mut app, &scheduler, &tx, &mut rx);

    scheduler.stop();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    scheduler: &Arc<PollScheduler<Source>>,
    tx: &mpsc::UnboundedSender<BoardUpdate>,
    rx: &mut mpsc::UnboundedReceiver<BoardUpdate>,
) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        while let Ok(update) = rx.try_recv() {
            app.apply_update(update);
        }
        app.set_sync(snapshot(scheduler));

        if app.take_sync_request() {
            spawn_sync(scheduler.clone(), tx.clone());
        }

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered =
                    ratatui::layout::Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(8),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::board::render(frame, app, chunks[1]);
            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            events::handle_event(app, event, CONTENT_START_ROW);
        }
    }

    Ok(())
}

/// Sample engine health for the header and status bar.
fn snapshot(scheduler: &PollScheduler<Source>) -> SyncSnapshot {
    let cache = scheduler.cache();
    SyncSnapshot {
        status: cache.status(),
        data_age: cache
            .peek()
            .and_then(|read| read.fetched_at)
            .map(|at| at.elapsed()),
        last_error: cache.last_error().map(|e| e.to_string()),
    }
}

/// Run a Sync Now in the background and report back to the UI thread.
fn spawn_sync(scheduler: Arc<PollScheduler<Source>>, tx: mpsc::UnboundedSender<BoardUpdate>) {
    tokio::spawn(async move {
        let result = scheduler
            .force_update()
            .await
            .map(|dataset| dataset.len())
            .map_err(|e| e.to_string());
        let _ = tx.send(BoardUpdate::SyncFinished(result));
    });
}
