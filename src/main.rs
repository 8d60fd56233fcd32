mod api;
mod app;
mod canvas;
mod config;
mod diagram;
mod storage;
mod store;
mod types;
mod ui;
mod worker;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::{Connection, Settings, DEFAULT_INSTANCE_URL};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use storage::{MemoryStorage, SqliteStorage, Storage};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

#[derive(Parser)]
#[command(name = "bdm")]
#[command(about = "Design Business Data Models from remote storage tables in the terminal")]
struct Cli {
    /// Storage API token; skips the connect dialog
    #[arg(long, env = "BDM_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Storage API instance URL
    #[arg(long, env = "BDM_API_URL", default_value = DEFAULT_INSTANCE_URL)]
    url: String,

    /// Directory for the saved diagram, connection and log file
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// File used by diagram export and import
    #[arg(long, value_name = "FILE", default_value = "bdm-export.json")]
    export_path: PathBuf,

    /// Do not reconnect with the remembered credential on startup
    #[arg(long)]
    no_reconnect: bool,
}

impl Cli {
    fn into_settings(self) -> Settings {
        Settings {
            data_dir: self.data_dir.unwrap_or_else(config::default_data_dir),
            export_path: self.export_path,
            reconnect: !self.no_reconnect,
            connection: self.token.map(|token| Connection::new(token, self.url)),
        }
    }
}

fn main() -> Result<()> {
    let settings = Cli::parse().into_settings();
    fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            settings.data_dir.display()
        )
    })?;

    // Flushes buffered log lines when dropped, so it lives until the UI exits
    let _log_guard = init_logging(&settings)?;

    run_tui(settings)
}

/// Background writer appending to the log file in `dir`
fn log_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(config::LOG_FILE)
        .build(dir)
        .with_context(|| format!("Failed to create log file in {}", dir.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Log to a file in the data directory; stdout belongs to the terminal UI
fn init_logging(settings: &Settings) -> Result<WorkerGuard> {
    let (writer, guard) = log_writer(&settings.data_dir)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn open_storage(settings: &Settings) -> Box<dyn Storage> {
    match SqliteStorage::open(settings.storage_path()) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            tracing::warn!("Local storage unavailable, nothing will persist: {}", e);
            Box::new(MemoryStorage::new())
        }
    }
}

fn run_tui(settings: Settings) -> Result<()> {
    let worker = worker::Worker::new()?;
    let mut app = App::new(worker, open_storage(&settings), settings.export_path.clone());
    app.startup(settings.connection.clone(), settings.reconnect);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    // Main event loop
    loop {
        let size = terminal.size()?;
        app.set_canvas_area(ui::canvas_area(size, &app));
        terminal.draw(|f| ui::render(f, &app))?;

        if app.should_quit() {
            break;
        }

        // Process worker responses
        app.process_worker_responses();

        // Handle input and resize events
        if event::poll(std::time::Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    app.handle_key_event(key);
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                _ => {}
            }
        }
    }

    // Cleanup
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.shutdown()?;

    Ok(())
}
