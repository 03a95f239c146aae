use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
        supports_keyboard_enhancement,
    },
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use notepai_ai::{AiService, Backend, OpenAiConfig, OpenAiProvider, RemoteBackend};
use notepai_core::db;
use notepai_notepad::Notepad;
use notepai_notepad::executor::AiExecutor;

#[derive(Parser)]
#[command(name = "notepai")]
#[command(about = "A terminal notepad with AI autocomplete, quick edit and chat", long_about = None)]
#[command(version)]
struct Config {
    /// Base URL of a running notepai-server; the model is called directly
    /// when omitted
    #[arg(long, env = "NOTEPAI_ENDPOINT")]
    endpoint: Option<String>,

    /// Chat model used when calling the model directly
    #[arg(long, env = "NOTEPAI_MODEL")]
    model: Option<String>,

    /// Database file (defaults to the platform data directory)
    #[arg(long, env = "NOTEPAI_DB")]
    db: Option<PathBuf>,

    /// Log level written to notepai.log in the data directory
    #[arg(long, env = "NOTEPAI_LOG", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config.log_level)?;

    let conn = match &config.db {
        Some(path) => db::open_db_at(path)?,
        None => db::open_db()?,
    };
    let executor = AiExecutor::spawn(build_backend(&config)?)?;
    let mut notepad = Notepad::new(conn, executor)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Ctrl-Enter and Ctrl-Backspace are only distinguishable with this
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    let result = run_app(&mut terminal, &mut notepad);

    if let Err(e) = notepad.save_if_dirty() {
        warn!(error = %e, "failed to save note on exit");
    }

    // Restore terminal
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(level: &str) -> Result<()> {
    let path = db::data_dir()?.join("notepai.log");
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let level = level.to_lowercase();
    let filter = EnvFilter::try_new(format!(
        "notepai={level},notepai_notepad={level},notepai_ai={level},notepai_core={level}"
    ))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_backend(config: &Config) -> Result<Arc<dyn Backend>> {
    match &config.endpoint {
        Some(url) => {
            info!(%url, "using remote endpoints");
            Ok(Arc::new(RemoteBackend::new(url.clone())))
        }
        None => {
            let provider = OpenAiProvider::new(OpenAiConfig::from_env(config.model.clone()))
                .context("Set OPENAI_API_KEY or pass --endpoint")?;
            info!(model = provider.model(), "calling the model directly");
            Ok(Arc::new(AiService::new(provider)))
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    notepad: &mut Notepad,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(50);

    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            notepad.render(frame, area);
        })?;

        if notepad.should_quit() {
            return Ok(());
        }

        // Poll with timeout so debounce timers and replies keep moving
        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    notepad.handle_key(key);
                }
            }
        }

        notepad.tick();
    }
}
