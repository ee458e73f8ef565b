use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use pulsepower::{
    access::{EnvKeyGate, KeyGate, OpenGate},
    app::{App, Flow},
    app_dirs::AppDirs,
    audio::{BellCueSink, CueSink, SilentCueSink},
    config::{Config, FileConfigStore},
    exercise::{default_catalog, load_catalog, Exercise},
    export::{CsvHistorySink, FormExportSink},
    imagery::HttpImageResolver,
    runtime::{AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    ui, TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// guided workout: pulse check, timed exercises, repeat rounds, pulse check again
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A guided terminal workout. Measures your pulse, walks you through a fixed exercise routine with preparation and exercise timers, offers up to three rounds, then measures your pulse again and lets you upload the result."
)]
pub struct Cli {
    /// silence the countdown beeps
    #[clap(long)]
    mute: bool,

    /// start without checking for an illustration api key
    #[clap(long)]
    skip_key_check: bool,

    /// load the exercise routine from a json file
    #[clap(short = 'e', long)]
    exercises: Option<PathBuf>,

    /// do not append finished sessions to the local history csv
    #[clap(long)]
    no_history: bool,

    /// log filter, e.g. "debug" or "pulsepower=trace"
    #[clap(long)]
    log_level: Option<String>,

    /// config file to use instead of the platform default
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Flags override whatever the config file says
    fn apply(&self, mut config: Config) -> Config {
        if self.mute {
            config.sound = false;
        }
        if self.skip_key_check {
            config.require_api_key = false;
        }
        if self.no_history {
            config.history_csv = false;
        }
        if let Some(path) = &self.exercises {
            config.exercises_path = Some(path.clone());
        }
        config
    }
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = cli
        .log_level
        .as_deref()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    // the terminal belongs to the TUI, so logs only go to a file
    let dir = AppDirs::log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "pulsepower.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Some(guard)
}

fn catalog(config: &Config) -> Vec<Exercise> {
    match &config.exercises_path {
        Some(path) => match load_catalog(path) {
            Ok(exercises) => exercises,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "falling back to built-in routine");
                default_catalog()
            }
        },
        None => default_catalog(),
    }
}

fn build_app(config: &Config, events: &impl AppEventSource) -> App {
    let cues: Box<dyn CueSink> = if config.sound {
        Box::new(BellCueSink)
    } else {
        Box::new(SilentCueSink)
    };
    let gate: Box<dyn KeyGate> = if config.require_api_key {
        Box::new(EnvKeyGate::new(config.api_key_env.clone()))
    } else {
        Box::new(OpenGate)
    };

    let workout = pulsepower::workout::Workout::new(catalog(config), cues);
    let mut app = App::new(workout, gate)
        .with_sink(Box::new(FormExportSink::new(config.form.clone())));

    if config.history_csv {
        if let Some(path) = AppDirs::history_path() {
            app = app.with_sink(Box::new(CsvHistorySink::with_path(path)));
        }
    }

    match HttpImageResolver::new() {
        Ok(resolver) => app.with_resolver(Arc::new(resolver), events.sender()),
        Err(e) => {
            warn!(error = %e, "image resolution disabled");
            app
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = init_logging(&cli);

    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = cli.apply(store.load_or_init());
    info!(config = %store.path().display(), "starting");

    let events = CrosstermEventSource::new();
    let mut app = build_app(&config, &events);
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let flow = app.on_event(runner.step());
        if flow == Flow::Quit {
            info!(stage = %app.stage(), "quit");
            break;
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
