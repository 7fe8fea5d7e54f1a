use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use eduplan::{
    Config, KeyValueStore, Planner, Profile, SqliteStore,
    cli::{self, Cli, Commands},
    outline::{GeminiClient, JsonOutlineService, OutlineService},
};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_with_profile(profile)?,
    };

    init_tracing(&config)?;
    tracing::info!(?profile, db = %config.get_database_path().display(), "starting eduplan");

    let store: Box<dyn KeyValueStore> = Box::new(SqliteStore::open(config.get_database_path())?);
    let mut planner = Planner::load(store)?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let service: Arc<dyn OutlineService> = match GeminiClient::from_config(&config.gemini) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error = %e, "remote service unavailable, imports expect JSON");
                    Arc::new(JsonOutlineService)
                }
            };
            let app = eduplan::tui::App::new(config, planner, service)?;
            eduplan::tui::run_event_loop(app)?;
        }
        Commands::Task(command) => cli::handle_task(command, &mut planner)?,
        Commands::Outstanding { query } => cli::handle_outstanding(query, &mut planner)?,
        Commands::Subject(command) => cli::handle_subject(command, &mut planner)?,
        Commands::Module(command) => cli::handle_module(command, &mut planner)?,
        Commands::Lesson(command) => cli::handle_lesson(command, &mut planner)?,
        Commands::Search { query } => cli::handle_search(&query, &mut planner)?,
        Commands::Import(args) => {
            let service: Box<dyn OutlineService> = if args.json {
                Box::new(JsonOutlineService)
            } else {
                Box::new(GeminiClient::from_config(&config.gemini)?)
            };
            cli::handle_import(args, service.as_ref(), &mut planner)?;
        }
        Commands::Outline { subject, topic } => {
            let client = GeminiClient::from_config(&config.gemini)?;
            cli::handle_outline(&subject, &topic, &client)?;
        }
    }

    Ok(())
}

/// Log to a file in the data directory; the TUI owns the terminal
fn init_tracing(config: &Config) -> Result<()> {
    let log_path = config.get_log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("opening log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("EDUPLAN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
