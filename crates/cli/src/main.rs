mod settings_commands;
mod simulate_commands;

use std::path::PathBuf;

use {
    avc_config::{FileSettingsStore, SettingsStore},
    avc_engine::{format_time, glob_matches, page_qualifies},
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "avc", about = "avc: alternative video controls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Settings file (overrides ./avc.json and ~/.config/avc/avc.json).
    #[arg(long, global = true, env = "AVC_SETTINGS")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit stored settings.
    Settings {
        #[command(subcommand)]
        action: settings_commands::SettingsAction,
    },
    /// Report whether the controls would run on a page.
    Check { url: String },
    /// Test a single URL pattern against an input.
    Glob { pattern: String, input: String },
    /// Format seconds the way the overlay timecodes do.
    FormatTime {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
    /// Run an in-process browser session and report tab and toolbar state.
    Simulate(simulate_commands::SimulateArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn settings_store(cli: &Cli) -> FileSettingsStore {
    match &cli.settings {
        Some(path) => FileSettingsStore::new(path.clone()),
        None => FileSettingsStore::discover(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let store = settings_store(&cli);
    debug!(path = %store.path().display(), "settings file");

    match cli.command {
        Commands::Settings { action } => settings_commands::handle_settings(action, &store).await,
        Commands::Check { url } => {
            let settings = store.load().await?;
            let mode = if settings.whitelist_mode {
                "whitelist"
            } else {
                "blacklist"
            };
            if page_qualifies(&settings, &url) {
                println!("{url}: controls enabled ({mode} mode)");
            } else {
                println!("{url}: controls disabled ({mode} mode)");
            }
            Ok(())
        },
        Commands::Glob { pattern, input } => {
            println!("{}", glob_matches(&pattern, &input));
            Ok(())
        },
        Commands::FormatTime { seconds } => {
            println!("{}", format_time(seconds));
            Ok(())
        },
        Commands::Simulate(args) => simulate_commands::handle_simulate(args, &store).await,
    }
}
