//! devsettings command line
//!
//! Boot-time restore and interactive control of device hardware settings.
//!
//! ```text
//! devsettings [--config PATH] [--store PATH] [--mock PROFILE] <COMMAND>
//!
//! Commands:
//!   restore            Push every persisted value to the hardware
//!   list [--json]      Show the settings supported on this device
//!   get <ID>           Print a setting's current value
//!   set <ID> <VALUE>   Change a setting (exit 2 if the value is rejected)
//!   config             Print the effective configuration
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devsettings_config::{CONFIG_DIR, DevsettingsConfig};
use devsettings_sync::mock::{MockBackend, MockProfile};
use devsettings_sync::{Backend, DeviceSettings, Screen, SysfsBackend, TomlStore, ValueDomain};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Exit code for a change the setting refused
const EXIT_REJECTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "devsettings", version, about = "Device hardware settings")]
struct Cli {
    /// Configuration file (default: $DEVSETTINGS_CONFIG, then standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Preferences store, overriding the configured path
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Use a mock backend instead of real hardware (galaxy-s2, no-mdnie, desktop).
    /// Falls back to $DEVSETTINGS_MOCK_DEVICE
    #[arg(long, global = true, value_parser = parse_mock_profile)]
    mock: Option<MockProfile>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push every persisted value to the hardware
    Restore,
    /// Show the settings supported on this device
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a setting's current value
    Get { id: String },
    /// Change a setting
    Set { id: String, value: String },
    /// Print the effective configuration
    Config,
}

fn parse_mock_profile(name: &str) -> std::result::Result<MockProfile, String> {
    MockProfile::from_name(name).ok_or_else(|| format!("unknown mock profile '{}'", name))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => DevsettingsConfig::load_layered(Some(path.as_path())),
        None => DevsettingsConfig::load_default(),
    }
    .context("Failed to load configuration")?;

    match cli.mock.or_else(MockProfile::from_env) {
        Some(profile) => {
            info!("Using mock backend ({:?})", profile);
            run(&cli, &config, MockBackend::new_profile(profile))
        }
        None => {
            let backend =
                SysfsBackend::new().with_broadcast_program(&config.general.broadcast_program);
            run(&cli, &config, backend)
        }
    }
}

/// Setup logging to stderr
fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Directory searched for `settings.d` drop-ins
fn config_dir(cli: &Cli) -> PathBuf {
    cli.config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
}

fn run<B: Backend>(cli: &Cli, config: &DevsettingsConfig, backend: B) -> Result<ExitCode> {
    let dir = config_dir(cli);
    debug!("Custom settings directory: {}", dir.display());

    let descriptors = config
        .catalog(Some(&dir))
        .context("Invalid settings table")?;
    let mut settings = DeviceSettings::new(
        backend,
        devsettings_sync::catalog::builtin_categories(),
        descriptors,
        config.sink_policy(),
    )?;

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.general.store_path.clone());
    let mut store = TomlStore::open(&store_path)
        .with_context(|| format!("Failed to open store {}", store_path.display()))?;

    match &cli.command {
        Command::Restore => {
            let report = settings.restore_all(&store);
            for (id, error) in &report.failed {
                warn!("{}: {}", id, error);
            }
            if report.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::List { json } => {
            let screen = settings.screen(&store);
            if *json {
                println!("{}", serde_json::to_string_pretty(&screen)?);
            } else {
                print_screen(&screen);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Get { id } => {
            let value = settings.value(&store, id)?;
            if !settings.is_supported(id)? {
                warn!("{} is not supported on this device", id);
            }
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Command::Set { id, value } => {
            if settings.on_change_str(&mut store, id, value)? {
                println!("{} = {}", id, settings.value(&store, id)?);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}: rejected value '{}'", id, value);
                Ok(ExitCode::from(EXIT_REJECTED))
            }
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn describe_domain(domain: &ValueDomain) -> String {
    match domain {
        ValueDomain::Boolean { .. } => "on|off".to_string(),
        ValueDomain::Choice { options, .. } => options.join("|"),
        ValueDomain::Integer { min, max, .. } => format!("{}..={}", min, max),
    }
}

fn print_screen(screen: &Screen) {
    if screen.is_empty() {
        println!("No supported settings on this device");
        return;
    }

    for category in &screen.categories {
        println!("{}", category.title);
        for entry in &category.entries {
            println!(
                "  {:<26} {:<8} {:<24} {}",
                entry.id,
                entry.value.to_string(),
                describe_domain(&entry.domain),
                entry.title
            );
        }
    }
}
