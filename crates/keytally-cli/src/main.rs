//! keytally - keypad time tracker
//!
//! Finds the keypad, restores today's tracking state, and turns button
//! presses into time-log rows until interrupted or the shift button is
//! held.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keytally_hardware::discovery::attempt_order;
use keytally_hardware::{
    Discovery, DiscoveryConfig, SerialConfig, SerialConnector, SessionConfig, SessionManager,
    SystemPorts,
};
use keytally_storage::{ButtonRemap, DuplicatePolicy, SystemClock, TimeLog};
use keytally_tracker::{Keymap, SleepInhibitor, TrackerSession};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// keytally - keypad time tracker
#[derive(Parser, Debug)]
#[command(name = "keytally")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the daily CSV logs
    #[arg(long, env = "KEYTALLY_LOG_DIR", default_value = ".", global = true)]
    log_dir: PathBuf,

    /// Only consider serial ports whose path contains this text
    #[arg(long, env = "KEYTALLY_PORT", global = true)]
    port: Option<String>,

    /// JSON keymap replacing the default layout
    #[arg(long, global = true)]
    keymap: Option<PathBuf>,

    /// raw:logical button map applied to incoming events
    #[arg(long, global = true)]
    remap: Option<PathBuf>,

    /// Confirm the device identity with a PING before using a port
    #[arg(long, global = true)]
    verify: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the keypad and track time (default)
    Run,

    /// Print today's report
    Report,

    /// Move today's log aside and start a fresh one
    Reset,

    /// List candidate serial ports in the order they are tried
    Ports,

    /// Show a raw:logical button map as a keypad grid
    Remap {
        /// Map file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => run(&cli).await,
        Command::Report => report(&cli.log_dir),
        Command::Reset => reset(&cli.log_dir),
        Command::Ports => ports(&cli),
        Command::Remap { file } => show_remap(file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("keytally: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "keytally=debug" } else { "keytally=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn discovery_config(cli: &Cli) -> DiscoveryConfig {
    DiscoveryConfig::default()
        .with_filter(cli.port.clone())
        .with_verification(cli.verify)
}

fn open_log(dir: &Path) -> Result<TimeLog> {
    TimeLog::open(dir, Arc::new(SystemClock))
        .with_context(|| format!("Cannot open time log in {}", dir.display()))
}

async fn run(cli: &Cli) -> Result<()> {
    let keymap = match &cli.keymap {
        Some(path) => Keymap::load(path)
            .with_context(|| format!("Cannot load keymap {}", path.display()))?,
        None => Keymap::default(),
    };
    let remap = cli
        .remap
        .as_deref()
        .map(|path| ButtonRemap::load(path, DuplicatePolicy::default()))
        .transpose()
        .context("Cannot load button map")?;

    let log = open_log(&cli.log_dir)?;
    let mut tracker = TrackerSession::new(keymap, log, SleepInhibitor::platform_default());

    let connector = SerialConnector::new(discovery_config(cli), SerialConfig::default());
    let mut session = SessionManager::new(connector, SessionConfig::default());
    session
        .connect(&tracker)
        .await
        .context("Keypad not available")?;
    info!(
        port = session.endpoint().unwrap_or_default(),
        log_dir = %cli.log_dir.display(),
        "Tracking"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let reason = keytally_tracker::run(
        &mut session,
        &mut tracker,
        remap.as_ref(),
        shutdown,
        |report| println!("{report}"),
    )
    .await;

    info!(%reason, "Stopped");
    Ok(())
}

fn report(log_dir: &Path) -> Result<()> {
    let log = open_log(log_dir)?;
    let report = log.show_today().context("Cannot read today's log")?;
    println!("{report}");
    Ok(())
}

fn reset(log_dir: &Path) -> Result<()> {
    let mut log = open_log(log_dir)?;
    match log.reset_today().context("Cannot reset today's log")? {
        Some(backup) => println!("Previous log saved as {}", backup.display()),
        None => println!("No log for today, started a fresh one"),
    }
    Ok(())
}

fn ports(cli: &Cli) -> Result<()> {
    let discovery = Discovery::new(SystemPorts::default(), discovery_config(cli));
    let candidates = discovery.candidates().context("Cannot list serial ports")?;

    if candidates.is_empty() {
        println!("No keypad ports found");
        return Ok(());
    }
    for endpoint in attempt_order(&candidates) {
        println!("{}  (group {})", endpoint.path, endpoint.group);
    }
    Ok(())
}

fn show_remap(file: &Path) -> Result<()> {
    let remap = ButtonRemap::load(file, DuplicatePolicy::default())
        .with_context(|| format!("Cannot load button map {}", file.display()))?;
    print!("{}", remap.grid());
    Ok(())
}
