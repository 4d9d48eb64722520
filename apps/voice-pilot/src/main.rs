//! Voice Pilot
//!
//! Speech → transcript → parsed command chain → validated vehicle actions.
//! Transcripts come from stdin or a script file; the vehicle is the
//! in-process simulator unless a hardware backend is linked in.

mod config;
mod power;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flight_control::{
    ChainRunner, CommandExecutor, CommandLoop, ExecutionFlags, LogOnlyPower, PowerControl,
    Session, SimVehicle, VehicleControl, VehicleState,
};
use intent_parser::{create_parser, init as init_intent_parser};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use voice_local::plugin::{new_transcript_source, TranscriptBackendKind};

use crate::config::Config;
use crate::power::SystemPowerOff;

#[derive(Parser)]
#[command(name = "voice-pilot")]
#[command(about = "Fly a drone with chained voice commands")]
struct Args {
    /// JSON configuration file, created with defaults if missing
    #[arg(long, default_value = "voice-pilot.json")]
    config: String,

    /// Fly the simulated vehicle instead of a real autopilot
    #[arg(long)]
    sim: bool,

    /// Vehicle connection address, e.g. udp://:14540
    #[arg(long)]
    address: Option<String>,

    /// Replay utterances from a file, one per line (blank line = silence)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Read utterances from stdin
    #[arg(long)]
    interactive: bool,

    /// Parse one utterance, print the commands as JSON and exit
    #[arg(long)]
    test_command: Option<String>,

    /// Directory for the plain-text session log
    #[arg(long)]
    log_dir: Option<String>,

    /// Let the power-off command shut the host down
    #[arg(long)]
    allow_poweroff: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(text) = &args.test_command {
        setup_tracing(None);
        return print_parsed(text);
    }

    let config = load_config(&args)?;
    if let Some(path) = setup_tracing(config.log_dir.as_deref()) {
        info!("Logging to {}", path.display());
    }

    info!("Starting Voice Pilot");
    init_intent_parser().map_err(|e| anyhow::anyhow!("Failed to init intent parser: {}", e))?;
    flight_control::init()
        .map_err(|e| anyhow::anyhow!("Failed to init flight control: {}", e))?;

    if !config.simulation {
        bail!("no autopilot backend is linked into this build; run with --sim");
    }
    info!("Simulation mode enabled.");
    let vehicle: Arc<dyn VehicleControl> = Arc::new(SimVehicle::new());

    let state = Arc::new(VehicleState::with_vehicle(vehicle));
    let session = Arc::new(Session::new(state.clone(), config.flight.clone()));
    if let Err(e) = session.connect().await {
        error!("Fatal: {}", e);
        session.cleanup().await;
        return Err(e.into());
    }

    let executor = CommandExecutor::new(state, Arc::new(ExecutionFlags::new()), &config.flight);
    let runner = Arc::new(ChainRunner::new(executor));
    let power: Arc<dyn PowerControl> = if config.allow_poweroff {
        Arc::new(SystemPowerOff)
    } else {
        Arc::new(LogOnlyPower)
    };

    let source = new_transcript_source(config.transcript_backend, &config.script)
        .map_err(|e| anyhow::anyhow!("Failed to create transcript source: {}", e))?;
    let parser = create_parser().map_err(|e| anyhow::anyhow!("Failed to create parser: {}", e))?;

    let command_loop = CommandLoop::new(
        source,
        parser,
        runner,
        session.clone(),
        power,
        config.flight.poll_interval,
    );

    info!(backend = ?config.transcript_backend, "Listening for commands...");
    let exit = command_loop
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Keyboard interrupt received. Exiting...");
        })
        .await;
    info!(?exit, "Command loop finished");

    info!("Voice Pilot stopped");
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(&args.config)?;

    if args.sim {
        config.simulation = true;
    }
    if let Some(address) = &args.address {
        config.flight.connection_address = address.clone();
    }
    if let Some(path) = &args.script {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        config.script = contents.lines().map(str::to_string).collect();
        config.transcript_backend = TranscriptBackendKind::Script;
    }
    if args.interactive {
        config.transcript_backend = TranscriptBackendKind::Stdin;
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir.clone();
    }
    if args.allow_poweroff {
        config.allow_poweroff = true;
    }
    Ok(config)
}

fn print_parsed(text: &str) -> Result<()> {
    let commands = intent_parser::parse_command(text)
        .map_err(|e| anyhow::anyhow!("Failed to parse: {}", e))?;
    if commands.is_empty() {
        println!("No valid commands found in: '{}'", text);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&commands)?);
    Ok(())
}

/// Console logging, plus a plain-text file under `log_dir` when given.
/// Returns the log file path if one was opened.
fn setup_tracing(log_dir: Option<&str>) -> Option<PathBuf> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = log_dir.and_then(|dir| match open_log_file(Path::new(dir)) {
        Ok(opened) => Some(opened),
        Err(e) => {
            eprintln!("Failed to open log file, logging to console only: {:#}", e);
            None
        }
    });
    let (file_layer, path) = match file {
        Some((file, path)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            Some(path),
        ),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    path
}

fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(log_file_name()?);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok((file, path))
}

/// `LOG <dd>_<mm> <HH>_<MM>.txt`, local time when the offset is known.
fn log_file_name() -> Result<String> {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let format = time::format_description::parse("LOG [day]_[month] [hour]_[minute].txt")?;
    Ok(now.format(&format)?)
}
