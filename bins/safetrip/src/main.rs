//! SafeTrip CLI
//!
//! Distance and geofence checks, replay of recorded tracks through the live
//! tracking loop, and stored location history.

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use safetrip_core::config::Config;
use safetrip_core::error::exit_codes;
use safetrip_telemetry::TelemetryConfig;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod input;
mod output;

/// Geofence alerts and location tracking for travelers
#[derive(Parser)]
#[command(name = "safetrip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a config file (defaults to .safetrip.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable
    Text,
    /// Machine readable JSON on stdout
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Great-circle distance in meters between two points
    #[command(allow_negative_numbers = true)]
    Distance {
        /// Latitude of the first point
        from_lat: f64,
        /// Longitude of the first point
        from_lon: f64,
        /// Latitude of the second point
        to_lat: f64,
        /// Longitude of the second point
        to_lon: f64,
    },

    /// Evaluate geofences for one position
    #[command(allow_negative_numbers = true)]
    Check {
        /// Latitude in degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long)]
        lon: f64,

        /// JSON file with fence definitions
        #[arg(long, conflicts_with = "remote", required_unless_present = "user")]
        fences: Option<PathBuf>,

        /// Use this user's fences from the backend
        #[arg(long)]
        user: Option<String>,

        /// Let the backend evaluate instead of evaluating locally
        #[arg(long, requires = "user")]
        remote: bool,
    },

    /// Run the tracking loop over a recorded track
    Replay {
        /// JSON file with the recorded positions, oldest first
        #[arg(long)]
        track: PathBuf,

        /// JSON file with fence definitions
        #[arg(long, required_unless_present = "user")]
        fences: Option<PathBuf>,

        /// Tracked user; fences come from the backend unless --fences is given
        #[arg(long)]
        user: Option<String>,

        /// Delay between samples in milliseconds
        #[arg(long, default_value = "200")]
        interval_ms: u64,

        /// Store every sample in the backend
        #[arg(long, requires = "user")]
        sync: bool,

        /// Attach stored samples to this trip
        #[arg(long, requires = "sync")]
        trip: Option<String>,
    },

    /// Show stored location history, newest first
    History {
        /// User whose history to show
        #[arg(long)]
        user: String,

        /// Maximum number of entries (the backend keeps at most 100)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e, cli.format);
            return exit_code(e.exit_code());
        }
    };

    let mut telemetry = TelemetryConfig::from(&config.schema.logging);
    if cli.verbose {
        telemetry.log_level = "debug".to_string();
    }
    if let Err(e) = safetrip_telemetry::init_with_config(telemetry) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    if let Some(path) = &config.path {
        tracing::debug!(path = %path.display(), "Loaded config");
    }

    let result = match cli.command {
        Commands::Distance {
            from_lat,
            from_lon,
            to_lat,
            to_lon,
        } => commands::distance::run((from_lat, from_lon), (to_lat, to_lon), cli.format),

        Commands::Check {
            lat,
            lon,
            fences,
            user,
            remote,
        } => commands::check::run(lat, lon, fences, user, remote, cli.format).await,

        Commands::Replay {
            track,
            fences,
            user,
            interval_ms,
            sync,
            trip,
        } => {
            let args = commands::replay::ReplayArgs {
                track,
                fences,
                user,
                interval_ms,
                sync,
                trip,
                verbose: cli.verbose,
            };
            commands::replay::run(args, &config.schema.tracking, cli.format).await
        }

        Commands::History { user, limit } => commands::history::run(&user, limit, cli.format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<safetrip_core::Error>() {
            Some(err) => {
                output::print_error(err, cli.format);
                exit_code(err.exit_code())
            }
            None => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit_code(exit_codes::FAILURE)
            }
        },
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
