//! Main entry point for the check-in service.
//!
//! Runs a single check-in: loads the configuration, builds the engine with
//! the local key account and the alloy HTTP connector, executes one run and
//! prints its outcome. Intended to be started by a scheduler once per day.

use checkin_account::implementations::local::create_account;
use checkin_config::Config;
use checkin_core::{CheckinBuilder, CheckinEngine, CheckinFactories};
use checkin_delivery::implementations::evm::alloy::AlloyConnector;
use checkin_types::RunOutcome;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Command-line arguments for the check-in service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "CHECKIN_CONFIG", default_value = "config/opbnb.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr; stdout carries only the outcome line
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	match run(&args).await {
		Ok(outcome) => {
			println!("{}", outcome);
			ExitCode::from(exit_status(&outcome))
		}
		Err(e) => {
			println!("[ERROR] {}", e);
			ExitCode::FAILURE
		}
	}
}

/// Loads the configuration, builds the engine and executes one run.
async fn run(args: &Args) -> Result<RunOutcome, Box<dyn std::error::Error>> {
	tracing::info!("Started check-in");

	let config = Config::from_file(&args.config).await.map_err(|e| {
		format!(
			"Failed to load configuration {}: {}",
			args.config.display(),
			e
		)
	})?;
	tracing::info!("Loaded configuration [{}]", config.checkin.id);

	let engine = build_engine(config)?;
	let outcome = engine.run().await;

	tracing::info!("Stopped check-in");
	Ok(outcome)
}

/// Builds the engine with the production implementations.
fn build_engine(config: Config) -> Result<CheckinEngine, Box<dyn std::error::Error>> {
	let connector = AlloyConnector::new(config.network.request_timeout());

	let engine = CheckinBuilder::new(config).build(CheckinFactories {
		account_factory: create_account,
		connector: Arc::new(connector),
	})?;

	Ok(engine)
}

/// Process exit status for an outcome. Nothing to claim is not an error.
fn exit_status(outcome: &RunOutcome) -> u8 {
	if outcome.is_aborted() {
		1
	} else {
		0
	}
}
