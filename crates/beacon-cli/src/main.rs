// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Beacon CLI
//!
//! Evaluates feature flags for a user through the configured provider and
//! exercises the flag-gated backend endpoints.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use beacon_cli_config::{load_config_with_cli, CliOverrides};

mod commands;
mod logging;

/// Beacon - feature flag client
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long, global = true)]
	json_logs: bool,

	/// Backend base URL (overrides config)
	#[arg(long, global = true)]
	backend_url: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Evaluate flags locally and fetch the backend's view for a user
	Flags {
		/// User to evaluate for
		#[arg(short, long)]
		user: String,
	},
	/// Call the backend's hello endpoint
	Hello {
		#[arg(short, long)]
		user: String,
	},
	/// Call the backend's flag-gated secret endpoint
	Secret {
		#[arg(short, long)]
		user: String,
	},
	/// Check backend health
	Health,
	/// Print flag values on every provider update until Ctrl-C
	Watch {
		#[arg(short, long)]
		user: String,
	},
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		CliOverrides {
			log_level: args.log_level.clone(),
			json_logs: args.json_logs,
			backend_url: args.backend_url.clone(),
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config_with_cli(CliOverrides::from(&args), args.config.clone())
		.context("failed to load configuration")?;

	logging::init_tracing(&config.logging);
	debug!(command = ?args.command, "starting beacon");

	match &args.command {
		Command::Flags { user } => commands::flags(&config, user).await,
		Command::Hello { user } => commands::hello(&config, user).await,
		Command::Secret { user } => commands::secret(&config, user).await,
		Command::Health => commands::health(&config).await,
		Command::Watch { user } => commands::watch(&config, user).await,
	}
}
