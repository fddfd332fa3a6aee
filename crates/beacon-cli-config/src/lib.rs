// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the Beacon CLI.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides (`BEACON_*`, plus `FLAGD_*` fallbacks)
//! - Configuration validation

pub mod defaults;
pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sections;
pub mod sources;
pub mod validation;

use std::path::PathBuf;

pub use defaults::{ensure_default_config, DEFAULT_CONFIG_TEMPLATE};
pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::BeaconConfig;
pub use sections::*;
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from all sources with default precedence.
///
/// If no user config file exists, a default one is created at
/// `~/.config/beacon/config.toml`.
pub fn load_config() -> Result<BeaconConfig, ConfigError> {
	load_config_with_cli(sources::CliOverrides::default(), None)
}

/// Load configuration with CLI overrides and an optional explicit file.
///
/// If no user config file exists, a default one is created at
/// `~/.config/beacon/config.toml`.
pub fn load_config_with_cli(
	cli: sources::CliOverrides,
	config_file: Option<PathBuf>,
) -> Result<BeaconConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	// Ensure default user config exists
	defaults::ensure_default_config(&paths.user_config_file)?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system(&paths)));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	if let Ok(ws) = sources::FileSource::workspace() {
		registry.register(Box::new(ws));
	}
	if let Some(path) = config_file {
		if !path.exists() {
			return Err(ConfigError::invalid_value(
				"--config",
				format!("{} does not exist", path.display()),
			));
		}
		registry.register(Box::new(sources::FileSource::new(path)));
	}
	registry.register(Box::new(sources::EnvSource::new()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
