// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered collection of configuration sources.

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::runtime::BeaconConfig;
use crate::sources::ConfigSource;
use crate::validation;

/// Collects sources and merges them in precedence order.
#[derive(Default)]
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		self.sources.push(source);
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}

	/// Merges every source, lowest precedence first. Sources with equal
	/// precedence apply in registration order.
	pub fn merged_layer(&mut self) -> Result<ConfigLayer, ConfigError> {
		self.sources.sort_by_key(|s| s.precedence());

		let mut merged = ConfigLayer::default();
		for source in &self.sources {
			debug!(source = source.name(), "loading configuration source");
			merged.merge(source.load()?);
		}
		Ok(merged)
	}

	/// Merges, resolves and validates the configuration.
	pub fn load(&mut self, paths: PathsConfig) -> Result<BeaconConfig, ConfigError> {
		let config = BeaconConfig::from_layer(self.merged_layer()?, paths);
		validation::validate(&config)?;

		info!(
			provider_kind = %config.provider.kind,
			provider_url = %config.provider.url(),
			backend_url = %config.backend.base_url,
			client = %config.client.name,
			log_level = %config.logging.level,
			"configuration loaded"
		);
		Ok(config)
	}
}
