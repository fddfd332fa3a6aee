// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fully resolved runtime configuration.

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::sections::{BackendConfig, ClientConfig, LoggingConfig, ProviderConfig, RetryConfig};

/// Configuration after every source has been merged and defaults applied.
#[derive(Debug, Clone, Default)]
pub struct BeaconConfig {
	pub provider: ProviderConfig,
	pub backend: BackendConfig,
	pub client: ClientConfig,
	pub logging: LoggingConfig,
	pub retry: RetryConfig,
	pub paths: PathsConfig,
}

impl BeaconConfig {
	/// Resolves a merged layer, filling unset values with defaults.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Self {
		Self {
			provider: layer.provider.unwrap_or_default().finalize(),
			backend: layer.backend.unwrap_or_default().finalize(),
			client: layer.client.unwrap_or_default().finalize(),
			logging: layer.logging.unwrap_or_default().finalize(),
			retry: layer.retry.unwrap_or_default().finalize(),
			paths,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sections::{BackendConfigLayer, ProviderKind};

	#[test]
	fn test_empty_layer_gives_defaults() {
		let config = BeaconConfig::from_layer(ConfigLayer::default(), PathsConfig::default());
		assert_eq!(config.provider.kind, ProviderKind::Remote);
		assert_eq!(config.backend.base_url, "http://localhost:8000");
		assert_eq!(config.client.name, "frontend");
		assert_eq!(config.logging.level, "info");
		assert_eq!(config.retry.max_attempts, 3);
	}

	#[test]
	fn test_layer_values_are_kept() {
		let layer = ConfigLayer {
			backend: Some(BackendConfigLayer {
				base_url: Some("http://backend:9000".to_string()),
			}),
			..Default::default()
		};
		let config = BeaconConfig::from_layer(layer, PathsConfig::default());
		assert_eq!(config.backend.base_url, "http://backend:9000");
	}
}
