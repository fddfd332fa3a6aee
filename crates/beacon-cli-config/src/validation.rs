// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation of resolved configuration.

use crate::error::ConfigError;
use crate::runtime::BeaconConfig;
use crate::sections::ProviderKind;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Checks field ranges and cross-field rules.
pub fn validate(config: &BeaconConfig) -> Result<(), ConfigError> {
	let provider = &config.provider;
	match provider.kind {
		ProviderKind::File if provider.flags_file.is_none() => {
			return Err(ConfigError::missing_field("provider.flags_file"));
		}
		ProviderKind::Remote => {
			if provider.host.trim().is_empty() {
				return Err(ConfigError::invalid_value("provider.host", "must not be empty"));
			}
			if provider.port == 0 {
				return Err(ConfigError::invalid_value("provider.port", "must be non-zero"));
			}
			if provider.poll_interval_secs == 0 {
				return Err(ConfigError::invalid_value(
					"provider.poll_interval_secs",
					"must be at least 1",
				));
			}
		}
		ProviderKind::File => {}
	}

	if provider.init_timeout_secs == 0 {
		return Err(ConfigError::invalid_value(
			"provider.init_timeout_secs",
			"must be at least 1",
		));
	}
	if provider.error_threshold == 0 {
		return Err(ConfigError::invalid_value(
			"provider.error_threshold",
			"must be at least 1",
		));
	}

	let base_url = &config.backend.base_url;
	if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
		return Err(ConfigError::invalid_value(
			"backend.base_url",
			format!("'{base_url}' must start with http:// or https://"),
		));
	}

	if config.client.evaluation_timeout_ms == 0 {
		return Err(ConfigError::invalid_value(
			"client.evaluation_timeout_ms",
			"must be at least 1",
		));
	}

	if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
		return Err(ConfigError::invalid_value(
			"logging.level",
			format!(
				"'{}' is not one of {}",
				config.logging.level,
				LOG_LEVELS.join(", ")
			),
		));
	}

	let retry = &config.retry;
	if retry.max_attempts == 0 {
		return Err(ConfigError::invalid_value("retry.max_attempts", "must be at least 1"));
	}
	if retry.base_delay_ms > retry.max_delay_ms {
		return Err(ConfigError::validation(
			"retry.base_delay_ms must not exceed retry.max_delay_ms",
		));
	}

	Ok(())
}
