// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP retry configuration.

use std::time::Duration;

use serde::Deserialize;

/// Retry configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		RetryConfigLayer::default().finalize()
	}
}

impl RetryConfig {
	pub fn base_delay(&self) -> Duration {
		Duration::from_millis(self.base_delay_ms)
	}

	pub fn max_delay(&self) -> Duration {
		Duration::from_millis(self.max_delay_ms)
	}
}

/// Retry configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryConfigLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
}

impl RetryConfigLayer {
	pub fn merge(&mut self, other: RetryConfigLayer) {
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.base_delay_ms.is_some() {
			self.base_delay_ms = other.base_delay_ms;
		}
		if other.max_delay_ms.is_some() {
			self.max_delay_ms = other.max_delay_ms;
		}
	}

	pub fn finalize(self) -> RetryConfig {
		RetryConfig {
			max_attempts: self.max_attempts.unwrap_or(3),
			base_delay_ms: self.base_delay_ms.unwrap_or(200),
			max_delay_ms: self.max_delay_ms.unwrap_or(5000),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = RetryConfigLayer::default().finalize();
		assert_eq!(config.max_attempts, 3);
		assert_eq!(config.base_delay(), Duration::from_millis(200));
		assert_eq!(config.max_delay(), Duration::from_secs(5));
	}
}
