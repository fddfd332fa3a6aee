// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Client configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
	pub name: String,
	pub evaluation_timeout_ms: u64,
}

impl Default for ClientConfig {
	fn default() -> Self {
		ClientConfigLayer::default().finalize()
	}
}

impl ClientConfig {
	pub fn evaluation_timeout(&self) -> Duration {
		Duration::from_millis(self.evaluation_timeout_ms)
	}
}

/// Client configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfigLayer {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub evaluation_timeout_ms: Option<u64>,
}

impl ClientConfigLayer {
	pub fn merge(&mut self, other: ClientConfigLayer) {
		if other.name.is_some() {
			self.name = other.name;
		}
		if other.evaluation_timeout_ms.is_some() {
			self.evaluation_timeout_ms = other.evaluation_timeout_ms;
		}
	}

	pub fn finalize(self) -> ClientConfig {
		ClientConfig {
			name: self.name.unwrap_or_else(|| "frontend".to_string()),
			evaluation_timeout_ms: self.evaluation_timeout_ms.unwrap_or(2000),
		}
	}
}
