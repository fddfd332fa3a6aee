// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gated backend configuration.

use serde::Deserialize;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Backend configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
	pub base_url: String,
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BACKEND_URL.to_string(),
		}
	}
}

/// Backend configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
}

impl BackendConfigLayer {
	pub fn merge(&mut self, other: BackendConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
	}

	pub fn finalize(self) -> BackendConfig {
		BackendConfig {
			base_url: self
				.base_url
				.map(|url| url.trim_end_matches('/').to_string())
				.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
		}
	}
}
