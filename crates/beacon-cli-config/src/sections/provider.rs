// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag provider configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Where flag definitions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	/// Poll a flag document over HTTP.
	#[default]
	Remote,
	/// Load a flag document from a local file.
	File,
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProviderKind::Remote => write!(f, "remote"),
			ProviderKind::File => write!(f, "file"),
		}
	}
}

impl FromStr for ProviderKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"remote" => Ok(ProviderKind::Remote),
			"file" => Ok(ProviderKind::File),
			other => Err(format!("unknown provider kind '{other}' (expected remote or file)")),
		}
	}
}

/// Provider configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
	pub kind: ProviderKind,
	pub host: String,
	pub port: u16,
	pub tls: bool,
	pub path: String,
	pub flags_file: Option<PathBuf>,
	pub poll_interval_secs: u64,
	pub init_timeout_secs: u64,
	pub error_threshold: u32,
}

impl Default for ProviderConfig {
	fn default() -> Self {
		ProviderConfigLayer::default().finalize()
	}
}

impl ProviderConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn init_timeout(&self) -> Duration {
		Duration::from_secs(self.init_timeout_secs)
	}

	/// URL of the remote flag document.
	pub fn url(&self) -> String {
		let scheme = if self.tls { "https" } else { "http" };
		format!("{scheme}://{}:{}{}", self.host, self.port, self.path)
	}
}

/// Provider configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfigLayer {
	#[serde(default)]
	pub kind: Option<ProviderKind>,
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub tls: Option<bool>,
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub flags_file: Option<PathBuf>,
	#[serde(default)]
	pub poll_interval_secs: Option<u64>,
	#[serde(default)]
	pub init_timeout_secs: Option<u64>,
	#[serde(default)]
	pub error_threshold: Option<u32>,
}

impl ProviderConfigLayer {
	pub fn merge(&mut self, other: ProviderConfigLayer) {
		if other.kind.is_some() {
			self.kind = other.kind;
		}
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.tls.is_some() {
			self.tls = other.tls;
		}
		if other.path.is_some() {
			self.path = other.path;
		}
		if other.flags_file.is_some() {
			self.flags_file = other.flags_file;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.init_timeout_secs.is_some() {
			self.init_timeout_secs = other.init_timeout_secs;
		}
		if other.error_threshold.is_some() {
			self.error_threshold = other.error_threshold;
		}
	}

	pub fn finalize(self) -> ProviderConfig {
		let path = self.path.unwrap_or_else(|| "/flags.json".to_string());
		let path = if path.starts_with('/') {
			path
		} else {
			format!("/{path}")
		};

		ProviderConfig {
			kind: self.kind.unwrap_or_default(),
			host: self.host.unwrap_or_else(|| "localhost".to_string()),
			port: self.port.unwrap_or(8013),
			tls: self.tls.unwrap_or(false),
			path,
			flags_file: self.flags_file,
			poll_interval_secs: self.poll_interval_secs.unwrap_or(30),
			init_timeout_secs: self.init_timeout_secs.unwrap_or(10),
			error_threshold: self.error_threshold.unwrap_or(3),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ProviderConfigLayer::default().finalize();
		assert_eq!(config.kind, ProviderKind::Remote);
		assert_eq!(config.url(), "http://localhost:8013/flags.json");
		assert_eq!(config.poll_interval(), Duration::from_secs(30));
		assert_eq!(config.init_timeout(), Duration::from_secs(10));
		assert_eq!(config.error_threshold, 3);
		assert!(config.flags_file.is_none());
	}

	#[test]
	fn test_merge_overrides_only_set_fields() {
		let mut base = ProviderConfigLayer {
			host: Some("flags.internal".to_string()),
			port: Some(9000),
			..Default::default()
		};
		base.merge(ProviderConfigLayer {
			port: Some(9443),
			tls: Some(true),
			..Default::default()
		});

		let config = base.finalize();
		assert_eq!(config.url(), "https://flags.internal:9443/flags.json");
	}

	#[test]
	fn test_path_gets_leading_slash() {
		let config = ProviderConfigLayer {
			path: Some("v1/flags.json".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.path, "/v1/flags.json");
	}

	#[test]
	fn test_kind_from_str() {
		assert_eq!("FILE".parse::<ProviderKind>().unwrap(), ProviderKind::File);
		assert_eq!("remote".parse::<ProviderKind>().unwrap(), ProviderKind::Remote);
		assert!("grpc".parse::<ProviderKind>().is_err());
	}
}
