// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment, and CLI flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ConfigLayer;
use crate::paths::{self, PathsConfig};
use crate::sections::{
	BackendConfigLayer, ClientConfigLayer, LogFormat, LoggingConfigLayer, ProviderConfigLayer,
	ProviderKind, RetryConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	WorkspaceFile = 40,
	ExplicitFile = 45,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct FileSource {
	name: &'static str,
	path: PathBuf,
	precedence: Precedence,
}

impl FileSource {
	/// A file given explicitly, e.g. with `--config`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			name: "explicit-file",
			path: path.into(),
			precedence: Precedence::ExplicitFile,
		}
	}

	pub fn system(paths: &PathsConfig) -> Self {
		Self {
			name: "system-file",
			path: paths.system_config_file.clone(),
			precedence: Precedence::SystemFile,
		}
	}

	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			name: "user-file",
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
		}
	}

	pub fn workspace() -> Result<Self, ConfigError> {
		Ok(Self {
			name: "workspace-file",
			path: paths::workspace_config_path()?,
			precedence: Precedence::WorkspaceFile,
		})
	}

	pub fn path(&self) -> &PathBuf {
		&self.path
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}

	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `BEACON_<SECTION>_<FIELD>`. The provider connection also
/// honours `FLAGD_HOST`, `FLAGD_PORT` and `FLAGD_TLS` when the `BEACON_`
/// names are unset.
#[derive(Default)]
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars
					.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn var_or(&self, name: &str, fallback: &str) -> Option<String> {
		self.var(name).or_else(|| self.var(fallback))
	}

	fn parsed<T: FromStr>(&self, name: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
		match value {
			Some(v) => v
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::invalid_value(name, format!("cannot parse '{v}'"))),
			None => Ok(None),
		}
	}

	fn number<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		self.parsed(name, self.var(name))
	}

	fn load_provider(&self) -> Result<ProviderConfigLayer, ConfigError> {
		let kind = match self.var("BEACON_PROVIDER_KIND") {
			Some(v) => Some(
				v.parse::<ProviderKind>()
					.map_err(|e| ConfigError::invalid_value("BEACON_PROVIDER_KIND", e))?,
			),
			None => None,
		};

		Ok(ProviderConfigLayer {
			kind,
			host: self.var_or("BEACON_PROVIDER_HOST", "FLAGD_HOST"),
			port: self.parsed(
				"BEACON_PROVIDER_PORT",
				self.var_or("BEACON_PROVIDER_PORT", "FLAGD_PORT"),
			)?,
			tls: self.var_or("BEACON_PROVIDER_TLS", "FLAGD_TLS").map(|v| is_truthy(&v)),
			path: self.var("BEACON_PROVIDER_PATH"),
			flags_file: self.var("BEACON_PROVIDER_FLAGS_FILE").map(PathBuf::from),
			poll_interval_secs: self.number("BEACON_PROVIDER_POLL_INTERVAL_SECS")?,
			init_timeout_secs: self.number("BEACON_PROVIDER_INIT_TIMEOUT_SECS")?,
			error_threshold: self.number("BEACON_PROVIDER_ERROR_THRESHOLD")?,
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("BEACON_LOGGING_FORMAT") {
			Some(v) => Some(
				v.parse::<LogFormat>()
					.map_err(|e| ConfigError::invalid_value("BEACON_LOGGING_FORMAT", e))?,
			),
			None => None,
		};

		Ok(LoggingConfigLayer {
			level: self.var("BEACON_LOGGING_LEVEL"),
			format,
		})
	}
}

/// `1`, `true` and `yes` (any case) are true; anything else is false.
pub fn is_truthy(value: &str) -> bool {
	matches!(
		value.trim().to_ascii_lowercase().as_str(),
		"1" | "true" | "yes"
	)
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ConfigLayer {
			provider: Some(self.load_provider()?),
			backend: Some(BackendConfigLayer {
				base_url: self.var("BEACON_BACKEND_BASE_URL"),
			}),
			client: Some(ClientConfigLayer {
				name: self.var("BEACON_CLIENT_NAME"),
				evaluation_timeout_ms: self.number("BEACON_CLIENT_EVALUATION_TIMEOUT_MS")?,
			}),
			logging: Some(self.load_logging()?),
			retry: Some(RetryConfigLayer {
				max_attempts: self.number("BEACON_RETRY_MAX_ATTEMPTS")?,
				base_delay_ms: self.number("BEACON_RETRY_BASE_DELAY_MS")?,
				max_delay_ms: self.number("BEACON_RETRY_MAX_DELAY_MS")?,
			}),
		})
	}
}

/// Overrides taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub log_level: Option<String>,
	pub json_logs: bool,
	pub backend_url: Option<String>,
}

/// Command-line source, highest precedence.
pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let overrides = &self.overrides;
		Ok(ConfigLayer {
			backend: Some(BackendConfigLayer {
				base_url: overrides.backend_url.clone(),
			}),
			logging: Some(LoggingConfigLayer {
				level: overrides.log_level.clone(),
				format: overrides.json_logs.then_some(LogFormat::Json),
			}),
			..ConfigLayer::default()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::ExplicitFile);
		assert!(Precedence::ExplicitFile > Precedence::WorkspaceFile);
		assert!(Precedence::WorkspaceFile > Precedence::UserFile);
		assert!(Precedence::UserFile > Precedence::SystemFile);
		assert!(Precedence::SystemFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.provider.is_none());
		assert!(layer.backend.is_none());
	}

	#[test]
	fn test_file_source_missing_file_returns_empty() {
		let layer = FileSource::new("/nonexistent/beacon/config.toml")
			.load()
			.unwrap();
		assert!(layer.provider.is_none());
	}

	#[test]
	fn test_system_source_uses_resolved_path() {
		let paths = PathsConfig {
			system_config_file: PathBuf::from("/opt/beacon/config.toml"),
			..PathsConfig::default()
		};
		let source = FileSource::system(&paths);
		assert_eq!(source.path(), &PathBuf::from("/opt/beacon/config.toml"));
		assert_eq!(source.precedence(), Precedence::SystemFile);
	}

	#[test]
	fn test_file_source_reads_toml() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[backend]\nbase_url = \"https://api.example.com\"").unwrap();

		let layer = FileSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.backend.unwrap().base_url.as_deref(),
			Some("https://api.example.com")
		);
	}

	#[test]
	fn test_file_source_reports_parse_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[provider\nport = ").unwrap();

		let err = FileSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_source_reads_beacon_vars() {
		let source = EnvSource::from_vars([
			("BEACON_PROVIDER_KIND", "file"),
			("BEACON_PROVIDER_FLAGS_FILE", "/srv/flags.json"),
			("BEACON_CLIENT_EVALUATION_TIMEOUT_MS", "750"),
			("BEACON_LOGGING_FORMAT", "json"),
		]);
		let layer = source.load().unwrap();

		let provider = layer.provider.unwrap();
		assert_eq!(provider.kind, Some(ProviderKind::File));
		assert_eq!(provider.flags_file, Some(PathBuf::from("/srv/flags.json")));
		assert_eq!(layer.client.unwrap().evaluation_timeout_ms, Some(750));
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn test_env_source_flagd_fallbacks() {
		let source = EnvSource::from_vars([
			("FLAGD_HOST", "flagd"),
			("FLAGD_PORT", "8014"),
			("FLAGD_TLS", "yes"),
		]);
		let provider = source.load().unwrap().provider.unwrap();

		assert_eq!(provider.host.as_deref(), Some("flagd"));
		assert_eq!(provider.port, Some(8014));
		assert_eq!(provider.tls, Some(true));
	}

	#[test]
	fn test_env_source_beacon_vars_win_over_flagd() {
		let source = EnvSource::from_vars([
			("FLAGD_HOST", "flagd"),
			("BEACON_PROVIDER_HOST", "beacon-flags"),
		]);
		let provider = source.load().unwrap().provider.unwrap();
		assert_eq!(provider.host.as_deref(), Some("beacon-flags"));
	}

	#[test]
	fn test_env_source_rejects_bad_numbers() {
		let source = EnvSource::from_vars([("FLAGD_PORT", "eighty")]);
		let err = source.load().unwrap_err();
		assert!(err.to_string().contains("BEACON_PROVIDER_PORT"));
	}

	#[test]
	fn test_empty_env_values_are_ignored() {
		let source = EnvSource::from_vars([("BEACON_BACKEND_BASE_URL", "")]);
		assert!(source.load().unwrap().backend.unwrap().base_url.is_none());
	}

	#[test]
	fn test_truthy_values() {
		for value in ["1", "true", "TRUE", "yes", " Yes "] {
			assert!(is_truthy(value), "{value} should be truthy");
		}
		for value in ["0", "false", "no", "on", ""] {
			assert!(!is_truthy(value), "{value} should be falsy");
		}
	}

	#[test]
	fn test_cli_source_json_logs() {
		let layer = CliSource::new(CliOverrides {
			json_logs: true,
			..Default::default()
		})
		.load()
		.unwrap();
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}
}
