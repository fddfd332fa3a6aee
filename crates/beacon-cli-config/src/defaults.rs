// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Default user configuration file.

use std::path::Path;

use tracing::info;

use crate::error::ConfigError;

/// Written to the user config path on first run.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Beacon configuration
#
# Precedence (lowest to highest): built-in defaults, /etc/beacon/config.toml,
# this file, .beacon/config.toml in the working directory, --config,
# BEACON_* environment variables, command-line flags.

[provider]
# "remote" polls a flag document over HTTP, "file" reads flags_file.
kind = "remote"
host = "localhost"
port = 8013
tls = false
path = "/flags.json"
# flags_file = "flags.json"
poll_interval_secs = 30
init_timeout_secs = 10
error_threshold = 3

[backend]
base_url = "http://localhost:8000"

[client]
name = "frontend"
evaluation_timeout_ms = 2000

[logging]
# trace, debug, info, warn, error, off
level = "info"
# pretty, compact, json
format = "pretty"

[retry]
max_attempts = 3
base_delay_ms = 200
max_delay_ms = 5000
"#;

/// Creates the default config file at `path` if nothing exists there.
///
/// Returns true if a file was written.
pub fn ensure_default_config(path: &Path) -> Result<bool, ConfigError> {
	if path.exists() {
		return Ok(false);
	}

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
	info!(path = %path.display(), "created default configuration file");
	Ok(true)
}
