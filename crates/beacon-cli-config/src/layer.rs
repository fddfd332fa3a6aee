// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by a single source.

use serde::Deserialize;

use crate::sections::{
	BackendConfigLayer, ClientConfigLayer, LoggingConfigLayer, ProviderConfigLayer, RetryConfigLayer,
};

/// One source's view of the configuration. Absent sections and fields leave
/// lower-precedence values in place when merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub provider: Option<ProviderConfigLayer>,
	#[serde(default)]
	pub backend: Option<BackendConfigLayer>,
	#[serde(default)]
	pub client: Option<ClientConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub retry: Option<RetryConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(incoming) = other {
		match base {
			Some(existing) => merge(existing, incoming),
			None => *base = Some(incoming),
		}
	}
}

impl ConfigLayer {
	/// Overlays `other` on top of `self`.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_section(&mut self.provider, other.provider, ProviderConfigLayer::merge);
		merge_section(&mut self.backend, other.backend, BackendConfigLayer::merge);
		merge_section(&mut self.client, other.client, ClientConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.retry, other.retry, RetryConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_partial_toml() {
		let layer: ConfigLayer = toml::from_str(
			r#"
			[provider]
			host = "flags.internal"
			port = 9000

			[logging]
			format = "json"
			"#,
		)
		.unwrap();

		let provider = layer.provider.unwrap();
		assert_eq!(provider.host.as_deref(), Some("flags.internal"));
		assert_eq!(provider.port, Some(9000));
		assert!(provider.tls.is_none());
		assert!(layer.backend.is_none());
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base: ConfigLayer = toml::from_str(
			r#"
			[provider]
			host = "flags.internal"
			port = 9000
			"#,
		)
		.unwrap();
		let top: ConfigLayer = toml::from_str(
			r#"
			[provider]
			port = 9443
			[backend]
			base_url = "https://api.example.com"
			"#,
		)
		.unwrap();

		base.merge(top);
		let provider = base.provider.unwrap();
		assert_eq!(provider.host.as_deref(), Some("flags.internal"));
		assert_eq!(provider.port, Some(9443));
		assert_eq!(
			base.backend.unwrap().base_url.as_deref(),
			Some("https://api.example.com")
		);
	}

	#[test]
	fn test_unknown_provider_kind_is_rejected() {
		let result: Result<ConfigLayer, _> = toml::from_str(
			r#"
			[provider]
			kind = "grpc"
			"#,
		);
		assert!(result.is_err());
	}
}
