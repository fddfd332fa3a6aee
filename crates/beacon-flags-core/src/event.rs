// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider lifecycle events.
//!
//! Providers emit these to report readiness and configuration changes. Clients
//! forward them to subscribers, who decide whether to re-query flag values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of lifecycle event a provider can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEventKind {
	/// The provider is ready to evaluate flags.
	Ready,
	/// The provider's flag configuration changed.
	ConfigurationChanged,
	/// The provider hit an error and may not be able to evaluate flags.
	Error,
	/// The provider's cached configuration may be out of date.
	Stale,
}

impl ProviderEventKind {
	pub const ALL: [ProviderEventKind; 4] = [
		ProviderEventKind::Ready,
		ProviderEventKind::ConfigurationChanged,
		ProviderEventKind::Error,
		ProviderEventKind::Stale,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderEventKind::Ready => "ready",
			ProviderEventKind::ConfigurationChanged => "configuration_changed",
			ProviderEventKind::Error => "error",
			ProviderEventKind::Stale => "stale",
		}
	}
}

impl fmt::Display for ProviderEventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A lifecycle event together with its details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvent {
	pub kind: ProviderEventKind,
	pub provider_name: String,
	/// Keys whose definitions changed; only set for configuration changes.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub flags_changed: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub timestamp: DateTime<Utc>,
}

impl ProviderEvent {
	pub fn new(kind: ProviderEventKind, provider_name: impl Into<String>) -> Self {
		Self {
			kind,
			provider_name: provider_name.into(),
			flags_changed: Vec::new(),
			message: None,
			timestamp: Utc::now(),
		}
	}

	pub fn ready(provider_name: impl Into<String>) -> Self {
		Self::new(ProviderEventKind::Ready, provider_name)
	}

	pub fn configuration_changed(provider_name: impl Into<String>, flags_changed: Vec<String>) -> Self {
		Self {
			flags_changed,
			..Self::new(ProviderEventKind::ConfigurationChanged, provider_name)
		}
	}

	pub fn error(provider_name: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ProviderEventKind::Error, provider_name).with_message(message)
	}

	pub fn stale(provider_name: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ProviderEventKind::Stale, provider_name).with_message(message)
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}
