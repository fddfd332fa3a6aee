// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProviderEventKind;

/// Readiness of a client and its bound provider.
///
/// `NotReady -> Binding -> Ready -> [ConfigurationChanged -> Ready]* -> (Error -> Ready | Stale)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
	/// No provider bound yet.
	#[default]
	NotReady,
	/// A provider is being initialized.
	Binding,
	Ready,
	Error,
	Stale,
}

impl ClientStatus {
	/// The status after observing an event from the bound provider.
	pub fn apply(self, kind: ProviderEventKind) -> Self {
		match (self, kind) {
			(ClientStatus::NotReady | ClientStatus::Binding, ProviderEventKind::ConfigurationChanged) => self,
			(_, ProviderEventKind::Ready) => ClientStatus::Ready,
			// Fresh configuration means the provider is serving current data again.
			(_, ProviderEventKind::ConfigurationChanged) => ClientStatus::Ready,
			(_, ProviderEventKind::Error) => ClientStatus::Error,
			(_, ProviderEventKind::Stale) => ClientStatus::Stale,
		}
	}

	pub fn is_ready(&self) -> bool {
		matches!(self, ClientStatus::Ready)
	}
}

impl fmt::Display for ClientStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ClientStatus::NotReady => "not_ready",
			ClientStatus::Binding => "binding",
			ClientStatus::Ready => "ready",
			ClientStatus::Error => "error",
			ClientStatus::Stale => "stale",
		};
		f.write_str(s)
	}
}
