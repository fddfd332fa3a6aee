// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provider contract.
//!
//! A provider is anything that can resolve a flag key to a value for an
//! evaluation context. The client talks to exactly one provider at a time and
//! learns about its lifecycle through the events it publishes.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_flags_core::{EvaluationContext, FlagValue, ProviderEventKind, ResolutionDetails};

use crate::error::Result;
use crate::events::{EventHandler, ProviderEvents, Subscription};

/// Descriptive information about a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
	pub name: String,
}

impl ProviderMetadata {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}
}

/// A source of flag values.
///
/// `resolve` must not fail: when a flag cannot be resolved the provider
/// returns the supplied default with an error code set.
#[async_trait]
pub trait FeatureProvider: Send + Sync + 'static {
	fn metadata(&self) -> &ProviderMetadata;

	/// Prepares the provider for evaluation with the current context.
	///
	/// The client only binds a provider whose initialization succeeded.
	async fn initialize(&self, _context: &EvaluationContext) -> Result<()> {
		Ok(())
	}

	/// Resolves `flag_key` for `context`, falling back to `default`.
	async fn resolve(
		&self,
		flag_key: &str,
		default: &FlagValue,
		context: &EvaluationContext,
	) -> ResolutionDetails;

	/// Acknowledges a context change. Providers that pre-compute per-context
	/// state refresh it here.
	async fn on_context_change(
		&self,
		_old_context: &EvaluationContext,
		_new_context: &EvaluationContext,
	) -> Result<()> {
		Ok(())
	}

	/// Releases background resources. Called once the provider is unbound.
	async fn shutdown(&self) {}

	/// The provider's event publisher.
	fn events(&self) -> &ProviderEvents;

	fn subscribe(&self, kind: ProviderEventKind, handler: EventHandler) -> Subscription {
		self.events().subscribe(kind, handler)
	}

	fn unsubscribe(&self, subscription: &Subscription) -> bool {
		self.events().unsubscribe(subscription)
	}
}

/// A provider shared between the client and in-flight evaluations.
pub type SharedProvider = Arc<dyn FeatureProvider>;
