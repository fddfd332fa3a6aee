// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A provider backed by a flag set held in memory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_flags_core::{
	EvaluationContext, FlagDefinition, FlagSet, FlagValue, ProviderEvent, ResolutionDetails,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::events::ProviderEvents;
use crate::provider::{FeatureProvider, ProviderMetadata};

pub const IN_MEMORY_PROVIDER_NAME: &str = "in-memory";

/// Resolves flags from a [`FlagSet`] that can be swapped at runtime.
///
/// Swapping the set with [`replace_flags`](Self::replace_flags) emits a
/// `ConfigurationChanged` event listing the keys that differ.
#[derive(Debug)]
pub struct InMemoryProvider {
	metadata: ProviderMetadata,
	flags: RwLock<Arc<FlagSet>>,
	events: ProviderEvents,
}

impl InMemoryProvider {
	pub fn new(flags: FlagSet) -> Self {
		Self::with_name(IN_MEMORY_PROVIDER_NAME, flags)
	}

	pub fn with_name(name: impl Into<String>, flags: FlagSet) -> Self {
		Self {
			metadata: ProviderMetadata::new(name),
			flags: RwLock::new(Arc::new(flags)),
			events: ProviderEvents::new(),
		}
	}

	/// Builds a provider from a JSON flag document.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(Self::new(FlagSet::from_json(json)?))
	}

	/// Builds a provider from a JSON flag file on disk.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let contents = tokio::fs::read_to_string(path).await?;
		let flags = FlagSet::from_json(&contents)?;
		info!(path = %path.display(), flags = flags.len(), "loaded flag file");
		Ok(Self::with_name(format!("file:{}", path.display()), flags))
	}

	/// Snapshot of the current flag set.
	pub fn flags(&self) -> Arc<FlagSet> {
		Arc::clone(&self.flags.read())
	}

	/// Replaces the whole flag set and returns the keys that changed.
	///
	/// Nothing is emitted when the new set is identical.
	pub fn replace_flags(&self, flags: FlagSet) -> Vec<String> {
		self.update(|_| flags)
	}

	/// Adds or redefines a single flag.
	pub fn set_flag(&self, key: impl Into<String>, definition: FlagDefinition) -> Vec<String> {
		self.update(|current| current.clone().with_flag(key, definition))
	}

	/// Derives the next set from the current one under the write lock.
	fn update(&self, next: impl FnOnce(&FlagSet) -> FlagSet) -> Vec<String> {
		let changed = {
			let mut current = self.flags.write();
			let next = next(&**current);
			let changed = current.changed_keys(&next);
			*current = Arc::new(next);
			changed
		};

		if changed.is_empty() {
			debug!(provider = %self.metadata.name, "flag set unchanged");
		} else {
			info!(provider = %self.metadata.name, changed = ?changed, "flag set replaced");
			self
				.events
				.emit(ProviderEvent::configuration_changed(&self.metadata.name, changed.clone()));
		}
		changed
	}
}

impl Default for InMemoryProvider {
	fn default() -> Self {
		Self::new(FlagSet::new())
	}
}

#[async_trait]
impl FeatureProvider for InMemoryProvider {
	fn metadata(&self) -> &ProviderMetadata {
		&self.metadata
	}

	async fn resolve(
		&self,
		flag_key: &str,
		default: &FlagValue,
		context: &EvaluationContext,
	) -> ResolutionDetails {
		self.flags().evaluate(flag_key, default, context)
	}

	fn events(&self) -> &ProviderEvents {
		&self.events
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::events::handler;
	use beacon_flags_core::{ErrorCode, EvaluationReason, ProviderEventKind};
	use parking_lot::Mutex;
	use std::io::Write;

	fn badge_flags() -> FlagSet {
		FlagSet::new().with_flag(
			"new-badge",
			FlagDefinition::boolean(false).with_users(["alice"], "on"),
		)
	}

	#[tokio::test]
	async fn resolves_targeted_and_default_values() {
		let provider = InMemoryProvider::new(badge_flags());

		let alice = provider
			.resolve(
				"new-badge",
				&FlagValue::Boolean(false),
				&EvaluationContext::for_user("alice"),
			)
			.await;
		assert_eq!(alice.value, FlagValue::Boolean(true));
		assert_eq!(alice.reason, EvaluationReason::TargetingMatch);

		let bob = provider
			.resolve(
				"new-badge",
				&FlagValue::Boolean(false),
				&EvaluationContext::for_user("bob"),
			)
			.await;
		assert_eq!(bob.value, FlagValue::Boolean(false));
		assert_eq!(bob.reason, EvaluationReason::Static);
	}

	#[tokio::test]
	async fn missing_flag_returns_default() {
		let provider = InMemoryProvider::default();
		let details = provider
			.resolve(
				"missing",
				&FlagValue::String("fallback".to_string()),
				&EvaluationContext::new(),
			)
			.await;

		assert_eq!(details.value, FlagValue::String("fallback".to_string()));
		assert_eq!(details.error_code, Some(ErrorCode::FlagNotFound));
	}

	#[test]
	fn replace_flags_emits_configuration_changed() {
		let provider = InMemoryProvider::new(badge_flags());
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		provider.subscribe(
			ProviderEventKind::ConfigurationChanged,
			handler(move |event| sink.lock().push(event.flags_changed.clone())),
		);

		let changed = provider.set_flag("cta-color", FlagDefinition::strings(["blue"], "blue"));
		assert_eq!(changed, vec!["cta-color".to_string()]);
		assert_eq!(*seen.lock(), vec![vec!["cta-color".to_string()]]);
	}

	#[test]
	fn identical_replacement_is_silent() {
		let provider = InMemoryProvider::new(badge_flags());
		let seen = Arc::new(Mutex::new(0));
		let sink = Arc::clone(&seen);
		provider.subscribe(
			ProviderEventKind::ConfigurationChanged,
			handler(move |_| *sink.lock() += 1),
		);

		assert!(provider.replace_flags(badge_flags()).is_empty());
		assert_eq!(*seen.lock(), 0);
	}

	#[test]
	fn concurrent_set_flag_keeps_every_update() {
		let provider = Arc::new(InMemoryProvider::new(badge_flags()));
		let writers: Vec<_> = (0..8)
			.map(|i| {
				let provider = Arc::clone(&provider);
				std::thread::spawn(move || {
					for j in 0..25 {
						provider.set_flag(
							format!("flag-{i}-{j}"),
							FlagDefinition::boolean(true),
						);
					}
				})
			})
			.collect();
		for writer in writers {
			writer.join().unwrap();
		}

		assert_eq!(provider.flags().len(), 1 + 8 * 25);
	}

	#[tokio::test]
	async fn loads_flag_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"{{"flags": {{"secret-access": {{"variants": {{"on": true, "off": false}}, "defaultVariant": "off"}}}}}}"#
		)
		.unwrap();

		let provider = InMemoryProvider::from_file(file.path()).await.unwrap();
		assert!(provider.metadata().name.starts_with("file:"));
		assert_eq!(provider.flags().len(), 1);
	}

	#[tokio::test]
	async fn missing_file_is_an_error() {
		let result = InMemoryProvider::from_file("/nonexistent/beacon/flags.json").await;
		assert!(matches!(result, Err(crate::FlagsError::Io(_))));
	}

	#[test]
	fn invalid_json_is_an_error() {
		let result = InMemoryProvider::from_json("{not json");
		assert!(matches!(result, Err(crate::FlagsError::InvalidFlags(_))));
	}
}
