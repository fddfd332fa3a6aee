// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage for the client's current evaluation context.

use std::sync::Arc;

use beacon_flags_core::EvaluationContext;
use parking_lot::RwLock;

/// Holds the context used for every evaluation.
///
/// Readers get an `Arc` snapshot, so an evaluation keeps seeing the context it
/// started with even if it is replaced mid-flight.
#[derive(Debug, Default)]
pub struct ContextStore {
	current: RwLock<Arc<EvaluationContext>>,
}

impl ContextStore {
	pub fn new(context: EvaluationContext) -> Self {
		Self {
			current: RwLock::new(Arc::new(context)),
		}
	}

	pub fn get(&self) -> Arc<EvaluationContext> {
		Arc::clone(&self.current.read())
	}

	/// Stores `context` and returns the one it replaced.
	pub fn replace(&self, context: EvaluationContext) -> Arc<EvaluationContext> {
		std::mem::replace(&mut *self.current.write(), Arc::new(context))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_empty_by_default() {
		let store = ContextStore::default();
		assert!(store.get().is_empty());
	}

	#[test]
	fn replace_returns_previous() {
		let store = ContextStore::new(EvaluationContext::for_user("alice"));
		let previous = store.replace(EvaluationContext::for_user("bob"));

		assert_eq!(previous.user_id(), Some("alice"));
		assert_eq!(store.get().user_id(), Some("bob"));
	}

	#[test]
	fn snapshot_survives_replacement() {
		let store = ContextStore::new(EvaluationContext::for_user("alice"));
		let snapshot = store.get();
		store.replace(EvaluationContext::for_user("bob"));

		assert_eq!(snapshot.user_id(), Some("alice"));
	}
}
