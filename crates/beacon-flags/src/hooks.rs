// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation hooks.
//!
//! A hook observes every evaluation the client performs, after the value has
//! been settled. Hooks are the integration point for exposure tracking or
//! audit logging; they cannot change the result.
//!
//! # Example
//!
//! ```ignore
//! use beacon_flags::{EvaluationHook, EvaluationRecord, FlagClient};
//! use async_trait::async_trait;
//!
//! struct PrintHook;
//!
//! #[async_trait]
//! impl EvaluationHook for PrintHook {
//!     async fn after_evaluation(&self, record: EvaluationRecord) {
//!         println!("{} = {}", record.flag_key, record.value);
//!     }
//! }
//!
//! let client = FlagClient::builder().name("frontend").hook(PrintHook).build();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use beacon_flags_core::{ErrorCode, EvaluationReason, FlagType, FlagValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a hook learns about one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
	pub flag_key: String,
	pub flag_type: FlagType,
	/// The value handed back to the caller.
	pub value: FlagValue,
	pub variant: Option<String>,
	pub reason: EvaluationReason,
	pub error_code: Option<ErrorCode>,
	/// Targeting key of the context the flag was evaluated against.
	pub targeting_key: Option<String>,
	/// Provider that resolved the flag, if one was bound.
	pub provider_name: Option<String>,
	pub timestamp: DateTime<Utc>,
}

impl EvaluationRecord {
	/// Whether the caller received its own default because of a failure.
	pub fn is_fallback(&self) -> bool {
		self.error_code.is_some()
	}

	/// Flattens the record into properties suitable for an analytics event.
	pub fn to_event_properties(&self) -> serde_json::Value {
		serde_json::json!({
			"flag_key": self.flag_key,
			"value": self.value.to_json(),
			"variant": self.variant,
			"reason": self.reason,
		})
	}
}

/// Observer invoked after each evaluation.
///
/// Runs on the evaluation path, so implementations should return quickly and
/// queue expensive work elsewhere.
#[async_trait]
pub trait EvaluationHook: Send + Sync + 'static {
	async fn after_evaluation(&self, record: EvaluationRecord);
}

/// Type alias for a shared evaluation hook.
pub type SharedEvaluationHook = Arc<dyn EvaluationHook>;

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEvaluationHook;

#[async_trait]
impl EvaluationHook for NoOpEvaluationHook {
	async fn after_evaluation(&self, _record: EvaluationRecord) {}
}

/// Logs each evaluation at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvaluationHook;

#[async_trait]
impl EvaluationHook for TracingEvaluationHook {
	async fn after_evaluation(&self, record: EvaluationRecord) {
		debug!(
			flag_key = %record.flag_key,
			value = %record.value,
			variant = ?record.variant,
			reason = ?record.reason,
			error_code = ?record.error_code,
			targeting_key = ?record.targeting_key,
			"flag evaluated"
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn record(error_code: Option<ErrorCode>) -> EvaluationRecord {
		EvaluationRecord {
			flag_key: "new-badge".to_string(),
			flag_type: FlagType::Boolean,
			value: FlagValue::Boolean(true),
			variant: Some("on".to_string()),
			reason: EvaluationReason::TargetingMatch,
			error_code,
			targeting_key: Some("alice".to_string()),
			provider_name: Some("in-memory".to_string()),
			timestamp: Utc::now(),
		}
	}

	#[test]
	fn event_properties() {
		let props = record(None).to_event_properties();

		assert_eq!(props["flag_key"], "new-badge");
		assert_eq!(props["value"], true);
		assert_eq!(props["variant"], "on");
		assert_eq!(props["reason"], "TARGETING_MATCH");
	}

	#[test]
	fn fallback_follows_error_code() {
		assert!(!record(None).is_fallback());
		assert!(record(Some(ErrorCode::FlagNotFound)).is_fallback());
	}

	struct CountingHook {
		count: AtomicUsize,
	}

	#[async_trait]
	impl EvaluationHook for CountingHook {
		async fn after_evaluation(&self, _record: EvaluationRecord) {
			self.count.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[tokio::test]
	async fn hook_is_called() {
		let hook = CountingHook {
			count: AtomicUsize::new(0),
		};

		hook.after_evaluation(record(None)).await;
		assert_eq!(hook.count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn builtin_hooks_accept_records() {
		tokio_test::block_on(async {
			NoOpEvaluationHook.after_evaluation(record(None)).await;
			TracingEvaluationHook
				.after_evaluation(record(Some(ErrorCode::General)))
				.await;
		});
	}
}
