// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Beacon feature flags SDK.
//!
//! This crate holds the data model shared by the client SDK (`beacon-flags`)
//! and anything that talks to it: evaluation context, flag values, resolution
//! details, provider lifecycle events, and flag-set definitions.
//!
//! # Example
//!
//! ```
//! use beacon_flags_core::{EvaluationContext, FlagDefinition, FlagSet, FlagValue};
//!
//! let flags = FlagSet::new()
//!     .with_flag("new-badge", FlagDefinition::boolean(false).with_users(["alice"], "on"));
//!
//! let details = flags.evaluate(
//!     "new-badge",
//!     &FlagValue::Boolean(false),
//!     &EvaluationContext::for_user("alice"),
//! );
//! assert_eq!(details.value, FlagValue::Boolean(true));
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod flag_set;
pub mod resolution;
pub mod status;
pub mod value;

pub use context::{ContextValue, EvaluationContext, ANONYMOUS_USER, USER_ID_ATTRIBUTE};
pub use error::{FlagSetError, Result};
pub use event::{ProviderEvent, ProviderEventKind};
pub use flag_set::{FlagDefinition, FlagSet, FlagState, Operator, TargetingRule};
pub use resolution::{ErrorCode, EvaluationDetails, EvaluationReason, ResolutionDetails};
pub use status::ClientStatus;
pub use value::{FlagType, FlagValue};

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn unknown_keys_always_resolve_to_default(key in "[a-z][a-z0-9-]{0,30}", default: bool) {
			let set = FlagSet::new().with_flag("known-flag", FlagDefinition::boolean(true));
			prop_assume!(key != "known-flag");

			let details = set.evaluate(&key, &FlagValue::Boolean(default), &EvaluationContext::new());
			prop_assert_eq!(details.value, FlagValue::Boolean(default));
			prop_assert_eq!(details.error_code, Some(ErrorCode::FlagNotFound));
		}

		#[test]
		fn listed_users_get_targeted_variant(user in "[a-z]{3,12}", others in prop::collection::vec("[A-Z]{3,12}", 0..5)) {
			let mut listed: Vec<&str> = others.iter().map(String::as_str).collect();
			listed.push(&user);

			let set = FlagSet::new()
				.with_flag("beta", FlagDefinition::boolean(false).with_users(listed, "on"));
			let details = set.evaluate("beta", &FlagValue::Boolean(false), &EvaluationContext::for_user(user.clone()));

			prop_assert_eq!(details.value, FlagValue::Boolean(true));
			prop_assert_eq!(details.reason, EvaluationReason::TargetingMatch);
		}

		#[test]
		fn in_and_not_in_are_complementary(needle in "[a-c]", haystack in prop::collection::vec("[a-c]", 0..4)) {
			let needle = serde_json::json!(needle);
			let haystack = serde_json::json!(haystack);
			prop_assert_eq!(
				Operator::In.matches(&needle, &haystack),
				!Operator::NotIn.matches(&needle, &haystack)
			);
		}

		#[test]
		fn changed_keys_of_identical_sets_is_empty(keys in prop::collection::btree_set("[a-z]{2,8}", 0..6)) {
			let set = keys
				.iter()
				.fold(FlagSet::new(), |set, key| set.with_flag(key.clone(), FlagDefinition::boolean(true)));
			prop_assert!(set.changed_keys(&set.clone()).is_empty());
		}
	}
}
