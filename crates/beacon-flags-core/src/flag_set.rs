// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag definitions in the flagd document shape, and local evaluation over them.
//!
//! ```json
//! {
//!   "flags": {
//!     "new-badge": {
//!       "state": "ENABLED",
//!       "variants": { "on": true, "off": false },
//!       "defaultVariant": "off",
//!       "targeting": [
//!         { "attribute": "userId", "operator": "in", "value": ["alice"], "variant": "on" }
//!       ]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FlagSetError, Result};
use crate::{ErrorCode, EvaluationContext, EvaluationReason, FlagValue, ResolutionDetails};

/// A complete set of flag definitions keyed by flag key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
	#[serde(default)]
	pub flags: BTreeMap<String, FlagDefinition>,
}

/// Whether a flag is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagState {
	#[default]
	Enabled,
	Disabled,
}

/// One flag: its variants, the default variant, and ordered targeting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
	#[serde(default)]
	pub state: FlagState,
	pub variants: BTreeMap<String, FlagValue>,
	pub default_variant: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub targeting: Vec<TargetingRule>,
}

/// Serves `variant` when the context attribute satisfies the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
	pub attribute: String,
	#[serde(default)]
	pub operator: Operator,
	pub value: serde_json::Value,
	pub variant: String,
}

/// Comparison operators for targeting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
	#[default]
	Equals,
	NotEquals,
	In,
	NotIn,
	StartsWith,
	EndsWith,
	Contains,
}

impl Operator {
	/// Evaluates this operator with the context value on the left.
	pub fn matches(&self, actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
		match self {
			Operator::Equals => json_eq(actual, expected),
			Operator::NotEquals => !json_eq(actual, expected),
			Operator::In => expected
				.as_array()
				.is_some_and(|values| values.iter().any(|v| json_eq(actual, v))),
			Operator::NotIn => !expected
				.as_array()
				.is_some_and(|values| values.iter().any(|v| json_eq(actual, v))),
			Operator::StartsWith => match (actual.as_str(), expected.as_str()) {
				(Some(a), Some(e)) => a.starts_with(e),
				_ => false,
			},
			Operator::EndsWith => match (actual.as_str(), expected.as_str()) {
				(Some(a), Some(e)) => a.ends_with(e),
				_ => false,
			},
			Operator::Contains => match (actual.as_str(), expected.as_str()) {
				(Some(a), Some(e)) => a.contains(e),
				_ => false,
			},
		}
	}
}

/// JSON equality that treats `1` and `1.0` as the same number.
fn json_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
	match (a.as_f64(), b.as_f64()) {
		(Some(x), Some(y)) => x == y,
		_ => a == b,
	}
}

impl FlagDefinition {
	pub fn new(variants: BTreeMap<String, FlagValue>, default_variant: impl Into<String>) -> Self {
		Self {
			state: FlagState::Enabled,
			variants,
			default_variant: default_variant.into(),
			targeting: Vec::new(),
		}
	}

	/// A boolean flag with `on`/`off` variants.
	pub fn boolean(default_on: bool) -> Self {
		let variants = BTreeMap::from([
			("on".to_string(), FlagValue::Boolean(true)),
			("off".to_string(), FlagValue::Boolean(false)),
		]);
		Self::new(variants, if default_on { "on" } else { "off" })
	}

	/// A flag whose variants are named after their string values.
	pub fn strings<'a>(values: impl IntoIterator<Item = &'a str>, default: &str) -> Self {
		let variants = values
			.into_iter()
			.map(|v| (v.to_string(), FlagValue::String(v.to_string())))
			.collect();
		Self::new(variants, default)
	}

	pub fn with_rule(mut self, rule: TargetingRule) -> Self {
		self.targeting.push(rule);
		self
	}

	/// Serve `variant` to the listed users.
	pub fn with_users<'a>(self, users: impl IntoIterator<Item = &'a str>, variant: &str) -> Self {
		let users: Vec<serde_json::Value> = users
			.into_iter()
			.map(|u| serde_json::Value::String(u.to_string()))
			.collect();
		self.with_rule(TargetingRule {
			attribute: crate::context::USER_ID_ATTRIBUTE.to_string(),
			operator: Operator::In,
			value: serde_json::Value::Array(users),
			variant: variant.to_string(),
		})
	}

	pub fn disabled(mut self) -> Self {
		self.state = FlagState::Disabled;
		self
	}

	fn validate(&self, flag_key: &str) -> Result<()> {
		if self.variants.is_empty() {
			return Err(FlagSetError::NoVariants {
				flag_key: flag_key.to_string(),
			});
		}

		let referenced = std::iter::once(&self.default_variant).chain(self.targeting.iter().map(|r| &r.variant));
		for variant in referenced {
			if !self.variants.contains_key(variant) {
				return Err(FlagSetError::UnknownVariant {
					flag_key: flag_key.to_string(),
					variant: variant.clone(),
				});
			}
		}
		Ok(())
	}

	/// Picks the variant for a context: first matching rule, else the default.
	fn select(&self, context: &EvaluationContext) -> (&str, EvaluationReason) {
		for rule in &self.targeting {
			let Some(actual) = context.lookup(&rule.attribute) else {
				continue;
			};
			if rule.operator.matches(&actual, &rule.value) {
				return (rule.variant.as_str(), EvaluationReason::TargetingMatch);
			}
		}
		(self.default_variant.as_str(), EvaluationReason::Static)
	}
}

impl FlagSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates a flag document.
	pub fn from_json(json: &str) -> Result<Self> {
		let set: FlagSet = serde_json::from_str(json)?;
		set.validate()?;
		Ok(set)
	}

	pub fn with_flag(mut self, key: impl Into<String>, definition: FlagDefinition) -> Self {
		self.flags.insert(key.into(), definition);
		self
	}

	pub fn validate(&self) -> Result<()> {
		for (key, definition) in &self.flags {
			definition.validate(key)?;
		}
		Ok(())
	}

	pub fn get(&self, flag_key: &str) -> Option<&FlagDefinition> {
		self.flags.get(flag_key)
	}

	pub fn len(&self) -> usize {
		self.flags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.flags.is_empty()
	}

	/// Resolves a flag for a context. Never fails: problems resolve to `default`.
	pub fn evaluate(&self, flag_key: &str, default: &FlagValue, context: &EvaluationContext) -> ResolutionDetails {
		let Some(definition) = self.flags.get(flag_key) else {
			return ResolutionDetails::error(
				default.clone(),
				ErrorCode::FlagNotFound,
				format!("flag not found: {flag_key}"),
			);
		};

		if definition.state == FlagState::Disabled {
			return ResolutionDetails::new(default.clone(), EvaluationReason::Disabled);
		}

		let (variant, reason) = definition.select(context);
		match definition.variants.get(variant) {
			Some(value) => ResolutionDetails::new(value.clone(), reason).with_variant(variant),
			None => ResolutionDetails::error(
				default.clone(),
				ErrorCode::General,
				format!("flag {flag_key} references unknown variant {variant}"),
			),
		}
	}

	/// Keys that were added, removed, or redefined between `self` and `next`.
	pub fn changed_keys(&self, next: &FlagSet) -> Vec<String> {
		let mut changed: Vec<String> = next
			.flags
			.iter()
			.filter(|(key, definition)| self.flags.get(*key) != Some(*definition))
			.map(|(key, _)| key.clone())
			.collect();

		changed.extend(
			self
				.flags
				.keys()
				.filter(|key| !next.flags.contains_key(*key))
				.cloned(),
		);
		changed.sort();
		changed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn demo_set() -> FlagSet {
		FlagSet::new()
			.with_flag("new-badge", FlagDefinition::boolean(false).with_users(["alice"], "on"))
			.with_flag(
				"cta-color",
				FlagDefinition::strings(["blue", "green"], "blue").with_users(["carol"], "green"),
			)
	}

	#[test]
	fn targeting_match_for_listed_user() {
		let set = demo_set();
		let details = set.evaluate(
			"new-badge",
			&FlagValue::Boolean(false),
			&EvaluationContext::for_user("alice"),
		);
		assert_eq!(details.value, FlagValue::Boolean(true));
		assert_eq!(details.reason, EvaluationReason::TargetingMatch);
		assert_eq!(details.variant.as_deref(), Some("on"));
	}

	#[test]
	fn default_variant_for_other_users() {
		let set = demo_set();
		let details = set.evaluate(
			"cta-color",
			&FlagValue::String("red".into()),
			&EvaluationContext::for_user("bob"),
		);
		assert_eq!(details.value, FlagValue::String("blue".into()));
		assert_eq!(details.reason, EvaluationReason::Static);
	}

	#[test]
	fn unknown_flag_returns_default_with_error() {
		let details = demo_set().evaluate("nope", &FlagValue::Number(4.0), &EvaluationContext::new());
		assert_eq!(details.value, FlagValue::Number(4.0));
		assert_eq!(details.error_code, Some(ErrorCode::FlagNotFound));
	}

	#[test]
	fn disabled_flag_returns_default() {
		let set = FlagSet::new().with_flag("off-flag", FlagDefinition::boolean(true).disabled());
		let details = set.evaluate("off-flag", &FlagValue::Boolean(false), &EvaluationContext::new());
		assert_eq!(details.value, FlagValue::Boolean(false));
		assert_eq!(details.reason, EvaluationReason::Disabled);
		assert!(!details.is_error());
	}

	#[test]
	fn parses_flagd_document() {
		let doc = json!({
			"flags": {
				"new-badge": {
					"state": "ENABLED",
					"variants": { "on": true, "off": false },
					"defaultVariant": "off",
					"targeting": [
						{ "attribute": "userId", "operator": "equals", "value": "alice", "variant": "on" }
					]
				},
				"api-new-endpoint-enabled": {
					"variants": { "on": true, "off": false },
					"defaultVariant": "off"
				}
			}
		});

		let set = FlagSet::from_json(&doc.to_string()).unwrap();
		assert_eq!(set.len(), 2);
		assert_eq!(set.get("api-new-endpoint-enabled").unwrap().state, FlagState::Enabled);
	}

	#[test]
	fn rejects_unknown_default_variant() {
		let doc = json!({
			"flags": { "broken": { "variants": { "on": true }, "defaultVariant": "off" } }
		});
		let err = FlagSet::from_json(&doc.to_string()).unwrap_err();
		assert!(matches!(err, FlagSetError::UnknownVariant { ref variant, .. } if variant == "off"));
	}

	#[test]
	fn rejects_flag_without_variants() {
		let doc = json!({ "flags": { "empty": { "variants": {}, "defaultVariant": "x" } } });
		assert!(matches!(
			FlagSet::from_json(&doc.to_string()),
			Err(FlagSetError::NoVariants { .. })
		));
	}

	#[test]
	fn changed_keys_covers_added_removed_and_modified() {
		let before = demo_set();
		let after = FlagSet::new()
			.with_flag("new-badge", FlagDefinition::boolean(true))
			.with_flag("cta-color", before.get("cta-color").unwrap().clone())
			.with_flag("fresh", FlagDefinition::boolean(false));

		assert_eq!(before.changed_keys(&after), vec!["fresh".to_string(), "new-badge".to_string()]);

		let removed = FlagSet::new();
		assert_eq!(
			before.changed_keys(&removed),
			vec!["cta-color".to_string(), "new-badge".to_string()]
		);
		assert!(before.changed_keys(&before.clone()).is_empty());
	}

	#[test]
	fn operators() {
		assert!(Operator::Equals.matches(&json!(1), &json!(1.0)));
		assert!(Operator::NotEquals.matches(&json!("a"), &json!("b")));
		assert!(Operator::In.matches(&json!("b"), &json!(["a", "b"])));
		assert!(Operator::NotIn.matches(&json!("c"), &json!(["a", "b"])));
		assert!(Operator::NotIn.matches(&json!("c"), &json!("not-a-list")));
		assert!(Operator::StartsWith.matches(&json!("alice@corp.com"), &json!("alice")));
		assert!(Operator::EndsWith.matches(&json!("alice@corp.com"), &json!("@corp.com")));
		assert!(Operator::Contains.matches(&json!("alice@corp.com"), &json!("corp")));
		assert!(!Operator::Contains.matches(&json!(5), &json!("5")));
	}
}
