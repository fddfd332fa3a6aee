// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation context used to target flag evaluation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute name the backend and the demo front end use for the user identifier.
pub const USER_ID_ATTRIBUTE: &str = "userId";

/// Pseudo-attribute that resolves to the context's targeting key.
pub const TARGETING_KEY_ATTRIBUTE: &str = "targetingKey";

/// Identifier used when no user is known.
pub const ANONYMOUS_USER: &str = "anonymous";

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
	Bool(bool),
	Number(f64),
	String(String),
}

impl ContextValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			ContextValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			ContextValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			ContextValue::Number(n) => Some(*n),
			_ => None,
		}
	}

	/// Converts the value to JSON for comparison against targeting rules.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			ContextValue::Bool(b) => serde_json::Value::Bool(*b),
			ContextValue::Number(n) => serde_json::Number::from_f64(*n)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			ContextValue::String(s) => serde_json::Value::String(s.clone()),
		}
	}
}

impl fmt::Display for ContextValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ContextValue::Bool(b) => write!(f, "{b}"),
			ContextValue::Number(n) => write!(f, "{n}"),
			ContextValue::String(s) => f.write_str(s),
		}
	}
}

impl From<bool> for ContextValue {
	fn from(value: bool) -> Self {
		ContextValue::Bool(value)
	}
}

impl From<f64> for ContextValue {
	fn from(value: f64) -> Self {
		ContextValue::Number(value)
	}
}

impl From<i64> for ContextValue {
	fn from(value: i64) -> Self {
		ContextValue::Number(value as f64)
	}
}

impl From<i32> for ContextValue {
	fn from(value: i32) -> Self {
		ContextValue::Number(f64::from(value))
	}
}

impl From<&str> for ContextValue {
	fn from(value: &str) -> Self {
		ContextValue::String(value.to_string())
	}
}

impl From<String> for ContextValue {
	fn from(value: String) -> Self {
		ContextValue::String(value)
	}
}

/// The attributes a flag is evaluated against.
///
/// A context is an immutable value once handed to a client: updating it means
/// replacing it wholesale, never merging into the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub targeting_key: Option<String>,
	#[serde(default)]
	pub attributes: BTreeMap<String, ContextValue>,
}

impl EvaluationContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the context for a single user: targeting key and `userId` attribute.
	///
	/// An empty identifier falls back to `anonymous`.
	pub fn for_user(user_id: impl Into<String>) -> Self {
		let user_id = user_id.into();
		let user_id = if user_id.trim().is_empty() {
			ANONYMOUS_USER.to_string()
		} else {
			user_id
		};

		Self::new()
			.with_targeting_key(user_id.clone())
			.with_attribute(USER_ID_ATTRIBUTE, user_id)
	}

	pub fn with_targeting_key(mut self, key: impl Into<String>) -> Self {
		self.targeting_key = Some(key.into());
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn attribute(&self, key: &str) -> Option<&ContextValue> {
		self.attributes.get(key)
	}

	/// The user identifier: the `userId` attribute, else the targeting key.
	pub fn user_id(&self) -> Option<&str> {
		self
			.attribute(USER_ID_ATTRIBUTE)
			.and_then(ContextValue::as_str)
			.or(self.targeting_key.as_deref())
	}

	/// Resolves an attribute name as targeting rules see it.
	///
	/// `targetingKey` maps to the targeting key; anything else is a plain attribute.
	pub fn lookup(&self, attribute: &str) -> Option<serde_json::Value> {
		if attribute == TARGETING_KEY_ATTRIBUTE {
			return self
				.targeting_key
				.as_ref()
				.map(|k| serde_json::Value::String(k.clone()));
		}
		self.attributes.get(attribute).map(ContextValue::to_json)
	}

	pub fn is_empty(&self) -> bool {
		self.targeting_key.is_none() && self.attributes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn for_user_sets_targeting_key_and_attribute() {
		let ctx = EvaluationContext::for_user("alice");
		assert_eq!(ctx.targeting_key.as_deref(), Some("alice"));
		assert_eq!(
			ctx.attribute(USER_ID_ATTRIBUTE),
			Some(&ContextValue::String("alice".to_string()))
		);
		assert_eq!(ctx.user_id(), Some("alice"));
	}

	#[test]
	fn for_user_falls_back_to_anonymous() {
		let ctx = EvaluationContext::for_user("  ");
		assert_eq!(ctx.user_id(), Some(ANONYMOUS_USER));
	}

	#[test]
	fn lookup_resolves_targeting_key_pseudo_attribute() {
		let ctx = EvaluationContext::new()
			.with_targeting_key("bob")
			.with_attribute("plan", "pro");

		assert_eq!(ctx.lookup(TARGETING_KEY_ATTRIBUTE), Some(serde_json::json!("bob")));
		assert_eq!(ctx.lookup("plan"), Some(serde_json::json!("pro")));
		assert_eq!(ctx.lookup("missing"), None);
	}

	#[test]
	fn context_deserializes_scalar_attributes() {
		let ctx: EvaluationContext = serde_json::from_value(serde_json::json!({
			"targetingKey": "carol",
			"attributes": { "beta": true, "age": 41, "country": "NZ" }
		}))
		.unwrap();

		assert_eq!(ctx.attribute("beta"), Some(&ContextValue::Bool(true)));
		assert_eq!(ctx.attribute("age"), Some(&ContextValue::Number(41.0)));
		assert_eq!(ctx.attribute("country").and_then(ContextValue::as_str), Some("NZ"));
	}

	#[test]
	fn empty_context() {
		assert!(EvaluationContext::new().is_empty());
		assert!(!EvaluationContext::for_user("dave").is_empty());
	}
}
