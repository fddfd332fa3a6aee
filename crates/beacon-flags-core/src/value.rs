// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a flag value, as requested by a typed getter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
	Boolean,
	String,
	Number,
	Structured,
}

impl fmt::Display for FlagType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			FlagType::Boolean => "boolean",
			FlagType::String => "string",
			FlagType::Number => "number",
			FlagType::Structured => "structured",
		};
		f.write_str(name)
	}
}

/// A flag value: boolean, string, number, or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
	Boolean(bool),
	Number(f64),
	String(String),
	Structured(serde_json::Value),
}

impl FlagValue {
	/// Classifies an arbitrary JSON value.
	pub fn from_json(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Bool(b) => FlagValue::Boolean(b),
			serde_json::Value::String(s) => FlagValue::String(s),
			serde_json::Value::Number(n) => match n.as_f64() {
				Some(f) => FlagValue::Number(f),
				None => FlagValue::Structured(serde_json::Value::Number(n)),
			},
			other => FlagValue::Structured(other),
		}
	}

	pub fn flag_type(&self) -> FlagType {
		match self {
			FlagValue::Boolean(_) => FlagType::Boolean,
			FlagValue::Number(_) => FlagType::Number,
			FlagValue::String(_) => FlagType::String,
			FlagValue::Structured(_) => FlagType::Structured,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FlagValue::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FlagValue::String(s) => Some(s),
			_ => None,
		}
	}

	/// Numbers only; a structured JSON number that fits `f64` also counts.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FlagValue::Number(n) => Some(*n),
			FlagValue::Structured(serde_json::Value::Number(n)) => n.as_f64(),
			_ => None,
		}
	}

	pub fn as_structured(&self) -> Option<&serde_json::Value> {
		match self {
			FlagValue::Structured(v) => Some(v),
			_ => None,
		}
	}

	/// Whether this value satisfies a getter of type `expected`.
	pub fn is_compatible_with(&self, expected: FlagType) -> bool {
		match expected {
			FlagType::Number => self.as_f64().is_some(),
			other => self.flag_type() == other,
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		match self {
			FlagValue::Boolean(b) => serde_json::Value::Bool(*b),
			FlagValue::Number(n) => serde_json::Number::from_f64(*n)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			FlagValue::String(s) => serde_json::Value::String(s.clone()),
			FlagValue::Structured(v) => v.clone(),
		}
	}
}

impl fmt::Display for FlagValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FlagValue::Boolean(b) => write!(f, "{b}"),
			FlagValue::Number(n) => write!(f, "{n}"),
			FlagValue::String(s) => f.write_str(s),
			FlagValue::Structured(v) => write!(f, "{v}"),
		}
	}
}

impl From<bool> for FlagValue {
	fn from(value: bool) -> Self {
		FlagValue::Boolean(value)
	}
}

impl From<f64> for FlagValue {
	fn from(value: f64) -> Self {
		FlagValue::Number(value)
	}
}

impl From<&str> for FlagValue {
	fn from(value: &str) -> Self {
		FlagValue::String(value.to_string())
	}
}

impl From<String> for FlagValue {
	fn from(value: String) -> Self {
		FlagValue::String(value)
	}
}

impl From<serde_json::Value> for FlagValue {
	fn from(value: serde_json::Value) -> Self {
		FlagValue::from_json(value)
	}
}
