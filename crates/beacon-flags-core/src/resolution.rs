// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Results of resolving a flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FlagValue;

/// Why a resolution produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationReason {
	/// The flag has a single static value for everyone.
	Static,
	/// A targeting rule matched the context.
	TargetingMatch,
	/// The caller's default was used.
	Default,
	/// The flag is disabled; the caller's default was used.
	Disabled,
	/// The value came from a local copy of the flag configuration.
	Cached,
	/// Resolution failed; the caller's default was used.
	Error,
}

/// Error codes attached to fallback resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ProviderNotReady,
	FlagNotFound,
	TypeMismatch,
	ParseError,
	General,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let code = match self {
			ErrorCode::ProviderNotReady => "PROVIDER_NOT_READY",
			ErrorCode::FlagNotFound => "FLAG_NOT_FOUND",
			ErrorCode::TypeMismatch => "TYPE_MISMATCH",
			ErrorCode::ParseError => "PARSE_ERROR",
			ErrorCode::General => "GENERAL",
		};
		f.write_str(code)
	}
}

/// What a provider hands back for one flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDetails {
	pub value: FlagValue,
	pub variant: Option<String>,
	pub reason: EvaluationReason,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
}

impl ResolutionDetails {
	pub fn new(value: FlagValue, reason: EvaluationReason) -> Self {
		Self {
			value,
			variant: None,
			reason,
			error_code: None,
			error_message: None,
		}
	}

	pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
		self.variant = Some(variant.into());
		self
	}

	/// A resolution that failed and carries the caller's default.
	pub fn error(default: FlagValue, code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			value: default,
			variant: None,
			reason: EvaluationReason::Error,
			error_code: Some(code),
			error_message: Some(message.into()),
		}
	}

	pub fn is_error(&self) -> bool {
		self.error_code.is_some()
	}
}

/// The typed outcome of an evaluation, as seen by callers of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetails<T> {
	pub flag_key: String,
	pub value: T,
	pub variant: Option<String>,
	pub reason: EvaluationReason,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
}

impl<T> EvaluationDetails<T> {
	/// True when `value` is the caller's default rather than a provider answer.
	pub fn is_fallback(&self) -> bool {
		self.error_code.is_some()
			|| matches!(
				self.reason,
				EvaluationReason::Default | EvaluationReason::Disabled | EvaluationReason::Error
			)
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EvaluationDetails<U> {
		EvaluationDetails {
			flag_key: self.flag_key,
			value: f(self.value),
			variant: self.variant,
			reason: self.reason,
			error_code: self.error_code,
			error_message: self.error_message,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_resolution_carries_default() {
		let details = ResolutionDetails::error(
			FlagValue::Boolean(false),
			ErrorCode::FlagNotFound,
			"flag not found: new-badge",
		);
		assert!(details.is_error());
		assert_eq!(details.value, FlagValue::Boolean(false));
		assert_eq!(details.reason, EvaluationReason::Error);
	}

	#[test]
	fn reason_serializes_screaming_snake() {
		let json = serde_json::to_string(&EvaluationReason::TargetingMatch).unwrap();
		assert_eq!(json, "\"TARGETING_MATCH\"");
		assert_eq!(ErrorCode::TypeMismatch.to_string(), "TYPE_MISMATCH");
	}

	#[test]
	fn fallback_detection() {
		let hit = EvaluationDetails {
			flag_key: "cta-color".to_string(),
			value: "green".to_string(),
			variant: Some("green".to_string()),
			reason: EvaluationReason::TargetingMatch,
			error_code: None,
			error_message: None,
		};
		assert!(!hit.is_fallback());

		let disabled = EvaluationDetails {
			reason: EvaluationReason::Disabled,
			..hit.clone()
		};
		assert!(disabled.is_fallback());

		let mapped = hit.map(|s| s.len());
		assert_eq!(mapped.value, 5);
	}
}
