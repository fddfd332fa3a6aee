// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for flag-set operations.
pub type Result<T> = std::result::Result<T, FlagSetError>;

/// Errors raised while loading flag definitions.
#[derive(Debug, Error)]
pub enum FlagSetError {
	#[error("Failed to parse flag definitions: {0}")]
	Parse(#[from] serde_json::Error),

	#[error("Flag {flag_key} references unknown variant {variant}")]
	UnknownVariant { flag_key: String, variant: String },

	#[error("Flag {flag_key} defines no variants")]
	NoVariants { flag_key: String },
}
