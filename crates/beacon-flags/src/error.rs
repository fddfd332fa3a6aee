// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the feature flags SDK.

use beacon_common_http::RetryableError;
use beacon_flags_core::FlagSetError;
use thiserror::Error;

/// Result type alias for the flags SDK.
pub type Result<T> = std::result::Result<T, FlagsError>;

/// Errors that can cross the SDK's public boundary.
///
/// Evaluation never produces one of these: evaluation failures resolve to the
/// caller's default instead.
#[derive(Error, Debug)]
pub enum FlagsError {
	/// Binding a provider failed.
	#[error("Provider {provider} failed to initialize: {message}")]
	ProviderInit {
		/// Name of the provider that failed.
		provider: String,
		/// What went wrong.
		message: String,
	},

	/// Base URL is missing or invalid.
	#[error("Invalid base URL: {0}")]
	InvalidBaseUrl(String),

	/// Failed to connect to the server.
	#[error("Failed to connect to server: {0}")]
	ConnectionFailed(#[source] reqwest::Error),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[source] reqwest::Error),

	/// Server returned an error response.
	#[error("Server returned an error: {status} - {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Error message from server.
		message: String,
	},

	/// Flag definitions could not be loaded.
	#[error("Invalid flag definitions: {0}")]
	InvalidFlags(#[from] FlagSetError),

	/// Reading a local flag file failed.
	#[error("Failed to read flag file: {0}")]
	Io(#[from] std::io::Error),

	/// The provider refused a context update.
	#[error("Provider {provider} rejected the context: {message}")]
	ContextRejected {
		/// Name of the provider.
		provider: String,
		/// Reason given by the provider.
		message: String,
	},

	/// Client already closed.
	#[error("Client has been closed")]
	ClientClosed,
}

impl FlagsError {
	/// Wraps any error as a provider initialization failure.
	pub fn provider_init(provider: impl Into<String>, err: impl std::fmt::Display) -> Self {
		FlagsError::ProviderInit {
			provider: provider.into(),
			message: err.to_string(),
		}
	}

	/// Returns true if another attempt could succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			FlagsError::ConnectionFailed(_) => true,
			FlagsError::RequestFailed(e) => e.is_retryable(),
			FlagsError::ServerError { status, .. } => matches!(status, 408 | 429 | 500..=599),
			_ => false,
		}
	}
}

impl RetryableError for FlagsError {
	fn is_retryable(&self) -> bool {
		FlagsError::is_retryable(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_errors_are_retryable() {
		assert!(FlagsError::ServerError {
			status: 503,
			message: "unavailable".to_string()
		}
		.is_retryable());
		assert!(FlagsError::ServerError {
			status: 429,
			message: String::new()
		}
		.is_retryable());
	}

	#[test]
	fn client_errors_are_not_retryable() {
		assert!(!FlagsError::ServerError {
			status: 404,
			message: "not found".to_string()
		}
		.is_retryable());
		assert!(!FlagsError::ClientClosed.is_retryable());
		assert!(!FlagsError::provider_init("remote", "boom").is_retryable());
	}

	#[test]
	fn provider_init_message() {
		let err = FlagsError::provider_init("remote", "connection refused");
		assert_eq!(
			err.to_string(),
			"Provider remote failed to initialize: connection refused"
		);
	}
}
