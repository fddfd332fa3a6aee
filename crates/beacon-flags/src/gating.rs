// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client for the flag-gated backend.
//!
//! The backend evaluates flags server-side and gates its own endpoints. Every
//! call passes the user id as the `userId` query parameter and comes back as
//! either a [`BackendReply`] or a [`BackendRequestError`]; transport failures
//! and non-2xx statuses are both folded into the error type so callers have a
//! single shape to render.

use std::fmt;
use std::time::Duration;

use beacon_common_http::{retry, RetryConfig, RetryableError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{FlagsError, Result};

/// Flag key to value, as returned by the backend's flags endpoint.
pub type FlagMap = Map<String, Value>;

/// A successful backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply<T> {
	pub status: u16,
	pub body: T,
}

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct BackendRequestError {
	/// HTTP status, absent when the request never got a response.
	pub status: Option<u16>,
	/// Human-readable reason.
	pub error: String,
	/// Parsed JSON body of the error response, if any.
	pub body: Option<Value>,
}

impl BackendRequestError {
	fn transport(err: reqwest::Error) -> Self {
		Self {
			status: err.status().map(|s| s.as_u16()),
			error: err.to_string(),
			body: None,
		}
	}

	/// Builds the error from a non-2xx response body.
	///
	/// The message comes from an `error` field, else a `detail` field, else
	/// the bare status.
	fn from_response(status: StatusCode, text: &str) -> Self {
		let body: Option<Value> = serde_json::from_str(text).ok();
		let message = body.as_ref().and_then(|body| {
			body
				.get("error")
				.or_else(|| body.get("detail"))
				.map(|value| match value {
					Value::String(s) => s.clone(),
					other => other.to_string(),
				})
		});

		Self {
			status: Some(status.as_u16()),
			error: message.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
			body,
		}
	}

	/// JSON rendering for display: `{"error": "HTTP <status>"}` overlaid with
	/// the fields of the response body.
	pub fn to_json(&self) -> Value {
		let mut out = Map::new();
		let summary = match self.status {
			Some(status) => format!("HTTP {status}"),
			None => self.error.clone(),
		};
		out.insert("error".to_string(), Value::String(summary));

		match &self.body {
			Some(Value::Object(fields)) => {
				for (key, value) in fields {
					out.insert(key.clone(), value.clone());
				}
			}
			Some(other) => {
				out.insert("body".to_string(), other.clone());
			}
			None => {}
		}
		Value::Object(out)
	}
}

pub type BackendResult<T> = std::result::Result<BackendReply<T>, BackendRequestError>;

/// One attempt's failure, before it is turned into a [`BackendRequestError`].
enum AttemptError {
	Transport(reqwest::Error),
	Status { status: StatusCode, text: String },
}

impl fmt::Display for AttemptError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttemptError::Transport(e) => write!(f, "{e}"),
			AttemptError::Status { status, .. } => write!(f, "HTTP {}", status.as_u16()),
		}
	}
}

impl RetryableError for AttemptError {
	fn is_retryable(&self) -> bool {
		match self {
			AttemptError::Transport(e) => e.is_retryable(),
			// Only statuses listed in the retry policy reach this variant.
			AttemptError::Status { .. } => true,
		}
	}
}

/// Client for the backend's flag-gated endpoints.
#[derive(Debug, Clone)]
pub struct GatingClient {
	base_url: String,
	http: reqwest::Client,
	retry: RetryConfig,
}

impl GatingClient {
	/// Creates a client for `base_url`, e.g. `http://localhost:8000`.
	pub fn new(base_url: impl Into<String>) -> Result<Self> {
		Self::with_timeout(base_url, Duration::from_secs(10))
	}

	pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let base_url = base_url.into();
		let trimmed = base_url.trim().trim_end_matches('/');
		if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
			return Err(FlagsError::InvalidBaseUrl(base_url));
		}

		let http = beacon_common_http::builder()
			.timeout(timeout)
			.build()
			.map_err(FlagsError::ConnectionFailed)?;

		Ok(Self {
			base_url: trimmed.to_string(),
			http,
			retry: RetryConfig::default(),
		})
	}

	pub fn with_retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// `GET /api/healthz`
	pub async fn healthz(&self) -> BackendResult<Value> {
		self.get_json("/api/healthz", None).await
	}

	/// `GET /api/flags?userId=<id>`: the flag values the backend sees for a user.
	pub async fn flags(&self, user_id: &str) -> BackendResult<FlagMap> {
		self.get_json("/api/flags", Some(user_id)).await
	}

	/// `GET /api/hello?userId=<id>`
	pub async fn hello(&self, user_id: &str) -> BackendResult<Value> {
		self.get_json("/api/hello", Some(user_id)).await
	}

	/// `GET /api/secret?userId=<id>`: forbidden unless the secret flag is on.
	pub async fn secret(&self, user_id: &str) -> BackendResult<Value> {
		self.get_json("/api/secret", Some(user_id)).await
	}

	#[instrument(skip(self), fields(base_url = %self.base_url))]
	pub async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		user_id: Option<&str>,
	) -> BackendResult<T> {
		let url = format!("{}{}", self.base_url, path);
		let url = url.as_str();
		let http = &self.http;
		let policy = &self.retry;

		let outcome = retry(policy, path, || async move {
			let mut request = http.get(url);
			if let Some(user_id) = user_id {
				request = request.query(&[("userId", user_id)]);
			}

			let response = request.send().await.map_err(AttemptError::Transport)?;
			let status = response.status();
			if policy.is_retryable_status(status) {
				let text = response.text().await.unwrap_or_default();
				return Err(AttemptError::Status { status, text });
			}
			Ok(response)
		})
		.await;

		let response = match outcome {
			Ok(response) => response,
			Err(AttemptError::Transport(e)) => return Err(BackendRequestError::transport(e)),
			Err(AttemptError::Status { status, text }) => {
				return Err(BackendRequestError::from_response(status, &text))
			}
		};

		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(BackendRequestError::transport)?;
		debug!(status = status.as_u16(), "backend responded");

		if !status.is_success() {
			return Err(BackendRequestError::from_response(status, &text));
		}

		match serde_json::from_str(&text) {
			Ok(body) => Ok(BackendReply {
				status: status.as_u16(),
				body,
			}),
			Err(e) => Err(BackendRequestError {
				status: Some(status.as_u16()),
				error: format!("invalid JSON in response: {e}"),
				body: None,
			}),
		}
	}
}
