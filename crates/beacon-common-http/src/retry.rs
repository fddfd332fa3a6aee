// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for HTTP calls.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

/// Backoff policy for [`retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	/// Scale each delay by a random factor in `[0.5, 1.5)`.
	pub jitter: bool,
	pub retryable_statuses: Vec<StatusCode>,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
			retryable_statuses: vec![
				StatusCode::TOO_MANY_REQUESTS,
				StatusCode::REQUEST_TIMEOUT,
				StatusCode::INTERNAL_SERVER_ERROR,
				StatusCode::BAD_GATEWAY,
				StatusCode::SERVICE_UNAVAILABLE,
				StatusCode::GATEWAY_TIMEOUT,
			],
		}
	}
}

impl RetryConfig {
	/// A policy that makes exactly one attempt.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	pub fn is_retryable_status(&self, status: StatusCode) -> bool {
		self.retryable_statuses.contains(&status)
	}

	/// Delay before retry number `attempt` (zero-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}

/// Errors that know whether another attempt could succeed.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self
			.status()
			.is_some_and(|status| RetryConfig::default().is_retryable_status(status))
	}
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or runs out of attempts.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			debug!(operation, attempt, error = %err, "non-retryable error");
			return Err(err);
		}

		if attempt >= max_attempts {
			warn!(operation, attempt, max_attempts, error = %err, "retry attempts exhausted");
			return Err(err);
		}

		let delay = cfg.delay_for(attempt - 1);
		warn!(
			operation,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			error = %err,
			"retrying after error"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct FakeError {
		retryable: bool,
	}

	impl fmt::Display for FakeError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "fake error (retryable: {})", self.retryable)
		}
	}

	impl RetryableError for FakeError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			jitter: false,
			..RetryConfig::default()
		}
	}

	#[tokio::test]
	async fn non_retryable_error_is_returned_after_one_attempt() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(5), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retryable_error_stops_at_max_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(3), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<&str, FakeError> = retry(&fast_config(4), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				if counter.fetch_add(1, Ordering::SeqCst) < 2 {
					Err(FakeError { retryable: true })
				} else {
					Ok("flags")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "flags");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn no_retry_policy_makes_one_attempt() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let _: Result<(), FakeError> = retry(&RetryConfig::no_retry(), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: true })
			}
		})
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn delay_grows_and_is_capped() {
		let cfg = RetryConfig {
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(400),
			jitter: false,
			..RetryConfig::default()
		};

		assert_eq!(cfg.delay_for(0), Duration::from_millis(100));
		assert_eq!(cfg.delay_for(1), Duration::from_millis(200));
		assert_eq!(cfg.delay_for(2), Duration::from_millis(400));
		assert_eq!(cfg.delay_for(8), Duration::from_millis(400));
	}

	#[test]
	fn jitter_stays_within_bounds() {
		let cfg = RetryConfig {
			base_delay: Duration::from_millis(100),
			jitter: true,
			..RetryConfig::default()
		};

		for _ in 0..50 {
			let delay = cfg.delay_for(0);
			assert!(delay >= Duration::from_millis(50));
			assert!(delay < Duration::from_millis(150));
		}
	}

	#[test]
	fn server_errors_are_retryable_statuses() {
		let cfg = RetryConfig::default();
		assert!(cfg.is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
		assert!(!cfg.is_retryable_status(StatusCode::FORBIDDEN));
		assert!(!cfg.is_retryable_status(StatusCode::NOT_FOUND));
	}
}
