// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A provider that polls a flag document over HTTP.
//!
//! The provider fetches a JSON [`FlagSet`] from `scheme://host:port/path`,
//! evaluates locally against the last good copy, and re-fetches on a fixed
//! interval in a background task. Poll failures keep serving the last good
//! copy while reporting `Stale`, then `Error` once failures pile up; the
//! first successful poll afterwards reports `Ready` again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_common_http::{retry, RetryConfig};
use beacon_flags_core::{
	ErrorCode, EvaluationContext, FlagSet, FlagValue, ProviderEvent, ResolutionDetails,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{FlagsError, Result};
use crate::events::ProviderEvents;
use crate::provider::{FeatureProvider, ProviderMetadata};

pub const REMOTE_PROVIDER_NAME: &str = "remote";

/// Connection and polling settings for [`RemoteProvider`].
#[derive(Debug, Clone)]
pub struct RemoteProviderConfig {
	pub host: String,
	pub port: u16,
	pub tls: bool,
	/// Path of the flag document, starting with `/`.
	pub path: String,
	/// Full URL that overrides host, port, tls and path when set.
	pub endpoint: Option<String>,
	pub poll_interval: Duration,
	/// Upper bound on the initial fetch, retries included.
	pub init_timeout: Duration,
	pub request_timeout: Duration,
	/// Consecutive poll failures before `Error` is reported.
	pub error_threshold: u32,
	/// Longest wait between polls while failing.
	pub max_backoff: Duration,
	/// Retry policy for the initial fetch.
	pub retry: RetryConfig,
}

impl Default for RemoteProviderConfig {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: 8013,
			tls: false,
			path: "/flags.json".to_string(),
			endpoint: None,
			poll_interval: Duration::from_secs(30),
			init_timeout: Duration::from_secs(10),
			request_timeout: Duration::from_secs(5),
			error_threshold: 3,
			max_backoff: Duration::from_secs(300),
			retry: RetryConfig::default(),
		}
	}
}

impl RemoteProviderConfig {
	/// A config that fetches from `url` directly.
	pub fn for_endpoint(url: impl Into<String>) -> Self {
		Self {
			endpoint: Some(url.into()),
			..Self::default()
		}
	}

	pub fn url(&self) -> String {
		if let Some(endpoint) = &self.endpoint {
			return endpoint.clone();
		}
		let scheme = if self.tls { "https" } else { "http" };
		let path = if self.path.starts_with('/') {
			self.path.clone()
		} else {
			format!("/{}", self.path)
		};
		format!("{scheme}://{}:{}{path}", self.host, self.port)
	}

	/// Delay before the next poll after `consecutive_failures` failures.
	fn poll_delay(&self, consecutive_failures: u32) -> Duration {
		if consecutive_failures == 0 {
			return self.poll_interval;
		}
		let factor = 2u32.saturating_pow(consecutive_failures.min(10));
		self
			.poll_interval
			.saturating_mul(factor)
			.min(self.max_backoff.max(self.poll_interval))
	}
}

struct Poller {
	shutdown_tx: mpsc::Sender<()>,
	handle: JoinHandle<()>,
}

/// Resolves flags from a periodically fetched flag document.
pub struct RemoteProvider {
	metadata: ProviderMetadata,
	config: RemoteProviderConfig,
	http: reqwest::Client,
	flags: Arc<RwLock<Option<Arc<FlagSet>>>>,
	events: Arc<ProviderEvents>,
	poller: Mutex<Option<Poller>>,
}

impl RemoteProvider {
	pub fn new(config: RemoteProviderConfig) -> Result<Self> {
		let http = beacon_common_http::builder()
			.timeout(config.request_timeout)
			.build()
			.map_err(FlagsError::ConnectionFailed)?;

		Ok(Self {
			metadata: ProviderMetadata::new(REMOTE_PROVIDER_NAME),
			config,
			http,
			flags: Arc::new(RwLock::new(None)),
			events: Arc::new(ProviderEvents::new()),
			poller: Mutex::new(None),
		})
	}

	pub fn config(&self) -> &RemoteProviderConfig {
		&self.config
	}

	/// The last successfully fetched flag set.
	pub fn flags(&self) -> Option<Arc<FlagSet>> {
		self.flags.read().clone()
	}

	pub fn is_polling(&self) -> bool {
		self
			.poller
			.lock()
			.as_ref()
			.is_some_and(|poller| !poller.handle.is_finished())
	}

	fn start_polling(&self) {
		let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
		let handle = tokio::spawn(run_poll_loop(
			self.http.clone(),
			self.config.clone(),
			self.metadata.name.clone(),
			Arc::clone(&self.flags),
			Arc::clone(&self.events),
			shutdown_rx,
		));

		let previous = self.poller.lock().replace(Poller {
			shutdown_tx,
			handle,
		});
		if let Some(previous) = previous {
			previous.handle.abort();
		}
	}

	async fn stop_polling(&self) {
		let poller = self.poller.lock().take();
		if let Some(poller) = poller {
			let _ = poller.shutdown_tx.send(()).await;
			poller.handle.abort();
			let _ = poller.handle.await;
			debug!(provider = %self.metadata.name, "stopped flag polling");
		}
	}
}

impl std::fmt::Debug for RemoteProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteProvider")
			.field("url", &self.config.url())
			.field("poll_interval", &self.config.poll_interval)
			.field("loaded", &self.flags.read().is_some())
			.finish()
	}
}

impl Drop for RemoteProvider {
	fn drop(&mut self) {
		if let Some(poller) = self.poller.get_mut().take() {
			poller.handle.abort();
		}
	}
}

#[async_trait]
impl FeatureProvider for RemoteProvider {
	fn metadata(&self) -> &ProviderMetadata {
		&self.metadata
	}

	#[instrument(skip(self, _context), fields(url = %self.config.url()))]
	async fn initialize(&self, _context: &EvaluationContext) -> Result<()> {
		let url = self.config.url();
		let fetch = retry(&self.config.retry, "fetch flag document", || {
			fetch_flag_set(&self.http, &url)
		});

		let flags = match tokio::time::timeout(self.config.init_timeout, fetch).await {
			Ok(Ok(flags)) => flags,
			Ok(Err(e)) => return Err(FlagsError::provider_init(&self.metadata.name, e)),
			Err(_) => {
				return Err(FlagsError::provider_init(
					&self.metadata.name,
					format!(
						"no flag document from {url} within {}ms",
						self.config.init_timeout.as_millis()
					),
				))
			}
		};

		info!(flags = flags.len(), "fetched flag document");
		*self.flags.write() = Some(Arc::new(flags));
		self.start_polling();
		Ok(())
	}

	async fn resolve(
		&self,
		flag_key: &str,
		default: &FlagValue,
		context: &EvaluationContext,
	) -> ResolutionDetails {
		match self.flags() {
			Some(flags) => flags.evaluate(flag_key, default, context),
			None => ResolutionDetails::error(
				default.clone(),
				ErrorCode::ProviderNotReady,
				"flag document not loaded",
			),
		}
	}

	async fn shutdown(&self) {
		self.stop_polling().await;
	}

	fn events(&self) -> &ProviderEvents {
		&self.events
	}
}

async fn fetch_flag_set(http: &reqwest::Client, url: &str) -> Result<FlagSet> {
	let response = http.get(url).send().await.map_err(|e| {
		if e.is_connect() {
			FlagsError::ConnectionFailed(e)
		} else {
			FlagsError::RequestFailed(e)
		}
	})?;

	let status = response.status();
	if !status.is_success() {
		let message = response.text().await.unwrap_or_default();
		return Err(FlagsError::ServerError {
			status: status.as_u16(),
			message,
		});
	}

	let body = response.text().await.map_err(FlagsError::RequestFailed)?;
	Ok(FlagSet::from_json(&body)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollHealth {
	Healthy,
	Stale,
	Failed,
}

async fn run_poll_loop(
	http: reqwest::Client,
	config: RemoteProviderConfig,
	provider_name: String,
	flags: Arc<RwLock<Option<Arc<FlagSet>>>>,
	events: Arc<ProviderEvents>,
	mut shutdown_rx: mpsc::Receiver<()>,
) {
	let url = config.url();
	let mut consecutive_failures: u32 = 0;
	let mut health = PollHealth::Healthy;

	loop {
		let delay = config.poll_delay(consecutive_failures);
		tokio::select! {
			_ = tokio::time::sleep(delay) => {}
			_ = shutdown_rx.recv() => {
				info!(provider = %provider_name, "flag polling received shutdown signal");
				break;
			}
		}

		match fetch_flag_set(&http, &url).await {
			Ok(next) => {
				consecutive_failures = 0;
				let changed = {
					let mut current = flags.write();
					let changed = match current.as_deref() {
						Some(previous) => previous.changed_keys(&next),
						None => next.flags.keys().cloned().collect(),
					};
					*current = Some(Arc::new(next));
					changed
				};

				if health != PollHealth::Healthy {
					info!(provider = %provider_name, "flag polling recovered");
					health = PollHealth::Healthy;
					events.emit(ProviderEvent::ready(&provider_name));
				}
				if !changed.is_empty() {
					info!(provider = %provider_name, changed = ?changed, "flag document changed");
					events.emit(ProviderEvent::configuration_changed(&provider_name, changed));
				}
			}
			Err(e) => {
				consecutive_failures += 1;
				warn!(
					provider = %provider_name,
					error = %e,
					failures = consecutive_failures,
					"flag poll failed"
				);

				if consecutive_failures >= config.error_threshold.max(1) {
					if health != PollHealth::Failed {
						error!(provider = %provider_name, failures = consecutive_failures, "flag source unreachable");
						health = PollHealth::Failed;
						events.emit(ProviderEvent::error(&provider_name, e.to_string()));
					}
				} else if health == PollHealth::Healthy {
					health = PollHealth::Stale;
					events.emit(ProviderEvent::stale(&provider_name, e.to_string()));
				}
			}
		}
	}
}
