// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_cli_config::{BeaconConfig, ProviderKind};
use beacon_flags::{
	handler, BackendResult, ClientConfig, EvaluationContext, FlagClient, GatingClient,
	InMemoryProvider, ProviderEventKind, RemoteProvider, RemoteProviderConfig, SharedProvider,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const NEW_BADGE_FLAG: &str = "new-badge";
pub const CTA_COLOR_FLAG: &str = "cta-color";

/// Maps the configured retry section onto the HTTP retry policy.
pub fn retry_policy(config: &beacon_cli_config::RetryConfig) -> beacon_common_http::RetryConfig {
	beacon_common_http::RetryConfig {
		max_attempts: config.max_attempts,
		base_delay: config.base_delay(),
		max_delay: config.max_delay(),
		..Default::default()
	}
}

pub async fn build_provider(config: &BeaconConfig) -> Result<SharedProvider> {
	let provider = &config.provider;
	match provider.kind {
		ProviderKind::Remote => {
			let remote = RemoteProviderConfig {
				host: provider.host.clone(),
				port: provider.port,
				tls: provider.tls,
				path: provider.path.clone(),
				poll_interval: provider.poll_interval(),
				init_timeout: provider.init_timeout(),
				error_threshold: provider.error_threshold,
				retry: retry_policy(&config.retry),
				..Default::default()
			};
			let remote = RemoteProvider::new(remote).context("failed to create remote provider")?;
			Ok(Arc::new(remote))
		}
		ProviderKind::File => {
			let path = provider
				.flags_file
				.as_ref()
				.context("provider.flags_file is required for the file provider")?;
			let file = InMemoryProvider::from_file(path)
				.await
				.with_context(|| format!("failed to load flags from {}", path.display()))?;
			Ok(Arc::new(file))
		}
	}
}

pub fn build_client(config: &BeaconConfig) -> FlagClient {
	FlagClient::builder()
		.config(ClientConfig {
			name: config.client.name.clone(),
			evaluation_timeout: config.client.evaluation_timeout(),
			// The provider enforces its own init timeout; leave headroom for it.
			init_timeout: config.provider.init_timeout() * 2,
		})
		.build()
}

pub fn gating_client(config: &BeaconConfig) -> Result<GatingClient> {
	let client = GatingClient::new(config.backend.base_url.clone())
		.context("invalid backend URL")?
		.with_retry(retry_policy(&config.retry));
	Ok(client)
}

/// Binds the configured provider. A failed bind is logged and the client
/// keeps serving defaults.
async fn bind(client: &FlagClient, config: &BeaconConfig) -> Result<()> {
	let provider = build_provider(config).await?;
	if let Err(e) = client.set_provider_and_wait(provider).await {
		warn!(error = %e, "flag provider unavailable, evaluating defaults");
	}
	Ok(())
}

/// Current values of the flags the CLI knows about.
pub async fn evaluate_known_flags(client: &FlagClient) -> Value {
	let new_badge = client.get_boolean_value(NEW_BADGE_FLAG, false).await;
	let cta_color = client.get_string_value(CTA_COLOR_FLAG, "blue").await;
	json!({
		NEW_BADGE_FLAG: new_badge,
		CTA_COLOR_FLAG: cta_color,
	})
}

/// Renders a backend result: the body on success, the error JSON otherwise.
pub fn render_backend<T: Serialize>(result: BackendResult<T>) -> Value {
	match result {
		Ok(reply) => serde_json::to_value(reply.body).unwrap_or(Value::Null),
		Err(e) => e.to_json(),
	}
}

fn print_json(value: &Value) -> Result<()> {
	println!(
		"{}",
		serde_json::to_string_pretty(value).context("failed to render output")?
	);
	Ok(())
}

/// Client-side and backend-side flag values for one user.
pub async fn flags_report(config: &BeaconConfig, user: &str) -> Result<Value> {
	let client = build_client(config);
	bind(&client, config).await?;
	client.set_context(EvaluationContext::for_user(user)).await;

	let local = evaluate_known_flags(&client).await;
	let backend = render_backend(gating_client(config)?.flags(user).await);
	client.close().await;

	Ok(json!({
		"user": user,
		"client": local,
		"backend": backend,
	}))
}

pub async fn flags(config: &BeaconConfig, user: &str) -> Result<()> {
	print_json(&flags_report(config, user).await?)
}

pub async fn hello(config: &BeaconConfig, user: &str) -> Result<()> {
	print_json(&render_backend(gating_client(config)?.hello(user).await))
}

pub async fn secret(config: &BeaconConfig, user: &str) -> Result<()> {
	print_json(&render_backend(gating_client(config)?.secret(user).await))
}

pub async fn health(config: &BeaconConfig) -> Result<()> {
	let result = gating_client(config)?.healthz().await;
	let healthy = result.is_ok();
	print_json(&render_backend(result))?;
	if !healthy {
		anyhow::bail!("backend at {} is unhealthy", config.backend.base_url);
	}
	Ok(())
}

/// Prints flag values whenever the provider becomes ready or its
/// configuration changes, until Ctrl-C.
pub async fn watch(config: &BeaconConfig, user: &str) -> Result<()> {
	let client = build_client(config);
	let (tx, mut rx) = mpsc::unbounded_channel();

	for kind in [ProviderEventKind::Ready, ProviderEventKind::ConfigurationChanged] {
		let tx = tx.clone();
		client.add_handler(
			kind,
			handler(move |event| {
				let _ = tx.send(event.clone());
			}),
		);
	}
	drop(tx);

	client.set_context(EvaluationContext::for_user(user)).await;
	let provider = build_provider(config).await?;
	client
		.set_provider_and_wait(provider)
		.await
		.context("failed to bind flag provider")?;
	info!(user, "watching flags, press Ctrl-C to stop");

	loop {
		tokio::select! {
			event = rx.recv() => {
				let Some(event) = event else { break };
				let values = evaluate_known_flags(&client).await;
				print_json(&json!({
					"event": event.kind,
					"flagsChanged": event.flags_changed,
					"flags": values,
				}))?;
			}
			signal = tokio::signal::ctrl_c() => {
				signal.context("failed to listen for Ctrl-C")?;
				info!("stopping watch");
				break;
			}
		}
	}

	client.close().await;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_cli_config::{BackendConfig, ProviderConfig};
	use std::io::Write;
	use std::time::Duration;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const FLAGS: &str = r#"{
		"flags": {
			"new-badge": {
				"variants": {"on": true, "off": false},
				"defaultVariant": "off",
				"targeting": [
					{"attribute": "userId", "operator": "equals", "value": "alice", "variant": "on"}
				]
			},
			"cta-color": {
				"variants": {"blue": "blue", "green": "green"},
				"defaultVariant": "blue"
			}
		}
	}"#;

	fn file_config(flags: &tempfile::NamedTempFile, backend: &str) -> BeaconConfig {
		BeaconConfig {
			provider: ProviderConfig {
				kind: ProviderKind::File,
				flags_file: Some(flags.path().to_path_buf()),
				..Default::default()
			},
			backend: BackendConfig {
				base_url: backend.to_string(),
			},
			..Default::default()
		}
	}

	fn flags_file() -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "{FLAGS}").unwrap();
		file
	}

	#[test]
	fn retry_policy_follows_config() {
		let section = beacon_cli_config::RetryConfig {
			max_attempts: 5,
			base_delay_ms: 50,
			max_delay_ms: 1_000,
		};
		let policy = retry_policy(&section);
		assert_eq!(policy.max_attempts, 5);
		assert_eq!(policy.base_delay, Duration::from_millis(50));
		assert_eq!(policy.max_delay, Duration::from_secs(1));
	}

	#[tokio::test]
	async fn file_provider_without_path_is_an_error() {
		let config = BeaconConfig {
			provider: ProviderConfig {
				kind: ProviderKind::File,
				..Default::default()
			},
			..Default::default()
		};
		assert!(build_provider(&config).await.is_err());
	}

	#[tokio::test]
	async fn flags_report_combines_client_and_backend() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/flags"))
			.and(query_param("userId", "alice"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"new-badge": true})))
			.mount(&server)
			.await;

		let file = flags_file();
		let report = flags_report(&file_config(&file, &server.uri()), "alice")
			.await
			.unwrap();

		assert_eq!(report["user"], json!("alice"));
		assert_eq!(report["client"], json!({"new-badge": true, "cta-color": "blue"}));
		assert_eq!(report["backend"], json!({"new-badge": true}));
	}

	#[tokio::test]
	async fn untargeted_user_gets_defaults() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
			.mount(&server)
			.await;

		let file = flags_file();
		let report = flags_report(&file_config(&file, &server.uri()), "bob")
			.await
			.unwrap();
		assert_eq!(report["client"], json!({"new-badge": false, "cta-color": "blue"}));
	}

	#[tokio::test]
	async fn forbidden_secret_renders_error_json() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/secret"))
			.respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "forbidden"})))
			.mount(&server)
			.await;

		let file = flags_file();
		let config = file_config(&file, &server.uri());
		let rendered = render_backend(gating_client(&config).unwrap().secret("bob").await);
		assert_eq!(rendered, json!({"error": "forbidden"}));
	}

	#[tokio::test]
	async fn unhealthy_backend_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/healthz"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let file = flags_file();
		assert!(health(&file_config(&file, &server.uri())).await.is_err());
	}
}
