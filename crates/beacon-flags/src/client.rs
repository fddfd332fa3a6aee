// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The flag client.
//!
//! [`FlagClient`] is the application-facing handle. It binds one provider at a
//! time, holds the evaluation context, exposes typed getters that never fail,
//! and relays provider lifecycle events to application handlers.
//!
//! Provider events reach the client through forwarders registered on the
//! provider. Each forwarder is tagged with the binding generation it belongs
//! to and pushes into an unbounded channel; a dispatcher task drains the
//! channel, drops events whose generation is no longer bound, updates the
//! client status, and runs the application handlers in registration order.
//! Handlers therefore never run on the provider's own call stack.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use beacon_flags_core::{
	ClientStatus, ErrorCode, EvaluationContext, EvaluationDetails, EvaluationReason, FlagType,
	FlagValue, ProviderEvent, ProviderEventKind, ResolutionDetails,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::context::ContextStore;
use crate::error::{FlagsError, Result};
use crate::events::{handler, EventHandler, HandlerRegistry, Subscription};
use crate::hooks::{EvaluationHook, EvaluationRecord, SharedEvaluationHook};
use crate::provider::{FeatureProvider, ProviderMetadata, SharedProvider};

/// Client-level settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Name used in logs.
	pub name: String,
	/// Upper bound on a single provider resolution.
	pub evaluation_timeout: Duration,
	/// Upper bound on provider initialization during a bind.
	pub init_timeout: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			name: "default".to_string(),
			evaluation_timeout: Duration::from_secs(2),
			init_timeout: Duration::from_secs(30),
		}
	}
}

/// Builder for [`FlagClient`].
#[derive(Default)]
pub struct FlagClientBuilder {
	config: ClientConfig,
	context: EvaluationContext,
	hooks: Vec<SharedEvaluationHook>,
}

impl FlagClientBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.config.name = name.into();
		self
	}

	pub fn evaluation_timeout(mut self, timeout: Duration) -> Self {
		self.config.evaluation_timeout = timeout;
		self
	}

	pub fn init_timeout(mut self, timeout: Duration) -> Self {
		self.config.init_timeout = timeout;
		self
	}

	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the context in place before any provider is bound.
	pub fn context(mut self, context: EvaluationContext) -> Self {
		self.context = context;
		self
	}

	/// Adds an evaluation hook. Hooks run in the order they were added.
	pub fn hook<H: EvaluationHook>(mut self, hook: H) -> Self {
		self.hooks.push(Arc::new(hook));
		self
	}

	pub fn shared_hook(mut self, hook: SharedEvaluationHook) -> Self {
		self.hooks.push(hook);
		self
	}

	/// Builds the client and starts its event dispatcher.
	///
	/// Must be called from within a Tokio runtime.
	pub fn build(self) -> FlagClient {
		let (events_tx, events_rx) = mpsc::unbounded_channel();

		let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
			let dispatcher = tokio::spawn(run_dispatcher(weak.clone(), events_rx));
			ClientInner {
				config: self.config,
				binding: RwLock::new(None),
				bind_lock: tokio::sync::Mutex::new(()),
				next_generation: AtomicU64::new(0),
				status: RwLock::new(ClientStatus::NotReady),
				bind_in_progress: AtomicBool::new(false),
				context: ContextStore::new(self.context),
				handlers: HandlerRegistry::new(),
				hooks: self.hooks,
				events_tx,
				dispatcher: Mutex::new(Some(dispatcher)),
				closed: AtomicBool::new(false),
			}
		});

		FlagClient { inner }
	}
}

/// A provider the client has successfully bound.
struct Binding {
	provider: SharedProvider,
	generation: u64,
	subscriptions: Vec<Subscription>,
}

impl Binding {
	fn detach_events(&self) {
		for subscription in &self.subscriptions {
			self.provider.unsubscribe(subscription);
		}
	}
}

/// Marks a bind as in progress until dropped.
struct BindInProgress<'a>(&'a AtomicBool);

impl<'a> BindInProgress<'a> {
	fn start(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::SeqCst);
		Self(flag)
	}
}

impl Drop for BindInProgress<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

enum Dispatch {
	/// Relayed from a provider; dropped unless `generation` is still bound.
	Provider { generation: u64, event: ProviderEvent },
	/// Raised by the client itself about a bind it just completed or failed.
	Client(ProviderEvent),
}

struct ClientInner {
	config: ClientConfig,
	binding: RwLock<Option<Arc<Binding>>>,
	bind_lock: tokio::sync::Mutex<()>,
	next_generation: AtomicU64,
	/// Status of the bound provider; `status()` reports `Binding` over it
	/// while a bind is in progress.
	status: RwLock<ClientStatus>,
	bind_in_progress: AtomicBool,
	context: ContextStore,
	handlers: HandlerRegistry,
	hooks: Vec<SharedEvaluationHook>,
	events_tx: mpsc::UnboundedSender<Dispatch>,
	dispatcher: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
}

impl ClientInner {
	fn current_generation(&self) -> Option<u64> {
		self.binding.read().as_ref().map(|binding| binding.generation)
	}

	fn set_status(&self, status: ClientStatus) {
		let previous = std::mem::replace(&mut *self.status.write(), status);
		if previous != status {
			debug!(client = %self.config.name, from = %previous, to = %status, "client status changed");
		}
	}

	fn handle(&self, dispatch: Dispatch) {
		let event = match dispatch {
			Dispatch::Provider { generation, event } => {
				if self.current_generation() != Some(generation) {
					debug!(
						client = %self.config.name,
						provider = %event.provider_name,
						kind = %event.kind,
						"dropping event from unbound provider"
					);
					return;
				}
				let next = self.status.read().apply(event.kind);
				self.set_status(next);
				event
			}
			Dispatch::Client(event) => event,
		};

		self.handlers.dispatch(&event);
	}

	fn send(&self, dispatch: Dispatch) {
		if self.events_tx.send(dispatch).is_err() {
			debug!(client = %self.config.name, "event dispatcher stopped");
		}
	}
}

impl Drop for ClientInner {
	fn drop(&mut self) {
		if let Some(handle) = self.dispatcher.get_mut().take() {
			handle.abort();
		}
	}
}

async fn run_dispatcher(client: Weak<ClientInner>, mut rx: mpsc::UnboundedReceiver<Dispatch>) {
	while let Some(dispatch) = rx.recv().await {
		let Some(inner) = client.upgrade() else {
			break;
		};
		inner.handle(dispatch);
	}
}

/// Application handle for evaluating feature flags.
///
/// Cheap to clone; clones share the same provider, context, and handlers.
///
/// # Example
///
/// ```ignore
/// use beacon_flags::{EvaluationContext, FlagClient, InMemoryProvider};
///
/// let client = FlagClient::builder().name("frontend").build();
/// client.set_provider_and_wait(Arc::new(InMemoryProvider::new(flags))).await?;
/// client.set_context(EvaluationContext::for_user("alice")).await;
///
/// if client.get_boolean_value("new-badge", false).await {
///     render_badge();
/// }
/// ```
#[derive(Clone)]
pub struct FlagClient {
	inner: Arc<ClientInner>,
}

impl FlagClient {
	pub fn builder() -> FlagClientBuilder {
		FlagClientBuilder::new()
	}

	/// A client with default settings.
	pub fn new() -> Self {
		Self::builder().build()
	}

	pub fn name(&self) -> &str {
		&self.inner.config.name
	}

	pub fn status(&self) -> ClientStatus {
		if self.inner.bind_in_progress.load(Ordering::SeqCst) {
			return ClientStatus::Binding;
		}
		*self.inner.status.read()
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Metadata of the bound provider, if any.
	pub fn provider_metadata(&self) -> Option<ProviderMetadata> {
		self
			.inner
			.binding
			.read()
			.as_ref()
			.map(|binding| binding.provider.metadata().clone())
	}

	/// Binds `provider`, returning once it has initialized.
	///
	/// The provider is initialized with the current context before it replaces
	/// the bound one, so evaluations keep using the previous provider until
	/// the new one is ready. On failure the previous binding stays in place.
	#[instrument(skip_all, fields(client = %self.inner.config.name, provider = %provider.metadata().name))]
	pub async fn set_provider_and_wait(&self, provider: SharedProvider) -> Result<()> {
		if self.is_closed() {
			return Err(FlagsError::ClientClosed);
		}

		let _guard = self.inner.bind_lock.lock().await;
		if self.is_closed() {
			return Err(FlagsError::ClientClosed);
		}

		let name = provider.metadata().name.clone();
		let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
		let binding_marker = BindInProgress::start(&self.inner.bind_in_progress);
		debug!("binding provider");

		let subscriptions = self.forward_events(&provider, generation);
		let context = self.inner.context.get();

		let init = tokio::time::timeout(self.inner.config.init_timeout, provider.initialize(&context)).await;
		let failure = match init {
			Ok(Ok(())) => None,
			Ok(Err(FlagsError::ProviderInit { message, .. })) => Some(message),
			Ok(Err(e)) => Some(e.to_string()),
			Err(_) => Some(format!(
				"initialization exceeded {}ms",
				self.inner.config.init_timeout.as_millis()
			)),
		};

		if let Some(message) = failure {
			for subscription in &subscriptions {
				provider.unsubscribe(subscription);
			}

			// Events from the still-bound provider kept its status current.
			let still_bound = self.inner.binding.read().is_some();
			if still_bound {
				warn!(error = %message, "provider failed to initialize, keeping current provider");
			} else {
				self.inner.set_status(ClientStatus::Error);
				error!(error = %message, "provider failed to initialize");
				self
					.inner
					.send(Dispatch::Client(ProviderEvent::error(&name, message.clone())));
			}
			drop(binding_marker);
			return Err(FlagsError::ProviderInit {
				provider: name,
				message,
			});
		}

		let binding = Arc::new(Binding {
			provider: Arc::clone(&provider),
			generation,
			subscriptions,
		});
		let previous = self.inner.binding.write().replace(binding);
		self.inner.set_status(ClientStatus::Ready);
		drop(binding_marker);
		info!("provider bound");
		self.inner.send(Dispatch::Client(ProviderEvent::ready(&name)));

		if let Some(previous) = previous {
			previous.detach_events();
			if Arc::ptr_eq(&previous.provider, &provider) {
				debug!("rebound the same provider instance");
			} else {
				previous.provider.shutdown().await;
				debug!(previous = %previous.provider.metadata().name, "previous provider shut down");
			}
		}

		Ok(())
	}

	/// Binds `provider` in the background.
	///
	/// Failures are logged and reported to `Error` handlers when no other
	/// provider is bound.
	pub fn set_provider(&self, provider: SharedProvider) -> JoinHandle<Result<()>> {
		let client = self.clone();
		tokio::spawn(async move {
			let result = client.set_provider_and_wait(provider).await;
			if let Err(e) = &result {
				warn!(client = %client.name(), error = %e, "background provider bind failed");
			}
			result
		})
	}

	fn forward_events(&self, provider: &SharedProvider, generation: u64) -> Vec<Subscription> {
		ProviderEventKind::ALL
			.into_iter()
			.map(|kind| {
				let tx = self.inner.events_tx.clone();
				provider.subscribe(
					kind,
					handler(move |event| {
						let _ = tx.send(Dispatch::Provider {
							generation,
							event: event.clone(),
						});
					}),
				)
			})
			.collect()
	}

	/// Replaces the evaluation context.
	///
	/// The bound provider is told about the change first; evaluations issued
	/// after this returns use the new context. Waits for an in-progress bind
	/// so the incoming provider either initializes with this context or
	/// acknowledges it. Concurrent calls resolve last-writer-wins.
	pub async fn set_context(&self, context: EvaluationContext) {
		let _guard = self.inner.bind_lock.lock().await;
		let binding = self.inner.binding.read().clone();
		if let Some(binding) = binding {
			let previous = self.inner.context.get();
			if let Err(e) = binding.provider.on_context_change(&previous, &context).await {
				warn!(
					client = %self.inner.config.name,
					provider = %binding.provider.metadata().name,
					error = %e,
					"provider did not acknowledge context change"
				);
			}
		}

		self.inner.context.replace(context);
		debug!(client = %self.inner.config.name, "evaluation context replaced");
	}

	/// The context evaluations currently run against.
	pub fn context(&self) -> Arc<EvaluationContext> {
		self.inner.context.get()
	}

	/// Registers `handler` for `kind`.
	///
	/// Only events that occur after registration are delivered.
	pub fn add_handler(&self, kind: ProviderEventKind, handler: EventHandler) -> Subscription {
		self.inner.handlers.add_handler(kind, handler)
	}

	/// Removes every registration of `handler` for `kind`.
	pub fn remove_handler(&self, kind: ProviderEventKind, handler: &EventHandler) -> usize {
		self.inner.handlers.remove_handler(kind, handler)
	}

	pub fn remove_subscription(&self, subscription: &Subscription) -> bool {
		self.inner.handlers.remove_subscription(subscription)
	}

	/// Unbinds and shuts down the provider and stops event delivery.
	///
	/// Evaluations after close return their defaults.
	pub async fn close(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		let _guard = self.inner.bind_lock.lock().await;
		let binding = self.inner.binding.write().take();
		if let Some(binding) = binding {
			binding.detach_events();
			binding.provider.shutdown().await;
		}

		let dispatcher = self.inner.dispatcher.lock().take();
		if let Some(handle) = dispatcher {
			handle.abort();
		}
		self.inner.handlers.clear();
		self.inner.set_status(ClientStatus::NotReady);
		info!(client = %self.inner.config.name, "flag client closed");
	}

	pub async fn get_boolean_value(&self, flag_key: &str, default: bool) -> bool {
		self.get_boolean_details(flag_key, default).await.value
	}

	pub async fn get_string_value(&self, flag_key: &str, default: &str) -> String {
		self.get_string_details(flag_key, default).await.value
	}

	pub async fn get_number_value(&self, flag_key: &str, default: f64) -> f64 {
		self.get_number_details(flag_key, default).await.value
	}

	pub async fn get_object_value(
		&self,
		flag_key: &str,
		default: serde_json::Value,
	) -> serde_json::Value {
		self.get_object_details(flag_key, default).await.value
	}

	pub async fn get_boolean_details(&self, flag_key: &str, default: bool) -> EvaluationDetails<bool> {
		self
			.evaluate(flag_key, FlagValue::Boolean(default), FlagType::Boolean)
			.await
			.map(|value| value.as_bool().unwrap_or(default))
	}

	pub async fn get_string_details(&self, flag_key: &str, default: &str) -> EvaluationDetails<String> {
		self
			.evaluate(flag_key, FlagValue::String(default.to_string()), FlagType::String)
			.await
			.map(|value| match value {
				FlagValue::String(s) => s,
				_ => default.to_string(),
			})
	}

	pub async fn get_number_details(&self, flag_key: &str, default: f64) -> EvaluationDetails<f64> {
		self
			.evaluate(flag_key, FlagValue::Number(default), FlagType::Number)
			.await
			.map(|value| value.as_f64().unwrap_or(default))
	}

	pub async fn get_object_details(
		&self,
		flag_key: &str,
		default: serde_json::Value,
	) -> EvaluationDetails<serde_json::Value> {
		self
			.evaluate(
				flag_key,
				FlagValue::Structured(default.clone()),
				FlagType::Structured,
			)
			.await
			.map(|value| match value {
				FlagValue::Structured(json) => json,
				_ => default,
			})
	}

	async fn evaluate(
		&self,
		flag_key: &str,
		default: FlagValue,
		expected: FlagType,
	) -> EvaluationDetails<FlagValue> {
		let context = self.inner.context.get();
		let binding = if self.is_closed() {
			None
		} else {
			self.inner.binding.read().clone()
		};

		let provider_name = binding
			.as_ref()
			.map(|binding| binding.provider.metadata().name.clone());

		let resolution = match &binding {
			None => ResolutionDetails::error(
				default.clone(),
				ErrorCode::ProviderNotReady,
				"no provider is bound",
			),
			Some(binding) => {
				let timeout = self.inner.config.evaluation_timeout;
				let resolve = binding.provider.resolve(flag_key, &default, &context);
				match tokio::time::timeout(timeout, resolve).await {
					Ok(resolution) => resolution,
					Err(_) => ResolutionDetails::error(
						default.clone(),
						ErrorCode::General,
						format!("provider did not respond within {}ms", timeout.as_millis()),
					),
				}
			}
		};

		let resolution = settle(resolution, &default, expected);
		match resolution.error_code {
			None => {}
			Some(ErrorCode::FlagNotFound) => debug!(
				client = %self.inner.config.name,
				flag_key,
				"flag not found, using default"
			),
			Some(code) => warn!(
				client = %self.inner.config.name,
				flag_key,
				error_code = %code,
				error = ?resolution.error_message,
				"flag evaluation fell back to default"
			),
		}

		let details = EvaluationDetails {
			flag_key: flag_key.to_string(),
			value: resolution.value,
			variant: resolution.variant,
			reason: resolution.reason,
			error_code: resolution.error_code,
			error_message: resolution.error_message,
		};

		if !self.inner.hooks.is_empty() {
			let record = EvaluationRecord {
				flag_key: details.flag_key.clone(),
				flag_type: expected,
				value: details.value.clone(),
				variant: details.variant.clone(),
				reason: details.reason,
				error_code: details.error_code,
				targeting_key: context.targeting_key.clone(),
				provider_name,
				timestamp: Utc::now(),
			};
			for hook in &self.inner.hooks {
				hook.after_evaluation(record.clone()).await;
			}
		}

		details
	}
}

impl Default for FlagClient {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for FlagClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FlagClient")
			.field("name", &self.inner.config.name)
			.field("status", &self.status())
			.field("provider", &self.provider_metadata().map(|m| m.name))
			.finish()
	}
}

/// Enforces the evaluation contract on a provider's answer: errors and
/// disabled flags yield the default, and a value of the wrong type is a
/// `TypeMismatch`.
fn settle(resolution: ResolutionDetails, default: &FlagValue, expected: FlagType) -> ResolutionDetails {
	if resolution.is_error() || resolution.reason == EvaluationReason::Disabled {
		return ResolutionDetails {
			value: default.clone(),
			..resolution
		};
	}

	if !resolution.value.is_compatible_with(expected) {
		return ResolutionDetails::error(
			default.clone(),
			ErrorCode::TypeMismatch,
			format!(
				"expected {expected} value, provider returned {}",
				resolution.value.flag_type()
			),
		);
	}

	resolution
}
