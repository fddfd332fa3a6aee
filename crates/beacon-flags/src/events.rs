// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event handler registries.
//!
//! [`HandlerRegistry`] keeps an ordered list of handlers per event kind. It is
//! used twice: providers own one (wrapped in [`ProviderEvents`]) to publish
//! lifecycle events, and the client owns one for application subscribers.
//!
//! Dispatch always runs over a snapshot taken under the lock, and handlers are
//! invoked with the lock released, so a handler may add or remove handlers
//! without deadlocking. Such changes apply from the next dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use beacon_flags_core::{ProviderEvent, ProviderEventKind};
use parking_lot::RwLock;
use tracing::trace;

/// A callback invoked with each matching event.
pub type EventHandler = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Wraps a closure as an [`EventHandler`].
pub fn handler<F>(f: F) -> EventHandler
where
	F: Fn(&ProviderEvent) + Send + Sync + 'static,
{
	Arc::new(f)
}

/// Identifies a single registration, returned by [`HandlerRegistry::add_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
	kind: ProviderEventKind,
	id: u64,
}

impl Subscription {
	pub fn kind(&self) -> ProviderEventKind {
		self.kind
	}
}

struct Registration {
	id: u64,
	handler: EventHandler,
}

#[derive(Default)]
struct RegistryInner {
	next_id: u64,
	handlers: HashMap<ProviderEventKind, Vec<Registration>>,
}

/// Ordered handler lists keyed by event kind.
#[derive(Default)]
pub struct HandlerRegistry {
	inner: RwLock<RegistryInner>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a handler for `kind`.
	///
	/// Registering the same handler twice is allowed and yields two
	/// registrations; it will then run twice per event.
	pub fn add_handler(&self, kind: ProviderEventKind, handler: EventHandler) -> Subscription {
		let mut inner = self.inner.write();
		inner.next_id += 1;
		let id = inner.next_id;
		inner
			.handlers
			.entry(kind)
			.or_default()
			.push(Registration { id, handler });
		Subscription { kind, id }
	}

	/// Removes every registration of `handler` for `kind`.
	///
	/// Handlers are compared by identity. Returns the number removed; removing
	/// a handler that was never added is a no-op.
	pub fn remove_handler(&self, kind: ProviderEventKind, handler: &EventHandler) -> usize {
		let mut inner = self.inner.write();
		let Some(list) = inner.handlers.get_mut(&kind) else {
			return 0;
		};
		let before = list.len();
		list.retain(|registration| !Arc::ptr_eq(&registration.handler, handler));
		before - list.len()
	}

	/// Removes the single registration identified by `subscription`.
	pub fn remove_subscription(&self, subscription: &Subscription) -> bool {
		let mut inner = self.inner.write();
		let Some(list) = inner.handlers.get_mut(&subscription.kind) else {
			return false;
		};
		let before = list.len();
		list.retain(|registration| registration.id != subscription.id);
		before != list.len()
	}

	/// Returns the handlers for `kind` in registration order.
	pub fn handlers(&self, kind: ProviderEventKind) -> Vec<EventHandler> {
		self
			.inner
			.read()
			.handlers
			.get(&kind)
			.map(|list| list.iter().map(|r| Arc::clone(&r.handler)).collect())
			.unwrap_or_default()
	}

	pub fn handler_count(&self, kind: ProviderEventKind) -> usize {
		self.inner.read().handlers.get(&kind).map_or(0, Vec::len)
	}

	/// Invokes each handler registered for the event's kind, in order.
	///
	/// Returns the number of handlers invoked.
	pub fn dispatch(&self, event: &ProviderEvent) -> usize {
		let snapshot = self.handlers(event.kind);
		for handler in &snapshot {
			handler(event);
		}
		snapshot.len()
	}

	pub fn clear(&self) {
		self.inner.write().handlers.clear();
	}
}

impl fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.read();
		let counts: HashMap<_, _> = inner
			.handlers
			.iter()
			.map(|(kind, list)| (kind.as_str(), list.len()))
			.collect();
		f.debug_struct("HandlerRegistry")
			.field("handlers", &counts)
			.finish()
	}
}

/// The event side of a provider: subscribers and an emitter.
#[derive(Debug, Default)]
pub struct ProviderEvents {
	registry: HandlerRegistry,
}

impl ProviderEvents {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, kind: ProviderEventKind, handler: EventHandler) -> Subscription {
		self.registry.add_handler(kind, handler)
	}

	pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
		self.registry.remove_subscription(subscription)
	}

	/// Publishes an event to every subscriber of its kind.
	pub fn emit(&self, event: ProviderEvent) {
		let delivered = self.registry.dispatch(&event);
		trace!(
			provider = %event.provider_name,
			kind = %event.kind,
			delivered,
			"emitted provider event"
		);
	}

	pub fn subscriber_count(&self, kind: ProviderEventKind) -> usize {
		self.registry.handler_count(kind)
	}
}
