// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature Flags Rust SDK for Beacon.
//!
//! This crate provides a context-scoped flag client: the application binds a
//! provider, sets the evaluation context once (typically the signed-in user),
//! and reads flags through typed getters that never fail.
//!
//! # Features
//!
//! - **Pluggable providers**: in-memory, file-backed, and HTTP-polled flag sources
//! - **Atomic rebinding**: a new provider is only swapped in once it is ready
//! - **Lifecycle events**: `Ready`, `ConfigurationChanged`, `Error`, and `Stale`
//!   relayed to application handlers in registration order
//! - **Safe evaluation**: missing flags, type mismatches, and provider failures
//!   all resolve to the caller's default
//! - **Backend gating client**: calls the flag-gated backend endpoints
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use beacon_flags::{EvaluationContext, FlagClient, ProviderEventKind, RemoteProvider, RemoteProviderConfig, handler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FlagClient::builder().name("frontend").build();
//!     client.set_provider_and_wait(Arc::new(RemoteProvider::new(RemoteProviderConfig::default())?)).await?;
//!
//!     client.add_handler(
//!         ProviderEventKind::ConfigurationChanged,
//!         handler(|event| println!("changed: {:?}", event.flags_changed)),
//!     );
//!
//!     client.set_context(EvaluationContext::for_user("alice")).await;
//!     let show_badge = client.get_boolean_value("new-badge", false).await;
//!     println!("new-badge = {show_badge}");
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

mod client;
mod context;
mod error;
mod events;
mod gating;
mod hooks;
mod provider;
mod providers;

pub use client::{ClientConfig, FlagClient, FlagClientBuilder};
pub use context::ContextStore;
pub use error::{FlagsError, Result};
pub use events::{handler, EventHandler, HandlerRegistry, ProviderEvents, Subscription};
pub use gating::{BackendReply, BackendRequestError, BackendResult, FlagMap, GatingClient};
pub use hooks::{
	EvaluationHook, EvaluationRecord, NoOpEvaluationHook, SharedEvaluationHook,
	TracingEvaluationHook,
};
pub use provider::{FeatureProvider, ProviderMetadata, SharedProvider};
pub use providers::{
	InMemoryProvider, RemoteProvider, RemoteProviderConfig, IN_MEMORY_PROVIDER_NAME,
	REMOTE_PROVIDER_NAME,
};

pub use beacon_common_http::RetryConfig;

// Re-export core types for convenience
pub use beacon_flags_core::{
	ClientStatus, ContextValue, ErrorCode, EvaluationContext, EvaluationDetails, EvaluationReason,
	FlagDefinition, FlagSet, FlagState, FlagType, FlagValue, Operator, ProviderEvent,
	ProviderEventKind, ResolutionDetails, TargetingRule,
};
