// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.
//!
//! Each section comes in two forms: a `*ConfigLayer` with every field optional,
//! produced by a single source and merged field by field, and a resolved
//! `*Config` with defaults filled in.

mod backend;
mod client;
mod logging;
mod provider;
mod retry;

pub use backend::{BackendConfig, BackendConfigLayer};
pub use client::{ClientConfig, ClientConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use provider::{ProviderConfig, ProviderConfigLayer, ProviderKind};
pub use retry::{RetryConfig, RetryConfigLayer};
