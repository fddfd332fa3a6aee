// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in providers.

mod in_memory;
mod remote;

pub use in_memory::{InMemoryProvider, IN_MEMORY_PROVIDER_NAME};
pub use remote::{RemoteProvider, RemoteProviderConfig, REMOTE_PROVIDER_NAME};
