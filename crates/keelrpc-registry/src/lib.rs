//! keelrpc Service Registry
//!
//! Abstracts register / unregister / discover / watch / heartbeat against any
//! coordination backend, and layers a process-local discovery cache on top.
//!
//! # Architecture
//!
//! - [`RegistryBackend`] - the raw backend contract; concrete coordination
//!   services (lease-based stores, polling meshes, relational registries with
//!   a TTL sweep) plug in behind it
//! - [`RegistryClient`] - what the rest of the framework talks to: caches
//!   discovery results per service key, installs one watch per key that
//!   invalidates the cached entry on any change, and tracks the node keys it
//!   registered so `destroy` can clean them up
//! - [`MemoryRegistry`] - an in-process backend used as the default and as
//!   the test double
//!
//! Cache staleness is harmless by design: a stale entry only sends calls to a
//! dead node, which the retry and fail-over layers absorb.

pub mod backend;
pub mod cache;
pub mod client;
pub mod memory;

pub use backend::{RegistryBackend, ServiceChange};
pub use cache::RegistryServiceCache;
pub use client::RegistryClient;
pub use memory::MemoryRegistry;

use std::sync::Arc;

use keelrpc_common::config::RegistryConfig;
use keelrpc_common::protocol::error::{Result, RpcError};

/// Resolves a registry backend by its configuration key.
///
/// The table is explicit: a key either maps to a constructor here or the
/// lookup fails at startup. `memory` is the only in-tree backend; coordination
/// backends live in their own crates and register at the call site.
pub fn backend_from_key(config: &RegistryConfig) -> Result<Arc<dyn RegistryBackend>> {
    match config.registry.as_str() {
        "memory" => Ok(Arc::new(MemoryRegistry::new())),
        other => Err(RpcError::UnknownKey {
            kind: "registry",
            key: other.to_string(),
        }),
    }
}
