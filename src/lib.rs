//! keelrpc: a fault-tolerant RPC framework.
//!
//! Callers invoke a method on a named service without knowing which physical
//! host implements it; discovery, load balancing, retry and fault tolerance
//! compose into a single decision procedure per call.
//!
//! This crate re-exports the workspace members:
//!
//! - [`common`] - protocol model, wire codec, stream framer, transports
//! - [`registry`] - discovery backends and the cached registry client
//! - [`cluster`] - load balancing, retry and tolerant strategies
//! - [`client`] - the client invocation pipeline
//! - [`server`] - provider-side servers and dispatch
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use keelrpc::client::ServiceClient;
//! use keelrpc::common::protocol::value::RpcValue;
//! use keelrpc::common::service::ServiceTable;
//! use keelrpc::registry::{MemoryRegistry, RegistryClient};
//! use keelrpc::server::RpcServer;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(MemoryRegistry::new());
//!
//! // Provider
//! let server = RpcServer::new(
//!     Arc::new(RegistryClient::new(backend.clone())),
//!     "127.0.0.1",
//!     0,
//! );
//! server.register_service(
//!     "demo.Echo",
//!     ServiceTable::new().route("say", |args| {
//!         args.first().cloned().ok_or_else(|| "missing argument".to_string())
//!     }),
//! );
//! let handle = server.start().await?;
//!
//! // Consumer
//! let client = ServiceClient::builder(Arc::new(RegistryClient::new(backend))).build()?;
//! let reply = client.call("demo.Echo", "say", vec![RpcValue::from("hi")]).await?;
//! assert_eq!(reply, RpcValue::from("hi"));
//!
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub use keelrpc_client as client;
pub use keelrpc_cluster as cluster;
pub use keelrpc_common as common;
pub use keelrpc_registry as registry;
pub use keelrpc_server as server;
