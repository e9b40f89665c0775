//! keelrpc Client
//!
//! The call-site half of the framework: [`ServiceClient`] turns
//! "call method X on service S" into a concrete network call against one of
//! potentially many live instances, composing discovery, load balancing,
//! retry and fault tolerance into a single decision procedure per call.

pub mod client;

pub use client::{ServiceClient, ServiceClientBuilder};
