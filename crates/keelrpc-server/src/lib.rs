//! keelrpc Server
//!
//! The provider-side half of the framework: servers accept framed TCP
//! connections (or plain HTTP posts), dispatch requests through explicit
//! per-service method tables and answer with the request's serializer and id
//! echoed back.

pub mod dispatch;
pub mod http;
pub mod server;
pub mod tcp;

pub use dispatch::LocalServiceRegistry;
pub use http::HttpServer;
pub use server::{RpcServer, ServerHandle};
pub use tcp::TcpServer;
