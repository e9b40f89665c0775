//! keelrpc Common Types and Transport
//!
//! This crate provides the core protocol definitions and transport layer for
//! the keelrpc framework.
//!
//! # Overview
//!
//! keelrpc lets a caller invoke a method on a named service without knowing
//! which physical host implements it. This crate contains the pieces shared
//! by every component:
//!
//! - **Protocol Layer**: request/response model, service metadata, the framed
//!   wire envelope, pluggable body serializers, and error handling
//! - **Transport Layer**: framed TCP transport plus the simpler HTTP variant
//! - **Service Layer**: explicit per-service method tables used for dispatch
//!
//! # Wire Format
//!
//! Every TCP message is a 17-byte header followed by a variable-length body:
//!
//! ```text
//! [magic:1][version:1][serializer:1][type:1][status:1][request id:8][body length:4][body]
//! ```
//!
//! The body is serialized with the codec named by the header's serializer id,
//! so peers with different configured codecs still interoperate per message.
//!
//! # Components
//!
//! - [`protocol`] - core protocol types and the body serializer registry
//! - [`transport`] - wire codec, stream framer, TCP and HTTP transports
//! - [`service`] - method tables for explicit dispatch
//! - [`config`] - framework configuration

pub mod config;
pub mod protocol;
pub mod service;
pub mod transport;

pub use config::{RegistryConfig, RpcConfig};
pub use protocol::error::{Result, RpcError};
pub use protocol::{
    MessageBody, MessageStatus, MessageType, ProtocolMessage, RpcRequest, RpcResponse, RpcValue,
    Serializer, ServiceMetaInfo,
};
pub use service::ServiceTable;
