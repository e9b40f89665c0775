//! keelrpc Transport Layer
//!
//! # Architecture
//!
//! - **Wire codec** ([`codec`]): encodes/decodes a [`ProtocolMessage`] with
//!   its 17-byte header; buffers only, no sockets
//! - **Stream framer** ([`framer`]): re-assembles arbitrarily-chunked byte
//!   streams into complete frames (half packet / sticky packet handling)
//! - **TCP transport** ([`tcp`]): one framed request/response per connection
//! - **HTTP transport** ([`http`]): non-framed variant, one serialized body
//!   per POST
//!
//! All paths enforce the [`MAX_BODY_SIZE`] bound so a hostile length field
//! cannot force an oversized allocation.
//!
//! [`ProtocolMessage`]: crate::protocol::ProtocolMessage
//! [`MAX_BODY_SIZE`]: crate::protocol::MAX_BODY_SIZE

pub mod codec;
pub mod framer;
pub mod http;
pub mod tcp;

pub use framer::MessageFramer;
pub use http::HttpTransport;
pub use tcp::TcpTransport;
