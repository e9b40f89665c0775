//! Framed TCP transport, client side.
//!
//! Each request opens a fresh connection, sends one encoded protocol message
//! and reads chunks through a [`MessageFramer`] until the response frame is
//! complete. One connection carries exactly one request/response pair; there
//! is no pipelining or multiplexing.

use std::net::ToSocketAddrs;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::error::{Result, RpcError};
use crate::protocol::message::{next_request_id, MessageBody, ProtocolMessage};
use crate::protocol::meta::ServiceMetaInfo;
use crate::protocol::requests::RpcRequest;
use crate::protocol::responses::RpcResponse;
use crate::protocol::serializer::Serializer;
use crate::transport::codec;
use crate::transport::framer::MessageFramer;

/// Read chunk size for the response stream.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Framed TCP transport for keelrpc calls.
pub struct TcpTransport;

impl TcpTransport {
    /// Connects to a remote endpoint.
    ///
    /// Resolves the address (which may yield several socket addresses) and
    /// attempts each until one succeeds.
    pub async fn connect(addr: &str) -> Result<TcpStream> {
        let socket_addrs = addr
            .to_socket_addrs()
            .map_err(|e| RpcError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(&socket_addr).await {
                Ok(stream) => {
                    debug!(addr, %socket_addr, "connection established");
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(RpcError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }

    /// Sends one protocol message and reads one complete reply frame.
    pub async fn exchange(
        stream: &mut TcpStream,
        message: &ProtocolMessage,
    ) -> Result<ProtocolMessage> {
        let encoded = codec::encode(message)?;
        stream
            .write_all(&encoded)
            .await
            .map_err(|e| map_io_error(e, "writing request"))?;
        stream
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing request"))?;

        let mut framer = MessageFramer::new();
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| map_io_error(e, "reading response"))?;
            if n == 0 {
                return Err(RpcError::Connection(
                    "connection closed before a complete response".to_string(),
                ));
            }
            if let Some(frame) = framer.push(&chunk[..n])?.into_iter().next() {
                return codec::decode(&frame);
            }
        }
    }

    /// Performs one full request against a service instance.
    ///
    /// Builds the request frame with a fresh request id, exchanges it, and
    /// verifies the response echoes the same id before unwrapping the body.
    pub async fn request(
        instance: &ServiceMetaInfo,
        serializer: Serializer,
        request: &RpcRequest,
    ) -> Result<RpcResponse> {
        let request_id = next_request_id();
        let message = ProtocolMessage::request(serializer, request_id, request.clone());

        let mut stream = Self::connect(&instance.service_address()).await?;
        let reply = Self::exchange(&mut stream, &message).await?;

        if reply.header.request_id != request_id {
            return Err(RpcError::InvalidResponse(format!(
                "response id {} does not match request id {}",
                reply.header.request_id, request_id
            )));
        }
        match reply.body {
            MessageBody::Response(response) => Ok(response),
            other => Err(RpcError::InvalidResponse(format!(
                "expected a response body, got {:?}",
                other
            ))),
        }
    }

    /// [`request`](Self::request) bounded by a per-call deadline.
    pub async fn request_with_deadline(
        instance: &ServiceMetaInfo,
        serializer: Serializer,
        request: &RpcRequest,
        deadline: Duration,
    ) -> Result<RpcResponse> {
        tokio::time::timeout(deadline, Self::request(instance, serializer, request))
            .await
            .map_err(|_| RpcError::Timeout(deadline.as_millis() as u64))?
    }
}

/// Map IO errors to transport error variants.
fn map_io_error(err: std::io::Error, context: &str) -> RpcError {
    match err.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::NotConnected => {
            RpcError::Connection(format!("{}: connection lost", context))
        }
        _ => RpcError::Io(err),
    }
}
