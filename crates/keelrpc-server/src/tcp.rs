//! Framed TCP server.
//!
//! Accepts connections in a loop and spawns one handler task per connection.
//! Each connection owns its own frame state machine; frames decode into
//! protocol messages, requests dispatch through the local service registry,
//! heartbeats are answered header-only, and every reply echoes the request's
//! serializer and request id.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::message::{
    MessageBody, MessageStatus, MessageType, ProtocolMessage, HEADER_LENGTH,
};
use keelrpc_common::protocol::responses::RpcResponse;
use keelrpc_common::protocol::serializer::Serializer;
use keelrpc_common::transport::codec;
use keelrpc_common::transport::framer::MessageFramer;

use crate::dispatch::LocalServiceRegistry;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Async TCP server for keelrpc providers.
pub struct TcpServer {
    listener: TcpListener,
    services: Arc<LocalServiceRegistry>,
}

impl TcpServer {
    /// Binds to an address. Use port 0 for an ephemeral port.
    pub async fn bind(bind_addr: &str, services: Arc<LocalServiceRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            RpcError::Connection(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        Ok(Self { listener, services })
    }

    /// The actual bound address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RpcError::Connection(format!("Failed to get local addr: {}", e)))
    }

    /// Accepts connections until the task is aborted.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(|e| {
                RpcError::Connection(format!("Failed to accept connection: {}", e))
            })?;
            debug!(peer = %peer_addr, "connection established");

            let services = self.services.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, services).await {
                    warn!(peer = %peer_addr, error = %e, "connection error");
                }
            });
        }
    }
}

/// Serves one connection until the peer closes it.
async fn handle_connection(
    mut stream: TcpStream,
    services: Arc<LocalServiceRegistry>,
) -> Result<()> {
    let mut framer = MessageFramer::new();
    let mut chunk = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) => {
                debug!("connection closed by peer");
                return Ok(());
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => {
                return Err(RpcError::Connection(format!("Failed to read: {}", e)));
            }
        };

        for frame in framer.push(&chunk[..n])? {
            let reply = match codec::decode(&frame) {
                Ok(message) => answer(&message, &services),
                Err(decode_error) => {
                    warn!(error = %decode_error, "failed to decode frame");
                    match recover_bad_request_reply(&frame, &decode_error) {
                        // The stream itself may be poisoned; reply once and
                        // drop the connection.
                        Some(reply) => {
                            send(&mut stream, &reply).await?;
                            return Ok(());
                        }
                        None => return Err(decode_error),
                    }
                }
            };
            send(&mut stream, &reply).await?;
        }
    }
}

/// Produces the reply for one well-formed inbound message.
fn answer(message: &ProtocolMessage, services: &LocalServiceRegistry) -> ProtocolMessage {
    let serializer = message.header.serializer;
    let request_id = message.header.request_id;

    match &message.body {
        MessageBody::Request(request) => {
            let (response, status) = services.dispatch(request);
            ProtocolMessage::response(serializer, request_id, status, response)
        }
        MessageBody::Empty if message.header.message_type == MessageType::Heartbeat => {
            ProtocolMessage::heartbeat(serializer, request_id)
        }
        _ => ProtocolMessage::response(
            serializer,
            request_id,
            MessageStatus::BadRequest,
            RpcResponse::failure(format!(
                "unexpected message type: {:?}",
                message.header.message_type
            )),
        ),
    }
}

/// Builds a bad-request reply for an undecodable frame when the request id is
/// still recoverable from the raw header bytes. JSON is used for the reply
/// body since the frame's own serializer id may be the unreadable part.
fn recover_bad_request_reply(frame: &[u8], decode_error: &RpcError) -> Option<ProtocolMessage> {
    if frame.len() < HEADER_LENGTH {
        return None;
    }
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&frame[5..13]);
    let request_id = u64::from_be_bytes(id_bytes);

    Some(ProtocolMessage::response(
        Serializer::Json,
        request_id,
        MessageStatus::BadRequest,
        RpcResponse::failure(decode_error.to_string()),
    ))
}

async fn send(stream: &mut TcpStream, message: &ProtocolMessage) -> Result<()> {
    let encoded = codec::encode(message)?;
    stream
        .write_all(&encoded)
        .await
        .map_err(|e| RpcError::Connection(format!("Failed to send response: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| RpcError::Connection(format!("Failed to flush response: {}", e)))?;
    Ok(())
}
