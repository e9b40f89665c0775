//! The framed wire envelope.
//!
//! Header layout, fixed 17 bytes, big-endian multi-byte fields:
//!
//! ```text
//! [0]     magic
//! [1]     protocol version
//! [2]     serializer id
//! [3]     message type (0 request, 1 response, 2 heartbeat, 3 other)
//! [4]     status (20 ok, 40 bad request, 50 bad response)
//! [5..13] request id (u64)
//! [13..17] body length (u32)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use super::requests::RpcRequest;
use super::responses::RpcResponse;
use super::serializer::Serializer;

/// Magic byte rejecting foreign or garbled streams.
pub const PROTOCOL_MAGIC: u8 = 0x01;

/// Protocol revision.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Fixed header size in bytes.
pub const HEADER_LENGTH: usize = 17;

/// Offset of the body-length field within the header.
pub const BODY_LENGTH_OFFSET: usize = 13;

/// Upper bound on body size, guards against hostile length fields.
pub const MAX_BODY_SIZE: usize = 100 * 1024 * 1024;

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a request id that is unique per call.
///
/// Timestamp in the upper half, atomic counter in the lower half, so ids stay
/// unique across restarts and across concurrent callers. Used to correlate a
/// response with its request on a connection and across retries.
pub fn next_request_id() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    (timestamp & 0xFFFF_FFFF_0000_0000) | (counter & 0xFFFF_FFFF)
}

/// Kind of message carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Heartbeat,
    Other,
}

impl MessageType {
    pub const fn id(&self) -> u8 {
        match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Heartbeat => 2,
            MessageType::Other => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(MessageType::Request),
            1 => Some(MessageType::Response),
            2 => Some(MessageType::Heartbeat),
            3 => Some(MessageType::Other),
            _ => None,
        }
    }
}

/// Outcome status carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Ok,
    BadRequest,
    BadResponse,
}

impl MessageStatus {
    pub const fn value(&self) -> u8 {
        match self {
            MessageStatus::Ok => 20,
            MessageStatus::BadRequest => 40,
            MessageStatus::BadResponse => 50,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            20 => Some(MessageStatus::Ok),
            40 => Some(MessageStatus::BadRequest),
            50 => Some(MessageStatus::BadResponse),
            _ => None,
        }
    }
}

/// Fixed-size message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: u8,
    pub version: u8,
    pub serializer: Serializer,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub request_id: u64,
    /// Length of the serialized body. Set by the codec on encode, read back
    /// on decode; constructors leave it zero.
    pub body_length: u32,
}

/// Body of a protocol message, selected by the header's message type.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Request(RpcRequest),
    Response(RpcResponse),
    /// Header-only frames: heartbeats and reserved message types.
    Empty,
}

/// The wire envelope: a fixed header plus a serializer-encoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolMessage {
    pub header: Header,
    pub body: MessageBody,
}

impl ProtocolMessage {
    /// A request frame.
    pub fn request(serializer: Serializer, request_id: u64, request: RpcRequest) -> Self {
        Self {
            header: Header {
                magic: PROTOCOL_MAGIC,
                version: PROTOCOL_VERSION,
                serializer,
                message_type: MessageType::Request,
                status: MessageStatus::Ok,
                request_id,
                body_length: 0,
            },
            body: MessageBody::Request(request),
        }
    }

    /// A response frame echoing the request's serializer and id.
    pub fn response(
        serializer: Serializer,
        request_id: u64,
        status: MessageStatus,
        response: RpcResponse,
    ) -> Self {
        Self {
            header: Header {
                magic: PROTOCOL_MAGIC,
                version: PROTOCOL_VERSION,
                serializer,
                message_type: MessageType::Response,
                status,
                request_id,
                body_length: 0,
            },
            body: MessageBody::Response(response),
        }
    }

    /// A header-only heartbeat frame.
    pub fn heartbeat(serializer: Serializer, request_id: u64) -> Self {
        Self {
            header: Header {
                magic: PROTOCOL_MAGIC,
                version: PROTOCOL_VERSION,
                serializer,
                message_type: MessageType::Heartbeat,
                status: MessageStatus::Ok,
                request_id,
                body_length: 0,
            },
            body: MessageBody::Empty,
        }
    }
}
