//! Wire codec for [`ProtocolMessage`].
//!
//! Operates purely on in-memory buffers: it has no knowledge of sockets and
//! holds no state, so it is safe to call from any number of tasks. Framing of
//! a live byte stream into message-sized buffers is the
//! [framer](crate::transport::framer)'s job; this module assumes it is handed
//! exactly one message.

use crate::protocol::error::{Result, RpcError};
use crate::protocol::message::{
    Header, MessageBody, MessageStatus, MessageType, ProtocolMessage, HEADER_LENGTH, MAX_BODY_SIZE,
    PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
use crate::protocol::serializer::Serializer;

/// Encodes a message into header + serialized body.
///
/// The body is serialized with the codec named by `header.serializer`; the
/// body-length field is written from the actual serialized length, whatever
/// the header carried.
pub fn encode(message: &ProtocolMessage) -> Result<Vec<u8>> {
    let header = &message.header;
    let body = match (&header.message_type, &message.body) {
        (MessageType::Request, MessageBody::Request(request)) => {
            header.serializer.encode_request(request)?
        }
        (MessageType::Response, MessageBody::Response(response)) => {
            header.serializer.encode_response(response)?
        }
        (MessageType::Heartbeat | MessageType::Other, MessageBody::Empty) => Vec::new(),
        (message_type, _) => {
            return Err(RpcError::InvalidMessage(format!(
                "body does not match message type {:?}",
                message_type
            )))
        }
    };

    let mut buf = Vec::with_capacity(HEADER_LENGTH + body.len());
    buf.push(header.magic);
    buf.push(header.version);
    buf.push(header.serializer.id());
    buf.push(header.message_type.id());
    buf.push(header.status.value());
    buf.extend_from_slice(&header.request_id.to_be_bytes());
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Decodes one complete message from a buffer.
///
/// Rejects bad magic, unsupported protocol versions, unknown serializer ids,
/// unknown message types, unknown status values and truncated buffers.
pub fn decode(data: &[u8]) -> Result<ProtocolMessage> {
    if data.len() < HEADER_LENGTH {
        return Err(RpcError::InvalidMessage(format!(
            "buffer too short for header: {} bytes",
            data.len()
        )));
    }

    let magic = data[0];
    if magic != PROTOCOL_MAGIC {
        return Err(RpcError::InvalidMessage(format!(
            "bad magic: 0x{:02x}",
            magic
        )));
    }

    let version = data[1];
    if version != PROTOCOL_VERSION {
        return Err(RpcError::InvalidMessage(format!(
            "unsupported protocol version: {}",
            version
        )));
    }

    let serializer = Serializer::from_id(data[2]).ok_or_else(|| {
        RpcError::InvalidMessage(format!("unknown serializer id: {}", data[2]))
    })?;
    let message_type = MessageType::from_id(data[3])
        .ok_or_else(|| RpcError::InvalidMessage(format!("unknown message type: {}", data[3])))?;
    let status = MessageStatus::from_value(data[4])
        .ok_or_else(|| RpcError::InvalidMessage(format!("unknown status: {}", data[4])))?;

    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&data[5..13]);
    let request_id = u64::from_be_bytes(id_bytes);

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[13..17]);
    let body_length = u32::from_be_bytes(len_bytes);

    if body_length as usize > MAX_BODY_SIZE {
        return Err(RpcError::InvalidMessage(format!(
            "body length {} exceeds limit",
            body_length
        )));
    }
    if data.len() < HEADER_LENGTH + body_length as usize {
        return Err(RpcError::InvalidMessage(format!(
            "truncated body: have {} of {} bytes",
            data.len() - HEADER_LENGTH,
            body_length
        )));
    }
    let body_bytes = &data[HEADER_LENGTH..HEADER_LENGTH + body_length as usize];

    let body = match message_type {
        MessageType::Request => MessageBody::Request(serializer.decode_request(body_bytes)?),
        MessageType::Response => MessageBody::Response(serializer.decode_response(body_bytes)?),
        MessageType::Heartbeat | MessageType::Other => {
            if !body_bytes.is_empty() {
                return Err(RpcError::InvalidMessage(format!(
                    "unexpected {}-byte body on header-only message",
                    body_bytes.len()
                )));
            }
            MessageBody::Empty
        }
    };

    Ok(ProtocolMessage {
        header: Header {
            magic,
            version,
            serializer,
            message_type,
            status,
            request_id,
            body_length,
        },
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::next_request_id;
    use crate::protocol::requests::RpcRequest;
    use crate::protocol::responses::RpcResponse;
    use crate::protocol::value::RpcValue;

    fn sample_request_message(serializer: Serializer) -> ProtocolMessage {
        ProtocolMessage::request(
            serializer,
            next_request_id(),
            RpcRequest::new("demo.Echo", "say", vec![RpcValue::from("hi")]),
        )
    }

    #[test]
    fn test_request_roundtrip_all_serializers() {
        for serializer in Serializer::ALL {
            let message = sample_request_message(serializer);
            let bytes = encode(&message).unwrap();
            let decoded = decode(&bytes).unwrap();

            assert_eq!(decoded.header.serializer, serializer);
            assert_eq!(decoded.header.request_id, message.header.request_id);
            assert_eq!(decoded.body, message.body);
            assert_eq!(
                decoded.header.body_length as usize,
                bytes.len() - HEADER_LENGTH,
                "body length field must match the serialized body"
            );
        }
    }

    #[test]
    fn test_response_roundtrip() {
        let message = ProtocolMessage::response(
            Serializer::Postcard,
            42,
            MessageStatus::Ok,
            RpcResponse::success(RpcValue::from("pong")),
        );
        let bytes = encode(&message).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.header.status, MessageStatus::Ok);
        assert_eq!(decoded.body, message.body);
    }

    #[test]
    fn test_heartbeat_roundtrip_is_header_only() {
        let message = ProtocolMessage::heartbeat(Serializer::Json, 9);
        let bytes = encode(&message).unwrap();
        assert_eq!(bytes.len(), HEADER_LENGTH);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.header.message_type, MessageType::Heartbeat);
        assert_eq!(decoded.body, MessageBody::Empty);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = encode(&sample_request_message(Serializer::Json)).unwrap();
        bytes[0] = 0x7F;
        assert!(matches!(decode(&bytes), Err(RpcError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_serializer() {
        let mut bytes = encode(&sample_request_message(Serializer::Json)).unwrap();
        bytes[2] = 9;
        assert!(matches!(decode(&bytes), Err(RpcError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let bytes = encode(&sample_request_message(Serializer::Json)).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(decode(truncated), Err(RpcError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert!(matches!(
            decode(&[PROTOCOL_MAGIC; 5]),
            Err(RpcError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_encode_rejects_mismatched_body() {
        let mut message = sample_request_message(Serializer::Json);
        message.body = MessageBody::Empty;
        assert!(matches!(
            encode(&message),
            Err(RpcError::InvalidMessage(_))
        ));
    }
}
