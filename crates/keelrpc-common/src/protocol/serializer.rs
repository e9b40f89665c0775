//! Pluggable body serializers.
//!
//! The wire header names the body codec by a one-byte id, so both peers of a
//! connection agree on the codec per message rather than per deployment. The
//! enum is the registration table: adding a codec means adding a variant and
//! its two match arms, and the compiler checks the table is total.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{Result, RpcError};
use super::requests::RpcRequest;
use super::responses::RpcResponse;

/// Body codec selected by the wire header's serializer id.
///
/// | id | key        | format                       |
/// |----|------------|------------------------------|
/// | 0  | `postcard` | native compact binary        |
/// | 1  | `json`     | JSON                         |
/// | 2  | `bincode`  | fast fixed-layout binary     |
/// | 3  | `msgpack`  | portable MessagePack binary  |
///
/// # Example
///
/// ```
/// use keelrpc_common::protocol::serializer::Serializer;
/// use keelrpc_common::protocol::requests::RpcRequest;
///
/// let serializer = Serializer::Json;
/// let request = RpcRequest::new("demo.Echo", "say", vec![]);
///
/// let bytes = serializer.encode_request(&request).unwrap();
/// let decoded = serializer.decode_request(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Serializer {
    Postcard,
    Json,
    Bincode,
    MsgPack,
}

impl Serializer {
    /// Numeric id written into the wire header.
    pub const fn id(&self) -> u8 {
        match self {
            Serializer::Postcard => 0,
            Serializer::Json => 1,
            Serializer::Bincode => 2,
            Serializer::MsgPack => 3,
        }
    }

    /// Resolves a wire id, `None` for foreign ids.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Serializer::Postcard),
            1 => Some(Serializer::Json),
            2 => Some(Serializer::Bincode),
            3 => Some(Serializer::MsgPack),
            _ => None,
        }
    }

    /// Configuration key for this codec.
    pub const fn key(&self) -> &'static str {
        match self {
            Serializer::Postcard => "postcard",
            Serializer::Json => "json",
            Serializer::Bincode => "bincode",
            Serializer::MsgPack => "msgpack",
        }
    }

    /// Resolves a configuration key.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "postcard" => Ok(Serializer::Postcard),
            "json" => Ok(Serializer::Json),
            "bincode" => Ok(Serializer::Bincode),
            "msgpack" => Ok(Serializer::MsgPack),
            other => Err(RpcError::UnknownKey {
                kind: "serializer",
                key: other.to_string(),
            }),
        }
    }

    /// Encodes a request body.
    pub fn encode_request(&self, request: &RpcRequest) -> Result<Vec<u8>> {
        self.encode(request)
    }

    /// Decodes a request body.
    pub fn decode_request(&self, data: &[u8]) -> Result<RpcRequest> {
        self.decode(data)
    }

    /// Encodes a response body.
    pub fn encode_response(&self, response: &RpcResponse) -> Result<Vec<u8>> {
        self.encode(response)
    }

    /// Decodes a response body.
    pub fn decode_response(&self, data: &[u8]) -> Result<RpcResponse> {
        self.decode(data)
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Serializer::Postcard => Ok(postcard::to_allocvec(value)?),
            Serializer::Json => Ok(serde_json::to_vec(value)?),
            Serializer::Bincode => Ok(bincode::serialize(value)?),
            Serializer::MsgPack => Ok(rmp_serde::to_vec(value)?),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Serializer::Postcard => Ok(postcard::from_bytes(data)?),
            Serializer::Json => Ok(serde_json::from_slice(data)?),
            Serializer::Bincode => Ok(bincode::deserialize(data)?),
            Serializer::MsgPack => Ok(rmp_serde::from_slice(data)?),
        }
    }

    /// Every supported codec, in wire-id order.
    pub const ALL: [Serializer; 4] = [
        Serializer::Postcard,
        Serializer::Json,
        Serializer::Bincode,
        Serializer::MsgPack,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::value::RpcValue;

    fn sample_request() -> RpcRequest {
        RpcRequest::new(
            "demo.Echo",
            "say",
            vec![
                RpcValue::from("hi"),
                RpcValue::from(42i64),
                RpcValue::Bytes(vec![0, 1, 255]),
            ],
        )
    }

    #[test]
    fn test_id_key_mapping_is_stable() {
        for serializer in Serializer::ALL {
            assert_eq!(Serializer::from_id(serializer.id()), Some(serializer));
            assert_eq!(Serializer::from_key(serializer.key()).unwrap(), serializer);
        }
        assert_eq!(Serializer::from_id(9), None);
        assert!(Serializer::from_key("protobuf").is_err());
    }

    #[test]
    fn test_request_roundtrip_all_codecs() {
        let request = sample_request();
        for serializer in Serializer::ALL {
            let bytes = serializer.encode_request(&request).unwrap();
            let back = serializer.decode_request(&bytes).unwrap();
            assert_eq!(request, back, "codec {}", serializer.key());
        }
    }

    #[test]
    fn test_response_roundtrip_all_codecs() {
        let response = RpcResponse::success(RpcValue::from("pong"));
        for serializer in Serializer::ALL {
            let bytes = serializer.encode_response(&response).unwrap();
            let back = serializer.decode_response(&bytes).unwrap();
            assert_eq!(response, back, "codec {}", serializer.key());
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        for serializer in Serializer::ALL {
            assert!(serializer.decode_request(&[0xFF, 0xFE, 0xFD]).is_err());
        }
    }
}
