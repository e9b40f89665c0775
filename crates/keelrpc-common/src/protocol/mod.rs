pub mod error;
pub mod message;
pub mod meta;
pub mod requests;
pub mod responses;
pub mod serializer;
pub mod value;

pub use error::{Result, RpcError};
pub use message::{
    next_request_id, Header, MessageBody, MessageStatus, MessageType, ProtocolMessage,
    HEADER_LENGTH, MAX_BODY_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use meta::{ServiceMetaInfo, DEFAULT_SERVICE_GROUP, DEFAULT_SERVICE_VERSION};
pub use requests::RpcRequest;
pub use responses::RpcResponse;
pub use serializer::Serializer;
pub use value::RpcValue;
