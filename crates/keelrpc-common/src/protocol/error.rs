use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Native serialization error: {0}")]
    Native(#[from] postcard::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("No provider found for service: {0}")]
    NoProvider(String),

    #[error("Unknown {kind} key: {key}")]
    UnknownKey { kind: &'static str, key: String },

    #[error("All {attempts} attempts failed: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: Box<RpcError>,
    },

    #[error("All service nodes failed")]
    AllNodesFailed,

    #[error("Remote invocation failed: {0}")]
    RemoteInvocation(String),

    #[error("Tolerant strategy context missing: {0}")]
    TolerantContextMissing(&'static str),
}

impl RpcError {
    /// Unwraps to the innermost cause of a retry-exhaustion error.
    ///
    /// Useful when callers want to inspect the underlying transport failure
    /// rather than the wrapper.
    pub fn root_cause(&self) -> &RpcError {
        match self {
            RpcError::RetriesExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
