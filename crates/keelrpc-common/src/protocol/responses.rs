//! RPC response type.
//!
//! Exactly one of a normal return or a populated `exception` signals the
//! outcome of the remote invocation. A populated `exception` rides back in an
//! otherwise successful round trip; transport failures never produce a
//! response at all.

use serde::{Deserialize, Serialize};

use super::value::RpcValue;

/// A serializable result descriptor.
///
/// # Example
///
/// ```
/// use keelrpc_common::protocol::responses::RpcResponse;
/// use keelrpc_common::protocol::value::RpcValue;
///
/// let ok = RpcResponse::success(RpcValue::from("hi"));
/// assert!(ok.exception.is_none());
///
/// let failed = RpcResponse::failure("division by zero");
/// assert!(failed.exception.is_some());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    /// Return value, absent for void returns and failures
    pub data: Option<RpcValue>,
    /// Declared return type, used to interpret `data` when the codec alone
    /// cannot recover it
    pub data_type: Option<String>,
    /// Human-readable status
    pub message: Option<String>,
    /// Set when the server-side invocation failed
    pub exception: Option<String>,
}

impl RpcResponse {
    /// A successful response carrying a return value.
    pub fn success(data: RpcValue) -> Self {
        Self {
            data_type: Some(data.type_name().to_string()),
            data: Some(data),
            message: Some("ok".to_string()),
            exception: None,
        }
    }

    /// A response for a failed server-side invocation.
    pub fn failure(exception: impl Into<String>) -> Self {
        Self {
            data: None,
            data_type: None,
            message: None,
            exception: Some(exception.into()),
        }
    }

    /// An empty response, used by the silent fault-tolerance postures.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this response carries a normal return.
    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }
}
