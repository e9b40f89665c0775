//! HTTP transport variant, client side.
//!
//! The simpler, non-framed sibling of the TCP transport: one POST carries one
//! serialized [`RpcRequest`] as the body, the HTTP response body is one
//! serialized [`RpcResponse`]. No 17-byte header is involved; the serializer
//! must be agreed out of band.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::protocol::error::{Result, RpcError};
use crate::protocol::meta::ServiceMetaInfo;
use crate::protocol::requests::RpcRequest;
use crate::protocol::responses::RpcResponse;
use crate::protocol::serializer::Serializer;

/// Default timeout for an HTTP exchange.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport for keelrpc calls.
pub struct HttpTransport;

impl HttpTransport {
    /// Sends one request to a service instance over HTTP.
    pub async fn request(
        instance: &ServiceMetaInfo,
        serializer: Serializer,
        request: &RpcRequest,
    ) -> Result<RpcResponse> {
        Self::request_with_deadline(instance, serializer, request, DEFAULT_TIMEOUT).await
    }

    /// Sends one request over HTTP, bounded by a per-call deadline.
    pub async fn request_with_deadline(
        instance: &ServiceMetaInfo,
        serializer: Serializer,
        request: &RpcRequest,
        deadline: Duration,
    ) -> Result<RpcResponse> {
        let url = format!("http://{}/", instance.service_address());
        let body = serializer.encode_request(request)?;

        let http_request = Request::builder()
            .method("POST")
            .uri(&url)
            .header("Content-Type", "application/octet-stream")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| RpcError::Transport(format!("Failed to build request: {}", e)))?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        let response_future = client.request(http_request);
        let response = tokio::time::timeout(deadline, response_future)
            .await
            .map_err(|_| RpcError::Timeout(deadline.as_millis() as u64))?
            .map_err(|e| RpcError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RpcError::Transport(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RpcError::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        serializer.decode_response(&body_bytes)
    }
}
