//! HTTP provider variant.
//!
//! The non-framed sibling of the TCP server: each POST body is one
//! serialized [`RpcRequest`], each response body one serialized
//! [`RpcResponse`]. The serializer is fixed per server instead of negotiated
//! per message, since there is no header byte to carry it.
//!
//! [`RpcRequest`]: keelrpc_common::protocol::requests::RpcRequest
//! [`RpcResponse`]: keelrpc_common::protocol::responses::RpcResponse

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;
use keelrpc_common::protocol::serializer::Serializer;

use crate::dispatch::LocalServiceRegistry;

/// HTTP server for keelrpc providers.
pub struct HttpServer {
    services: Arc<LocalServiceRegistry>,
    serializer: Serializer,
    listener: TcpListener,
}

impl HttpServer {
    /// Binds to an address. Use port 0 for an ephemeral port.
    pub async fn bind(
        bind_addr: &str,
        services: Arc<LocalServiceRegistry>,
        serializer: Serializer,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            RpcError::Connection(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        Ok(Self {
            services,
            serializer,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RpcError::Connection(format!("Failed to get local addr: {}", e)))
    }

    /// Serves connections until the task is aborted.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(|e| {
                RpcError::Connection(format!("Failed to accept connection: {}", e))
            })?;
            debug!(peer = %peer_addr, "http connection established");

            let services = self.services.clone();
            let serializer = self.serializer;
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let services = services.clone();
                    async move { handle_request(request, services, serializer).await }
                });
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    warn!(peer = %peer_addr, error = %e, "http connection error");
                }
            });
        }
    }
}

async fn handle_request(
    request: Request<Incoming>,
    services: Arc<LocalServiceRegistry>,
    serializer: Serializer,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read http request body");
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                serializer,
                "failed to read request body",
            ));
        }
    };

    let rpc_request = match serializer.decode_request(&body) {
        Ok(rpc_request) => rpc_request,
        Err(e) => {
            warn!(error = %e, "failed to decode http request body");
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                serializer,
                format!("failed to decode request: {}", e),
            ));
        }
    };

    let (rpc_response, _status) = services.dispatch(&rpc_request);
    let encoded = match serializer.encode_response(&rpc_response) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(error = %e, "failed to encode http response body");
            return Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                serializer,
                "failed to encode response",
            ));
        }
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/octet-stream")
        .body(Full::new(Bytes::from(encoded)))
        .unwrap_or_default();
    Ok(response)
}

fn error_reply(
    status: StatusCode,
    serializer: Serializer,
    message: impl Into<String>,
) -> Response<Full<Bytes>> {
    let body = serializer
        .encode_response(&RpcResponse::failure(message))
        .unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/octet-stream")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_default()
}
