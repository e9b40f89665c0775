use dashmap::DashMap;
use tracing::warn;

use keelrpc_common::protocol::message::MessageStatus;
use keelrpc_common::protocol::requests::RpcRequest;
use keelrpc_common::protocol::responses::RpcResponse;
use keelrpc_common::service::ServiceTable;

/// Local registry of the services this process exposes.
///
/// Maps a service name to its method table, built once at registration time.
/// Dispatch is a plain double lookup: service by name, handler by method.
#[derive(Default)]
pub struct LocalServiceRegistry {
    services: DashMap<String, ServiceTable>,
}

impl LocalServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, replacing any previous table under that name.
    pub fn register(&self, service_name: impl Into<String>, table: ServiceTable) {
        self.services.insert(service_name.into(), table);
    }

    pub fn unregister(&self, service_name: &str) {
        self.services.remove(service_name);
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|e| e.key().clone()).collect()
    }

    /// Dispatches one request.
    ///
    /// Unknown service or method is a bad request; a handler error is an
    /// invocation failure carried in the response exception, reported with OK
    /// status because the round trip itself succeeded.
    pub fn dispatch(&self, request: &RpcRequest) -> (RpcResponse, MessageStatus) {
        let Some(table) = self.services.get(&request.service_name) else {
            warn!(service = %request.service_name, "request for unknown service");
            return (
                RpcResponse::failure(format!("service not found: {}", request.service_name)),
                MessageStatus::BadRequest,
            );
        };

        match table.invoke(&request.method_name, &request.args) {
            Some(Ok(value)) => (RpcResponse::success(value), MessageStatus::Ok),
            Some(Err(invocation_error)) => {
                (RpcResponse::failure(invocation_error), MessageStatus::Ok)
            }
            None => {
                warn!(
                    service = %request.service_name,
                    method = %request.method_name,
                    "request for unknown method"
                );
                (
                    RpcResponse::failure(format!(
                        "method not found: {}.{}",
                        request.service_name, request.method_name
                    )),
                    MessageStatus::BadRequest,
                )
            }
        }
    }
}
