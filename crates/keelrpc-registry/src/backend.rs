use async_trait::async_trait;
use tokio::sync::broadcast;

use keelrpc_common::protocol::error::Result;
use keelrpc_common::protocol::meta::ServiceMetaInfo;

/// A change notification for a watched service key.
///
/// Carries only the key: watchers react by invalidating their cached entry,
/// never by patching it, so the payload does not need the changed instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChange {
    pub service_key: String,
}

/// Raw registry backend contract.
///
/// Liveness is each backend's private affair: lease/TTL renewal, ephemeral
/// nodes, or a periodic cleanup sweep. The framework only calls `heartbeat`
/// periodically from providers and leaves the semantics to the backend.
///
/// Failure semantics for `discover`: a backend error is an error to the
/// caller; a service with no live instances is an empty list, not an error.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Registers one service instance.
    async fn register(&self, instance: ServiceMetaInfo) -> Result<()>;

    /// Removes one service instance.
    async fn unregister(&self, instance: &ServiceMetaInfo) -> Result<()>;

    /// Lists all live instances under a service key.
    async fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>>;

    /// Subscribes to change notifications.
    ///
    /// The receiver may deliver changes for any key; subscribers filter.
    async fn watch(&self, service_key: &str) -> Result<broadcast::Receiver<ServiceChange>>;

    /// Renews this process's registrations, whatever that means to the backend.
    async fn heartbeat(&self) -> Result<()>;

    /// Releases backend resources.
    async fn destroy(&self) -> Result<()>;
}
