//! Provider bootstrap.
//!
//! Ties the TCP server to the registry: services registered locally are
//! advertised as instances at startup, and shutdown walks the reverse path,
//! stop accepting first, then destroy the registry handle so owned nodes are
//! unregistered and watches cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use keelrpc_common::config::RpcConfig;
use keelrpc_common::protocol::error::Result;
use keelrpc_common::protocol::meta::ServiceMetaInfo;
use keelrpc_common::service::ServiceTable;
use keelrpc_registry::RegistryClient;

use crate::dispatch::LocalServiceRegistry;
use crate::tcp::TcpServer;

/// Interval between liveness heartbeats to the registry backend.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A provider process: local service tables plus registry advertisement.
pub struct RpcServer {
    services: Arc<LocalServiceRegistry>,
    registry: Arc<RegistryClient>,
    host: String,
    port: u16,
    version: String,
}

impl RpcServer {
    pub fn new(registry: Arc<RegistryClient>, host: impl Into<String>, port: u16) -> Self {
        Self {
            services: Arc::new(LocalServiceRegistry::new()),
            registry,
            host: host.into(),
            port,
            version: "1.0".to_string(),
        }
    }

    pub fn from_config(config: &RpcConfig, registry: Arc<RegistryClient>) -> Self {
        let mut server = Self::new(registry, config.server_host.clone(), config.server_port);
        server.version = config.version.clone();
        server
    }

    /// Registers a service implementation under its interface name.
    pub fn register_service(&self, service_name: impl Into<String>, table: ServiceTable) {
        self.services.register(service_name, table);
    }

    /// Binds the TCP listener, advertises every registered service and starts
    /// serving in the background.
    pub async fn start(self) -> Result<ServerHandle> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        let server = TcpServer::bind(&bind_addr, self.services.clone()).await?;
        let local_addr = server.local_addr()?;

        let mut advertised = Vec::new();
        for service_name in self.services.service_names() {
            let instance = ServiceMetaInfo::new(service_name, self.host.clone(), local_addr.port())
                .with_version(self.version.clone());
            self.registry.register(instance.clone()).await?;
            advertised.push(instance);
        }
        info!(
            addr = %local_addr,
            services = advertised.len(),
            "rpc server started"
        );

        let accept_task = tokio::spawn(server.run());

        // Lease renewal is the backend's affair; the provider only has to
        // keep calling in.
        let heartbeat_registry = self.registry.clone();
        let heartbeat_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = heartbeat_registry.heartbeat().await {
                    warn!(error = %e, "registry heartbeat failed");
                }
            }
        });

        Ok(ServerHandle {
            accept_task,
            heartbeat_task,
            registry: self.registry,
            local_addr,
        })
    }
}

/// Handle for a running provider.
pub struct ServerHandle {
    accept_task: JoinHandle<Result<()>>,
    heartbeat_task: JoinHandle<()>,
    registry: Arc<RegistryClient>,
    local_addr: std::net::SocketAddr,
}

impl ServerHandle {
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, then destroys the registry handle,
    /// unregistering every instance this server advertised.
    pub async fn shutdown(self) -> Result<()> {
        self.accept_task.abort();
        self.heartbeat_task.abort();
        self.registry.destroy().await?;
        info!(addr = %self.local_addr, "rpc server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keelrpc_common::protocol::value::RpcValue;
    use keelrpc_registry::{MemoryRegistry, RegistryBackend};

    fn echo_table() -> ServiceTable {
        ServiceTable::new().route("say", |args| {
            args.first()
                .cloned()
                .ok_or_else(|| "missing argument".to_string())
        })
    }

    #[tokio::test]
    async fn test_start_advertises_services() {
        let backend = Arc::new(MemoryRegistry::new());
        let registry = Arc::new(RegistryClient::new(backend.clone()));

        let server = RpcServer::new(registry, "127.0.0.1", 0);
        server.register_service("demo.Echo", echo_table());
        let handle = server.start().await.unwrap();

        let instances = backend.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].service_port, handle.local_addr().port());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_unregisters_instances() {
        let backend = Arc::new(MemoryRegistry::new());
        let registry = Arc::new(RegistryClient::new(backend.clone()));

        let server = RpcServer::new(registry, "127.0.0.1", 0);
        server.register_service("demo.Echo", echo_table());
        let handle = server.start().await.unwrap();
        handle.shutdown().await.unwrap();

        let instances = backend.discover("demo.Echo:1.0").await.unwrap();
        assert!(instances.is_empty());
    }

    #[tokio::test]
    async fn test_custom_version_in_advertisement() {
        let backend = Arc::new(MemoryRegistry::new());
        let registry = Arc::new(RegistryClient::new(backend.clone()));
        let config = RpcConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            version: "2.0".to_string(),
            ..RpcConfig::default()
        };

        let server = RpcServer::from_config(&config, registry);
        server.register_service("demo.Echo", echo_table());
        let handle = server.start().await.unwrap();

        assert!(backend.discover("demo.Echo:1.0").await.unwrap().is_empty());
        assert_eq!(backend.discover("demo.Echo:2.0").await.unwrap().len(), 1);

        handle.shutdown().await.unwrap();
    }
}
