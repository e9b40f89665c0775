use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use keelrpc_common::protocol::error::Result;
use keelrpc_common::protocol::meta::ServiceMetaInfo;

use crate::backend::{RegistryBackend, ServiceChange};

/// Capacity of the change-event channel. Laggards re-query instead of
/// replaying missed events, so a small buffer is enough.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-process registry backend.
///
/// The default backend and the test double: registrations live in process
/// memory, change notifications fan out over a broadcast channel, and
/// heartbeats are no-ops because in-process registrations cannot go stale.
///
/// Discovery results are sorted by node key so selection order is stable
/// across calls.
pub struct MemoryRegistry {
    services: DashMap<String, HashMap<String, ServiceMetaInfo>>,
    events: broadcast::Sender<ServiceChange>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            services: DashMap::new(),
            events,
        }
    }

    fn notify(&self, service_key: &str) {
        // Ignore send errors: no subscriber means nothing to invalidate.
        let _ = self.events.send(ServiceChange {
            service_key: service_key.to_string(),
        });
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn register(&self, instance: ServiceMetaInfo) -> Result<()> {
        let service_key = instance.service_key();
        self.services
            .entry(service_key.clone())
            .or_default()
            .insert(instance.service_node_key(), instance);
        debug!(service_key = %service_key, "registered instance");
        self.notify(&service_key);
        Ok(())
    }

    async fn unregister(&self, instance: &ServiceMetaInfo) -> Result<()> {
        let service_key = instance.service_key();
        if let Some(mut nodes) = self.services.get_mut(&service_key) {
            nodes.remove(&instance.service_node_key());
        }
        debug!(service_key = %service_key, "unregistered instance");
        self.notify(&service_key);
        Ok(())
    }

    async fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>> {
        let mut instances: Vec<ServiceMetaInfo> = self
            .services
            .get(service_key)
            .map(|nodes| nodes.values().cloned().collect())
            .unwrap_or_default();
        instances.sort_by_key(|i| i.service_node_key());
        Ok(instances)
    }

    async fn watch(&self, _service_key: &str) -> Result<broadcast::Receiver<ServiceChange>> {
        Ok(self.events.subscribe())
    }

    async fn heartbeat(&self) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        // Tears down this handle only. The store may be shared by other
        // clients in the same process; their registrations survive.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(host: &str, port: u16) -> ServiceMetaInfo {
        ServiceMetaInfo::new("demo.Echo", host, port)
    }

    #[tokio::test]
    async fn test_register_then_discover() {
        let registry = MemoryRegistry::new();
        registry.register(instance("h1", 9001)).await.unwrap();
        registry.register(instance("h2", 9002)).await.unwrap();

        let found = registry.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].service_host, "h1");
        assert_eq!(found[1].service_host, "h2");
    }

    #[tokio::test]
    async fn test_register_same_node_twice_is_one_instance() {
        let registry = MemoryRegistry::new();
        registry.register(instance("h1", 9001)).await.unwrap();
        registry.register(instance("h1", 9001)).await.unwrap();

        let found = registry.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_discover_unknown_key_is_empty_not_error() {
        let registry = MemoryRegistry::new();
        let found = registry.discover("no.Such:1.0").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_removes_only_that_node() {
        let registry = MemoryRegistry::new();
        let h1 = instance("h1", 9001);
        registry.register(h1.clone()).await.unwrap();
        registry.register(instance("h2", 9002)).await.unwrap();

        registry.unregister(&h1).await.unwrap();
        let found = registry.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service_host, "h2");
    }

    #[tokio::test]
    async fn test_watch_sees_registration_changes() {
        let registry = MemoryRegistry::new();
        let mut rx = registry.watch("demo.Echo:1.0").await.unwrap();

        registry.register(instance("h1", 9001)).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.service_key, "demo.Echo:1.0");
    }

    #[tokio::test]
    async fn test_versioned_keys_are_disjoint() {
        let registry = MemoryRegistry::new();
        registry.register(instance("h1", 9001)).await.unwrap();
        registry
            .register(instance("h2", 9002).with_version("2.0"))
            .await
            .unwrap();

        assert_eq!(registry.discover("demo.Echo:1.0").await.unwrap().len(), 1);
        assert_eq!(registry.discover("demo.Echo:2.0").await.unwrap().len(), 1);
    }
}
