use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use keelrpc_common::protocol::error::Result;
use keelrpc_common::protocol::meta::ServiceMetaInfo;

use crate::backend::RegistryBackend;
use crate::cache::RegistryServiceCache;

/// Registry facade with a discovery cache and watch bookkeeping.
///
/// This is what clients and servers hold. Consumers get cache-first
/// discovery with automatic watch installation; providers get owned-node
/// bookkeeping so a shutdown can unregister exactly what this process
/// registered.
///
/// Watches are idempotent per key: the first `watch` spawns a task that
/// invalidates the cached entry whenever the backend reports a change for
/// that key, later calls are no-ops. `destroy` aborts all watch tasks,
/// unregisters owned nodes and tears the backend down.
pub struct RegistryClient {
    backend: Arc<dyn RegistryBackend>,
    cache: RegistryServiceCache,
    watched_keys: DashSet<String>,
    watch_tasks: Mutex<Vec<JoinHandle<()>>>,
    owned_nodes: DashMap<String, ServiceMetaInfo>,
}

impl RegistryClient {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            cache: RegistryServiceCache::new(),
            watched_keys: DashSet::new(),
            watch_tasks: Mutex::new(Vec::new()),
            owned_nodes: DashMap::new(),
        }
    }

    /// Registers an instance and remembers it as owned by this process.
    pub async fn register(&self, instance: ServiceMetaInfo) -> Result<()> {
        self.backend.register(instance.clone()).await?;
        info!(node_key = %instance.service_node_key(), "service instance registered");
        self.owned_nodes
            .insert(instance.service_node_key(), instance);
        Ok(())
    }

    /// Unregisters an instance and forgets it.
    pub async fn unregister(&self, instance: &ServiceMetaInfo) -> Result<()> {
        self.backend.unregister(instance).await?;
        info!(node_key = %instance.service_node_key(), "service instance unregistered");
        self.owned_nodes.remove(&instance.service_node_key());
        Ok(())
    }

    /// Lists instances for a service key, cache first.
    ///
    /// A hit returns without touching the backend. A miss queries the
    /// backend, writes the full result into the cache and installs the watch
    /// for that key. Backend errors propagate; an empty result is a normal
    /// empty list and is cached like any other.
    pub async fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>> {
        if let Some(cached) = self.cache.read(service_key) {
            debug!(service_key, "discovery cache hit");
            return Ok(cached);
        }

        let instances = self.backend.discover(service_key).await?;
        debug!(
            service_key,
            count = instances.len(),
            "discovery cache miss, queried backend"
        );
        self.cache.write(service_key, instances.clone());
        self.watch(service_key).await?;
        Ok(instances)
    }

    /// Installs the cache-invalidation watch for a key. Idempotent.
    pub async fn watch(&self, service_key: &str) -> Result<()> {
        if !self.watched_keys.insert(service_key.to_string()) {
            return Ok(());
        }

        let mut receiver = self.backend.watch(service_key).await?;
        let cache = self.cache.clone();
        let key = service_key.to_string();
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        if change.service_key == key {
                            debug!(service_key = %key, "change notification, invalidating cache");
                            cache.invalidate(&key);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events may include ours; invalidate to be safe.
                        warn!(service_key = %key, skipped, "watch lagged, invalidating cache");
                        cache.invalidate(&key);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.watch_tasks.lock().await.push(task);
        Ok(())
    }

    /// Forwards a liveness heartbeat to the backend.
    pub async fn heartbeat(&self) -> Result<()> {
        self.backend.heartbeat().await
    }

    /// Shuts the registry down: cancels watches, unregisters owned nodes,
    /// destroys the backend handle.
    pub async fn destroy(&self) -> Result<()> {
        let tasks = {
            let mut guard = self.watch_tasks.lock().await;
            std::mem::take(&mut *guard)
        };
        for task in tasks {
            task.abort();
        }
        self.watched_keys.clear();

        let owned: Vec<ServiceMetaInfo> = self
            .owned_nodes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.owned_nodes.clear();
        for instance in owned {
            if let Err(e) = self.backend.unregister(&instance).await {
                warn!(
                    node_key = %instance.service_node_key(),
                    error = %e,
                    "failed to unregister owned node during destroy"
                );
            }
        }

        self.backend.destroy().await
    }

    /// Whether a service key currently has a cached entry. Mostly useful in
    /// tests and diagnostics.
    pub fn is_cached(&self, service_key: &str) -> bool {
        self.cache.contains(service_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ServiceChange;
    use crate::memory::MemoryRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend wrapper that counts discovery queries.
    struct CountingBackend {
        inner: MemoryRegistry,
        discover_calls: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                inner: MemoryRegistry::new(),
                discover_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RegistryBackend for CountingBackend {
        async fn register(&self, instance: ServiceMetaInfo) -> Result<()> {
            self.inner.register(instance).await
        }

        async fn unregister(&self, instance: &ServiceMetaInfo) -> Result<()> {
            self.inner.unregister(instance).await
        }

        async fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>> {
            self.discover_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.discover(service_key).await
        }

        async fn watch(&self, service_key: &str) -> Result<broadcast::Receiver<ServiceChange>> {
            self.inner.watch(service_key).await
        }

        async fn heartbeat(&self) -> Result<()> {
            self.inner.heartbeat().await
        }

        async fn destroy(&self) -> Result<()> {
            self.inner.destroy().await
        }
    }

    fn instance(host: &str, port: u16) -> ServiceMetaInfo {
        ServiceMetaInfo::new("demo.Echo", host, port)
    }

    async fn wait_until_invalidated(client: &RegistryClient, key: &str) {
        for _ in 0..100 {
            if !client.is_cached(key) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache entry for {} was never invalidated", key);
    }

    #[tokio::test]
    async fn test_discover_hits_cache_on_second_call() {
        let backend = Arc::new(CountingBackend::new());
        backend.register(instance("h1", 9001)).await.unwrap();
        let client = RegistryClient::new(backend.clone());

        let first = client.discover("demo.Echo:1.0").await.unwrap();
        let second = client.discover("demo.Echo:1.0").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.discover_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_change_notification_invalidates_and_requeries() {
        let backend = Arc::new(CountingBackend::new());
        backend.register(instance("h1", 9001)).await.unwrap();
        let client = RegistryClient::new(backend.clone());

        assert_eq!(client.discover("demo.Echo:1.0").await.unwrap().len(), 1);
        assert!(client.is_cached("demo.Echo:1.0"));

        // A registration through the backend must invalidate the cache.
        backend.register(instance("h2", 9002)).await.unwrap();
        wait_until_invalidated(&client, "demo.Echo:1.0").await;

        let rediscovered = client.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(rediscovered.len(), 2);
        assert_eq!(backend.discover_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_change_on_other_key_keeps_cache() {
        let backend = Arc::new(CountingBackend::new());
        backend.register(instance("h1", 9001)).await.unwrap();
        let client = RegistryClient::new(backend.clone());

        client.discover("demo.Echo:1.0").await.unwrap();

        // Change an unrelated key; give the watch task a moment to run.
        backend
            .register(ServiceMetaInfo::new("other.Service", "h9", 9009))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(client.is_cached("demo.Echo:1.0"));
        assert_eq!(backend.discover_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_is_idempotent_per_key() {
        let backend = Arc::new(MemoryRegistry::new());
        let client = RegistryClient::new(backend);

        client.watch("demo.Echo:1.0").await.unwrap();
        client.watch("demo.Echo:1.0").await.unwrap();

        let tasks = client.watch_tasks.lock().await;
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_discovery_is_ok_and_cached() {
        let backend = Arc::new(CountingBackend::new());
        let client = RegistryClient::new(backend.clone());

        let found = client.discover("demo.Echo:1.0").await.unwrap();
        assert!(found.is_empty());

        let again = client.discover("demo.Echo:1.0").await.unwrap();
        assert!(again.is_empty());
        assert_eq!(backend.discover_calls.load(Ordering::SeqCst), 1);
    }

    /// Backend wrapper that records unregistered node keys and skips the
    /// inner teardown so state stays observable after destroy.
    struct RecordingBackend {
        inner: MemoryRegistry,
        unregistered: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RegistryBackend for RecordingBackend {
        async fn register(&self, instance: ServiceMetaInfo) -> Result<()> {
            self.inner.register(instance).await
        }

        async fn unregister(&self, instance: &ServiceMetaInfo) -> Result<()> {
            self.unregistered
                .lock()
                .unwrap()
                .push(instance.service_node_key());
            self.inner.unregister(instance).await
        }

        async fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>> {
            self.inner.discover(service_key).await
        }

        async fn watch(&self, service_key: &str) -> Result<broadcast::Receiver<ServiceChange>> {
            self.inner.watch(service_key).await
        }

        async fn heartbeat(&self) -> Result<()> {
            Ok(())
        }

        async fn destroy(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_destroy_unregisters_only_owned_nodes() {
        let backend = Arc::new(RecordingBackend {
            inner: MemoryRegistry::new(),
            unregistered: std::sync::Mutex::new(Vec::new()),
        });
        let provider = RegistryClient::new(backend.clone());
        provider.register(instance("h1", 9001)).await.unwrap();

        // Registered by another process, not owned by this client.
        backend.register(instance("h2", 9002)).await.unwrap();

        provider.destroy().await.unwrap();

        let unregistered = backend.unregistered.lock().unwrap().clone();
        assert_eq!(unregistered, vec!["demo.Echo:1.0/h1:9001".to_string()]);

        let remaining = backend.discover("demo.Echo:1.0").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].service_host, "h2");
    }
}
