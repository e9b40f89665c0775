use std::sync::Arc;

use dashmap::DashMap;

use keelrpc_common::protocol::meta::ServiceMetaInfo;

/// Process-local discovery cache, keyed by service key.
///
/// Entries are overwritten wholesale on every successful discovery and
/// cleared per key when a watch reports a change. There is no TTL; staleness
/// is bounded by watch latency and absorbed by the fault-tolerance layer.
#[derive(Debug, Clone, Default)]
pub struct RegistryServiceCache {
    entries: Arc<DashMap<String, Vec<ServiceMetaInfo>>>,
}

impl RegistryServiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole entry for a service key.
    pub fn write(&self, service_key: &str, instances: Vec<ServiceMetaInfo>) {
        self.entries.insert(service_key.to_string(), instances);
    }

    /// Reads the cached entry, `None` on a miss.
    pub fn read(&self, service_key: &str) -> Option<Vec<ServiceMetaInfo>> {
        self.entries.get(service_key).map(|entry| entry.clone())
    }

    /// Drops the entry for one service key.
    pub fn invalidate(&self, service_key: &str) {
        self.entries.remove(service_key);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, service_key: &str) -> bool {
        self.entries.contains_key(service_key)
    }
}
