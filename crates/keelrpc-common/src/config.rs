//! Framework configuration.
//!
//! Plain serde structs with defaults; loading them from files or flags is an
//! application concern.

use serde::{Deserialize, Serialize};

/// Top-level framework configuration.
///
/// Strategy fields hold the string keys resolved through the per-strategy
/// registries (`Serializer::from_key`, the load balancer / retry / tolerant
/// factories and the registry backend factory).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Application name
    pub name: String,
    /// Service version providers register under
    pub version: String,
    /// Host providers bind and advertise
    pub server_host: String,
    /// Port providers bind, 0 for an ephemeral port
    pub server_port: u16,
    /// Body serializer key
    pub serializer: String,
    /// Load balancer key
    pub load_balancer: String,
    /// Retry strategy key
    pub retry_strategy: String,
    /// Tolerant strategy key
    pub tolerant_strategy: String,
    /// Per-call deadline in milliseconds
    pub request_timeout_ms: u64,
    /// Registry backend configuration
    pub registry: RegistryConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            name: "keelrpc".to_string(),
            version: "1.0".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            serializer: "json".to_string(),
            load_balancer: "round_robin".to_string(),
            retry_strategy: "no".to_string(),
            tolerant_strategy: "fail_fast".to_string(),
            request_timeout_ms: 5000,
            registry: RegistryConfig::default(),
        }
    }
}

/// Registry backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Backend key
    pub registry: String,
    /// Backend address
    pub address: String,
    /// Optional credentials
    pub username: Option<String>,
    pub password: Option<String>,
    /// Backend operation timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry: "memory".to_string(),
            address: "http://127.0.0.1:2379".to_string(),
            username: None,
            password: None,
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcConfig::default();
        assert_eq!(config.serializer, "json");
        assert_eq!(config.load_balancer, "round_robin");
        assert_eq!(config.retry_strategy, "no");
        assert_eq!(config.tolerant_strategy, "fail_fast");
        assert_eq!(config.registry.registry, "memory");
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: RpcConfig =
            serde_json::from_str(r#"{"serializer": "postcard", "registry": {"timeout_ms": 500}}"#)
                .unwrap();
        assert_eq!(config.serializer, "postcard");
        assert_eq!(config.registry.timeout_ms, 500);
        assert_eq!(config.load_balancer, "round_robin");
        assert_eq!(config.registry.registry, "memory");
    }
}
