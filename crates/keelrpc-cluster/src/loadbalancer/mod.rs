//! Instance selection policies.
//!
//! A load balancer picks one instance from the candidate list produced by
//! discovery. All policies share two degenerate rules: an empty candidate
//! list yields `None`, and a singleton list yields its only element without
//! consulting any policy state.

use std::collections::BTreeMap;
use std::sync::Arc;

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::meta::ServiceMetaInfo;

pub mod consistent_hash;
pub mod random;
pub mod round_robin;

pub use consistent_hash::ConsistentHashLoadBalancer;
pub use random::RandomLoadBalancer;
pub use round_robin::RoundRobinLoadBalancer;

/// Request attributes a selection may key on.
///
/// Carries at least the method name; additional attributes feed the
/// consistent-hash key so calls with the same profile stick to the same
/// instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectArgs {
    pub method_name: String,
    pub attributes: BTreeMap<String, String>,
}

impl SelectArgs {
    pub fn for_method(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Deterministic byte string hashed by the consistent-hash policy.
    pub(crate) fn hash_material(&self) -> String {
        let mut material = format!("method={}", self.method_name);
        for (key, value) in &self.attributes {
            material.push_str(&format!(";{}={}", key, value));
        }
        material
    }
}

/// Selects one instance from a candidate list.
pub trait LoadBalancer: Send + Sync {
    fn select(
        &self,
        args: &SelectArgs,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo>;
}

/// Resolves a load balancer by its configuration key.
pub fn load_balancer_from_key(key: &str) -> Result<Arc<dyn LoadBalancer>> {
    match key {
        "round_robin" => Ok(Arc::new(RoundRobinLoadBalancer::new())),
        "random" => Ok(Arc::new(RandomLoadBalancer::new())),
        "consistent_hash" => Ok(Arc::new(ConsistentHashLoadBalancer::new())),
        other => Err(RpcError::UnknownKey {
            kind: "load balancer",
            key: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(host: &str, port: u16) -> ServiceMetaInfo {
        ServiceMetaInfo::new("demo.Echo", host, port)
    }

    #[test]
    fn test_factory_resolves_all_keys() {
        for key in ["round_robin", "random", "consistent_hash"] {
            assert!(load_balancer_from_key(key).is_ok(), "key {}", key);
        }
        assert!(load_balancer_from_key("weighted").is_err());
    }

    #[test]
    fn test_all_policies_empty_candidates_yield_none() {
        let args = SelectArgs::for_method("say");
        for key in ["round_robin", "random", "consistent_hash"] {
            let lb = load_balancer_from_key(key).unwrap();
            assert!(lb.select(&args, &[]).is_none(), "key {}", key);
        }
    }

    #[test]
    fn test_all_policies_singleton_bypasses_policy() {
        let args = SelectArgs::for_method("say");
        let only = instance("h1", 9001);
        for key in ["round_robin", "random", "consistent_hash"] {
            let lb = load_balancer_from_key(key).unwrap();
            for _ in 0..5 {
                assert_eq!(lb.select(&args, &[only.clone()]), Some(only.clone()));
            }
        }
    }

    #[test]
    fn test_hash_material_is_order_independent_for_attributes() {
        let a = SelectArgs::for_method("say")
            .with_attribute("x", "1")
            .with_attribute("y", "2");
        let b = SelectArgs::for_method("say")
            .with_attribute("y", "2")
            .with_attribute("x", "1");
        assert_eq!(a.hash_material(), b.hash_material());
    }
}
