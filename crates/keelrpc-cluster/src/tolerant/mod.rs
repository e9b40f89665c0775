//! Fault-tolerance postures.
//!
//! A tolerant strategy runs once the retry policy has given up on an attempt.
//! It is the single point deciding whether the failure surfaces to the caller
//! (fail-fast), is absorbed (fail-safe, fail-back) or is retried elsewhere
//! (fail-over). Which posture runs is configuration; the triggering transport
//! error never changes the decision.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::meta::ServiceMetaInfo;
use keelrpc_common::protocol::requests::RpcRequest;
use keelrpc_common::protocol::responses::RpcResponse;
use keelrpc_common::service::ServiceTable;

use crate::loadbalancer::{LoadBalancer, SelectArgs};

pub mod fail_back;
pub mod fail_fast;
pub mod fail_over;
pub mod fail_safe;

pub use fail_back::FailBackTolerantStrategy;
pub use fail_fast::FailFastTolerantStrategy;
pub use fail_over::FailOverTolerantStrategy;
pub use fail_safe::FailSafeTolerantStrategy;

/// Callback performing one raw attempt against a specific node.
///
/// Fail-over invokes it exactly once against the alternate node it picks.
pub type Retryer =
    dyn Fn(RpcRequest, ServiceMetaInfo) -> BoxFuture<'static, Result<RpcResponse>> + Send + Sync;

/// Process-wide registry of local fallback implementations, keyed by service
/// name. Fail-back consults it when the remote call is beyond saving.
#[derive(Clone, Default)]
pub struct FallbackRegistry {
    tables: Arc<DashMap<String, ServiceTable>>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fallback implementation for a service.
    pub fn register(&self, service_name: impl Into<String>, table: ServiceTable) {
        self.tables.insert(service_name.into(), table);
    }

    pub fn get(&self, service_name: &str) -> Option<ServiceTable> {
        self.tables.get(service_name).map(|entry| entry.clone())
    }
}

/// Everything a strategy may need to act on a failure.
///
/// Every strategy requires the request; fail-over additionally requires the
/// candidate list, the failed node, the load balancer with its selection
/// arguments, the retryer and the shared fail-over counter; fail-back
/// requires the fallback registry. A strategy missing one of its required
/// fields fails with [`RpcError::TolerantContextMissing`].
pub struct TolerantContext<'a> {
    pub request: &'a RpcRequest,
    pub service_node_list: &'a [ServiceMetaInfo],
    pub selected_node: Option<&'a ServiceMetaInfo>,
    pub load_balancer: Option<&'a dyn LoadBalancer>,
    pub select_args: Option<&'a SelectArgs>,
    pub retryer: Option<&'a Retryer>,
    pub failover_count: Option<&'a AtomicU32>,
    pub fallbacks: Option<&'a FallbackRegistry>,
}

impl<'a> TolerantContext<'a> {
    /// A context carrying only the request, enough for the fail-fast and
    /// fail-safe postures.
    pub fn for_request(request: &'a RpcRequest) -> Self {
        Self {
            request,
            service_node_list: &[],
            selected_node: None,
            load_balancer: None,
            select_args: None,
            retryer: None,
            failover_count: None,
            fallbacks: None,
        }
    }
}

/// Decides what a spent retry sequence means for the caller.
#[async_trait]
pub trait TolerantStrategy: Send + Sync {
    async fn handle(&self, ctx: TolerantContext<'_>, error: RpcError) -> Result<RpcResponse>;
}

/// Resolves a tolerant strategy by its configuration key.
pub fn tolerant_from_key(key: &str) -> Result<Arc<dyn TolerantStrategy>> {
    match key {
        "fail_fast" => Ok(Arc::new(FailFastTolerantStrategy)),
        "fail_safe" => Ok(Arc::new(FailSafeTolerantStrategy)),
        "fail_back" => Ok(Arc::new(FailBackTolerantStrategy)),
        "fail_over" => Ok(Arc::new(FailOverTolerantStrategy)),
        other => Err(RpcError::UnknownKey {
            kind: "tolerant strategy",
            key: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_resolves_all_keys() {
        for key in ["fail_fast", "fail_safe", "fail_back", "fail_over"] {
            assert!(tolerant_from_key(key).is_ok(), "key {}", key);
        }
        assert!(tolerant_from_key("fail_everything").is_err());
    }

    #[test]
    fn test_fallback_registry_lookup() {
        let registry = FallbackRegistry::new();
        assert!(registry.get("demo.Echo").is_none());

        registry.register("demo.Echo", ServiceTable::new());
        assert!(registry.get("demo.Echo").is_some());
    }
}
