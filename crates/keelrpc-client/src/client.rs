use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use keelrpc_cluster::loadbalancer::{load_balancer_from_key, LoadBalancer, SelectArgs};
use keelrpc_cluster::retry::RetryPolicy;
use keelrpc_cluster::tolerant::{
    tolerant_from_key, FallbackRegistry, Retryer, TolerantContext, TolerantStrategy,
};
use keelrpc_common::config::RpcConfig;
use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::meta::{self, DEFAULT_SERVICE_VERSION};
use keelrpc_common::protocol::requests::RpcRequest;
use keelrpc_common::protocol::serializer::Serializer;
use keelrpc_common::protocol::value::RpcValue;
use keelrpc_common::transport::TcpTransport;
use keelrpc_registry::RegistryClient;

/// Client for invoking methods on named services.
///
/// Per call: builds the request, resolves candidates through the cached
/// registry, selects one instance, runs the deadline-bounded TCP attempt
/// under the retry policy and, if that exhausts, hands the failure to the
/// tolerant strategy. On success the response data comes back; a populated
/// response exception re-raises to the caller.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use keelrpc_client::ServiceClient;
/// use keelrpc_registry::{MemoryRegistry, RegistryClient};
/// use keelrpc_common::protocol::value::RpcValue;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(RegistryClient::new(Arc::new(MemoryRegistry::new())));
/// let client = ServiceClient::builder(registry).build()?;
///
/// let reply = client
///     .call("demo.Echo", "say", vec![RpcValue::from("hi")])
///     .await?;
/// assert_eq!(reply, RpcValue::from("hi"));
/// # Ok(())
/// # }
/// ```
pub struct ServiceClient {
    registry: Arc<RegistryClient>,
    load_balancer: Arc<dyn LoadBalancer>,
    retry: RetryPolicy,
    tolerant: Arc<dyn TolerantStrategy>,
    serializer: Serializer,
    call_deadline: Duration,
    fallbacks: FallbackRegistry,
    failover_count: AtomicU32,
}

impl ServiceClient {
    pub fn builder(registry: Arc<RegistryClient>) -> ServiceClientBuilder {
        ServiceClientBuilder::new(registry)
    }

    /// Builds a client from a configuration, resolving every strategy key.
    pub fn from_config(config: &RpcConfig, registry: Arc<RegistryClient>) -> Result<Self> {
        ServiceClientBuilder::new(registry)
            .serializer_key(&config.serializer)?
            .load_balancer_key(&config.load_balancer)?
            .retry_key(&config.retry_strategy)?
            .tolerant_key(&config.tolerant_strategy)?
            .call_deadline(Duration::from_millis(config.request_timeout_ms))
            .build()
    }

    /// Registers a local fallback used by the fail-back posture.
    pub fn register_fallback(
        &self,
        service_name: impl Into<String>,
        table: keelrpc_common::service::ServiceTable,
    ) {
        self.fallbacks.register(service_name, table);
    }

    /// Invokes `method` on service `service_name` with positional arguments.
    pub async fn call(
        &self,
        service_name: &str,
        method: &str,
        args: Vec<RpcValue>,
    ) -> Result<RpcValue> {
        let request = RpcRequest::new(service_name, method, args);
        let service_key = meta::service_key(service_name, DEFAULT_SERVICE_VERSION, "");

        // A discovery failure propagates; an empty candidate list is the
        // terminal no-provider condition and bypasses retry and fail-over.
        let candidates = self.registry.discover(&service_key).await?;
        if candidates.is_empty() {
            return Err(RpcError::NoProvider(service_name.to_string()));
        }

        let select_args = SelectArgs::for_method(method);
        let selected = self
            .load_balancer
            .select(&select_args, &candidates)
            .ok_or_else(|| RpcError::NoProvider(service_name.to_string()))?;
        debug!(
            service = service_name,
            method,
            node = %selected.service_address(),
            "selected service instance"
        );

        let serializer = self.serializer;
        let deadline = self.call_deadline;
        let attempt_result = self
            .retry
            .run(|| {
                let node = selected.clone();
                let request = request.clone();
                async move {
                    TcpTransport::request_with_deadline(&node, serializer, &request, deadline)
                        .await
                }
            })
            .await;

        let response = match attempt_result {
            Ok(response) => response,
            Err(error) => {
                let retryer = raw_retryer(serializer, deadline);
                let ctx = TolerantContext {
                    request: &request,
                    service_node_list: &candidates,
                    selected_node: Some(&selected),
                    load_balancer: Some(self.load_balancer.as_ref()),
                    select_args: Some(&select_args),
                    retryer: Some(retryer.as_ref()),
                    failover_count: Some(&self.failover_count),
                    fallbacks: Some(&self.fallbacks),
                };
                self.tolerant.handle(ctx, error).await?
            }
        };

        match response.exception {
            Some(exception) => Err(RpcError::RemoteInvocation(exception)),
            None => Ok(response.data.unwrap_or(RpcValue::Null)),
        }
    }
}

/// One raw deadline-bounded attempt against a specific node; what fail-over
/// invokes against the alternate it picks.
fn raw_retryer(serializer: Serializer, deadline: Duration) -> Box<Retryer> {
    Box::new(move |request, node| {
        Box::pin(async move {
            TcpTransport::request_with_deadline(&node, serializer, &request, deadline).await
        })
    })
}

/// Builder for [`ServiceClient`].
pub struct ServiceClientBuilder {
    registry: Arc<RegistryClient>,
    load_balancer: Arc<dyn LoadBalancer>,
    retry: RetryPolicy,
    tolerant: Arc<dyn TolerantStrategy>,
    serializer: Serializer,
    call_deadline: Duration,
    fallbacks: FallbackRegistry,
}

impl ServiceClientBuilder {
    pub fn new(registry: Arc<RegistryClient>) -> Self {
        Self {
            registry,
            load_balancer: Arc::new(
                keelrpc_cluster::loadbalancer::RoundRobinLoadBalancer::new(),
            ),
            retry: RetryPolicy::None,
            tolerant: Arc::new(keelrpc_cluster::tolerant::FailFastTolerantStrategy),
            serializer: Serializer::Json,
            call_deadline: Duration::from_secs(5),
            fallbacks: FallbackRegistry::new(),
        }
    }

    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn serializer_key(mut self, key: &str) -> Result<Self> {
        self.serializer = Serializer::from_key(key)?;
        Ok(self)
    }

    pub fn load_balancer(mut self, load_balancer: Arc<dyn LoadBalancer>) -> Self {
        self.load_balancer = load_balancer;
        self
    }

    pub fn load_balancer_key(mut self, key: &str) -> Result<Self> {
        self.load_balancer = load_balancer_from_key(key)?;
        Ok(self)
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_key(mut self, key: &str) -> Result<Self> {
        self.retry = RetryPolicy::from_key(key)?;
        Ok(self)
    }

    pub fn tolerant(mut self, tolerant: Arc<dyn TolerantStrategy>) -> Self {
        self.tolerant = tolerant;
        self
    }

    pub fn tolerant_key(mut self, key: &str) -> Result<Self> {
        self.tolerant = tolerant_from_key(key)?;
        Ok(self)
    }

    pub fn call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    pub fn fallbacks(mut self, fallbacks: FallbackRegistry) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn build(self) -> Result<ServiceClient> {
        Ok(ServiceClient {
            registry: self.registry,
            load_balancer: self.load_balancer,
            retry: self.retry,
            tolerant: self.tolerant,
            serializer: self.serializer,
            call_deadline: self.call_deadline,
            fallbacks: self.fallbacks,
            failover_count: AtomicU32::new(0),
        })
    }
}
