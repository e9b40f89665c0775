use serde::{Deserialize, Serialize};

use super::meta::DEFAULT_SERVICE_VERSION;
use super::value::RpcValue;

/// A serializable call descriptor.
///
/// Built once per remote call by the invocation pipeline, immutable after
/// construction. Arguments are positional and matched one-to-one against
/// `parameter_types`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    /// Fully-qualified service interface name
    pub service_name: String,
    /// Method to invoke on the service
    pub method_name: String,
    /// Service version the caller expects
    pub service_version: String,
    /// Ordered type identifiers, one per argument
    pub parameter_types: Vec<String>,
    /// Ordered argument values
    pub args: Vec<RpcValue>,
}

impl RpcRequest {
    /// Creates a request for the default service version.
    ///
    /// Parameter types are derived positionally from the argument values.
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        args: Vec<RpcValue>,
    ) -> Self {
        let parameter_types = args.iter().map(|a| a.type_name().to_string()).collect();
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            parameter_types,
            args,
        }
    }

    /// Pins a non-default service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }
}
