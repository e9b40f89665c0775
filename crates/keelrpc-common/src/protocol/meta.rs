use serde::{Deserialize, Serialize};

/// Default service version used when the caller does not pin one.
pub const DEFAULT_SERVICE_VERSION: &str = "1.0";

/// Default service group. An empty group is omitted from the service key.
pub const DEFAULT_SERVICE_GROUP: &str = "";

/// Identity of one running instance of a service.
///
/// Two instances are the same node iff their [`service_node_key`] is equal.
/// Equality and hashing cover all base fields, so a version or group bump
/// yields a distinct node.
///
/// [`service_node_key`]: ServiceMetaInfo::service_node_key
///
/// # Example
///
/// ```
/// use keelrpc_common::protocol::meta::ServiceMetaInfo;
///
/// let meta = ServiceMetaInfo::new("demo.Echo", "127.0.0.1", 9001);
/// assert_eq!(meta.service_key(), "demo.Echo:1.0");
/// assert_eq!(meta.service_address(), "127.0.0.1:9001");
/// assert_eq!(meta.service_node_key(), "demo.Echo:1.0/127.0.0.1:9001");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServiceMetaInfo {
    /// Fully-qualified service interface name
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Service group, empty by default
    pub service_group: String,
    /// Host the instance listens on
    pub service_host: String,
    /// Port the instance listens on
    pub service_port: u16,
}

impl ServiceMetaInfo {
    /// Creates instance metadata with the default version and group.
    pub fn new(service_name: impl Into<String>, service_host: impl Into<String>, service_port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            service_group: DEFAULT_SERVICE_GROUP.to_string(),
            service_host: service_host.into(),
            service_port,
        }
    }

    /// Sets a non-default version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Sets a non-default group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.service_group = group.into();
        self
    }

    /// The unit of discovery and caching: `name:version[:group]`.
    pub fn service_key(&self) -> String {
        service_key(&self.service_name, &self.service_version, &self.service_group)
    }

    /// `host:port` of this instance.
    pub fn service_address(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }

    /// The unit of registration identity: `service_key/service_address`.
    pub fn service_node_key(&self) -> String {
        format!("{}/{}", self.service_key(), self.service_address())
    }
}

/// Builds a service key without instance metadata at hand.
pub fn service_key(name: &str, version: &str, group: &str) -> String {
    if group.is_empty() {
        format!("{}:{}", name, version)
    } else {
        format!("{}:{}:{}", name, version, group)
    }
}
