//! Explicit method tables for service dispatch.
//!
//! Dispatch is a plain table lookup: each registered service builds a map of
//! method name to handler once, at registration time. Servers route requests
//! through it and the fail-back fault strategy reuses it for local fallback
//! implementations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::value::RpcValue;

/// A registered method handler.
///
/// Handlers receive the positional arguments and return either a value or a
/// human-readable error string, which travels back as the response exception.
pub type MethodFn = Arc<dyn Fn(&[RpcValue]) -> std::result::Result<RpcValue, String> + Send + Sync>;

/// Method table for one service.
///
/// # Example
///
/// ```
/// use keelrpc_common::service::ServiceTable;
/// use keelrpc_common::protocol::value::RpcValue;
///
/// let table = ServiceTable::new()
///     .route("say", |args| {
///         args.first().cloned().ok_or_else(|| "missing argument".to_string())
///     });
///
/// let result = table.invoke("say", &[RpcValue::from("hi")]).unwrap().unwrap();
/// assert_eq!(result, RpcValue::from("hi"));
/// ```
#[derive(Clone, Default)]
pub struct ServiceTable {
    methods: HashMap<String, MethodFn>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a method name, replacing any previous one.
    pub fn route<F>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[RpcValue]) -> std::result::Result<RpcValue, String> + Send + Sync + 'static,
    {
        self.methods.insert(method.into(), Arc::new(handler));
        self
    }

    /// Invokes a method; `None` when the method is not registered.
    pub fn invoke(
        &self,
        method: &str,
        args: &[RpcValue],
    ) -> Option<std::result::Result<RpcValue, String>> {
        self.methods.get(method).map(|handler| handler(args))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for ServiceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_table() -> ServiceTable {
        ServiceTable::new()
            .route("say", |args| {
                args.first()
                    .cloned()
                    .ok_or_else(|| "missing argument".to_string())
            })
            .route("add", |args| {
                let a = args.first().and_then(RpcValue::as_int);
                let b = args.get(1).and_then(RpcValue::as_int);
                match (a, b) {
                    (Some(a), Some(b)) => Ok(RpcValue::from(a + b)),
                    _ => Err("add expects two ints".to_string()),
                }
            })
    }

    #[test]
    fn test_invoke_known_method() {
        let table = echo_table();
        let result = table
            .invoke("add", &[RpcValue::from(2i64), RpcValue::from(3i64)])
            .unwrap()
            .unwrap();
        assert_eq!(result, RpcValue::from(5i64));
    }

    #[test]
    fn test_invoke_unknown_method_is_none() {
        let table = echo_table();
        assert!(table.invoke("missing", &[]).is_none());
    }

    #[test]
    fn test_handler_error_is_surfaced() {
        let table = echo_table();
        let result = table.invoke("add", &[RpcValue::from("x")]).unwrap();
        assert_eq!(result, Err("add expects two ints".to_string()));
    }

    #[test]
    fn test_route_replaces_existing() {
        let table = echo_table().route("say", |_| Ok(RpcValue::from("fixed")));
        let result = table.invoke("say", &[RpcValue::from("hi")]).unwrap().unwrap();
        assert_eq!(result, RpcValue::from("fixed"));
    }
}
