//! Retry policies for a single network attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;

/// Default wait between fixed-interval attempts.
const FIXED_INTERVAL: Duration = Duration::from_secs(3);

/// Default attempt bound, counting the initial attempt.
const FIXED_MAX_ATTEMPTS: usize = 3;

/// Wraps one network attempt with a retry policy.
///
/// The wrapped closure performs exactly one network call per invocation and
/// either yields a response or fails.
///
/// # Example
///
/// ```
/// use keelrpc_cluster::retry::RetryPolicy;
/// use keelrpc_common::protocol::responses::RpcResponse;
/// use keelrpc_common::protocol::value::RpcValue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::None;
/// let response = policy
///     .run(|| async { Ok(RpcResponse::success(RpcValue::from("hi"))) })
///     .await
///     .unwrap();
/// assert!(response.is_success());
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Invoke the attempt exactly once and propagate any error unchanged.
    None,
    /// Retry on any error after a fixed wait, up to `max_attempts` total
    /// attempts; the final failure wraps the last underlying error.
    FixedInterval {
        interval: Duration,
        max_attempts: usize,
    },
}

impl RetryPolicy {
    /// The fixed-interval policy with its default bounds: 3 attempts total,
    /// 3 seconds apart.
    pub fn fixed_interval() -> Self {
        RetryPolicy::FixedInterval {
            interval: FIXED_INTERVAL,
            max_attempts: FIXED_MAX_ATTEMPTS,
        }
    }

    /// Resolves a policy by its configuration key.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "no" => Ok(RetryPolicy::None),
            "fixed_interval" => Ok(Self::fixed_interval()),
            other => Err(RpcError::UnknownKey {
                kind: "retry strategy",
                key: other.to_string(),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            RetryPolicy::None => "no",
            RetryPolicy::FixedInterval { .. } => "fixed_interval",
        }
    }

    /// Runs the attempt under this policy.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> Result<RpcResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RpcResponse>>,
    {
        match self {
            RetryPolicy::None => attempt().await,
            RetryPolicy::FixedInterval {
                interval,
                max_attempts,
            } => {
                let attempts = (*max_attempts).max(1);
                let mut attempt_no = 0;
                loop {
                    attempt_no += 1;
                    match attempt().await {
                        Ok(response) => return Ok(response),
                        Err(error) => {
                            warn!(attempt = attempt_no, error = %error, "rpc attempt failed");
                            if attempt_no >= attempts {
                                return Err(RpcError::RetriesExhausted {
                                    attempts: attempt_no,
                                    source: Box::new(error),
                                });
                            }
                        }
                    }
                    tokio::time::sleep(*interval).await;
                }
            }
        }
    }
}
