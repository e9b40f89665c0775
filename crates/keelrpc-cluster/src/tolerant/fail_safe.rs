use async_trait::async_trait;
use tracing::warn;

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;

use super::{TolerantContext, TolerantStrategy};

/// Swallows the failure and returns an empty response.
///
/// For callers with best-effort semantics: the error is logged and the caller
/// sees a response with no data instead of a failure.
pub struct FailSafeTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailSafeTolerantStrategy {
    async fn handle(&self, ctx: TolerantContext<'_>, error: RpcError) -> Result<RpcResponse> {
        warn!(
            service = %ctx.request.service_name,
            method = %ctx.request.method_name,
            error = %error,
            "swallowing rpc failure"
        );
        Ok(RpcResponse::empty())
    }
}
