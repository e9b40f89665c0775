use async_trait::async_trait;
use tracing::{info, warn};

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;

use super::{TolerantContext, TolerantStrategy};

/// Degrades to a local fallback implementation.
///
/// Looks the service up in the fallback registry and invokes the same method
/// with the same arguments through its method table. A missing fallback or a
/// fallback failure degrades silently to an empty response; this posture
/// never raises.
pub struct FailBackTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailBackTolerantStrategy {
    async fn handle(&self, ctx: TolerantContext<'_>, error: RpcError) -> Result<RpcResponse> {
        info!(
            service = %ctx.request.service_name,
            method = %ctx.request.method_name,
            error = %error,
            "falling back to local implementation"
        );

        let fallbacks = ctx
            .fallbacks
            .ok_or(RpcError::TolerantContextMissing("fallbacks"))?;

        let Some(table) = fallbacks.get(&ctx.request.service_name) else {
            warn!(
                service = %ctx.request.service_name,
                "no fallback registered, returning empty response"
            );
            return Ok(RpcResponse::empty());
        };

        match table.invoke(&ctx.request.method_name, &ctx.request.args) {
            Some(Ok(value)) => {
                let mut response = RpcResponse::success(value);
                response.message = Some("Fallback success".to_string());
                Ok(response)
            }
            Some(Err(fallback_error)) => {
                warn!(
                    service = %ctx.request.service_name,
                    method = %ctx.request.method_name,
                    error = %fallback_error,
                    "fallback invocation failed, returning empty response"
                );
                Ok(RpcResponse::empty())
            }
            None => {
                warn!(
                    service = %ctx.request.service_name,
                    method = %ctx.request.method_name,
                    "fallback has no such method, returning empty response"
                );
                Ok(RpcResponse::empty())
            }
        }
    }
}
