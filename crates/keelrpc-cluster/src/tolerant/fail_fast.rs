use async_trait::async_trait;

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;

use super::{TolerantContext, TolerantStrategy};

/// Re-raises the failure to the caller immediately.
pub struct FailFastTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailFastTolerantStrategy {
    async fn handle(&self, _ctx: TolerantContext<'_>, error: RpcError) -> Result<RpcResponse> {
        Err(error)
    }
}
