use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tracing::{error, info};

use keelrpc_common::protocol::error::{Result, RpcError};
use keelrpc_common::protocol::responses::RpcResponse;

use super::{TolerantContext, TolerantStrategy};

/// Retries the call once against a different node.
///
/// Removes the failed node from the candidate list, asks the load balancer
/// for an alternate among the remainder and invokes the retryer against it
/// exactly once. This is a single hop: a failure on the alternate node
/// propagates uncaught rather than cascading through further hops. An empty
/// remainder raises without any call at all.
pub struct FailOverTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailOverTolerantStrategy {
    async fn handle(&self, ctx: TolerantContext<'_>, error_cause: RpcError) -> Result<RpcResponse> {
        let failed_node = ctx
            .selected_node
            .ok_or(RpcError::TolerantContextMissing("selected_node"))?;
        let load_balancer = ctx
            .load_balancer
            .ok_or(RpcError::TolerantContextMissing("load_balancer"))?;
        let select_args = ctx
            .select_args
            .ok_or(RpcError::TolerantContextMissing("select_args"))?;
        let retryer = ctx
            .retryer
            .ok_or(RpcError::TolerantContextMissing("retryer"))?;

        let remaining: Vec<_> = ctx
            .service_node_list
            .iter()
            .filter(|node| *node != failed_node)
            .cloned()
            .collect();

        if remaining.is_empty() {
            error!(
                service = %ctx.request.service_name,
                error = %error_cause,
                "all service nodes failed, nothing left to fail over to"
            );
            return Err(RpcError::AllNodesFailed);
        }

        let next_node = load_balancer
            .select(select_args, &remaining)
            .ok_or(RpcError::AllNodesFailed)?;

        if let Some(counter) = ctx.failover_count {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        info!(
            failed = %failed_node.service_address(),
            next = %next_node.service_address(),
            "failing over to alternate node"
        );

        retryer(ctx.request.clone(), next_node).await
    }
}
