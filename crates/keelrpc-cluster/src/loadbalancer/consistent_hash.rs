use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use keelrpc_common::protocol::meta::ServiceMetaInfo;

use crate::hash::murmur3_32;

use super::{LoadBalancer, SelectArgs};

/// Ring positions per instance. More virtual nodes smooth the distribution.
const VIRTUAL_NODES: usize = 100;

/// Immutable ring snapshot for one candidate set.
///
/// Readers always see a fully built ring: a candidate-set change builds a new
/// snapshot and swaps the pointer in one atomic store.
#[derive(Debug)]
struct Ring {
    /// Fingerprint of the candidate set this ring was built from
    fingerprint: u64,
    points: BTreeMap<u32, ServiceMetaInfo>,
}

impl Ring {
    fn empty() -> Self {
        Self {
            fingerprint: 0,
            points: BTreeMap::new(),
        }
    }

    fn build(fingerprint: u64, candidates: &[ServiceMetaInfo]) -> Self {
        let mut points = BTreeMap::new();
        for candidate in candidates {
            let node_key = candidate.service_node_key();
            for i in 0..VIRTUAL_NODES {
                let hash = murmur3_32(format!("{}#{}", node_key, i).as_bytes());
                points.insert(hash, candidate.clone());
            }
        }
        Self {
            fingerprint,
            points,
        }
    }

    /// First ring point with hash >= the request hash, wrapping to the
    /// smallest point when none is.
    fn locate(&self, hash: u32) -> Option<&ServiceMetaInfo> {
        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, instance)| instance)
    }
}

/// Consistent-hash selection: equal request profiles stick to the same
/// instance, and candidate churn remaps only a bounded fraction of keys.
pub struct ConsistentHashLoadBalancer {
    ring: ArcSwap<Ring>,
}

impl ConsistentHashLoadBalancer {
    pub fn new() -> Self {
        Self {
            ring: ArcSwap::from_pointee(Ring::empty()),
        }
    }

    fn fingerprint(candidates: &[ServiceMetaInfo]) -> u64 {
        let mut node_keys: Vec<String> =
            candidates.iter().map(|c| c.service_node_key()).collect();
        node_keys.sort();
        let joined = node_keys.join("|");
        // Two independent 32-bit hashes make a 64-bit fingerprint; collisions
        // across successive candidate sets are not a realistic concern.
        let high = murmur3_32(joined.as_bytes()) as u64;
        let low = murmur3_32(format!("fp:{}", joined).as_bytes()) as u64;
        (high << 32) | low
    }
}

impl Default for ConsistentHashLoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for ConsistentHashLoadBalancer {
    fn select(
        &self,
        args: &SelectArgs,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        if candidates.len() == 1 {
            return Some(candidates[0].clone());
        }

        let fingerprint = Self::fingerprint(candidates);
        let mut ring = self.ring.load_full();
        if ring.fingerprint != fingerprint {
            ring = Arc::new(Ring::build(fingerprint, candidates));
            self.ring.store(ring.clone());
        }

        let request_hash = murmur3_32(args.hash_material().as_bytes());
        ring.locate(request_hash).cloned()
    }
}
