use rand::Rng;

use keelrpc_common::protocol::meta::ServiceMetaInfo;

use super::{LoadBalancer, SelectArgs};

/// Uniform random selection over the candidate list.
#[derive(Debug, Default)]
pub struct RandomLoadBalancer;

impl RandomLoadBalancer {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for RandomLoadBalancer {
    fn select(
        &self,
        _args: &SelectArgs,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        if candidates.len() == 1 {
            return Some(candidates[0].clone());
        }
        let index = rand::rng().random_range(0..candidates.len());
        Some(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn candidates(n: usize) -> Vec<ServiceMetaInfo> {
        (0..n)
            .map(|i| ServiceMetaInfo::new("demo.Echo", format!("h{}", i), 9000 + i as u16))
            .collect()
    }

    #[test]
    fn test_selection_stays_within_candidates() {
        let lb = RandomLoadBalancer::new();
        let args = SelectArgs::for_method("say");
        let list = candidates(3);
        let hosts: HashSet<_> = list.iter().map(|c| c.service_host.clone()).collect();

        for _ in 0..50 {
            let picked = lb.select(&args, &list).unwrap();
            assert!(hosts.contains(&picked.service_host));
        }
    }

    #[test]
    fn test_eventually_covers_all_candidates() {
        let lb = RandomLoadBalancer::new();
        let args = SelectArgs::for_method("say");
        let list = candidates(3);

        let seen: HashSet<_> = (0..300)
            .map(|_| lb.select(&args, &list).unwrap().service_host)
            .collect();
        // Uniform picks over 300 draws miss a 1/3 bucket with probability
        // well below 1e-50.
        assert_eq!(seen.len(), 3);
    }
}
