use std::sync::atomic::{AtomicUsize, Ordering};

use keelrpc_common::protocol::meta::ServiceMetaInfo;

use super::{LoadBalancer, SelectArgs};

/// Round-robin selection over the candidate list.
///
/// The counter is shared across calls and advanced atomically, so concurrent
/// callers never lose an increment; indices only repeat through the natural
/// modulo wraparound.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    current: AtomicUsize,
}

impl RoundRobinLoadBalancer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobinLoadBalancer {
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
        let index = self.current.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn candidates(n: usize) -> Vec<ServiceMetaInfo> {
        (0..n)
            .map(|i| ServiceMetaInfo::new("demo.Echo", format!("h{}", i), 9000 + i as u16))
            .collect()
    }

    #[test]
    fn test_cycles_in_list_order() {
        let lb = RoundRobinLoadBalancer::new();
        let args = SelectArgs::for_method("say");
        let list = candidates(3);

        let picks: Vec<_> = (0..6)
            .map(|_| lb.select(&args, &list).unwrap().service_host)
            .collect();
        assert_eq!(picks, vec!["h0", "h1", "h2", "h0", "h1", "h2"]);
    }

    #[test]
    fn test_every_candidate_selected_within_one_window() {
        let lb = RoundRobinLoadBalancer::new();
        let args = SelectArgs::for_method("say");
        let list = candidates(4);

        for window in 0..3 {
            let seen: HashSet<_> = (0..list.len())
                .map(|_| lb.select(&args, &list).unwrap().service_host)
                .collect();
            assert_eq!(seen.len(), list.len(), "window {}", window);
        }
    }

    #[test]
    fn test_singleton_does_not_advance_counter() {
        let lb = RoundRobinLoadBalancer::new();
        let args = SelectArgs::for_method("say");
        let one = candidates(1);
        let three = candidates(3);

        lb.select(&args, &one).unwrap();
        lb.select(&args, &one).unwrap();
        // Counter untouched: the first multi-candidate pick is index 0.
        assert_eq!(lb.select(&args, &three).unwrap().service_host, "h0");
    }

    #[test]
    fn test_concurrent_selection_covers_all_indices() {
        let lb = Arc::new(RoundRobinLoadBalancer::new());
        let list = Arc::new(candidates(4));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let lb = lb.clone();
            let list = list.clone();
            handles.push(std::thread::spawn(move || {
                let args = SelectArgs::for_method("say");
                (0..100)
                    .map(|_| lb.select(&args, &list).unwrap().service_host)
                    .collect::<Vec<_>>()
            }));
        }

        let mut counts = std::collections::HashMap::new();
        for handle in handles {
            for host in handle.join().unwrap() {
                *counts.entry(host).or_insert(0usize) += 1;
            }
        }
        // 400 atomic increments over 4 candidates: an exact 100 each.
        assert_eq!(counts.len(), 4);
        for (host, count) in &counts {
            assert_eq!(*count, 100, "host {}", host);
        }
    }
}
