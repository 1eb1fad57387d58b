//! Request ID generation for outgoing JSON-RPC calls
//!
//! Ids are unique per generator, not globally: every backend client owns
//! its own sequence.

use crate::core::protocol::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request ID generator
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next request ID
    pub fn next_id(&self) -> RequestId {
        RequestId::Number(self.counter.fetch_add(1, Ordering::SeqCst) as i64)
    }

    /// Value the next call to `next_id` will return
    pub fn current_value(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequential_id_generation() {
        let generator = RequestIdGenerator::new();

        assert_eq!(generator.next_id(), RequestId::Number(1));
        assert_eq!(generator.next_id(), RequestId::Number(2));
        assert_eq!(generator.current_value(), 3);
    }

    #[test]
    fn test_generators_are_independent() {
        let a = RequestIdGenerator::new();
        let b = RequestIdGenerator::new();

        let _ = a.next_id();
        let _ = a.next_id();
        assert_eq!(b.next_id(), RequestId::Number(1));
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let generator = Arc::new(RequestIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..100).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
