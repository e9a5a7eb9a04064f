//! Correlation-ID generation.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::message::MessageId;

/// Thread-safe source of correlation IDs.
///
/// IDs are strictly increasing, wrap from `u32::MAX` back to 1, and never
/// take the reserved 0 value. Uniqueness among in-flight requests relies on
/// the wraparound span dwarfing any realistic number of concurrent
/// requests; no issued-ID tracking is kept. One counter is injected per
/// session rather than shared process-wide.
#[derive(Debug, Default)]
pub struct MessageIdCounter {
    last: AtomicU32,
}

impl MessageIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next correlation ID.
    pub fn generate(&self) -> MessageId {
        let prev = self
            .last
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(if v == u32::MAX { 1 } else { v + 1 })
            })
            .unwrap_or_else(|v| v);
        if prev == u32::MAX {
            1
        } else {
            prev + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[test]
    fn ids_start_at_one_and_increase() {
        let counter = MessageIdCounter::new();
        let ids: Vec<u32> = (0..100).map(|_| counter.generate()).collect();
        assert_eq!(ids[0], 1);
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn wraps_past_max_skipping_zero() {
        let counter = MessageIdCounter::new();
        counter.last.store(u32::MAX - 1, Ordering::Relaxed);
        assert_eq!(counter.generate(), u32::MAX);
        assert_eq!(counter.generate(), 1);
        assert_eq!(counter.generate(), 2);
    }

    #[test]
    fn concurrent_generation_yields_unique_nonzero_ids() {
        let counter = Arc::new(MessageIdCounter::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| counter.generate()).collect::<Vec<u32>>()
            }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert_ne!(id, 0);
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
