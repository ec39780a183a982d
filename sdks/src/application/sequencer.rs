// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic sequence source for one streaming session.
///
/// The first call to [`Sequencer::next`] returns 1. Values are unique and
/// strictly increasing no matter how many tasks call concurrently.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out (0 if none yet)
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_one() {
        let sequencer = Sequencer::new();
        assert_eq!(sequencer.current(), 0);
        assert_eq!(sequencer.next(), 1);
        assert_eq!(sequencer.next(), 2);
        assert_eq!(sequencer.current(), 2);
    }

    #[test]
    fn test_concurrent_callers_never_share_a_value() {
        let sequencer = Arc::new(Sequencer::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sequencer = sequencer.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::with_capacity(1000);
                    let mut last = 0;
                    for _ in 0..1000 {
                        let value = sequencer.next();
                        // Per-thread view is strictly increasing
                        assert!(value > last);
                        last = value;
                        seen.push(value);
                    }
                    seen
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(all.insert(value), "duplicate sequence {}", value);
            }
        }

        assert_eq!(all.len(), 8000);
        assert_eq!(all.iter().min(), Some(&1));
        assert_eq!(all.iter().max(), Some(&8000));
    }
}
