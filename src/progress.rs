//! Batch progress reporting shared across rayon worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Logs once per completed 10% of a batch
pub struct ProgressTracker {
    component: &'static str,
    total: usize,
    done: AtomicUsize,
    step: usize,
}

impl ProgressTracker {
    pub fn new(component: &'static str, total: usize) -> Self {
        Self {
            component,
            total,
            done: AtomicUsize::new(0),
            step: (total / 10).max(1),
        }
    }

    /// Record one finished item
    pub fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.step == 0 || done == self.total {
            info!(
                component = self.component,
                done,
                total = self.total,
                percent = done * 100 / self.total.max(1),
                "Scoring progress"
            );
        }
    }

    pub fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_counts_across_threads() {
        let tracker = ProgressTracker::new("test", 1000);
        (0..1000).into_par_iter().for_each(|_| tracker.tick());
        assert_eq!(tracker.completed(), 1000);
    }

    #[test]
    fn test_empty_batch() {
        let tracker = ProgressTracker::new("test", 0);
        assert_eq!(tracker.completed(), 0);
    }
}
