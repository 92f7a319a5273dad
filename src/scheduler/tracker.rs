//! Counting of settled asynchronous work.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// How many tracked items have settled out of the expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub settled: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.settled >= self.total
    }
}

/// Collects in-flight futures and yields their outputs as they settle,
/// in completion order rather than dispatch order.
pub struct CompletionTracker<F: Future> {
    in_flight: FuturesUnordered<F>,
    total: usize,
    settled: usize,
}

impl<F: Future> CompletionTracker<F> {
    /// A tracker expecting `total` items.
    pub fn new(total: usize) -> Self {
        Self {
            in_flight: FuturesUnordered::new(),
            total,
            settled: 0,
        }
    }

    pub fn track(&mut self, future: F) {
        self.in_flight.push(future);
    }

    /// Wait for the next item to settle. `None` when nothing is in flight.
    pub async fn next_settled(&mut self) -> Option<F::Output> {
        let output = self.in_flight.next().await?;
        self.settled += 1;
        Some(output)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            settled: self.settled,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::time::Duration;

    type Boxed = Pin<Box<dyn Future<Output = &'static str>>>;

    #[tokio::test(start_paused = true)]
    async fn test_outputs_arrive_in_completion_order() {
        let mut tracker: CompletionTracker<Boxed> = CompletionTracker::new(2);
        tracker.track(Box::pin(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "slow"
        }));
        tracker.track(Box::pin(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "fast"
        }));

        assert_eq!(tracker.next_settled().await, Some("fast"));
        assert!(!tracker.progress().is_complete());
        assert_eq!(tracker.next_settled().await, Some("slow"));
        assert!(tracker.progress().is_complete());
        assert_eq!(tracker.next_settled().await, None);
        assert_eq!(tracker.in_flight(), 0);
    }
}
