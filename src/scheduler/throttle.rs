//! Time-sliced dispatch of work items at a bounded rate.
//!
//! The throttle only decides *when* an item is handed to the caller. It knows
//! nothing about the work the caller starts for that item; tracking when that
//! work settles is the job of [`CompletionTracker`](super::CompletionTracker).
//! An empty input still waits for one tick before the run counts as exhausted.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Rate limits for one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    /// Pause between the end of one tick and the start of the next.
    pub delay: Duration,
    /// Maximum items handed out per tick.
    pub max_items_per_tick: usize,
    /// Wall-clock slice a single tick may spend dispatching.
    pub tick_budget: Duration,
    /// Delay before the first tick.
    pub start_delay: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(25),
            max_items_per_tick: usize::MAX,
            tick_budget: Duration::from_millis(50),
            start_delay: Duration::from_millis(25),
        }
    }
}

impl Throttle {
    pub fn new(delay: Duration, max_items_per_tick: usize) -> Self {
        Self {
            delay,
            max_items_per_tick,
            ..Default::default()
        }
    }

    pub fn with_tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget = budget;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Create a dispatcher over `items`, first tick due after `start_delay`.
    pub fn dispatcher<T>(&self, items: impl IntoIterator<Item = T>) -> Dispatcher<T> {
        Dispatcher {
            pending: items.into_iter().collect(),
            throttle: *self,
            deadline: Instant::now() + self.start_delay,
            ticks: 0,
            dispatched: 0,
        }
    }
}

/// Dispatch state for one run of a [`Throttle`].
#[derive(Debug)]
pub struct Dispatcher<T> {
    pending: VecDeque<T>,
    throttle: Throttle,
    deadline: Instant,
    ticks: usize,
    dispatched: usize,
}

impl<T> Dispatcher<T> {
    /// When the next tick is due.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Items not yet dispatched.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// True once at least one tick ran and nothing is left to hand out.
    pub fn is_exhausted(&self) -> bool {
        self.ticks > 0 && self.pending.is_empty()
    }

    /// Run one tick: dispatch until the item bound or the wall-clock slice is
    /// used up, then schedule the next tick `delay` from now.
    pub fn run_tick<F>(&mut self, mut process: F) -> usize
    where
        F: FnMut(T),
    {
        let started = Instant::now();
        let max_items = self.throttle.max_items_per_tick.max(1);
        let mut count = 0;

        while count < max_items {
            // Always make progress, even with a zero budget.
            if count > 0 && started.elapsed() >= self.throttle.tick_budget {
                break;
            }
            let Some(item) = self.pending.pop_front() else {
                break;
            };
            process(item);
            count += 1;
        }

        self.ticks += 1;
        self.dispatched += count;
        self.deadline = Instant::now() + self.throttle.delay;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::drive;

    #[tokio::test(start_paused = true)]
    async fn test_one_item_per_tick_spacing() {
        let throttle = Throttle::new(Duration::from_millis(700), 1);
        let start = Instant::now();
        let mut stamps = Vec::new();

        let settled = drive(
            &throttle,
            vec![1, 2, 3],
            |_| {
                stamps.push(start.elapsed());
                async {}
            },
            |_, _| {},
        )
        .await;

        assert_eq!(settled, 3);
        assert!(start.elapsed() >= Duration::from_millis(1400));
        assert!(start.elapsed() <= Duration::from_millis(1500));
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(700));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_respect_max_items() {
        let throttle = Throttle::new(Duration::from_millis(100), 10);
        let mut dispatcher = throttle.dispatcher(0..25);

        let mut batches = Vec::new();
        while !dispatcher.is_exhausted() {
            tokio::time::sleep_until(dispatcher.deadline()).await;
            batches.push(dispatcher.run_tick(|_| {}));
        }

        assert_eq!(batches, vec![10, 10, 5]);
        assert_eq!(dispatcher.dispatched(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_exhausts_after_one_tick() {
        let mut dispatcher = Throttle::default().dispatcher(Vec::<u8>::new());
        assert!(!dispatcher.is_exhausted());

        tokio::time::sleep_until(dispatcher.deadline()).await;
        assert_eq!(dispatcher.run_tick(|_| {}), 0);
        assert!(dispatcher.is_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_progresses() {
        let throttle = Throttle::new(Duration::from_millis(1), 5).with_tick_budget(Duration::ZERO);
        let mut seen = Vec::new();

        drive(
            &throttle,
            vec!["a", "b"],
            |item| async move { item },
            |item, _| seen.push(item),
        )
        .await;

        assert_eq!(seen, vec!["a", "b"]);
    }
}
