//! Rate-limited scheduling of outbound calls.
//!
//! Two layers: [`Throttle`] bounds how fast items are dispatched, and
//! [`CompletionTracker`] counts the asynchronous work they start until every
//! item has settled. [`drive`] runs both on the current task.

pub mod throttle;
pub mod tracker;

pub use throttle::Throttle;
pub use tracker::{CompletionTracker, Progress};

use std::future::Future;
use tokio::time::sleep_until;
use tracing::trace;

/// Dispatch `items` through `throttle`, starting one future per item with
/// `start`, and hand each output to `on_settled` as it resolves.
///
/// Returns once every started future has settled, not merely when dispatch
/// is exhausted. Everything runs on the calling task, so `on_settled` may
/// mutate state owned by the caller without locking.
pub async fn drive<T, F, Fut, H>(
    throttle: &Throttle,
    items: Vec<T>,
    mut start: F,
    mut on_settled: H,
) -> usize
where
    F: FnMut(T) -> Fut,
    Fut: Future,
    H: FnMut(Fut::Output, Progress),
{
    let mut dispatcher = throttle.dispatcher(items);
    let mut tracker = CompletionTracker::new(dispatcher.remaining());

    loop {
        let deadline = dispatcher.deadline();

        tokio::select! {
            _ = sleep_until(deadline), if !dispatcher.is_exhausted() => {
                let count = dispatcher.run_tick(|item| tracker.track(start(item)));
                trace!(
                    "Dispatched {} items, {} in flight, {} left",
                    count,
                    tracker.in_flight(),
                    dispatcher.remaining()
                );
            }
            Some(output) = tracker.next_settled() => {
                on_settled(output, tracker.progress());
            }
            else => break,
        }
    }

    let progress = tracker.progress();
    trace!(
        "{} dispatched, {} of {} settled",
        dispatcher.dispatched(),
        progress.settled,
        progress.total
    );
    progress.settled
}
