//! Progress and completion events raised by the pipeline.

use super::state::Phase;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The lifecycle moved to a new phase.
    PhaseChanged { phase: Phase },
    /// The snapshot finished loading (successfully or not).
    CacheReady { stargazers: usize, geocodes: usize },
    /// Repository metadata arrived.
    RepoLoaded { stargazers: usize, payload: Value },
    /// Repository metadata could not be fetched.
    RepoError { message: String },
    StargazersUpdated { known: usize, total: usize },
    StargazersLoaded { known: usize, new: usize },
    LocationUpdated { resolved: usize, total: usize },
    LocationsLoaded { pending: usize },
    PointsUpdated { points: usize, total: usize },
    PointsLoaded { points: usize },
}

/// Non-blocking event outlet. A sink without a receiver drops events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    /// A connected sink and the receiving end of its channel.
    pub fn channel() -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(ref sender) = self.sender {
            // A closed receiver only means nobody is listening anymore.
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_receiver_is_noop() {
        EventSink::default().emit(points_loaded());

        let (sink, receiver) = EventSink::channel();
        drop(receiver);
        sink.emit(points_loaded());
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, mut receiver) = EventSink::channel();
        sink.emit(PipelineEvent::LocationUpdated {
            resolved: 1,
            total: 2,
        });
        sink.emit(points_loaded());

        assert!(matches!(
            receiver.try_recv(),
            Ok(PipelineEvent::LocationUpdated { resolved: 1, .. })
        ));
        assert_eq!(receiver.try_recv(), Ok(points_loaded()));
    }

    fn points_loaded() -> PipelineEvent {
        PipelineEvent::PointsLoaded { points: 0 }
    }
}
