//! Geocoding of pending locations into heatmap points.

use super::events::{EventSink, PipelineEvent};
use super::render_points;
use super::state::AggregationState;
use crate::geocoder::GeocodeProvider;
use crate::render::{RenderStage, Renderer};
use crate::scheduler::{drive, Throttle};
use tracing::{debug, info, warn};

/// Geocode every pending location once, appending one point per stargazer
/// that reported it and re-rendering after each match.
pub async fn geocode_pending<P, R>(
    state: &mut AggregationState,
    provider: &P,
    throttle: &Throttle,
    renderer: &mut R,
    events: &EventSink,
) where
    P: GeocodeProvider,
    R: Renderer,
{
    if state.pending.is_empty() {
        return;
    }
    let pending = std::mem::take(&mut state.pending).into_entries();

    info!("Geocoding {} locations", pending.len());
    state.stats.geocode_requests += pending.len();

    drive(
        throttle,
        pending,
        move |(location, stargazers)| async move {
            let result = provider.geocode(&location).await;
            (location, stargazers, result)
        },
        |(location, stargazers, result), _| {
            match result {
                Ok(Some(geocode)) => {
                    debug!("{:?} -> {}", location, geocode);
                    state.add_geocode(location, geocode, stargazers);
                    render_points(&mut *renderer, &state.points, RenderStage::Partial);
                }
                Ok(None) => {
                    debug!("No match for {:?}", location);
                    state.stats.geocodes_unmatched += 1;
                }
                Err(e) => {
                    warn!("Error geocoding {:?}: {}", location, e);
                    state.stats.geocodes_failed += 1;
                }
            }

            events.emit(PipelineEvent::PointsUpdated {
                points: state.points.len(),
                total: state.total_known_stargazers,
            });
        },
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StarheatError};
    use crate::models::{Geocode, Point};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    /// In-memory provider recording every request.
    struct FakeProvider {
        answers: HashMap<&'static str, Option<Geocode>>,
        calls: RefCell<Vec<String>>,
    }

    impl GeocodeProvider for FakeProvider {
        async fn geocode(&self, address: &str) -> Result<Option<Geocode>> {
            self.calls.borrow_mut().push(address.to_string());
            match self.answers.get(address) {
                Some(answer) => Ok(*answer),
                None => Err(StarheatError::InvalidResponse("boom".into())),
            }
        }
    }

    #[derive(Default)]
    struct Recording(Vec<(usize, RenderStage)>);

    impl Renderer for Recording {
        fn set_data(&mut self, points: &[Point], stage: RenderStage) -> Result<()> {
            self.0.push((points.len(), stage));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shared_location_geocoded_once() {
        let provider = FakeProvider {
            answers: HashMap::from([
                ("NYC", Geocode::new(40.71, -74.0)),
                ("Nowhere", None),
            ]),
            calls: RefCell::new(Vec::new()),
        };
        let mut state = AggregationState::default();
        state.set_live_total(5);
        for location in ["NYC", "Nowhere", "NYC", "Broken"] {
            state.record_location(location.to_string());
        }
        let mut renderer = Recording::default();
        let throttle = Throttle::new(Duration::from_millis(1), 10).with_start_delay(Duration::ZERO);

        geocode_pending(&mut state, &provider, &throttle, &mut renderer, &EventSink::default())
            .await;

        assert_eq!(provider.calls.borrow().len(), 3);
        assert_eq!(state.geocodes.len(), 1);
        assert_eq!(state.points.len(), 2);
        assert_eq!(state.points[0], state.points[1]);
        assert_eq!(state.stats.geocodes_unmatched, 1);
        assert_eq!(state.stats.geocodes_failed, 1);
        assert_eq!(renderer.0, vec![(2, RenderStage::Partial)]);
        assert!(state.pending.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_pending_makes_no_calls() {
        let provider = FakeProvider {
            answers: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        };
        let mut state = AggregationState::default();
        let mut renderer = Recording::default();

        geocode_pending(
            &mut state,
            &provider,
            &Throttle::default(),
            &mut renderer,
            &EventSink::default(),
        )
        .await;

        assert!(provider.calls.borrow().is_empty());
        assert!(renderer.0.is_empty());
    }
}
