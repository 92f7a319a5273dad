//! The aggregation controller.
//!
//! Runs the lifecycle once to a terminal phase:
//!
//! ```text
//! Idle -> AwaitingBootstrap -> Initialized -> Converged
//!                                          -> AppendingStargazers -> ResolvingLocations
//!                                             -> Geocoding -> Done
//! ```
//!
//! A repository metadata error ends the run in `Halted` right after bootstrap.

pub mod enumerate;
pub mod events;
pub mod geocoding;
pub mod locations;
pub mod state;

pub use events::{EventSink, PipelineEvent};
pub use state::{AggregationState, Phase};

use crate::error::Result;
use crate::geocoder::GeocodeProvider;
use crate::github::{GitHubClient, RepoTarget};
use crate::models::{Point, RepositoryInfo, Snapshot};
use crate::render::{RenderStage, Renderer};
use crate::scheduler::Throttle;
use crate::snapshot::SnapshotStore;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub target: RepoTarget,
    /// Snapshot file path or URL. `None` skips the cache half of bootstrap.
    pub snapshot_location: Option<String>,
    pub page_size: usize,
    /// Profile lookups: cheap, so dispatched often.
    pub location_throttle: Throttle,
    /// Geocoding: the provider limits harder, so batches are spaced widely.
    pub geocode_throttle: Throttle,
}

impl AggregatorConfig {
    pub fn new(target: RepoTarget) -> Self {
        Self {
            target,
            snapshot_location: None,
            page_size: 100,
            location_throttle: Throttle::new(Duration::from_millis(700), 1),
            geocode_throttle: Throttle::new(Duration::from_secs(15), 10),
        }
    }
}

pub struct Aggregator<P, R> {
    config: AggregatorConfig,
    github: GitHubClient,
    provider: P,
    renderer: R,
    events: EventSink,
    state: AggregationState,
}

impl<P, R> Aggregator<P, R>
where
    P: GeocodeProvider,
    R: Renderer,
{
    pub fn new(
        config: AggregatorConfig,
        github: GitHubClient,
        provider: P,
        renderer: R,
        events: EventSink,
    ) -> Self {
        Self {
            config,
            github,
            provider,
            renderer,
            events,
            state: AggregationState::default(),
        }
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The current aggregation in persistable form.
    pub fn snapshot(&self) -> Snapshot {
        self.state.to_snapshot()
    }

    /// Run every phase to a terminal state and return it.
    pub async fn run(&mut self) -> Phase {
        self.transition(Phase::AwaitingBootstrap);

        let (snapshot, repository) = self.bootstrap().await;
        self.state = AggregationState::from_snapshot(snapshot.unwrap_or_default());
        self.state.phase = Phase::AwaitingBootstrap;

        let info = match repository {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to load repository {}: {}", self.config.target, e);
                self.events.emit(PipelineEvent::RepoError {
                    message: e.to_string(),
                });
                self.transition(Phase::Halted);
                return Phase::Halted;
            }
        };

        let name = info
            .full_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.target.to_string());
        info!(
            "{} has {} stargazers ({} cached)",
            name, info.stargazers, self.state.cached_stargazers
        );
        self.state.set_live_total(info.stargazers);
        self.events.emit(PipelineEvent::RepoLoaded {
            stargazers: info.stargazers,
            payload: info.payload,
        });
        self.transition(Phase::Initialized);

        if self.state.total_known_stargazers <= self.state.cached_stargazers {
            self.transition(Phase::Converged);
            self.finish();
            return Phase::Converged;
        }

        self.transition(Phase::AppendingStargazers);
        if !self.state.points.is_empty() {
            render_points(&mut self.renderer, &self.state.points, RenderStage::Partial);
        }

        let discovered = enumerate::append_stargazers(
            &mut self.state,
            &self.github,
            &self.config.target,
            self.config.page_size,
            &self.events,
        )
        .await;

        self.transition(Phase::ResolvingLocations);
        locations::resolve_locations(
            &mut self.state,
            &self.github,
            &self.config.location_throttle,
            discovered,
            &self.events,
        )
        .await;

        self.transition(Phase::Geocoding);
        geocoding::geocode_pending(
            &mut self.state,
            &self.provider,
            &self.config.geocode_throttle,
            &mut self.renderer,
            &self.events,
        )
        .await;

        self.transition(Phase::Done);
        self.finish();
        Phase::Done
    }

    /// Join the snapshot load and the repository fetch; whichever finishes
    /// last releases the barrier.
    async fn bootstrap(&self) -> (Option<Snapshot>, Result<RepositoryInfo>) {
        let load_cache = async {
            let location = self.config.snapshot_location.as_deref()?;
            let snapshot = SnapshotStore::new(location, self.github.http().clone())
                .load()
                .await;
            self.events.emit(PipelineEvent::CacheReady {
                stargazers: snapshot.stargazers.len(),
                geocodes: snapshot.geocodes.len(),
            });
            Some(snapshot)
        };
        let load_repository = self.github.repository(&self.config.target);

        tokio::join!(load_cache, load_repository)
    }

    fn finish(&mut self) {
        render_points(&mut self.renderer, &self.state.points, RenderStage::Final);
        info!("Loaded {} points", self.state.points.len());
        self.events.emit(PipelineEvent::PointsLoaded {
            points: self.state.points.len(),
        });
    }

    fn transition(&mut self, phase: Phase) {
        debug!("Phase: {} -> {}", self.state.phase, phase);
        self.state.phase = phase;
        self.events.emit(PipelineEvent::PhaseChanged { phase });
    }
}

/// Hand the points to the renderer; a failed render never stops the run.
pub(crate) fn render_points<R: Renderer>(renderer: &mut R, points: &[Point], stage: RenderStage) {
    if let Err(e) = renderer.set_data(points, stage) {
        warn!("Failed to render {} points: {}", points.len(), e);
    }
}
