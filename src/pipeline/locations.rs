//! Profile lookups turning new stargazers into location strings.

use super::events::{EventSink, PipelineEvent};
use super::state::AggregationState;
use crate::github::GitHubClient;
use crate::models::Stargazer;
use crate::scheduler::{drive, Throttle};
use tracing::{debug, info, warn};

/// Fetch each stargazer's profile through `throttle` and route its location.
///
/// Completes only after every lookup has settled; failed lookups are logged
/// and counted but never retried.
pub async fn resolve_locations(
    state: &mut AggregationState,
    github: &GitHubClient,
    throttle: &Throttle,
    stargazers: Vec<Stargazer>,
    events: &EventSink,
) {
    if stargazers.is_empty() {
        events.emit(PipelineEvent::LocationsLoaded { pending: 0 });
        return;
    }

    info!("Resolving locations for {} stargazers", stargazers.len());

    drive(
        throttle,
        stargazers,
        move |stargazer| async move {
            let location = github.user_location(&stargazer).await;
            (stargazer, location)
        },
        |(stargazer, location), progress| {
            match location {
                Ok(Some(location)) => state.record_location(location),
                Ok(None) => {
                    debug!("{} has no location", stargazer.login);
                    state.stats.without_location += 1;
                }
                Err(e) => {
                    warn!("Error loading {}: {}", stargazer.login, e);
                    state.stats.profiles_failed += 1;
                }
            }

            events.emit(PipelineEvent::LocationUpdated {
                resolved: progress.settled,
                total: progress.total,
            });
            if progress.is_complete() {
                debug!("All {} profile lookups settled", progress.total);
            }
        },
    )
    .await;

    info!("{} distinct locations to geocode", state.pending.len());
    events.emit(PipelineEvent::LocationsLoaded {
        pending: state.pending.len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Geocode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn fast_throttle() -> Throttle {
        Throttle::new(Duration::from_millis(1), 1).with_start_delay(Duration::ZERO)
    }

    async fn mount_profile(server: &MockServer, login: &str, status: u16, location: Option<&str>) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{login}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"location": location})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_routes_known_and_new_locations() {
        let mock_server = MockServer::start().await;
        mount_profile(&mock_server, "alice", 200, Some("Paris")).await;
        mount_profile(&mock_server, "bob", 200, Some("Oslo")).await;
        mount_profile(&mock_server, "carol", 200, None).await;
        mount_profile(&mock_server, "dave", 500, None).await;

        let github = GitHubClient::with_client(reqwest::Client::new(), &mock_server.uri());
        let mut state = AggregationState::default();
        state.set_live_total(4);
        state
            .geocodes
            .insert("Paris".into(), Geocode::new(48.85, 2.35).unwrap());

        let stargazers = ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|login| Stargazer::new(*login, ""))
            .collect();
        let (events, mut receiver) = EventSink::channel();

        resolve_locations(&mut state, &github, &fast_throttle(), stargazers, &events).await;

        assert_eq!(state.points.len(), 1);
        assert_eq!(state.pending.clone().into_entries(), vec![("Oslo".to_string(), 1)]);
        assert_eq!(state.stats.without_location, 1);
        assert_eq!(state.stats.profiles_failed, 1);

        let mut resolved = Vec::new();
        let mut loaded = None;
        while let Ok(event) = receiver.try_recv() {
            match event {
                PipelineEvent::LocationUpdated { resolved: n, total } => {
                    assert_eq!(total, 4);
                    resolved.push(n);
                }
                PipelineEvent::LocationsLoaded { pending } => loaded = Some(pending),
                _ => {}
            }
        }
        assert_eq!(resolved, vec![1, 2, 3, 4]);
        assert_eq!(loaded, Some(1));
    }

    #[tokio::test]
    async fn test_empty_input_completes_immediately() {
        let github = GitHubClient::with_client(reqwest::Client::new(), "http://127.0.0.1:9");
        let mut state = AggregationState::default();
        let (events, mut receiver) = EventSink::channel();

        resolve_locations(&mut state, &github, &fast_throttle(), Vec::new(), &events).await;

        assert_eq!(
            receiver.try_recv(),
            Ok(PipelineEvent::LocationsLoaded { pending: 0 })
        );
    }
}
