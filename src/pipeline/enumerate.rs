//! Paginated stargazer enumeration, deduplicated against the snapshot.

use super::events::{EventSink, PipelineEvent};
use super::state::AggregationState;
use crate::github::{GitHubClient, RepoTarget};
use crate::models::Stargazer;
use tracing::{debug, info, warn};

/// Page covering the first stargazer not in the snapshot (1-indexed).
pub fn first_page(cached: usize, page_size: usize) -> usize {
    cached.div_ceil(page_size.max(1)).max(1)
}

/// Walk stargazer pages until the known count reaches the live total or a
/// page comes back empty. Returns the stargazers not seen before.
///
/// A failed page ends enumeration like an empty one; whatever was
/// discovered so far is still returned.
pub async fn append_stargazers(
    state: &mut AggregationState,
    github: &GitHubClient,
    target: &RepoTarget,
    page_size: usize,
    events: &EventSink,
) -> Vec<Stargazer> {
    let mut page = first_page(state.cached_stargazers, page_size);
    let mut discovered = Vec::new();

    loop {
        let entries = match github.stargazers_page(target, page, page_size).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load stargazer page {}: {}", page, e);
                break;
            }
        };
        state.stats.pages_fetched += 1;

        let returned = entries.len();
        for stargazer in entries {
            if state.add_stargazer(&stargazer) {
                discovered.push(stargazer);
            }
        }
        debug!(
            "Page {}: {} entries, {} known of {}",
            page, returned, state.known_stargazers, state.total_known_stargazers
        );

        events.emit(PipelineEvent::StargazersUpdated {
            known: state.known_stargazers,
            total: state.total_known_stargazers,
        });

        // An empty page stops even if the live total says otherwise.
        if returned == 0 || state.known_stargazers >= state.total_known_stargazers {
            break;
        }
        page += 1;
    }

    info!("Discovered {} new stargazers", discovered.len());
    events.emit(PipelineEvent::StargazersLoaded {
        known: state.known_stargazers,
        new: discovered.len(),
    });

    discovered
}
