//! The single owned aggregation state threaded through every phase.

use crate::models::{Geocode, Point, Snapshot, Stargazer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Lifecycle of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Waiting for both the snapshot and the repository metadata.
    AwaitingBootstrap,
    Initialized,
    /// The snapshot already covers every stargazer. Terminal.
    Converged,
    AppendingStargazers,
    ResolvingLocations,
    Geocoding,
    /// Every phase ran to completion. Terminal.
    Done,
    /// Repository metadata failed; nothing past bootstrap ran. Terminal.
    Halted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Converged | Phase::Done | Phase::Halted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingBootstrap => "awaiting bootstrap",
            Phase::Initialized => "initialized",
            Phase::Converged => "converged",
            Phase::AppendingStargazers => "appending stargazers",
            Phase::ResolvingLocations => "resolving locations",
            Phase::Geocoding => "geocoding",
            Phase::Done => "done",
            Phase::Halted => "halted",
        };
        write!(f, "{}", name)
    }
}

/// Distinct locations awaiting geocoding, each with the number of
/// stargazers that reported it, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingLocations {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl PendingLocations {
    pub fn add(&mut self, location: String) {
        match self.index.get(&location) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(location.clone(), self.entries.len());
                self.entries.push((location, 1));
            }
        }
    }

    /// Number of distinct locations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, usize)> {
        self.entries
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub new_stargazers: usize,
    pub pages_fetched: usize,
    pub profiles_failed: usize,
    pub without_location: usize,
    pub locations_reused: usize,
    pub geocode_requests: usize,
    pub geocodes_added: usize,
    pub geocodes_unmatched: usize,
    pub geocodes_failed: usize,
    pub points_capped: usize,
}

#[derive(Debug, Clone)]
pub struct AggregationState {
    pub phase: Phase,
    /// Authoritative stargazer count: the live count once repository
    /// metadata arrived, the snapshot's count before that.
    pub total_known_stargazers: usize,
    /// Stargazer count recorded in the snapshot.
    pub cached_stargazers: usize,
    /// Running count of known stargazers during enumeration.
    pub known_stargazers: usize,
    pub stargazers: BTreeMap<String, Stargazer>,
    pub geocodes: BTreeMap<String, Geocode>,
    pub points: Vec<Point>,
    pub pending: PendingLocations,
    pub stats: RunStats,
}

impl Default for AggregationState {
    fn default() -> Self {
        Self::from_snapshot(Snapshot::default())
    }
}

impl AggregationState {
    /// Seed the state from a loaded snapshot, one point per cached geocode.
    ///
    /// The cached count never drops below the stargazers actually held.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let points = snapshot.cached_points();
        let cached = snapshot
            .total_known_stargazers
            .max(snapshot.stargazers.len());
        Self {
            phase: Phase::Idle,
            total_known_stargazers: cached,
            cached_stargazers: cached,
            known_stargazers: cached,
            stargazers: snapshot.stargazers,
            geocodes: snapshot.geocodes,
            points,
            pending: PendingLocations::default(),
            stats: RunStats::default(),
        }
    }

    /// Serializable form for the next run.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            total_known_stargazers: self.known_stargazers,
            stargazers: self.stargazers.clone(),
            geocodes: self.geocodes.clone(),
        }
    }

    /// Install the live stargazer count, trimming restored points that no
    /// longer fit under it.
    pub fn set_live_total(&mut self, total: usize) {
        self.total_known_stargazers = total;
        if self.points.len() > total {
            debug!(
                "Trimming {} cached points above live total {}",
                self.points.len() - total,
                total
            );
            self.stats.points_capped += self.points.len() - total;
            self.points.truncate(total);
        }
    }

    /// Record a newly seen stargazer. Returns false for known logins.
    pub fn add_stargazer(&mut self, stargazer: &Stargazer) -> bool {
        if self.stargazers.contains_key(&stargazer.login) {
            return false;
        }
        self.stargazers
            .insert(stargazer.login.clone(), stargazer.clone());
        self.known_stargazers += 1;
        self.stats.new_stargazers += 1;
        true
    }

    /// Route a resolved profile location: reuse a known geocode immediately,
    /// otherwise queue it for geocoding.
    pub fn record_location(&mut self, location: String) {
        match self.geocodes.get(&location).copied() {
            Some(geocode) => {
                self.stats.locations_reused += 1;
                self.push_points(geocode, 1);
            }
            None => self.pending.add(location),
        }
    }

    /// Store a fresh geocode and one point per stargazer reporting it.
    pub fn add_geocode(&mut self, location: String, geocode: Geocode, stargazers: usize) {
        self.geocodes.insert(location, geocode);
        self.stats.geocodes_added += 1;
        self.push_points(geocode, stargazers);
    }

    /// Append up to `count` points without exceeding the stargazer total.
    fn push_points(&mut self, geocode: Geocode, count: usize) -> usize {
        let room = self.total_known_stargazers.saturating_sub(self.points.len());
        let appended = count.min(room);
        self.stats.points_capped += count - appended;
        self.points
            .extend(std::iter::repeat(Point::from(geocode)).take(appended));
        appended
    }
}
