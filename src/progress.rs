//! Terminal progress display fed by pipeline events.

use crate::pipeline::{Phase, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg:24} [{bar:40.cyan/blue}] {pos}/{len}";

/// Keeps one progress bar in step with the pipeline.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(bar: ProgressBar) -> Self {
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    /// Consume events on a background task until the pipeline drops its sink.
    pub fn spawn(self, mut receiver: UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reporter = self;
            while let Some(event) = receiver.recv().await {
                reporter.handle(&event);
            }
            reporter.bar.finish_and_clear();
        })
    }

    pub fn handle(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PhaseChanged { phase } if phase.is_terminal() => {
                self.bar.finish_with_message(phase.to_string());
            }
            PipelineEvent::PhaseChanged { phase } => {
                self.bar.set_message(phase.to_string());
                if matches!(
                    phase,
                    Phase::AppendingStargazers | Phase::ResolvingLocations | Phase::Geocoding
                ) {
                    self.bar.set_position(0);
                }
            }
            PipelineEvent::CacheReady {
                stargazers,
                geocodes,
            } => {
                self.bar.println(format!(
                    "💾 Snapshot: {} stargazers, {} geocodes",
                    stargazers, geocodes
                ));
            }
            PipelineEvent::RepoLoaded { stargazers, .. } => {
                self.bar
                    .println(format!("⭐ Repository has {} stargazers", stargazers));
            }
            PipelineEvent::RepoError { message } => {
                self.bar.println(format!("❌ {}", message));
            }
            PipelineEvent::StargazersUpdated { known, total } => {
                self.update(*known, *total);
            }
            PipelineEvent::StargazersLoaded { known, new } => {
                self.bar
                    .println(format!("👥 {} stargazers known, {} new", known, new));
            }
            PipelineEvent::LocationUpdated { resolved, total } => {
                self.update(*resolved, *total);
            }
            PipelineEvent::LocationsLoaded { pending } => {
                self.bar
                    .println(format!("📍 {} locations to geocode", pending));
            }
            PipelineEvent::PointsUpdated { points, total } => {
                self.update(*points, *total);
            }
            PipelineEvent::PointsLoaded { points } => {
                self.bar.set_position(*points as u64);
            }
        }
    }

    fn update(&self, position: usize, length: usize) {
        self.bar.set_length(length as u64);
        self.bar.set_position(position as u64);
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}
