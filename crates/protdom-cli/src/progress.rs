//! Progress bar utilities for CLI operations

use indicatif::{ProgressBar, ProgressStyle};
use protdom_retriever::ProgressSink;

/// Create a percentage bar for a pipeline run
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}% {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Forwards stage progress to an `indicatif` bar
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn report(&self, message: &str, percent: f64) {
        self.bar.set_position(percent.round() as u64);
        // Run summaries are multi-line; the bar shows the headline only
        let headline = message.lines().next().unwrap_or_default();
        self.bar.set_message(headline.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar("Starting");
        assert_eq!(pb.length(), Some(100));
        assert_eq!(pb.message(), "Starting");
    }

    #[test]
    fn test_sink_updates_bar() {
        let pb = ProgressBar::hidden();
        pb.set_length(100);
        let sink = BarSink::new(pb.clone());

        sink.report("=== Summary ===\nmore lines", 99.6);

        assert_eq!(pb.position(), 100);
        assert_eq!(pb.message(), "=== Summary ===");
    }
}
