use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sandbox_cloud::{ProgressSink, TransferEvent};

/// Spinner shown while a remote call is in flight
pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { progress_bar: pb }
    }

    pub fn finish_success(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} {}", "✓".green(), message));
    }

    pub fn finish_error(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} {}", "✗".red(), message));
    }

    pub fn clear(&self) {
        self.progress_bar.finish_and_clear();
    }
}

/// Progress bar driven by transfer events
///
/// The total grows while the source is still being enumerated, so the bar
/// length follows the latest `Progress` event.
pub struct TransferProgress {
    progress_bar: ProgressBar,
    verb: &'static str,
}

impl TransferProgress {
    pub fn new(verb: &'static str) -> Self {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(format!("{}...", verb));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            progress_bar: pb,
            verb,
        }
    }

    /// Remove the bar if the transfer never reached a terminal event
    pub fn clear_unfinished(&self) {
        if !self.progress_bar.is_finished() {
            self.progress_bar.finish_and_clear();
        }
    }
}

impl ProgressSink for TransferProgress {
    fn on_event(&self, event: &TransferEvent) {
        match event {
            TransferEvent::Progress { completed, total } => {
                self.progress_bar.set_length(*total);
                self.progress_bar.set_position(*completed);
            }
            TransferEvent::ObjectFailed { key, message } => {
                self.progress_bar
                    .println(format!("  {} {}: {}", "⚠".yellow(), key, message));
            }
            TransferEvent::Finished(summary) => {
                self.progress_bar.set_length(summary.total);
                self.progress_bar.set_position(summary.total);
                self.progress_bar.finish_with_message(format!(
                    "{} {} {} objects",
                    "✓".green(),
                    self.verb,
                    summary.succeeded
                ));
            }
            TransferEvent::Failed { summary, .. } => {
                self.progress_bar.abandon_with_message(format!(
                    "{} {} of {} objects failed",
                    "✗".red(),
                    summary.failed,
                    summary.total
                ));
            }
        }
    }
}
