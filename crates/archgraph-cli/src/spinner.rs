//! Spinner for work of unknown duration, drawn on stderr.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒", "✓"]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.pb.finish_with_message(message.into());
    }

    pub fn fail(&self) {
        self.pb.finish_and_clear();
    }
}
