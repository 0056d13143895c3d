//! Terminal progress bar fed by library progress events.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use media_acquire::{ProgressEvent, ProgressReporter};

/// Renders transfer percentages and batch position on one bar.
pub(crate) struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    /// Creates a bar labelled `label`; hidden when `visible` is false or
    /// stderr is not a terminal.
    pub(crate) fn new(label: &str, visible: bool) -> Self {
        let bar = ProgressBar::new(100);
        if !visible || !std::io::stderr().is_terminal() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(
            ProgressStyle::with_template("{prefix} {msg} [{bar:30}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Resets the bar for the next item.
    pub(crate) fn start_item(&self, label: &str) {
        self.bar.set_position(0);
        self.bar.set_message(label.to_string());
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Transfer { percent } => self.bar.set_position(u64::from(percent)),
            ProgressEvent::Batch { current, total } => {
                self.bar.set_prefix(format!("[{current}/{total}]"));
                self.bar.set_position(0);
            }
        }
    }
}
