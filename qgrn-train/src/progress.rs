//! Progress reporting for the training loop

use indicatif::{ProgressBar, ProgressStyle};

/// Bar layout; `{msg}` shows the completion message
const TEMPLATE: &str = "[{elapsed_precise}] {bar:40} {pos}/{len} epochs {msg}";

/// Receives the current epoch once per epoch. Purely observational.
pub trait Progress {
    fn update(&mut self, current_epoch: usize);

    fn finish(&mut self) {}
}

/// Silent progress sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _current_epoch: usize) {}
}

/// Terminal progress bar over the epoch budget
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    pub fn new(epochs: usize) -> Self {
        let bar = ProgressBar::new(epochs as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template(TEMPLATE)
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    /// Reporter that draws nothing, for non-interactive runs
    pub fn hidden(epochs: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(epochs as u64);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Progress for ProgressBarReporter {
    fn update(&mut self, current_epoch: usize) {
        self.bar.set_position(current_epoch as u64);
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("done");
    }
}
