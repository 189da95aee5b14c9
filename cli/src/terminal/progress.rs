use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Counter bar over the total address count, fed by the scanner's progress
/// callback. Live hits print above it so they survive the redraw.
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{spinner:.blue} [{bar:40.green/black}] {pos}/{len} addresses ({per_sec}, eta {eta})",
        )
        .unwrap()
        .progress_chars("=> ");

        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn update(&self, processed: u64) {
        self.bar.set_position(processed);
    }

    pub fn println(&self, msg: &str) {
        self.bar.println(msg);
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
