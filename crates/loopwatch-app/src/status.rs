//! Terminal stand-in for the on-screen overlay.

use loopwatch_audio::PositionReport;
use tracing::{debug, info};

/// Logs the position report whenever what it would display changes.
#[derive(Debug, Default)]
pub struct StatusLine {
    last_text: String,
    last_swap_count: u64,
}

impl StatusLine {
    /// Feed the report for this tick. Returns true when something was logged.
    pub fn update(&mut self, report: &PositionReport) -> bool {
        let mut changed = false;

        if report.swap_count != self.last_swap_count {
            info!(
                "Swapped in new audio: {} frames (swap #{})",
                report.frame_count, report.swap_count
            );
            self.last_swap_count = report.swap_count;
            changed = true;
        }

        let text = report.to_string();
        if text != self.last_text {
            debug!("{}", text.replace('\n', " | "));
            self.last_text = text;
            changed = true;
        }

        changed
    }
}
