//! Render adapter trait and a log-backed implementation
//!
//! The controller never touches a UI directly. It pushes instructions to a
//! [`RenderAdapter`]. Implementations include:
//! - [`LogRenderer`] - writes instructions to the `tracing` log
//! - test doubles that record every call

use crate::track::CaptionEntry;
use tracing::{error, info};

/// Receiver of render instructions
pub trait RenderAdapter: Send {
    /// Put a caption on screen
    fn show_caption(&mut self, translated: &str, source: Option<&str>);

    /// Clear the caption overlay
    fn hide_caption(&mut self);

    /// Highlight a caption in the list, or clear the highlight
    fn highlight_list_item(&mut self, index: Option<usize>);

    /// Playback progress in `0.0..=1.0`
    fn update_progress(&mut self, fraction_complete: f64);

    /// Current position and total length, in seconds
    fn update_time_label(&mut self, current_secs: f64, total_secs: f64);

    /// Populate the caption list once a track is loaded
    fn show_caption_list(&mut self, _entries: &[CaptionEntry]) {}

    /// Surface a failure message to the user
    fn report_failure(&mut self, _message: &str) {}

    /// Enable or disable the submission control
    fn set_submit_enabled(&mut self, _enabled: bool) {}
}

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Adapter that logs every instruction
///
/// Progress updates are not logged; the time label already carries the
/// same information once per second.
#[derive(Debug, Default)]
pub struct LogRenderer {
    visible: Option<String>,
}

impl LogRenderer {
    /// Create a new log renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Translated text currently on screen
    pub fn visible_caption(&self) -> Option<&str> {
        self.visible.as_deref()
    }
}

impl RenderAdapter for LogRenderer {
    fn show_caption(&mut self, translated: &str, source: Option<&str>) {
        match source {
            Some(source) => info!(caption = translated, source, "Showing caption"),
            None => info!(caption = translated, "Showing caption"),
        }
        self.visible = Some(translated.to_string());
    }

    fn hide_caption(&mut self) {
        if self.visible.take().is_some() {
            info!("Hiding caption");
        }
    }

    fn highlight_list_item(&mut self, _index: Option<usize>) {}

    fn update_progress(&mut self, _fraction_complete: f64) {}

    fn update_time_label(&mut self, current_secs: f64, total_secs: f64) {
        info!("{} / {}", format_clock(current_secs), format_clock(total_secs));
    }

    fn show_caption_list(&mut self, entries: &[CaptionEntry]) {
        info!(count = entries.len(), "Caption track loaded");
    }

    fn report_failure(&mut self, message: &str) {
        error!("{}", message);
    }
}
