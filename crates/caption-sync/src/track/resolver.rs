//! Position → active caption resolution

use super::caption::CaptionTrack;

/// How many entries past the cursor are probed before a full lookup
const FORWARD_PROBE: usize = 2;

/// Maps playback positions to the caption active at that instant
///
/// Forward playback in small steps is answered from the cursor (the last
/// resolved index) in constant time. Any miss falls back to the track's
/// full lookup, so seeks and scrubs in either direction stay correct.
#[derive(Debug, Clone, Default)]
pub struct CaptionResolver {
    cursor: Option<usize>,
}

impl CaptionResolver {
    /// Create a resolver with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `time` to the index of the first caption containing it
    pub fn resolve(&mut self, track: &CaptionTrack, time: f64) -> Option<usize> {
        if !time.is_finite() {
            return None;
        }

        if let Some(cursor) = self.cursor {
            let probe_end = (cursor + FORWARD_PROBE).min(track.len());
            if let Some(hit) = (cursor..probe_end).find(|&i| track.is_first_match(i, time)) {
                self.cursor = Some(hit);
                return Some(hit);
            }
        }

        let resolved = track.entry_at(time);
        if resolved.is_some() {
            self.cursor = resolved;
        }
        resolved
    }

    /// Forget the cursor (new track or teardown)
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Last resolved index, if any
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }
}
