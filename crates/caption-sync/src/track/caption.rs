//! Caption entries and the ordered caption track

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One timestamped caption
///
/// Field names on the wire follow the caption service
/// (`start`, `duration`, `text`, `translation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    /// Start of the display window, in seconds
    #[serde(rename = "start")]
    pub start_seconds: f64,

    /// Length of the display window, in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: f64,

    /// Original-language text
    #[serde(rename = "text")]
    pub source_text: String,

    /// Translated text
    #[serde(rename = "translation")]
    pub translated_text: String,
}

impl CaptionEntry {
    /// Create a new caption entry
    pub fn new(
        start_seconds: f64,
        duration_seconds: f64,
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        Self {
            start_seconds,
            duration_seconds,
            source_text: source_text.into(),
            translated_text: translated_text.into(),
        }
    }

    /// Exclusive end of the display window
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }

    /// Returns true if `time` falls in `[start, start + duration)`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_seconds && time < self.end_seconds()
    }

    fn is_well_formed(&self) -> bool {
        self.start_seconds.is_finite()
            && self.start_seconds >= 0.0
            && self.duration_seconds.is_finite()
            && self.duration_seconds > 0.0
    }
}

/// Ordered, immutable sequence of captions for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionTrack {
    entries: Vec<CaptionEntry>,
    /// `reach[i]` is the furthest end time over `entries[0..=i]`
    reach: Vec<f64>,
}

impl CaptionTrack {
    /// Build a track from captions as delivered
    ///
    /// Entries with a non-finite or negative start, or a non-positive
    /// duration, are dropped. Entries out of start order are stably sorted.
    pub fn new(entries: Vec<CaptionEntry>) -> Self {
        let delivered = entries.len();
        let mut entries: Vec<CaptionEntry> =
            entries.into_iter().filter(CaptionEntry::is_well_formed).collect();

        if entries.len() != delivered {
            warn!(
                dropped = delivered - entries.len(),
                "Dropped malformed caption entries"
            );
        }

        let ascending = entries
            .windows(2)
            .all(|pair| pair[0].start_seconds <= pair[1].start_seconds);
        if !ascending {
            warn!("Caption entries were not in start order, sorting");
            entries.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        }

        let mut reach = Vec::with_capacity(entries.len());
        let mut furthest = f64::NEG_INFINITY;
        for entry in &entries {
            furthest = furthest.max(entry.end_seconds());
            reach.push(furthest);
        }

        Self { entries, reach }
    }

    /// Index of the first entry whose window contains `time`
    ///
    /// Exact first-match semantics even when windows overlap.
    pub fn entry_at(&self, time: f64) -> Option<usize> {
        if !time.is_finite() {
            return None;
        }

        // Entries [0, started) have start <= time.
        let started = self.entries.partition_point(|e| e.start_seconds <= time);
        // First index whose running reach passes `time`; that entry's own end does.
        let first_reaching = self.reach.partition_point(|&end| end <= time);

        (first_reaching < started).then_some(first_reaching)
    }

    /// Returns true if no earlier entry than `index` contains `time`
    pub(crate) fn is_first_match(&self, index: usize, time: f64) -> bool {
        match self.entries.get(index) {
            Some(entry) if entry.contains(time) => {
                index == 0 || self.reach[index - 1] <= time
            }
            _ => false,
        }
    }

    /// Get an entry by index
    pub fn get(&self, index: usize) -> Option<&CaptionEntry> {
        self.entries.get(index)
    }

    /// All entries in start order
    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the track has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest end time over all entries
    pub fn end_seconds(&self) -> Option<f64> {
        self.reach.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(windows: &[(f64, f64)]) -> CaptionTrack {
        CaptionTrack::new(
            windows
                .iter()
                .enumerate()
                .map(|(i, &(start, duration))| {
                    CaptionEntry::new(start, duration, format!("line {}", i), format!("줄 {}", i))
                })
                .collect(),
        )
    }

    #[test]
    fn test_single_entry_half_open_window() {
        let track = CaptionTrack::new(vec![CaptionEntry::new(0.0, 2.0, "hi", "안녕")]);
        assert_eq!(track.entry_at(1.5), Some(0));
        assert_eq!(track.entry_at(0.0), Some(0));
        assert_eq!(track.entry_at(2.0), None);
        assert_eq!(track.entry_at(-0.1), None);
    }

    #[test]
    fn test_gaps_resolve_to_none() {
        let track = track(&[(0.0, 1.0), (2.0, 1.0), (5.0, 2.5)]);
        assert_eq!(track.entry_at(0.5), Some(0));
        assert_eq!(track.entry_at(1.5), None);
        assert_eq!(track.entry_at(2.0), Some(1));
        assert_eq!(track.entry_at(4.99), None);
        assert_eq!(track.entry_at(7.4), Some(2));
        assert_eq!(track.entry_at(7.5), None);
    }

    #[test]
    fn test_every_sample_matches_linear_scan() {
        let track = track(&[(0.5, 1.0), (1.5, 0.25), (3.0, 3.0), (6.0, 0.5), (9.0, 1.0)]);
        let mut t = 0.0;
        while t < 11.0 {
            let expected = track.entries().iter().position(|e| e.contains(t));
            assert_eq!(track.entry_at(t), expected, "mismatch at t={}", t);
            t += 0.05;
        }
    }

    #[test]
    fn test_overlap_prefers_first_entry() {
        let track = track(&[(0.0, 5.0), (1.0, 1.0), (4.0, 3.0)]);
        assert_eq!(track.entry_at(1.5), Some(0));
        assert_eq!(track.entry_at(4.5), Some(0));
        assert_eq!(track.entry_at(5.5), Some(2));
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let track = track(&[(0.0, 1.0), (-1.0, 1.0), (2.0, 0.0), (f64::NAN, 1.0), (3.0, 1.0)]);
        assert_eq!(track.len(), 2);
        assert_eq!(track.entry_at(3.5), Some(1));
    }

    #[test]
    fn test_unsorted_entries_sorted_stably() {
        let track = track(&[(4.0, 1.0), (0.0, 1.0), (2.0, 1.0)]);
        let starts: Vec<f64> = track.entries().iter().map(|e| e.start_seconds).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0]);
        assert_eq!(track.get(0).unwrap().source_text, "line 1");
    }

    #[test]
    fn test_non_finite_time() {
        let track = track(&[(0.0, 10.0)]);
        assert_eq!(track.entry_at(f64::NAN), None);
        assert_eq!(track.entry_at(f64::INFINITY), None);
    }

    #[test]
    fn test_empty_track() {
        let track = CaptionTrack::default();
        assert!(track.is_empty());
        assert_eq!(track.entry_at(0.0), None);
        assert_eq!(track.end_seconds(), None);
    }

    #[test]
    fn test_wire_field_names() {
        let json = r#"{"start": 1.25, "duration": 2.0, "text": "hello", "translation": "안녕하세요"}"#;
        let entry: CaptionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.start_seconds, 1.25);
        assert_eq!(entry.translated_text, "안녕하세요");
        assert_eq!(entry.end_seconds(), 3.25);
    }
}
