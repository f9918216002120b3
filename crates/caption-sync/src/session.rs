//! Session and playback state owned by the sync controller

use std::fmt;

/// Generation token identifying one synchronization attempt
///
/// Every channel event, player event and tracker tick is tagged with the
/// token of the attempt that produced it. A new `submit` bumps the token,
/// so anything still in flight from an older attempt compares unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Token of the next attempt
    pub fn next(self) -> Self {
        SessionToken(self.0.wrapping_add(1))
    }

    /// Raw generation number
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Playback sub-state of a ready session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Player reports `Playing`; the position tracker is running
    Playing,
    /// Anything else (paused, ended, buffering, cued)
    Paused,
}

/// Session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No attempt in progress
    Idle,
    /// Channel is being established
    Connecting,
    /// Channel is up; waiting for captions and then for the player
    AwaitingCaptions,
    /// Captions loaded and player ready
    Ready(PlaybackPhase),
    /// Attempt failed; holds the message shown to the user
    Failed {
        /// Human-readable failure message
        message: String,
    },
}

impl SessionState {
    /// Short label for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingCaptions => "awaiting_captions",
            Self::Ready(PlaybackPhase::Playing) => "ready_playing",
            Self::Ready(PlaybackPhase::Paused) => "ready_paused",
            Self::Failed { .. } => "failed",
        }
    }

    /// Returns true while a channel attempt has not reached a terminal message
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingCaptions)
    }

    /// Returns true if the session is ready (playing or paused)
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns true if the session is ready and playing
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Ready(PlaybackPhase::Playing))
    }

    /// Returns the failure message if in failed state
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Playback bookkeeping read by the render side
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Whether the player last reported `Playing`
    pub is_playing: bool,
    /// Last position successfully sampled from the player, in seconds
    pub last_known_position_secs: f64,
    /// Index of the caption currently on screen
    pub active_caption_index: Option<usize>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            last_known_position_secs: 0.0,
            active_caption_index: None,
        }
    }
}
