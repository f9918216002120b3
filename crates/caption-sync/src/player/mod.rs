//! External media player boundary
//!
//! The player is constructed by a [`PlayerFactory`] once captions arrive and
//! reports back through a [`PlayerEventSink`]. Position queries return
//! `None` whenever the player cannot answer (not constructed, mid-destroy).

pub mod simulated;

pub use simulated::{SimulatedPlayer, SimulatedPlayerFactory};

use crate::events::{EventSender, SyncEvent};
use crate::session::SessionToken;
use crate::Result;
use tracing::debug;

/// Player state as reported by the embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Not started yet (`-1`)
    Unstarted,
    /// Reached the end (`0`)
    Ended,
    /// Playing (`1`)
    Playing,
    /// Paused (`2`)
    Paused,
    /// Buffering (`3`)
    Buffering,
    /// Cued and waiting (`5`)
    Cued,
}

impl PlayerState {
    /// Map an embed state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    /// Embed state code
    pub fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }

    /// Only `Playing` counts as playing
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Notifications from the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Player finished constructing and accepts commands
    Ready,
    /// Playback state changed
    StateChanged(PlayerState),
    /// Player reported an error
    Error(String),
}

/// Options passed to the player at construction
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    /// Start playing as soon as ready
    pub autoplay: bool,
    /// Show the embed's own controls
    pub controls: bool,
    /// Expected media length, when the caller knows it
    pub duration_hint: Option<f64>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            controls: true,
            duration_hint: None,
        }
    }
}

/// Route from a player back into the controller queue
///
/// Tagged with the attempt that constructed the player, so notifications
/// from a replaced player are recognised as stale.
#[derive(Debug, Clone)]
pub struct PlayerEventSink {
    token: SessionToken,
    events: EventSender,
}

impl PlayerEventSink {
    /// Create a sink for the given attempt
    pub fn new(token: SessionToken, events: EventSender) -> Self {
        Self { token, events }
    }

    /// Report that the player is ready
    pub fn ready(&self) {
        self.emit(PlayerEvent::Ready);
    }

    /// Report a playback state change
    pub fn state_changed(&self, state: PlayerState) {
        self.emit(PlayerEvent::StateChanged(state));
    }

    /// Report a player error
    pub fn error(&self, message: impl Into<String>) {
        self.emit(PlayerEvent::Error(message.into()));
    }

    fn emit(&self, event: PlayerEvent) {
        let token = self.token;
        if self.events.send(SyncEvent::Player { token, event }).is_err() {
            debug!(%token, "Controller gone, dropping player event");
        }
    }
}

/// Playback primitives of a constructed player
pub trait MediaPlayer: Send {
    /// Current position in seconds, if the player can report one
    fn current_time(&self) -> Option<f64>;

    /// Media length in seconds, if known
    fn duration(&self) -> Option<f64>;

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Jump to `seconds`
    fn seek_to(&mut self, seconds: f64);

    /// Release the player; later queries return `None`
    fn destroy(&mut self) {}
}

/// Constructs players for a video
pub trait PlayerFactory: Send {
    /// Construct a player for `video_id`
    ///
    /// The player must later call [`PlayerEventSink::ready`].
    fn create(
        &mut self,
        video_id: &str,
        options: &PlayerOptions,
        events: PlayerEventSink,
    ) -> Result<Box<dyn MediaPlayer>>;
}
