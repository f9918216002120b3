//! Event union dispatched into the sync controller
//!
//! Every input the controller reacts to (user commands, channel frames,
//! player notifications, tracker ticks) is one [`SyncEvent`] on a single
//! queue, so the controller's transition function is the only place state
//! changes.

use crate::channel::ChannelEvent;
use crate::player::PlayerEvent;
use crate::session::SessionToken;
use tokio::sync::mpsc;
use tracing::debug;

/// Sender half of the controller queue
pub type EventSender = mpsc::UnboundedSender<SyncEvent>;

/// Receiver half of the controller queue
pub type EventReceiver = mpsc::UnboundedReceiver<SyncEvent>;

/// Create the controller queue
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Inputs to the sync controller
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// User submitted a video URL
    Submit {
        /// Video URL
        url: String,
    },
    /// User asked to seek
    Seek {
        /// Target position in seconds
        seconds: f64,
    },
    /// User picked a caption from the list
    SeekToCaption {
        /// Caption index
        index: usize,
    },
    /// User asked to play
    Play,
    /// User asked to pause
    Pause,
    /// Event from the session channel
    Channel {
        /// Attempt that produced it
        token: SessionToken,
        /// Channel event
        event: ChannelEvent,
    },
    /// Event from the external player
    Player {
        /// Attempt that produced it
        token: SessionToken,
        /// Player event
        event: PlayerEvent,
    },
    /// Position tracker tick
    Tick {
        /// Attempt that started the tracker
        token: SessionToken,
    },
    /// Tear everything down and stop the controller loop
    Shutdown,
}

impl SyncEvent {
    /// Tagged attempt, for events that carry one
    pub fn token(&self) -> Option<SessionToken> {
        match self {
            Self::Channel { token, .. } | Self::Player { token, .. } | Self::Tick { token } => {
                Some(*token)
            }
            _ => None,
        }
    }

    /// Event name for logging/debugging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Seek { .. } => "seek",
            Self::SeekToCaption { .. } => "seek_to_caption",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Channel { .. } => "channel",
            Self::Player { .. } => "player",
            Self::Tick { .. } => "tick",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Cloneable front door to a running controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: EventSender,
}

impl ControllerHandle {
    /// Wrap a controller queue sender
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Start a new synchronization attempt for `url`
    pub fn submit(&self, url: impl Into<String>) -> bool {
        self.dispatch(SyncEvent::Submit { url: url.into() })
    }

    /// Seek the player to `seconds`
    pub fn seek(&self, seconds: f64) -> bool {
        self.dispatch(SyncEvent::Seek { seconds })
    }

    /// Seek the player to the start of caption `index`
    pub fn seek_to_caption(&self, index: usize) -> bool {
        self.dispatch(SyncEvent::SeekToCaption { index })
    }

    /// Resume playback
    pub fn play(&self) -> bool {
        self.dispatch(SyncEvent::Play)
    }

    /// Pause playback
    pub fn pause(&self) -> bool {
        self.dispatch(SyncEvent::Pause)
    }

    /// Tear down and stop the controller
    pub fn shutdown(&self) -> bool {
        self.dispatch(SyncEvent::Shutdown)
    }

    /// Returns false once the controller has stopped
    fn dispatch(&self, event: SyncEvent) -> bool {
        let name = event.name();
        match self.events.send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("Controller stopped, dropping {} command", name);
                false
            }
        }
    }
}
