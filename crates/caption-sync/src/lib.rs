//! Caption synchronization engine
//!
//! Keeps a stream of pre-translated, timestamped captions in step with the
//! playback position of an external media player. Captions are delivered
//! once per attempt by a remote caption service over a WebSocket session.
//!
//! # Features
//!
//! - **Session channel**: `init` → `ready`/`error` over WebSocket, one live
//!   channel per controller
//! - **Caption resolution**: first-match lookup on half-open caption windows,
//!   constant time for forward playback
//! - **Position tracking**: cancellable fixed-cadence sampling (100ms default)
//! - **Idempotent rendering**: render instructions only on active-index change
//! - **Stale-session guard**: events from a superseded attempt are dropped
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  ControllerHandle (submit / seek / play / pause)    │
//! │  ↓                                                  │
//! │  SyncEvent queue (tokio mpsc)                       │
//! │  ↓                                                  │
//! │  SyncController::handle                             │
//! │  ├─ SessionChannel ── caption service (WebSocket)  │
//! │  ├─ PositionTracker ── Tick every poll interval    │
//! │  ├─ CaptionTrack + CaptionResolver                 │
//! │  ├─ MediaPlayer (external)                         │
//! │  └─ RenderAdapter (external)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use caption_sync::{
//!     ControllerHandle, LogRenderer, SimulatedPlayerFactory, SyncConfig, SyncController,
//! };
//!
//! let config = SyncConfig::from_env()?;
//! let (mut controller, events, mut receiver) = SyncController::with_websocket(
//!     config,
//!     Box::new(SimulatedPlayerFactory::default()),
//!     Box::new(LogRenderer::new()),
//! )?;
//!
//! let handle = ControllerHandle::new(events);
//! handle.submit("https://youtu.be/dQw4w9WgXcQ");
//! controller.run(&mut receiver).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod player;
pub mod render;
pub mod session;
pub mod source_url;
pub mod track;
pub mod tracker;

// Re-exports for public API
pub use channel::{
    ChannelEvent, ChannelHandle, ClientMessage, ServerMessage, SessionChannel,
    SessionChannelManager,
};
pub use config::SyncConfig;
pub use controller::SyncController;
pub use error::{Error, Result};
pub use events::{event_channel, ControllerHandle, EventReceiver, EventSender, SyncEvent};
pub use player::{
    MediaPlayer, PlayerEvent, PlayerEventSink, PlayerFactory, PlayerOptions, PlayerState,
    SimulatedPlayer, SimulatedPlayerFactory,
};
pub use render::{format_clock, LogRenderer, RenderAdapter};
pub use session::{PlaybackPhase, PlaybackState, SessionState, SessionToken};
pub use source_url::{extract_video_id, is_valid_video_url};
pub use track::{CaptionEntry, CaptionResolver, CaptionTrack};
pub use tracker::PositionTracker;

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
