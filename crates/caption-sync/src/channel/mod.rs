//! Message-channel session with the caption service
//!
//! The [`SessionChannel`] trait is the seam the controller talks to; the
//! production implementation is [`SessionChannelManager`], a WebSocket
//! client. Raw frames are translated into typed [`ChannelEvent`]s before
//! they reach the controller.

pub mod client;
pub mod protocol;

pub use client::SessionChannelManager;
pub use protocol::{ClientMessage, ErrorPayload, ReadyPayload, ServerMessage};

use crate::session::SessionToken;
use crate::track::CaptionTrack;
use crate::Result;

/// Handle to the channel opened for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHandle {
    token: SessionToken,
}

impl ChannelHandle {
    /// Create a handle for the given attempt
    pub fn new(token: SessionToken) -> Self {
        Self { token }
    }

    /// Attempt this handle belongs to
    pub fn token(&self) -> SessionToken {
        self.token
    }
}

/// Typed channel events delivered to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Channel established; `init` has been queued
    Connected,
    /// Captions delivered
    Ready(CaptionTrack),
    /// The service reported an error; `message` is shown verbatim
    ServiceError {
        /// Service-provided message
        message: String,
    },
    /// A frame could not be interpreted
    ProtocolViolation {
        /// What was wrong with it (logged, not shown)
        detail: String,
    },
    /// The channel could not be established
    ConnectFailed {
        /// Transport-level reason
        reason: String,
    },
    /// The channel closed
    Closed {
        /// Close reason or transport error, if any
        reason: Option<String>,
    },
}

impl ChannelEvent {
    /// Event name for logging/debugging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Ready(_) => "ready",
            Self::ServiceError { .. } => "service_error",
            Self::ProtocolViolation { .. } => "protocol_violation",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::Closed { .. } => "closed",
        }
    }
}

/// Lifecycle of at most one live channel per controller
pub trait SessionChannel: Send {
    /// Open a channel for `target_url`, closing any previous one first
    ///
    /// Returns immediately; establishment and the `init` message happen in
    /// the background and are reported as [`ChannelEvent`]s tagged `token`.
    fn open(&mut self, token: SessionToken, target_url: &str) -> ChannelHandle;

    /// Queue a message on the channel identified by `handle`
    fn send(&mut self, handle: ChannelHandle, message: ClientMessage) -> Result<()>;

    /// Close the live channel; safe to call repeatedly and from any state
    fn close(&mut self);

    /// Returns true while a channel is open or opening
    fn is_open(&self) -> bool;
}
