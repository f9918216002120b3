//! Fixed-cadence position sampling
//!
//! The tracker does not read the player itself. It only asks the controller
//! to sample by queueing [`SyncEvent::Tick`], so sampling happens inside the
//! transition function like every other input.

use crate::events::{EventSender, SyncEvent};
use crate::session::SessionToken;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Cancellable periodic tick task
pub struct PositionTracker {
    /// Tick cadence (default: 100ms)
    poll_interval: Duration,

    /// Controller queue
    events: EventSender,

    /// Running task and the attempt it ticks for
    running: Option<(SessionToken, JoinHandle<()>)>,
}

impl PositionTracker {
    /// Create a stopped tracker
    pub fn new(poll_interval: Duration, events: EventSender) -> Self {
        Self {
            poll_interval,
            events,
            running: None,
        }
    }

    /// Start ticking for `token`; no-op if already running
    pub fn start(&mut self, token: SessionToken) {
        if self.running.is_some() {
            return;
        }

        info!(%token, "Starting position tracker (interval: {:?})", self.poll_interval);

        let events = self.events.clone();
        let poll_interval = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut timer = interval(poll_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                if events.send(SyncEvent::Tick { token }).is_err() {
                    debug!(%token, "Controller gone, stopping tracker");
                    break;
                }
            }
        });

        self.running = Some((token, task));
    }

    /// Stop ticking; no-op if already stopped
    pub fn stop(&mut self) {
        if let Some((token, task)) = self.running.take() {
            debug!(%token, "Stopping position tracker");
            task.abort();
        }
    }

    /// Returns true while the tick task is live
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Attempt the running tracker ticks for
    pub fn token(&self) -> Option<SessionToken> {
        self.running.as_ref().map(|(token, _)| *token)
    }

    /// Tick cadence
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
