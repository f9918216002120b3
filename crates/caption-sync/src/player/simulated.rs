//! Headless, clock-driven player
//!
//! Stands in for a real embed when running without a UI: position advances
//! with the tokio clock while playing and stops at the duration, where the
//! player reports `Ended`.

use super::{MediaPlayer, PlayerEventSink, PlayerFactory, PlayerOptions, PlayerState};
use crate::{Error, Result};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
struct Clock {
    /// Position at `anchor` (or the frozen position when not playing)
    base_secs: f64,
    /// Set while playing
    anchor: Option<Instant>,
    destroyed: bool,
}

impl Clock {
    fn position(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.base_secs + anchor.elapsed().as_secs_f64(),
            None => self.base_secs,
        }
    }
}

/// Player whose position is derived from the tokio clock
pub struct SimulatedPlayer {
    clock: Mutex<Clock>,
    duration: Option<f64>,
    events: PlayerEventSink,
}

impl SimulatedPlayer {
    /// Create a stopped player at position zero
    pub fn new(duration: Option<f64>, events: PlayerEventSink) -> Self {
        Self {
            clock: Mutex::new(Clock {
                base_secs: 0.0,
                anchor: None,
                destroyed: false,
            }),
            duration,
            events,
        }
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = seconds.max(0.0);
        match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        }
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn current_time(&self) -> Option<f64> {
        let mut clock = self.clock.lock();
        if clock.destroyed {
            return None;
        }

        let position = clock.position();
        if let (Some(duration), true) = (self.duration, clock.anchor.is_some()) {
            if position >= duration {
                clock.base_secs = duration;
                clock.anchor = None;
                drop(clock);
                debug!("Simulated playback reached the end");
                self.events.state_changed(PlayerState::Ended);
                return Some(duration);
            }
        }

        Some(position)
    }

    fn duration(&self) -> Option<f64> {
        if self.clock.lock().destroyed {
            None
        } else {
            self.duration
        }
    }

    fn play(&mut self) {
        let mut clock = self.clock.lock();
        if clock.destroyed || clock.anchor.is_some() {
            return;
        }
        if self.duration.is_some_and(|d| clock.base_secs >= d) {
            clock.base_secs = 0.0;
        }
        clock.anchor = Some(Instant::now());
        drop(clock);
        self.events.state_changed(PlayerState::Playing);
    }

    fn pause(&mut self) {
        let mut clock = self.clock.lock();
        if clock.destroyed || clock.anchor.is_none() {
            return;
        }
        clock.base_secs = clock.position();
        clock.anchor = None;
        drop(clock);
        self.events.state_changed(PlayerState::Paused);
    }

    fn seek_to(&mut self, seconds: f64) {
        let target = self.clamp(seconds);
        let mut clock = self.clock.lock();
        if clock.destroyed {
            return;
        }
        clock.base_secs = target;
        if clock.anchor.is_some() {
            clock.anchor = Some(Instant::now());
        }
    }

    fn destroy(&mut self) {
        let mut clock = self.clock.lock();
        clock.destroyed = true;
        clock.anchor = None;
    }
}

/// Factory producing [`SimulatedPlayer`]s
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlayerFactory {
    /// Overrides the duration hint passed at construction
    duration: Option<f64>,
    /// Refuse to construct a player that would never end
    require_duration: bool,
}

impl SimulatedPlayerFactory {
    /// Create a factory; `duration` overrides the controller's hint
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            require_duration: false,
        }
    }

    /// Fail construction when neither an override nor a hint gives a length
    pub fn require_duration(mut self) -> Self {
        self.require_duration = true;
        self
    }
}

impl PlayerFactory for SimulatedPlayerFactory {
    fn create(
        &mut self,
        video_id: &str,
        options: &PlayerOptions,
        events: PlayerEventSink,
    ) -> Result<Box<dyn MediaPlayer>> {
        let duration = self.duration.or(options.duration_hint);
        if duration.is_none() && self.require_duration {
            return Err(Error::Player(
                "no media length known for an empty caption track".to_string(),
            ));
        }
        info!(video_id, ?duration, "Constructing simulated player");

        let mut player = SimulatedPlayer::new(duration, events.clone());
        events.ready();
        if options.autoplay {
            player.play();
        }

        Ok(Box::new(player))
    }
}
