//! Sync controller: the session state machine
//!
//! One controller owns everything for the current attempt (channel, track,
//! player, tracker) and changes it only inside [`SyncController::handle`].
//!
//! ```text
//! Idle ─submit─▶ Connecting ─connected─▶ AwaitingCaptions ─player ready─▶ Ready(Paused)
//!                    │                         │                            ▲   │
//!                    └──── error/failure ──────┴──▶ Failed            Paused│   │Playing
//!                                                                           └───┘
//! ```
//!
//! A new submit is accepted from any state. It tears the previous attempt
//! down completely before the new session token becomes current.

use crate::channel::{ChannelEvent, ChannelHandle, SessionChannel, SessionChannelManager};
use crate::config::SyncConfig;
use crate::error::PROTOCOL_FAILURE_MESSAGE;
use crate::events::{event_channel, EventReceiver, EventSender, SyncEvent};
use crate::player::{
    MediaPlayer, PlayerEvent, PlayerEventSink, PlayerFactory, PlayerOptions, PlayerState,
};
use crate::render::RenderAdapter;
use crate::session::{PlaybackPhase, PlaybackState, SessionState, SessionToken};
use crate::source_url::extract_video_id;
use crate::track::{CaptionResolver, CaptionTrack};
use crate::tracker::PositionTracker;
use crate::{Error, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Owner of one page/session worth of synchronization state
pub struct SyncController {
    config: SyncConfig,

    /// Queue handed to player sinks
    events: EventSender,

    channel: Box<dyn SessionChannel>,
    players: Box<dyn PlayerFactory>,
    renderer: Box<dyn RenderAdapter>,
    tracker: PositionTracker,

    /// Current attempt; anything tagged otherwise is stale
    token: SessionToken,
    state: SessionState,
    state_updates: watch::Sender<SessionState>,
    playback: PlaybackState,

    channel_handle: Option<ChannelHandle>,
    video_id: Option<String>,
    track: Option<CaptionTrack>,
    resolver: CaptionResolver,
    player: Option<Box<dyn MediaPlayer>>,

    /// Whole seconds (current, total) last pushed to the time label
    time_label: Option<(u64, u64)>,
    shut_down: bool,
}

impl SyncController {
    /// Create an idle controller
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration
    /// * `events` - Sender half of the queue this controller is run on
    /// * `channel` - Session channel to the caption service
    /// * `players` - Factory for the external player
    /// * `renderer` - Receiver of render instructions
    pub fn new(
        config: SyncConfig,
        events: EventSender,
        channel: Box<dyn SessionChannel>,
        players: Box<dyn PlayerFactory>,
        renderer: Box<dyn RenderAdapter>,
    ) -> Self {
        let tracker = PositionTracker::new(config.poll_interval(), events.clone());
        let (state_updates, _) = watch::channel(SessionState::Idle);

        Self {
            config,
            events,
            channel,
            players,
            renderer,
            tracker,
            token: SessionToken::default(),
            state: SessionState::Idle,
            state_updates,
            playback: PlaybackState::default(),
            channel_handle: None,
            video_id: None,
            track: None,
            resolver: CaptionResolver::new(),
            player: None,
            time_label: None,
            shut_down: false,
        }
    }

    /// Create a controller talking to the configured caption service
    ///
    /// Returns the controller and the receiver to pass to [`run`](Self::run).
    pub fn with_websocket(
        config: SyncConfig,
        players: Box<dyn PlayerFactory>,
        renderer: Box<dyn RenderAdapter>,
    ) -> Result<(Self, EventSender, EventReceiver)> {
        config.validate()?;

        let (events, receiver) = event_channel();
        let channel = SessionChannelManager::new(
            config.backend_url.clone(),
            config.connect_timeout(),
            events.clone(),
        );
        let controller = Self::new(config, events.clone(), Box::new(channel), players, renderer);

        Ok((controller, events, receiver))
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Watch session state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_updates.subscribe()
    }

    /// Playback bookkeeping
    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// Loaded caption track, if any
    pub fn track(&self) -> Option<&CaptionTrack> {
        self.track.as_ref()
    }

    /// Token of the current attempt
    pub fn session_token(&self) -> SessionToken {
        self.token
    }

    /// Handle of the channel while one is open for the current attempt
    pub fn channel_handle(&self) -> Option<ChannelHandle> {
        self.channel_handle
    }

    /// Video id of the current attempt
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    /// Returns true while the position tracker is running
    pub fn is_tracking(&self) -> bool {
        self.tracker.is_running()
    }

    /// Returns true once `Shutdown` has been handled
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Drain the queue until `Shutdown`
    ///
    /// The controller itself holds senders (tracker, player sinks), so the
    /// loop ends on `Shutdown` rather than on the queue closing.
    pub async fn run(&mut self, events: &mut EventReceiver) {
        info!("Sync controller started");

        while let Some(event) = events.recv().await {
            self.handle(event);
            if self.shut_down {
                break;
            }
        }

        if !self.shut_down {
            self.handle(SyncEvent::Shutdown);
        }
        info!("Sync controller stopped");
    }

    /// Apply one event
    pub fn handle(&mut self, event: SyncEvent) {
        if self.shut_down {
            debug!("Controller shut down, ignoring {} event", event.name());
            return;
        }

        if let Some(token) = event.token() {
            if token != self.token {
                debug!(%token, current = %self.token, "Dropping stale {} event", event.name());
                return;
            }
        }

        match event {
            SyncEvent::Submit { url } => self.on_submit(&url),
            SyncEvent::Seek { seconds } => self.on_seek(seconds),
            SyncEvent::SeekToCaption { index } => self.on_seek_to_caption(index),
            SyncEvent::Play => self.with_ready_player(|player| player.play()),
            SyncEvent::Pause => self.with_ready_player(|player| player.pause()),
            SyncEvent::Channel { event, .. } => self.on_channel_event(event),
            SyncEvent::Player { event, .. } => self.on_player_event(event),
            SyncEvent::Tick { .. } => self.on_tick(),
            SyncEvent::Shutdown => {
                info!(token = %self.token, "Shutting down sync controller");
                self.release_session();
                self.set_state(SessionState::Idle);
                self.shut_down = true;
            }
        }
    }

    fn on_submit(&mut self, url: &str) {
        let Some(video_id) = extract_video_id(url) else {
            let err = Error::InvalidUrl(url.to_string());
            warn!("{}", err);
            self.renderer.report_failure(&err.user_message());
            return;
        };

        self.release_session();

        self.token = self.token.next();
        info!(token = %self.token, video_id = %video_id, "Starting synchronization attempt");

        self.video_id = Some(video_id);
        self.renderer.set_submit_enabled(false);
        self.set_state(SessionState::Connecting);
        self.channel_handle = Some(self.channel.open(self.token, url));
    }

    fn on_channel_event(&mut self, event: ChannelEvent) {
        if !self.state.is_pending() {
            debug!(state = self.state.name(), "Ignoring channel {} event", event.name());
            return;
        }

        match event {
            ChannelEvent::Connected => {
                if self.state == SessionState::Connecting {
                    self.set_state(SessionState::AwaitingCaptions);
                }
            }
            ChannelEvent::Ready(track) => {
                if self.track.is_some() {
                    debug!("Captions already loaded, ignoring repeated ready");
                    return;
                }
                self.load_track(track);
            }
            ChannelEvent::ServiceError { message } => {
                warn!(token = %self.token, "Caption service reported an error: {}", message);
                self.fail(message);
            }
            ChannelEvent::ProtocolViolation { detail } => {
                warn!(token = %self.token, "Protocol violation: {}", detail);
                self.fail(PROTOCOL_FAILURE_MESSAGE.to_string());
            }
            ChannelEvent::ConnectFailed { reason } => {
                let err = Error::Channel(reason);
                error!(token = %self.token, "{}", err);
                self.fail(err.user_message());
            }
            ChannelEvent::Closed { reason } => {
                if self.track.is_some() {
                    debug!("Channel closed after captions arrived");
                    return;
                }
                let err = Error::Channel(
                    reason.unwrap_or_else(|| "closed before captions arrived".to_string()),
                );
                error!(token = %self.token, "{}", err);
                self.fail(err.user_message());
            }
        }
    }

    fn load_track(&mut self, track: CaptionTrack) {
        info!(token = %self.token, captions = track.len(), "Caption track loaded");

        // `ready` is terminal for the channel.
        self.channel.close();
        self.channel_handle = None;

        if self.state == SessionState::Connecting {
            self.set_state(SessionState::AwaitingCaptions);
        }

        self.renderer.show_caption_list(track.entries());
        let options = PlayerOptions {
            autoplay: self.config.autoplay,
            controls: true,
            duration_hint: track.end_seconds(),
        };
        self.resolver.reset();
        self.track = Some(track);

        let video_id = self.video_id.clone().unwrap_or_default();
        let sink = PlayerEventSink::new(self.token, self.events.clone());
        match self.players.create(&video_id, &options, sink) {
            Ok(player) => self.player = Some(player),
            Err(e) => {
                error!(token = %self.token, "Failed to construct player: {}", e);
                self.fail(e.user_message());
            }
        }
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => {
                if self.state != SessionState::AwaitingCaptions || self.player.is_none() {
                    debug!(state = self.state.name(), "Ignoring player ready");
                    return;
                }
                info!(token = %self.token, "Player ready");
                self.set_state(SessionState::Ready(PlaybackPhase::Paused));
                self.renderer.set_submit_enabled(true);
            }
            PlayerEvent::StateChanged(player_state) => {
                if !self.state.is_ready() {
                    debug!(state = self.state.name(), ?player_state, "Ignoring player state");
                    return;
                }
                self.apply_player_state(player_state);
            }
            PlayerEvent::Error(message) => {
                let err = Error::Player(message);
                match self.state {
                    SessionState::AwaitingCaptions => {
                        error!(token = %self.token, "{}", err);
                        self.fail(err.user_message());
                    }
                    SessionState::Ready(_) => {
                        error!(token = %self.token, "{}", err);
                        self.apply_player_state(PlayerState::Paused);
                        self.renderer.report_failure(&err.user_message());
                    }
                    _ => debug!("Ignoring player error outside a session: {}", err),
                }
            }
        }
    }

    fn apply_player_state(&mut self, player_state: PlayerState) {
        if player_state.is_playing() {
            self.playback.is_playing = true;
            self.set_state(SessionState::Ready(PlaybackPhase::Playing));
            self.tracker.start(self.token);
        } else {
            self.playback.is_playing = false;
            self.set_state(SessionState::Ready(PlaybackPhase::Paused));
            self.tracker.stop();
        }
    }

    fn on_tick(&mut self) {
        // Ticks queued before the tracker was stopped
        if !self.tracker.is_running() || !self.state.is_playing() {
            debug!(state = self.state.name(), "Dropping tick while not playing");
            return;
        }

        let Some(player) = self.player.as_ref() else {
            return;
        };
        let Some(position) = player.current_time().filter(|t| t.is_finite()) else {
            debug!("{}", Error::PlaybackUnavailable("no position".to_string()));
            return;
        };
        let duration = player.duration();
        self.sync_to(position, duration);
    }

    fn on_seek(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            warn!(seconds, "Ignoring seek to a non-finite position");
            return;
        }
        let Some(player) = self.ready_player() else {
            debug!(state = self.state.name(), "Ignoring seek without a ready player");
            return;
        };
        let duration = player.duration().filter(|d| d.is_finite() && *d > 0.0);
        let target = match duration {
            Some(total) => seconds.clamp(0.0, total),
            None => seconds.max(0.0),
        };
        debug!(seconds = target, "Seeking");
        player.seek_to(target);

        // Reconcile at where the player landed, not at the request
        let landed = player
            .current_time()
            .filter(|t| t.is_finite())
            .unwrap_or(target);
        self.sync_to(landed, duration);
    }

    fn on_seek_to_caption(&mut self, index: usize) {
        match self.track.as_ref().and_then(|track| track.get(index)) {
            Some(entry) => {
                let start = entry.start_seconds;
                self.on_seek(start);
            }
            None => warn!(index, "No caption at index"),
        }
    }

    fn sync_to(&mut self, position: f64, duration: Option<f64>) {
        self.playback.last_known_position_secs = position;
        self.render_position(position, duration.filter(|d| d.is_finite() && *d > 0.0));
        self.reconcile_caption(position);
    }

    fn render_position(&mut self, position: f64, duration: Option<f64>) {
        let Some(total) = duration else {
            return;
        };

        self.renderer.update_progress((position / total).clamp(0.0, 1.0));

        let label = (position.max(0.0).floor() as u64, total.floor() as u64);
        if self.time_label != Some(label) {
            self.time_label = Some(label);
            self.renderer.update_time_label(position, total);
        }
    }

    /// Push a render instruction only when the active index changes
    fn reconcile_caption(&mut self, position: f64) {
        let Some(track) = self.track.as_ref() else {
            return;
        };

        let resolved = self.resolver.resolve(track, position);
        if resolved == self.playback.active_caption_index {
            return;
        }
        self.playback.active_caption_index = resolved;

        match resolved.and_then(|index| track.get(index).map(|entry| (index, entry))) {
            Some((index, entry)) => {
                debug!(index, position, "Active caption changed");
                let source = Some(entry.source_text.as_str())
                    .filter(|text| self.config.show_source_text && !text.is_empty());
                self.renderer.show_caption(&entry.translated_text, source);
                self.renderer.highlight_list_item(Some(index));
            }
            None => {
                debug!(position, "No active caption");
                self.renderer.hide_caption();
                self.renderer.highlight_list_item(None);
            }
        }
    }

    fn ready_player(&mut self) -> Option<&mut Box<dyn MediaPlayer>> {
        if self.state.is_ready() {
            self.player.as_mut()
        } else {
            None
        }
    }

    fn with_ready_player(&mut self, command: impl FnOnce(&mut Box<dyn MediaPlayer>)) {
        match self.ready_player() {
            Some(player) => command(player),
            None => debug!(state = self.state.name(), "Ignoring playback command"),
        }
    }

    /// End the attempt and surface `message`
    fn fail(&mut self, message: String) {
        self.release_session();
        self.renderer.report_failure(&message);
        self.renderer.set_submit_enabled(true);
        self.set_state(SessionState::Failed { message });
    }

    /// Release every resource of the current attempt; safe to repeat
    fn release_session(&mut self) {
        self.channel.close();
        self.channel_handle = None;
        self.tracker.stop();

        if let Some(mut player) = self.player.take() {
            player.destroy();
        }

        self.track = None;
        self.resolver.reset();
        if self.playback.active_caption_index.is_some() {
            self.renderer.hide_caption();
            self.renderer.highlight_list_item(None);
        }
        self.playback = PlaybackState::default();
        self.time_label = None;
    }

    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            info!(
                token = %self.token,
                "Session state transition: {} -> {}",
                self.state.name(),
                new_state.name()
            );
            self.state = new_state.clone();
            self.state_updates.send_replace(new_state);
        }
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.release_session();
    }
}
