//! Shared test doubles for controller tests
//!
//! Every double records into an `Arc<Mutex<_>>` probe so the test keeps a
//! view after the double is boxed into the controller.

#![allow(dead_code)]

use caption_sync::{
    event_channel, CaptionEntry, CaptionTrack, ChannelEvent, ChannelHandle, ClientMessage,
    EventReceiver, EventSender, MediaPlayer, PlayerEvent, PlayerEventSink, PlayerFactory,
    PlayerOptions, PlayerState, RenderAdapter, SessionChannel, SessionToken, SyncConfig,
    SyncController, SyncEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Render instruction as received by [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Show {
        translated: String,
        source: Option<String>,
    },
    Hide,
    Highlight(Option<usize>),
    Progress(f64),
    TimeLabel(f64, f64),
    CaptionList(usize),
    Failure(String),
    SubmitEnabled(bool),
}

/// Render adapter that records every call
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Translated text of every `show_caption` call, in order
    pub fn shown(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Show { translated, .. } => Some(translated.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn failures(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Failure(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }
}

impl RenderAdapter for RecordingRenderer {
    fn show_caption(&mut self, translated: &str, source: Option<&str>) {
        self.push(RenderCall::Show {
            translated: translated.to_string(),
            source: source.map(str::to_string),
        });
    }

    fn hide_caption(&mut self) {
        self.push(RenderCall::Hide);
    }

    fn highlight_list_item(&mut self, index: Option<usize>) {
        self.push(RenderCall::Highlight(index));
    }

    fn update_progress(&mut self, fraction_complete: f64) {
        self.push(RenderCall::Progress(fraction_complete));
    }

    fn update_time_label(&mut self, current_secs: f64, total_secs: f64) {
        self.push(RenderCall::TimeLabel(current_secs, total_secs));
    }

    fn show_caption_list(&mut self, entries: &[CaptionEntry]) {
        self.push(RenderCall::CaptionList(entries.len()));
    }

    fn report_failure(&mut self, message: &str) {
        self.push(RenderCall::Failure(message.to_string()));
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.push(RenderCall::SubmitEnabled(enabled));
    }
}

#[derive(Debug, Default)]
pub struct ChannelLog {
    pub opened: Vec<(SessionToken, String)>,
    pub sent: Vec<ClientMessage>,
    pub closes: usize,
    pub open: Option<ChannelHandle>,
}

/// In-memory channel; the test plays the caption service
#[derive(Clone, Default)]
pub struct FakeChannel {
    pub log: Arc<Mutex<ChannelLog>>,
}

impl SessionChannel for FakeChannel {
    fn open(&mut self, token: SessionToken, target_url: &str) -> ChannelHandle {
        let mut log = self.log.lock();
        let handle = ChannelHandle::new(token);
        log.opened.push((token, target_url.to_string()));
        log.open = Some(handle);
        handle
    }

    fn send(&mut self, handle: ChannelHandle, message: ClientMessage) -> caption_sync::Result<()> {
        let mut log = self.log.lock();
        if log.open != Some(handle) {
            return Err(caption_sync::Error::Channel("closed".to_string()));
        }
        log.sent.push(message);
        Ok(())
    }

    fn close(&mut self) {
        let mut log = self.log.lock();
        log.closes += 1;
        log.open = None;
    }

    fn is_open(&self) -> bool {
        self.log.lock().open.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(f64),
    Destroy,
}

#[derive(Debug, Default)]
pub struct PlayerLog {
    pub position: Option<f64>,
    pub duration: Option<f64>,
    pub calls: Vec<PlayerCall>,
    pub created: Vec<(String, PlayerOptions)>,
    pub sink: Option<PlayerEventSink>,
    pub fail_create: bool,
    /// Furthest position a seek can land on, independent of `duration`
    pub seek_limit: Option<f64>,
}

/// Player whose clock the test sets directly
pub struct ManualPlayer {
    log: Arc<Mutex<PlayerLog>>,
}

impl MediaPlayer for ManualPlayer {
    fn current_time(&self) -> Option<f64> {
        self.log.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.log.lock().duration
    }

    fn play(&mut self) {
        self.log.lock().calls.push(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.log.lock().calls.push(PlayerCall::Pause);
    }

    fn seek_to(&mut self, seconds: f64) {
        let mut log = self.log.lock();
        log.calls.push(PlayerCall::Seek(seconds));
        let landed = log.seek_limit.map_or(seconds, |limit| seconds.min(limit));
        log.position = Some(landed);
    }

    fn destroy(&mut self) {
        let mut log = self.log.lock();
        log.calls.push(PlayerCall::Destroy);
        log.position = None;
    }
}

#[derive(Clone, Default)]
pub struct ManualPlayerFactory {
    pub log: Arc<Mutex<PlayerLog>>,
}

impl PlayerFactory for ManualPlayerFactory {
    fn create(
        &mut self,
        video_id: &str,
        options: &PlayerOptions,
        events: PlayerEventSink,
    ) -> caption_sync::Result<Box<dyn MediaPlayer>> {
        let mut log = self.log.lock();
        if log.fail_create {
            return Err(caption_sync::Error::Player("embed blocked".to_string()));
        }
        log.created.push((video_id.to_string(), options.clone()));
        log.sink = Some(events);
        log.position = Some(0.0);
        log.duration = options.duration_hint;

        Ok(Box::new(ManualPlayer {
            log: Arc::clone(&self.log),
        }))
    }
}

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const OTHER_VIDEO_URL: &str = "https://youtu.be/9bZkp7q19f0";

/// Three captions with a gap between the second and third
pub fn sample_entries() -> Vec<CaptionEntry> {
    vec![
        CaptionEntry::new(0.0, 2.0, "hi", "안녕"),
        CaptionEntry::new(2.0, 1.5, "how are you", "잘 지내?"),
        CaptionEntry::new(5.0, 2.0, "bye", "잘 가"),
    ]
}

/// Controller wired to the doubles above
pub struct Harness {
    pub controller: SyncController,
    pub events: EventSender,
    pub receiver: EventReceiver,
    pub channel: FakeChannel,
    pub players: ManualPlayerFactory,
    pub render: RecordingRenderer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let (events, receiver) = event_channel();
        let channel = FakeChannel::default();
        let players = ManualPlayerFactory::default();
        let render = RecordingRenderer::default();

        let controller = SyncController::new(
            config,
            events.clone(),
            Box::new(channel.clone()),
            Box::new(players.clone()),
            Box::new(render.clone()),
        );

        Self {
            controller,
            events,
            receiver,
            channel,
            players,
            render,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.controller.session_token()
    }

    pub fn submit(&mut self, url: &str) {
        self.controller.handle(SyncEvent::Submit {
            url: url.to_string(),
        });
    }

    /// Deliver a channel event tagged with the current attempt
    pub fn channel_event(&mut self, event: ChannelEvent) {
        let token = self.token();
        self.controller.handle(SyncEvent::Channel { token, event });
    }

    /// Deliver a player event tagged with the current attempt
    pub fn player_event(&mut self, event: PlayerEvent) {
        let token = self.token();
        self.controller.handle(SyncEvent::Player { token, event });
    }

    /// Set the player position and deliver one tick
    pub fn tick_at(&mut self, position: f64) {
        self.players.log.lock().position = Some(position);
        let token = self.token();
        self.controller.handle(SyncEvent::Tick { token });
    }

    /// Submit, receive `entries` and bring the player to ready
    pub fn ready_with(&mut self, entries: Vec<CaptionEntry>) {
        self.submit(VIDEO_URL);
        self.channel_event(ChannelEvent::Connected);
        self.channel_event(ChannelEvent::Ready(CaptionTrack::new(entries)));
        self.player_event(PlayerEvent::Ready);
    }

    /// Same as [`ready_with`](Self::ready_with), then start playing
    pub fn playing_with(&mut self, entries: Vec<CaptionEntry>) {
        self.ready_with(entries);
        self.player_event(PlayerEvent::StateChanged(PlayerState::Playing));
    }
}
