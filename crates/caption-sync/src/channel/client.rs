//! WebSocket session channel to the caption service

use super::protocol::{ClientMessage, ServerMessage};
use super::{ChannelEvent, ChannelHandle, SessionChannel};
use crate::events::{EventSender, SyncEvent};
use crate::session::SessionToken;
use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The one live channel
struct ActiveChannel {
    handle: ChannelHandle,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// WebSocket implementation of [`SessionChannel`]
///
/// Each `open` spawns one task that connects, sends `init`, forwards
/// queued messages and translates inbound frames into [`ChannelEvent`]s.
pub struct SessionChannelManager {
    /// Caption service URL (ws:// or wss://)
    endpoint: String,

    /// Bound on channel establishment
    connect_timeout: Duration,

    /// Controller queue
    events: EventSender,

    active: Option<ActiveChannel>,
}

impl SessionChannelManager {
    /// Create a new channel manager
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Caption service WebSocket URL
    /// * `connect_timeout` - Maximum time to establish a channel
    /// * `events` - Controller queue that receives channel events
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        events: EventSender,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            events,
            active: None,
        }
    }

    /// Caption service URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Channel task: connect, send `init`, then pump both directions
    async fn channel_task(
        endpoint: String,
        connect_timeout: Duration,
        token: SessionToken,
        init: ClientMessage,
        mut outgoing: mpsc::UnboundedReceiver<ClientMessage>,
        mut shutdown: watch::Receiver<bool>,
        events: EventSender,
    ) {
        let emit = |event: ChannelEvent| {
            if events.send(SyncEvent::Channel { token, event }).is_err() {
                debug!(%token, "Controller gone, dropping channel event");
            }
        };

        info!(%token, "Connecting to caption service: {}", endpoint);

        let connect = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()));
        let connected = tokio::select! {
            result = connect => result,
            _ = shutdown.changed() => {
                debug!(%token, "Channel closed while connecting");
                return;
            }
        };

        let ws_stream: WsStream = match connected {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                warn!(%token, "Failed to connect: {}", e);
                emit(ChannelEvent::ConnectFailed {
                    reason: e.to_string(),
                });
                return;
            }
            Err(_) => {
                warn!(%token, "Connection timed out after {:?}", connect_timeout);
                emit(ChannelEvent::ConnectFailed {
                    reason: format!("timed out after {}ms", connect_timeout.as_millis()),
                });
                return;
            }
        };

        info!(%token, "Connected to caption service");
        emit(ChannelEvent::Connected);

        let (mut write, mut read) = ws_stream.split();

        if let Err(e) = Self::write_message(&mut write, &init).await {
            error!(%token, "Failed to send init: {}", e);
            emit(ChannelEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(%token, "Closing channel on request");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                queued = outgoing.recv() => match queued {
                    Some(message) => {
                        if let Err(e) = Self::write_message(&mut write, &message).await {
                            error!(%token, "Failed to send message: {}", e);
                            emit(ChannelEvent::Closed { reason: Some(e.to_string()) });
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                },
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = Self::translate(token, &text) {
                            emit(event);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(%token, "Caption service closed the channel");
                        emit(ChannelEvent::Closed {
                            reason: frame.map(|f| f.reason.into_owned()).filter(|r| !r.is_empty()),
                        });
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(%token, "WebSocket error: {}", e);
                        emit(ChannelEvent::Closed { reason: Some(e.to_string()) });
                        break;
                    }
                    None => {
                        emit(ChannelEvent::Closed { reason: None });
                        break;
                    }
                },
            }
        }

        debug!(%token, "Channel task terminated");
    }

    async fn write_message(
        write: &mut futures::stream::SplitSink<WsStream, Message>,
        message: &ClientMessage,
    ) -> Result<()> {
        let json = message.to_json()?;
        debug!("Sending channel message: {}", json);
        write.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Translate an inbound text frame; `None` for frames the controller ignores
    fn translate(token: SessionToken, text: &str) -> Option<ChannelEvent> {
        debug!(%token, "Received channel message: {}", text);

        match ServerMessage::parse(text) {
            Ok(ServerMessage::Ready(payload)) => Some(ChannelEvent::Ready(payload.into_track())),
            Ok(ServerMessage::Error(payload)) => Some(ChannelEvent::ServiceError {
                message: payload.message,
            }),
            Ok(ServerMessage::Unknown(tag)) => {
                debug!(%token, "Ignoring unknown message type: {}", tag);
                None
            }
            Err(e) => {
                warn!(%token, "{}", e);
                Some(ChannelEvent::ProtocolViolation {
                    detail: e.to_string(),
                })
            }
        }
    }
}

impl SessionChannel for SessionChannelManager {
    fn open(&mut self, token: SessionToken, target_url: &str) -> ChannelHandle {
        self.close();

        let handle = ChannelHandle::new(token);
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(Self::channel_task(
            self.endpoint.clone(),
            self.connect_timeout,
            token,
            ClientMessage::Init {
                url: target_url.to_string(),
            },
            outgoing_rx,
            shutdown_rx,
            self.events.clone(),
        ));

        self.active = Some(ActiveChannel {
            handle,
            outgoing: outgoing_tx,
            shutdown: shutdown_tx,
            task,
        });

        handle
    }

    fn send(&mut self, handle: ChannelHandle, message: ClientMessage) -> Result<()> {
        let active = self
            .active
            .as_ref()
            .filter(|active| active.handle == handle)
            .ok_or_else(|| Error::Channel(format!("channel for {} is closed", handle.token())))?;

        active
            .outgoing
            .send(message)
            .map_err(|e| Error::Channel(format!("Failed to queue message: {}", e)))
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(token = %active.handle.token(), "Requesting channel close");
            let _ = active.shutdown.send(true);
        }
    }

    fn is_open(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| !active.task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SessionChannelManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[test]
    fn test_translate_ready() {
        let token = SessionToken::default();
        let event = SessionChannelManager::translate(
            token,
            r#"{"type":"ready","subtitles":[{"start":0,"duration":2,"text":"hi","translation":"안녕"}],"total":1}"#,
        );
        match event {
            Some(ChannelEvent::Ready(track)) => assert_eq!(track.len(), 1),
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_translate_unknown_tag_is_dropped() {
        let event =
            SessionChannelManager::translate(SessionToken::default(), r#"{"type":"heartbeat"}"#);
        assert!(event.is_none());
    }

    #[test]
    fn test_translate_garbage_is_protocol_violation() {
        let event = SessionChannelManager::translate(SessionToken::default(), "<html>");
        assert!(matches!(event, Some(ChannelEvent::ProtocolViolation { .. })));
    }

    #[tokio::test]
    async fn test_send_on_closed_handle_fails() {
        let (tx, _rx) = event_channel();
        let mut manager =
            SessionChannelManager::new("ws://127.0.0.1:1", Duration::from_millis(50), tx);

        let handle = manager.open(SessionToken::default(), "https://youtu.be/dQw4w9WgXcQ");
        manager.close();
        manager.close();

        let result = manager.send(
            handle,
            ClientMessage::Init {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            },
        );
        assert!(matches!(result, Err(Error::Channel(_))));
        assert!(!manager.is_open());
    }
}
