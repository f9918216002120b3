//! JSON-tagged caption channel protocol

use crate::track::{CaptionEntry, CaptionTrack};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Messages sent from the client to the caption service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request captions for a video
    Init {
        /// Video URL as submitted by the user
        url: String,
    },
}

impl ClientMessage {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of a `ready` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Captions in delivery order
    pub subtitles: Vec<CaptionEntry>,
    /// Number of captions the service claims to have sent
    pub total: usize,
}

impl ReadyPayload {
    /// Check the declared total against the delivered array
    pub fn validate(&self) -> Result<()> {
        if self.total != self.subtitles.len() {
            return Err(Error::Protocol(format!(
                "ready declared total={} but carried {} subtitles",
                self.total,
                self.subtitles.len()
            )));
        }
        Ok(())
    }

    /// Build the caption track, logging a count mismatch and using the array
    pub fn into_track(self) -> CaptionTrack {
        if let Err(e) = self.validate() {
            warn!("{}; using the delivered array", e);
        }
        CaptionTrack::new(self.subtitles)
    }
}

/// Payload of an `error` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Message to show the user verbatim
    pub message: String,
}

/// Messages received from the caption service
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Captions are ready
    Ready(ReadyPayload),
    /// The service could not produce captions
    Error(ErrorPayload),
    /// A tag this client does not know; ignored for forward compatibility
    Unknown(String),
}

impl ServerMessage {
    /// Parse a text frame
    ///
    /// The `type` tag is read first so that unknown tags can be told apart
    /// from malformed payloads of known tags.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::Protocol(format!("message is not valid JSON: {}", e)))?;

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::Protocol("message has no string `type` tag".to_string()))?
            .to_owned();

        match tag.as_str() {
            "ready" => serde_json::from_value(value)
                .map(ServerMessage::Ready)
                .map_err(|e| Error::Protocol(format!("invalid ready payload: {}", e))),
            "error" => serde_json::from_value(value)
                .map(ServerMessage::Error)
                .map_err(|e| Error::Protocol(format!("invalid error payload: {}", e))),
            _ => Ok(ServerMessage::Unknown(tag)),
        }
    }

    /// Tag name for logging
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => "ready",
            Self::Error(_) => "error",
            Self::Unknown(tag) => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_serialization() {
        let msg = ClientMessage::Init {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["url"], "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_ready() {
        let json = r#"{
            "type": "ready",
            "subtitles": [
                {"start": 0, "duration": 2, "text": "hi", "translation": "안녕"},
                {"start": 2.5, "duration": 1.5, "text": "bye", "translation": "잘 가"}
            ],
            "total": 2
        }"#;

        match ServerMessage::parse(json).unwrap() {
            ServerMessage::Ready(payload) => {
                assert!(payload.validate().is_ok());
                let track = payload.into_track();
                assert_eq!(track.len(), 2);
                assert_eq!(track.get(1).unwrap().translated_text, "잘 가");
            }
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        let msg = ServerMessage::parse(r#"{"type":"error","message":"quota exceeded"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error(ErrorPayload {
                message: "quota exceeded".to_string()
            })
        );
    }

    #[test]
    fn test_total_mismatch_is_recoverable() {
        let json = r#"{"type":"ready","subtitles":[{"start":0,"duration":1,"text":"a","translation":"가"}],"total":3}"#;
        let ServerMessage::Ready(payload) = ServerMessage::parse(json).unwrap() else {
            panic!("Expected Ready");
        };

        assert!(matches!(payload.validate(), Err(Error::Protocol(_))));
        assert_eq!(payload.into_track().len(), 1);
    }

    #[test]
    fn test_unknown_tag_is_not_an_error() {
        let msg = ServerMessage::parse(r#"{"type":"progress","percentage":40}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown("progress".to_string()));
        assert_eq!(msg.name(), "progress");
    }

    #[test]
    fn test_malformed_messages_are_protocol_errors() {
        let cases = [
            "not json",
            r#"{"subtitles": []}"#,
            r#"{"type": 7}"#,
            r#"{"type":"ready","subtitles":"nope","total":0}"#,
            r#"{"type":"ready","subtitles":[{"start":0}],"total":1}"#,
            r#"{"type":"error"}"#,
        ];

        for case in cases {
            assert!(
                matches!(ServerMessage::parse(case), Err(Error::Protocol(_))),
                "expected protocol error for {}",
                case
            );
        }
    }
}
