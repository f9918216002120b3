//! Error types for the caption synchronization engine

/// Result type alias using the caption sync Error
pub type Result<T> = std::result::Result<T, Error>;

/// Generic message surfaced when the caption service sends something we
/// cannot interpret.
pub const PROTOCOL_FAILURE_MESSAGE: &str =
    "Received an invalid response from the caption service. Please try again.";

/// Errors that can occur while synchronizing captions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Submitted URL is not a recognised video URL
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    /// Channel could not be established, or closed before a terminal message
    #[error("Channel error: {0}")]
    Channel(String),

    /// Malformed or unexpected protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// External player not constructed yet or unable to report a position
    #[error("Playback unavailable: {0}")]
    PlaybackUnavailable(String),

    /// External player failed to construct or reported an error
    #[error("Player error: {0}")]
    Player(String),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error ends the current synchronization attempt
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::Channel(_) | Error::Protocol(_) | Error::WebSocket(_)
        )
    }

    /// Single human-readable sentence to show the user
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidUrl(_) => "Please enter a valid video URL.".to_string(),
            Error::Channel(_) | Error::WebSocket(_) => {
                "Could not reach the caption service. Please try again.".to_string()
            }
            Error::Protocol(_) | Error::Serialization(_) => PROTOCOL_FAILURE_MESSAGE.to_string(),
            Error::Player(detail) => format!("The video player failed: {}", detail),
            other => other.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("test".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: test");
    }

    #[test]
    fn test_error_is_session_fatal() {
        assert!(Error::Channel("closed".to_string()).is_session_fatal());
        assert!(Error::Protocol("bad tag".to_string()).is_session_fatal());
        assert!(!Error::PlaybackUnavailable("no player".to_string()).is_session_fatal());
        assert!(!Error::InvalidUrl("x".to_string()).is_session_fatal());
    }

    #[test]
    fn test_user_message_hides_protocol_detail() {
        let err = Error::Protocol("missing field `subtitles`".to_string());
        assert_eq!(err.user_message(), PROTOCOL_FAILURE_MESSAGE);
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(parse_err);
        assert!(matches!(err, Error::Serialization(_)));
    }
}
