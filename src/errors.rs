//! Error types for the poselink pipeline.

use std::fmt;

use thiserror::Error;

/// Negotiation step that failed while establishing a session.
///
/// Surfaced with every negotiation error so operators can tell a local
/// offer problem from a signaling-server problem from a bad answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStage {
    CreatePeer,
    CreateOffer,
    LocalDescription,
    SignalingExchange,
    RemoteDescription,
}

impl fmt::Display for NegotiationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationStage::CreatePeer => "peer creation",
            NegotiationStage::CreateOffer => "offer creation",
            NegotiationStage::LocalDescription => "local description",
            NegotiationStage::SignalingExchange => "signaling exchange",
            NegotiationStage::RemoteDescription => "remote description",
        };
        write!(f, "{}", name)
    }
}

/// Errors produced by the telemetry pipeline.
#[derive(Debug, Clone, Error)]
pub enum PoseLinkError {
    #[error("negotiation failed during {stage}: {message}")]
    Negotiation {
        stage: NegotiationStage,
        message: String,
    },

    #[error("a negotiation is already in progress")]
    NegotiationInProgress,

    #[error("session is already connected")]
    AlreadyConnected,

    #[error("truncated pose buffer: need {expected} bytes, got {actual}")]
    TruncatedBuffer { expected: usize, actual: usize },

    #[error("invalid joint count: {0}")]
    InvalidJointCount(i32),

    #[error("joint count mismatch: session expects {expected}, buffer declares {actual}")]
    JointCountMismatch { expected: usize, actual: usize },

    #[error("malformed haptic frame: {0}")]
    MalformedHapticFrame(String),

    #[error("channel \"{0}\" is closed")]
    ChannelClosed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for poselink operations.
pub type Result<T> = std::result::Result<T, PoseLinkError>;

impl PoseLinkError {
    pub(crate) fn negotiation(stage: NegotiationStage, err: impl fmt::Display) -> Self {
        PoseLinkError::Negotiation {
            stage,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_error_names_stage() {
        let err = PoseLinkError::negotiation(NegotiationStage::SignalingExchange, "refused");
        let msg = err.to_string();
        assert!(msg.contains("signaling exchange"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn test_truncated_buffer_reports_sizes() {
        let err = PoseLinkError::TruncatedBuffer {
            expected: 772,
            actual: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("772"));
        assert!(msg.contains("100"));
    }
}
