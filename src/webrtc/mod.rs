//! WebRTC transport layer.
//!
//! Session negotiation over HTTP signaling, the dual data channels,
//! the rate-gated pose sender, and the video receive path.

pub mod sender;
pub mod session;
pub mod signaling;
pub mod video;

pub use sender::{DataChannelTransport, PoseSender, PoseTransport, TickOutcome};
pub use session::TelemetrySession;
pub use signaling::{SignalingClient, SignalingMessage};
pub use video::VideoSink;
