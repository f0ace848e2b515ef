//! Poselink: body pose and viewpoint telemetry over WebRTC
//!
//! This crate streams a tracked operator's skeletal pose and viewpoint
//! orientation to a remote renderer/controller over a peer-to-peer
//! session, while receiving the remote video stream and haptic-intensity
//! commands for a wearable actuator.
//!
//! # Pipeline
//! - Pose snapshots are encoded to a compact binary form and handed to a
//!   single-slot mailbox; only the newest unsent snapshot is retained.
//! - A fixed-rate sender drains the mailbox onto an unordered/unreliable
//!   data channel, withholding sends while the channel's buffered bytes
//!   sit above a high-water mark. Superseded data is dropped, never
//!   queued, which bounds end-to-end latency.
//! - Orientation goes out every host tick on an ordered/reliable channel
//!   as a small JSON record.
//! - Incoming haptic frames decay to zero when their stream goes silent,
//!   so a disconnected producer can never leave a stale value actuating.
//!
//! # Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use poselink::{PoseLinkConfig, PoseSnapshot, TelemetrySession};
//!
//! # async fn run() -> poselink::Result<()> {
//! let config = PoseLinkConfig::load_or_default();
//! let session = Arc::new(TelemetrySession::new(config));
//! session.start().await?;
//!
//! // Once per capture tick:
//! session.submit_pose(&PoseSnapshot::identity(24));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decay;
pub mod errors;
pub mod haptics;
pub mod pose;
pub mod types;
pub mod webrtc;

// Re-exports for convenience
pub use crate::config::PoseLinkConfig;
pub use crate::decay::DecayMonitor;
pub use crate::errors::{NegotiationStage, PoseLinkError, Result};
pub use crate::haptics::{HapticActuator, HapticRenderer, MotorCommand};
pub use crate::pose::{JointPose, PoseMailbox, PoseSnapshot, PoseStreamReceiver};
pub use crate::types::{HandSide, OrientationState, SessionEvent, SessionState, SessionStats};
pub use crate::webrtc::{TelemetrySession, VideoSink};

/// Initialize logging for the telemetry pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "poselink=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
