//! Consuming-side pose stream handling.
//!
//! Decodes incoming pose buffers, enforces the session's expected joint
//! count, and exposes the freshest snapshot per stream through the decay
//! monitor. Malformed buffers are rejected to the caller, which is
//! expected to drop them with a diagnostic rather than tear anything
//! down.

use std::time::{Duration, Instant};

use crate::decay::DecayMonitor;
use crate::errors::{PoseLinkError, Result};
use crate::pose::{codec, PoseSnapshot};

/// Decode, validate, and track pose snapshots arriving per stream.
pub struct PoseStreamReceiver {
    expected_joints: usize,
    timeout: Duration,
    monitor: DecayMonitor<String, PoseSnapshot>,
}

impl PoseStreamReceiver {
    /// `expected_joints` is the skeleton size fixed at session
    /// establishment; `timeout` is the decay window for stale streams.
    pub fn new(expected_joints: usize, timeout: Duration) -> Self {
        Self {
            expected_joints,
            timeout,
            monitor: DecayMonitor::new(),
        }
    }

    pub fn expected_joints(&self) -> usize {
        self.expected_joints
    }

    /// Decode one incoming buffer for `stream` and record it.
    ///
    /// A joint-count mismatch signals a configuration change that needs a
    /// re-handshake; the snapshot is not applied and the error is
    /// returned so the caller can react.
    pub fn handle_message(&self, stream: &str, buf: &[u8], now: Instant) -> Result<()> {
        let snapshot = codec::decode(buf)?;

        if snapshot.joint_count() != self.expected_joints {
            return Err(PoseLinkError::JointCountMismatch {
                expected: self.expected_joints,
                actual: snapshot.joint_count(),
            });
        }

        self.monitor.record_message(stream.to_string(), snapshot, now);
        Ok(())
    }

    /// Freshest snapshot for `stream`, or `None` when absent or stale.
    pub fn latest(&self, stream: &str, now: Instant) -> Option<PoseSnapshot> {
        self.monitor
            .fresh_value(&stream.to_string(), now, self.timeout)
    }

    /// Forget all streams. Used at session teardown.
    pub fn clear(&self) {
        self.monitor.clear();
    }
}
