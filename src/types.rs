//! Shared types for session state, events, and the orientation stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PoseLinkError;

/// Lifecycle state of a telemetry session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Negotiating,
    Connected,
    Closed,
    Failed,
}

/// Events emitted by a session to its owner.
///
/// Delivered on a broadcast channel; subscribers that fall behind lose
/// the oldest events, which is acceptable for status notifications.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// The pose sender loop terminated on a send failure.
    PoseSenderFailed(PoseLinkError),
    /// A remote-announced data channel was adopted.
    ChannelAdopted(String),
}

/// Viewpoint orientation, sent once per host tick on the reliable channel.
///
/// Angles are in degrees. `pitch` is negated at capture to match the
/// remote controller's axis convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationState {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    #[serde(default = "default_fov_x")]
    pub fov_x: f32,
}

fn default_fov_x() -> f32 {
    90.0
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov_x: default_fov_x(),
        }
    }
}

impl OrientationState {
    /// Build an orientation record from raw Euler angles, applying the
    /// pitch inversion expected by the remote renderer.
    pub fn from_euler_degrees(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self {
            yaw,
            pitch: -pitch,
            roll,
            fov_x: default_fov_x(),
        }
    }

    pub fn with_fov_x(mut self, fov_x: f32) -> Self {
        self.fov_x = fov_x;
        self
    }
}

/// Which hand a haptic stream or command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Actuator position id for this hand (left glove 8, right glove 9).
    pub fn position_id(&self) -> i32 {
        match self {
            HandSide::Left => 8,
            HandSide::Right => 9,
        }
    }
}

/// Point-in-time snapshot of a session for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub pose_sends: u64,
    pub pose_deferrals: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_pitch_inverted() {
        let state = OrientationState::from_euler_degrees(10.0, 30.0, -5.0);
        assert_eq!(state.yaw, 10.0);
        assert_eq!(state.pitch, -30.0);
        assert_eq!(state.roll, -5.0);
        assert_eq!(state.fov_x, 90.0);
    }

    #[test]
    fn test_orientation_json_shape() {
        let state = OrientationState::from_euler_degrees(1.0, 2.0, 3.0).with_fov_x(110.0);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"yaw\""));
        assert!(json.contains("\"pitch\""));
        assert!(json.contains("\"roll\""));
        assert!(json.contains("\"fov_x\""));

        let back: OrientationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_orientation_fov_defaults_when_absent() {
        let back: OrientationState =
            serde_json::from_str(r#"{"yaw":0.0,"pitch":0.0,"roll":0.0}"#).unwrap();
        assert_eq!(back.fov_x, 90.0);
    }

    #[test]
    fn test_hand_position_ids() {
        assert_eq!(HandSide::Left.position_id(), 8);
        assert_eq!(HandSide::Right.position_id(), 9);
    }
}
