//! Haptic command frames and their mapping to glove motors.
//!
//! The remote controller sends JSON frames on its "haptics" data channel
//! with per-finger intensities in 0-1. This module parses those frames
//! and maps fresh intensities to per-motor commands: 0-100 intensity and
//! a pulse duration interpolated inversely from the strongest finger.

pub mod renderer;

use serde::{Deserialize, Serialize};

use crate::config::HapticConfig;
use crate::errors::{PoseLinkError, Result};
use crate::types::HandSide;

pub use renderer::{HapticActuator, HapticRenderer};

/// Number of motors per glove: five fingers plus the palm.
pub const MOTORS_PER_HAND: usize = 6;

/// Per-finger intensities for one hand, each in 0-1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HandIntensities {
    #[serde(default)]
    pub thumb: f32,
    #[serde(default)]
    pub index: f32,
    #[serde(default)]
    pub middle: f32,
    #[serde(default)]
    pub ring: f32,
    #[serde(default)]
    pub little: f32,
    #[serde(default)]
    pub palm: f32,
}

impl HandIntensities {
    /// Finger order matches the glove's motor layout.
    pub fn as_array(&self) -> [f32; MOTORS_PER_HAND] {
        [
            self.thumb,
            self.index,
            self.middle,
            self.ring,
            self.little,
            self.palm,
        ]
    }
}

/// One haptic frame as received on the wire. Both hands are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct HapticFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: f64,
    pub left: Option<HandIntensities>,
    pub right: Option<HandIntensities>,
}

/// Parse one haptic channel message.
///
/// Anything that is not a well-formed `"haptics"` frame is an error; the
/// receive path drops it with a diagnostic and keeps running.
pub fn parse_haptic_frame(buf: &[u8]) -> Result<HapticFrame> {
    let frame: HapticFrame = serde_json::from_slice(buf)
        .map_err(|e| PoseLinkError::MalformedHapticFrame(e.to_string()))?;

    if frame.kind != "haptics" {
        return Err(PoseLinkError::MalformedHapticFrame(format!(
            "unexpected frame type \"{}\"",
            frame.kind
        )));
    }

    Ok(frame)
}

/// Intensity-to-motor mapping parameters.
#[derive(Debug, Clone, Copy)]
pub struct HapticMapping {
    /// Pulse duration at full intensity, milliseconds.
    pub min_pulse_ms: u32,
    /// Pulse duration at threshold intensity, milliseconds.
    pub max_pulse_ms: u32,
    /// Intensities below this do not drive a motor.
    pub min_intensity_threshold: f32,
}

impl Default for HapticMapping {
    fn default() -> Self {
        Self {
            min_pulse_ms: 20,
            max_pulse_ms: 200,
            min_intensity_threshold: 0.01,
        }
    }
}

impl From<&HapticConfig> for HapticMapping {
    fn from(config: &HapticConfig) -> Self {
        Self {
            min_pulse_ms: config.min_pulse_ms,
            max_pulse_ms: config.max_pulse_ms,
            min_intensity_threshold: config.min_intensity_threshold,
        }
    }
}

/// One actuator command: motor intensities 0-100 and a pulse duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub hand: HandSide,
    pub motors: [i32; MOTORS_PER_HAND],
    pub duration_ms: u32,
}

/// Map one hand's intensities to a motor command.
///
/// Fingers below the threshold stay at zero; the rest map linearly
/// 0-1 to 0-100. The pulse duration shortens as the strongest intensity
/// rises, so strong contact reads as high-frequency vibration. Returns
/// `None` when no finger clears the threshold, so an idle or decayed
/// hand produces no actuation at all.
pub fn to_motor_command(
    hand: HandSide,
    intensities: &HandIntensities,
    mapping: &HapticMapping,
) -> Option<MotorCommand> {
    let mut motors = [0i32; MOTORS_PER_HAND];
    let mut strongest = 0.0f32;
    let mut any_active = false;

    for (i, value) in intensities.as_array().into_iter().enumerate() {
        if value < mapping.min_intensity_threshold {
            continue;
        }
        any_active = true;
        let clamped = value.clamp(0.0, 1.0);
        motors[i] = (clamped * 100.0).round() as i32;
        strongest = strongest.max(clamped);
    }

    if !any_active {
        return None;
    }

    let span = (mapping.max_pulse_ms - mapping.min_pulse_ms) as f32;
    let duration_ms = (mapping.max_pulse_ms as f32 - strongest * span).round() as u32;

    Some(MotorCommand {
        hand,
        motors,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_json(left: &str, right: &str) -> String {
        format!(
            r#"{{"type":"haptics","timestamp":1723.5,"left":{},"right":{}}}"#,
            left, right
        )
    }

    #[test]
    fn test_parse_full_frame() {
        let json = frame_json(
            r#"{"thumb":0.5,"index":1.0,"middle":0.0,"ring":0.0,"little":0.0,"palm":0.25}"#,
            "null",
        );
        let frame = parse_haptic_frame(json.as_bytes()).unwrap();
        assert_eq!(frame.kind, "haptics");
        let left = frame.left.unwrap();
        assert_eq!(left.index, 1.0);
        assert_eq!(left.palm, 0.25);
        assert!(frame.right.is_none());
    }

    #[test]
    fn test_parse_missing_fingers_default_to_zero() {
        let json = frame_json(r#"{"thumb":0.9}"#, "null");
        let left = parse_haptic_frame(json.as_bytes()).unwrap().left.unwrap();
        assert_eq!(left.thumb, 0.9);
        assert_eq!(left.index, 0.0);
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let err =
            parse_haptic_frame(br#"{"type":"pose","left":null,"right":null}"#).unwrap_err();
        assert!(matches!(err, PoseLinkError::MalformedHapticFrame(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_haptic_frame(b"not json at all").unwrap_err();
        assert!(matches!(err, PoseLinkError::MalformedHapticFrame(_)));
    }

    #[test]
    fn test_mapping_scales_to_percent() {
        let intensities = HandIntensities {
            thumb: 0.5,
            index: 1.0,
            ..Default::default()
        };
        let command =
            to_motor_command(HandSide::Left, &intensities, &HapticMapping::default()).unwrap();
        assert_eq!(command.hand, HandSide::Left);
        assert_eq!(command.motors[0], 50);
        assert_eq!(command.motors[1], 100);
        assert_eq!(command.motors[2], 0);
    }

    #[test]
    fn test_mapping_threshold_suppression() {
        let intensities = HandIntensities {
            middle: 0.005,
            ..Default::default()
        };
        assert!(
            to_motor_command(HandSide::Right, &intensities, &HapticMapping::default()).is_none()
        );
    }

    #[test]
    fn test_all_zero_hand_produces_no_command() {
        let intensities = HandIntensities::default();
        assert!(
            to_motor_command(HandSide::Left, &intensities, &HapticMapping::default()).is_none()
        );
    }

    #[test]
    fn test_duration_interpolation_endpoints() {
        let mapping = HapticMapping::default();

        let full = HandIntensities {
            index: 1.0,
            ..Default::default()
        };
        let command = to_motor_command(HandSide::Left, &full, &mapping).unwrap();
        assert_eq!(command.duration_ms, mapping.min_pulse_ms);

        let faint = HandIntensities {
            index: 0.011,
            ..Default::default()
        };
        let command = to_motor_command(HandSide::Left, &faint, &mapping).unwrap();
        assert!(command.duration_ms > 190 && command.duration_ms <= mapping.max_pulse_ms);
    }

    #[test]
    fn test_out_of_range_intensity_clamped() {
        let intensities = HandIntensities {
            palm: 3.0,
            ..Default::default()
        };
        let command =
            to_motor_command(HandSide::Right, &intensities, &HapticMapping::default()).unwrap();
        assert_eq!(command.motors[5], 100);
        assert_eq!(command.duration_ms, 20);
    }
}
