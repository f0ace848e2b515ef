//! Decay-checked haptic rendering.
//!
//! Incoming frames land in the decay monitor from the transport callback;
//! the host calls `render_tick` every actuation frame. A hand whose
//! stream has gone silent past the timeout decays to zero and stops
//! producing commands, so a disconnected producer can never leave the
//! last nonzero value stuck on the glove.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::HapticConfig;
use crate::decay::DecayMonitor;
use crate::haptics::{to_motor_command, HandIntensities, HapticFrame, HapticMapping, MotorCommand};
use crate::types::HandSide;

/// Driver for a wearable actuator. Rendering and device addressing are
/// the implementation's concern; `play_motors` must not block.
pub trait HapticActuator: Send + Sync {
    fn play_motors(&self, command: &MotorCommand);
}

/// Routes decayed haptic intensities to an injected actuator.
pub struct HapticRenderer {
    monitor: DecayMonitor<HandSide, HandIntensities>,
    actuator: Arc<dyn HapticActuator>,
    mapping: HapticMapping,
    timeout: Duration,
}

impl HapticRenderer {
    pub fn new(config: &HapticConfig, actuator: Arc<dyn HapticActuator>) -> Self {
        Self {
            monitor: DecayMonitor::new(),
            actuator,
            mapping: HapticMapping::from(config),
            timeout: Duration::from_secs_f32(config.decay_timeout_seconds),
        }
    }

    /// Record one parsed frame. Called from the transport receive path.
    pub fn record_frame(&self, frame: &HapticFrame, now: Instant) {
        if let Some(left) = frame.left {
            self.monitor.record_message(HandSide::Left, left, now);
        }
        if let Some(right) = frame.right {
            self.monitor.record_message(HandSide::Right, right, now);
        }
    }

    /// Evaluate both hands and drive the actuator. Must be called every
    /// actuation frame; staleness is only observable through this
    /// evaluation.
    pub fn render_tick(&self, now: Instant) {
        for hand in [HandSide::Left, HandSide::Right] {
            let intensities = self.monitor.effective_value(&hand, now, self.timeout);
            if let Some(command) = to_motor_command(hand, &intensities, &self.mapping) {
                self.actuator.play_motors(&command);
            }
        }
    }

    /// Forget all streams. Used at session teardown.
    pub fn clear(&self) {
        self.monitor.clear();
    }
}
