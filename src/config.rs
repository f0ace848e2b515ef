//! Configuration management for poselink.
//!
//! Provides configuration loading, saving, and validation for signaling,
//! channel, sender, haptics, and video options.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PoseLinkError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseLinkConfig {
    pub signaling: SignalingConfig,
    pub channels: ChannelConfig,
    pub sender: SenderConfig,
    pub haptics: HapticConfig,
    pub video: VideoConfig,
}

/// Signaling endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// URL the SDP offer is POSTed to
    pub url: String,
    /// STUN/TURN server URLs for ICE gathering
    pub ice_servers: Vec<String>,
}

/// Data channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Label of the reliable orientation channel
    pub orientation_label: String,
    /// Label of the unreliable pose channel
    pub pose_label: String,
    /// Label of the remote-announced haptics channel
    pub haptics_label: String,
    /// Whether the pose channel preserves message order
    pub pose_ordered: bool,
    /// Retransmission limit for the pose channel
    pub pose_max_retransmits: u16,
}

/// Rate-gated sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Pose send frequency in Hz
    pub send_rate_hz: f32,
    /// Buffered-byte threshold above which sends are withheld
    pub high_water_mark_bytes: usize,
}

/// Haptic rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticConfig {
    /// Silence period after which a hand's intensities decay to zero
    pub decay_timeout_seconds: f32,
    /// Pulse duration at full intensity, milliseconds
    pub min_pulse_ms: u32,
    /// Pulse duration at threshold intensity, milliseconds
    pub max_pulse_ms: u32,
    /// Intensities below this value do not drive a motor (0-1)
    pub min_intensity_threshold: f32,
}

/// Video receive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Negotiate a recv-only video transceiver
    pub enabled: bool,
}

impl Default for PoseLinkConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingConfig {
                url: "http://localhost:8080/offer".to_string(),
                ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            },
            channels: ChannelConfig {
                orientation_label: "camera".to_string(),
                pose_label: "body_pose".to_string(),
                haptics_label: "haptics".to_string(),
                pose_ordered: false,
                pose_max_retransmits: 0,
            },
            sender: SenderConfig {
                send_rate_hz: 90.0,
                high_water_mark_bytes: 1024 * 1024,
            },
            haptics: HapticConfig {
                decay_timeout_seconds: 1.0,
                min_pulse_ms: 20,
                max_pulse_ms: 200,
                min_intensity_threshold: 0.01,
            },
            video: VideoConfig { enabled: true },
        }
    }
}

impl PoseLinkConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| PoseLinkError::Config(format!("Failed to read config file: {}", e)))?;

        let config: PoseLinkConfig = toml::from_str(&contents)
            .map_err(|e| PoseLinkError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PoseLinkError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PoseLinkError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| PoseLinkError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("poselink.toml")
    }

    /// Load from default location or create with defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.signaling.url.is_empty() {
            return Err(PoseLinkError::Config("Signaling URL is empty".to_string()));
        }

        if self.channels.orientation_label.is_empty()
            || self.channels.pose_label.is_empty()
            || self.channels.haptics_label.is_empty()
        {
            return Err(PoseLinkError::Config(
                "Channel labels must be non-empty".to_string(),
            ));
        }
        if self.channels.orientation_label == self.channels.pose_label {
            return Err(PoseLinkError::Config(
                "Orientation and pose channels must have distinct labels".to_string(),
            ));
        }

        if !(self.sender.send_rate_hz > 0.0 && self.sender.send_rate_hz <= 240.0) {
            return Err(PoseLinkError::Config(
                "Send rate must be between 0 and 240 Hz".to_string(),
            ));
        }
        if self.sender.high_water_mark_bytes == 0 {
            return Err(PoseLinkError::Config(
                "High-water mark must be positive".to_string(),
            ));
        }

        if self.haptics.decay_timeout_seconds <= 0.0 {
            return Err(PoseLinkError::Config(
                "Decay timeout must be positive".to_string(),
            ));
        }
        if self.haptics.min_pulse_ms == 0 || self.haptics.min_pulse_ms > self.haptics.max_pulse_ms {
            return Err(PoseLinkError::Config(
                "Pulse durations must satisfy 0 < min <= max".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.haptics.min_intensity_threshold) {
            return Err(PoseLinkError::Config(
                "Intensity threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
