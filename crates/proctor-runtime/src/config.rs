//! Supervisor configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use proctor_core::{DeviceKind, ProctorError, ProctorResult};
use proctor_media::PermissionMonitorConfig;
use proctor_vision::{FaceMonitorConfig, DEFAULT_MODEL_URI, DEFAULT_SAMPLE_INTERVAL};

pub const ENV_PERMISSION_POLL: &str = "PROCTOR_PERMISSION_POLL";
pub const ENV_SAMPLE_INTERVAL: &str = "PROCTOR_SAMPLE_INTERVAL";
pub const ENV_MODEL_URI: &str = "PROCTOR_MODEL_URI";

/// What losing a permission does to a running session
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationAction {
    /// Release the session and wait for the permission to come back
    #[default]
    Suspend,
    /// End the attempt and send the candidate back to the start screen
    TerminateAndNavigate,
}

impl RevocationAction {
    pub fn stricter(self, other: RevocationAction) -> RevocationAction {
        self.max(other)
    }
}

/// Per-device revocation handling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevocationPolicy {
    pub camera: RevocationAction,
    pub microphone: RevocationAction,
}

impl RevocationPolicy {
    /// Microphone loss ends the attempt, camera loss only suspends
    pub fn strict() -> Self {
        RevocationPolicy {
            camera: RevocationAction::Suspend,
            microphone: RevocationAction::TerminateAndNavigate,
        }
    }

    pub fn action_for(&self, device: DeviceKind) -> RevocationAction {
        match device {
            DeviceKind::Camera => self.camera,
            DeviceKind::Microphone => self.microphone,
        }
    }
}

/// Proctoring supervisor configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Permission polling interval
    #[serde(with = "millis")]
    pub permission_poll_interval: Duration,
    /// Face detection sampling interval
    #[serde(with = "millis")]
    pub sample_interval: Duration,
    /// Where the detection models are loaded from
    pub model_uri: String,
    /// Draw detections when a surface is supplied
    pub overlay: bool,
    /// Use platform permission change events when offered
    pub prefer_permission_events: bool,
    /// Violation broadcast capacity
    pub violation_buffer: usize,
    /// Command queue capacity
    pub command_buffer: usize,
    pub revocation: RevocationPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            permission_poll_interval: Duration::from_millis(1000),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            model_uri: DEFAULT_MODEL_URI.to_string(),
            overlay: true,
            prefer_permission_events: true,
            violation_buffer: 64,
            command_buffer: 32,
            revocation: RevocationPolicy::default(),
        }
    }
}

impl SupervisorConfig {
    /// Microphone revocation terminates the attempt
    pub fn strict() -> Self {
        SupervisorConfig {
            revocation: RevocationPolicy::strict(),
            ..Default::default()
        }
    }

    /// Defaults overlaid with `PROCTOR_*` environment variables
    pub fn from_env() -> ProctorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> ProctorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SupervisorConfig::default();
        if let Some(value) = lookup(ENV_PERMISSION_POLL) {
            config.permission_poll_interval = parse_duration(ENV_PERMISSION_POLL, &value)?;
        }
        if let Some(value) = lookup(ENV_SAMPLE_INTERVAL) {
            config.sample_interval = parse_duration(ENV_SAMPLE_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_MODEL_URI) {
            config.model_uri = value;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProctorResult<()> {
        if self.permission_poll_interval.is_zero() {
            return Err(ProctorError::InvalidConfig(
                "permission_poll_interval must be non-zero".into(),
            ));
        }
        if self.sample_interval.is_zero() {
            return Err(ProctorError::InvalidConfig(
                "sample_interval must be non-zero".into(),
            ));
        }
        if self.violation_buffer == 0 || self.command_buffer == 0 {
            return Err(ProctorError::InvalidConfig("buffer sizes must be non-zero".into()));
        }
        if self.model_uri.is_empty() {
            return Err(ProctorError::InvalidConfig("model_uri must not be empty".into()));
        }
        Ok(())
    }

    pub fn permission_monitor(&self) -> PermissionMonitorConfig {
        PermissionMonitorConfig {
            poll_interval: self.permission_poll_interval,
            prefer_events: self.prefer_permission_events,
        }
    }

    pub fn face_monitor(&self) -> FaceMonitorConfig {
        FaceMonitorConfig {
            sample_interval: self.sample_interval,
            model_uri: self.model_uri.clone(),
        }
    }
}

fn parse_duration(key: &str, value: &str) -> ProctorResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ProctorError::InvalidConfig(format!("{}={:?}: {}", key, value, e)))
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
