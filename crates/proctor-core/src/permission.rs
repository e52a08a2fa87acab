//! Device permission snapshots
//!
//! Permission state is polled (or pushed, where the host supports change
//! notifications) and always reflects the most recent observation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capture device guarded by a platform permission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Camera, DeviceKind::Microphone];

    /// Platform permission name
    pub fn permission_name(self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.permission_name())
    }
}

/// Grant state reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not decided yet
    #[default]
    Prompt,
}

impl PermissionStatus {
    #[inline]
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }

    /// Parse a platform state string; anything unknown is treated as denied
    pub fn from_platform(state: &str) -> Self {
        match state {
            "granted" => PermissionStatus::Granted,
            "prompt" => PermissionStatus::Prompt,
            _ => PermissionStatus::Denied,
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Prompt => "prompt",
        };
        f.write_str(s)
    }
}

/// Camera + microphone permission snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionState {
    pub camera: PermissionStatus,
    pub microphone: PermissionStatus,
}

impl PermissionState {
    pub fn new(camera: PermissionStatus, microphone: PermissionStatus) -> Self {
        PermissionState { camera, microphone }
    }

    /// Both devices granted
    pub fn all_granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn get(&self, kind: DeviceKind) -> PermissionStatus {
        match kind {
            DeviceKind::Camera => self.camera,
            DeviceKind::Microphone => self.microphone,
        }
    }

    pub fn set(&mut self, kind: DeviceKind, status: PermissionStatus) {
        match kind {
            DeviceKind::Camera => self.camera = status,
            DeviceKind::Microphone => self.microphone = status,
        }
    }

    /// A capture session may exist only while this holds
    #[inline]
    pub fn both_granted(&self) -> bool {
        self.camera.is_granted() && self.microphone.is_granted()
    }

    /// Devices granted in `previous` but no longer granted in `self`
    pub fn revoked_since(&self, previous: &PermissionState) -> Vec<DeviceKind> {
        DeviceKind::ALL
            .into_iter()
            .filter(|kind| previous.get(*kind).is_granted() && !self.get(*kind).is_granted())
            .collect()
    }

    /// Devices that are currently not granted
    pub fn missing(&self) -> Vec<DeviceKind> {
        DeviceKind::ALL
            .into_iter()
            .filter(|kind| !self.get(*kind).is_granted())
            .collect()
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera={} microphone={}", self.camera, self.microphone)
    }
}
