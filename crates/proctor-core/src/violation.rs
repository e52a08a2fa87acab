//! Violation events
//!
//! Violations are advisory: they are forwarded to the host once and then
//! discarded. They never change the supervision state by themselves.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceKind, SessionGeneration};

/// What went wrong on a tick or in the capture pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    NoFaceDetected,
    MultipleFacesDetected,
    PermissionRevoked,
    StreamAcquisitionFailed,
}

impl ViolationKind {
    /// Face-presence violations come from sampling; the rest from devices
    pub fn is_face_presence(self) -> bool {
        matches!(
            self,
            ViolationKind::NoFaceDetected | ViolationKind::MultipleFacesDetected
        )
    }

    /// Default human-readable message
    pub fn message(self) -> &'static str {
        match self {
            ViolationKind::NoFaceDetected => "No face detected in the video stream",
            ViolationKind::MultipleFacesDetected => {
                "More than one face detected in the video stream"
            }
            ViolationKind::PermissionRevoked => "Device permission revoked",
            ViolationKind::StreamAcquisitionFailed => "Could not access the camera",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One advisory signal delivered to the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    pub detail: String,
    /// Capture generation the event was raised against (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<SessionGeneration>,
}

impl ViolationEvent {
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        ViolationEvent {
            kind,
            timestamp: Utc::now(),
            detail: detail.into(),
            generation: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn for_generation(mut self, generation: SessionGeneration) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Face count of a sample was zero
    pub fn no_face(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            ViolationKind::NoFaceDetected,
            ViolationKind::NoFaceDetected.message(),
        )
        .at(timestamp)
    }

    /// Face count of a sample exceeded one
    pub fn multiple_faces(timestamp: DateTime<Utc>, count: usize) -> Self {
        Self::new(
            ViolationKind::MultipleFacesDetected,
            format!("{} faces detected in the video stream", count),
        )
        .at(timestamp)
    }

    pub fn permission_revoked(device: DeviceKind) -> Self {
        Self::new(
            ViolationKind::PermissionRevoked,
            format!("{} permission revoked", device),
        )
    }

    pub fn stream_failed(detail: impl Into<String>) -> Self {
        Self::new(ViolationKind::StreamAcquisitionFailed, detail)
    }
}

impl fmt::Display for ViolationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.detail)
    }
}
