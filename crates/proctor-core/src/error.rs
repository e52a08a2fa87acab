//! Error types for exam supervision
//!
//! Nothing here is fatal to the host process: every failure degrades
//! supervision capability instead of aborting the exam flow.

use thiserror::Error;

use crate::{DeviceKind, SupervisorState};

/// Why a media stream could not be acquired
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    #[error("Permission revoked during acquisition")]
    PermissionRevoked,

    #[error("No capture device present")]
    NoDevice,

    #[error("Acquisition cancelled")]
    Cancelled,

    #[error("Acquisition failed: {0}")]
    Other(String),
}

/// Core supervision errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProctorError {
    // Permission errors
    #[error("Permission denied for {device}: {reason}")]
    PermissionDenied { device: DeviceKind, reason: String },

    // Device errors
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisitionFailed(#[from] AcquisitionError),

    // Detection errors
    #[error("Face model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("Detection sample failed: {0}")]
    TransientSampleFailure(String),

    // Lifecycle errors
    #[error("Operation not allowed in state {0}")]
    InvalidState(SupervisorState),

    #[error("Supervisor terminated")]
    Terminated,

    #[error("Supervisor channel closed")]
    ChannelClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProctorError {
    /// Can the exam flow continue after this error?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProctorError::Terminated | ProctorError::ChannelClosed)
    }

    pub fn permission_denied(device: DeviceKind, reason: impl Into<String>) -> Self {
        ProctorError::PermissionDenied {
            device,
            reason: reason.into(),
        }
    }
}

/// Result type for supervision operations
pub type ProctorResult<T> = Result<T, ProctorError>;
