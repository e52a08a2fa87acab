//! Supervision lifecycle states
//!
//! `Idle → AwaitingPermissions → Active ⇄ Degraded → Terminated`
//!
//! The supervisor is the only writer of this state. Everything else reads it
//! (the host gates exam content on it) or proposes transitions via events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Single source of truth for supervision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Created, not started
    #[default]
    Idle,
    /// Waiting for both camera and microphone to be granted
    AwaitingPermissions,
    /// Stream live and face monitoring running
    Active,
    /// Exam continues, but stream or detection is partly unavailable
    Degraded,
    /// Absorbing: every resource released, no callbacks fire
    Terminated,
}

impl SupervisorState {
    /// A capture session exists iff the state is Active or Degraded
    #[inline]
    pub fn has_capture(self) -> bool {
        matches!(self, SupervisorState::Active | SupervisorState::Degraded)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, SupervisorState::Terminated)
    }

    /// Can the host show exam content in this state?
    pub fn allows_exam(self) -> bool {
        self.has_capture()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::AwaitingPermissions => "awaiting_permissions",
            SupervisorState::Active => "active",
            SupervisorState::Degraded => "degraded",
            SupervisorState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why supervision is degraded
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum DegradedCause {
    /// No live stream: acquisition failed or the sink errored
    StreamUnavailable(String),
    /// Stream is live but face detection could not start
    DetectionUnavailable(String),
}

impl DegradedCause {
    pub fn detail(&self) -> &str {
        match self {
            DegradedCause::StreamUnavailable(detail) => detail,
            DegradedCause::DetectionUnavailable(detail) => detail,
        }
    }
}
