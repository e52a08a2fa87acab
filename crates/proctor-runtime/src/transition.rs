//! Supervisor transition table
//!
//! Pure function of (state, trigger, policy). The supervisor performs the
//! side effects; this only decides where it goes.

use std::fmt;

use proctor_core::SupervisorState;

use crate::{RevocationAction, RevocationPolicy};

/// Something that may move the supervisor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    /// Camera and microphone both granted
    PermissionsGranted,
    CameraRevoked,
    MicrophoneRevoked,
    /// Stream acquisition, sink or model loading failed
    AcquisitionFailed,
    /// A face presence violation was forwarded
    Violation,
    /// Manual dismissal or successful recovery
    Recovered,
    /// Candidate left before supervision began
    UserLeft,
    /// Exam submitted or navigation away
    Teardown,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Target state for `trigger`, or `None` when the trigger does not move
/// the supervisor out of `state`.
pub fn next_state(
    state: SupervisorState,
    trigger: Trigger,
    policy: &RevocationPolicy,
) -> Option<SupervisorState> {
    use SupervisorState::*;

    let revoked = |action: RevocationAction| match (action, state) {
        (RevocationAction::TerminateAndNavigate, AwaitingPermissions | Active | Degraded) => {
            Some(Terminated)
        }
        (RevocationAction::Suspend, Active | Degraded) => Some(AwaitingPermissions),
        _ => None,
    };

    match (state, trigger) {
        (Terminated, _) => None,
        (_, Trigger::Teardown) => Some(Terminated),

        (Idle, Trigger::Start) => Some(AwaitingPermissions),
        (AwaitingPermissions, Trigger::PermissionsGranted) => Some(Active),
        (AwaitingPermissions, Trigger::UserLeft) => Some(Terminated),

        (_, Trigger::CameraRevoked) => revoked(policy.camera),
        (_, Trigger::MicrophoneRevoked) => revoked(policy.microphone),

        (Active, Trigger::AcquisitionFailed) => Some(Degraded),
        (Degraded, Trigger::Recovered) => Some(Active),

        _ => None,
    }
}
