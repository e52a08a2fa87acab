//! Permission flapping chaos
//!
//! Drives the simulated host with a seeded random sequence of:
//! - Permission grants and revocations
//! - Busy devices
//! - Recovery attempts
//! - Changes of the visible face count
//!
//! and checks the supervision invariants after every step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use proctor_core::{AcquisitionError, DeviceKind, SupervisorState};

use crate::Harness;

/// Chaos run configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    pub steps: u32,
    /// Probability a step flips a permission
    pub flip_prob: f64,
    /// Probability a step toggles device busy
    pub busy_prob: f64,
    /// Probability a step attempts recovery
    pub recover_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            steps: 60,
            flip_prob: 0.5,
            busy_prob: 0.1,
            recover_prob: 0.2,
        }
    }
}

impl ChaosConfig {
    /// Permissions only, devices always available
    pub fn permissions_only() -> Self {
        ChaosConfig {
            busy_prob: 0.0,
            recover_prob: 0.0,
            ..Default::default()
        }
    }
}

/// One chaos step
#[derive(Clone, Debug, PartialEq)]
pub enum ChaosAction {
    Grant(DeviceKind),
    Revoke(DeviceKind),
    DeviceBusy(bool),
    Recover,
    Faces(usize),
}

/// Seeded action generator
pub struct PermissionChaos {
    config: ChaosConfig,
    rng: StdRng,
}

impl PermissionChaos {
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        PermissionChaos {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_action(&mut self) -> ChaosAction {
        let device = if self.rng.gen_bool(0.5) {
            DeviceKind::Camera
        } else {
            DeviceKind::Microphone
        };

        let roll: f64 = self.rng.gen();
        if roll < self.config.flip_prob {
            if self.rng.gen_bool(0.5) {
                ChaosAction::Grant(device)
            } else {
                ChaosAction::Revoke(device)
            }
        } else if roll < self.config.flip_prob + self.config.busy_prob {
            ChaosAction::DeviceBusy(self.rng.gen_bool(0.5))
        } else if roll < self.config.flip_prob + self.config.busy_prob + self.config.recover_prob {
            ChaosAction::Recover
        } else {
            ChaosAction::Faces(self.rng.gen_range(0..3))
        }
    }
}

/// Outcome of a chaos run
#[derive(Clone, Debug, Default)]
pub struct ChaosReport {
    pub steps: u32,
    pub activations: u32,
    pub degradations: u32,
    pub invariant_failures: Vec<String>,
}

impl ChaosReport {
    pub fn passed(&self) -> bool {
        self.invariant_failures.is_empty()
    }
}

/// Run `chaos` against a started harness. Assumes suspend-on-revocation.
pub async fn run_chaos(harness: &Harness, chaos: &mut PermissionChaos) -> ChaosReport {
    let mut report = ChaosReport::default();

    for step in 0..chaos.config.steps {
        let action = chaos.next_action();
        match &action {
            ChaosAction::Grant(device) => harness.platform.grant(*device),
            ChaosAction::Revoke(device) => harness.platform.revoke(*device),
            ChaosAction::DeviceBusy(busy) => harness.platform.fail_acquisition(
                busy.then(|| AcquisitionError::DeviceBusy("held by another application".into())),
            ),
            ChaosAction::Recover => {
                // Outside Degraded or with a busy device this is expected to fail
                let _ = harness.handle.recover().await;
            }
            ChaosAction::Faces(faces) => harness.detector.set_faces(*faces),
        }
        harness.poll().await;

        let state = harness.state();
        match state {
            SupervisorState::Active => report.activations += 1,
            SupervisorState::Degraded => report.degradations += 1,
            _ => {}
        }

        for failure in check_invariants(harness) {
            report
                .invariant_failures
                .push(format!("step {} after {:?}: {}", step, action, failure));
        }
        report.steps += 1;
    }

    report
}

/// Supervision invariants that must hold once a poll has been processed
pub fn check_invariants(harness: &Harness) -> Vec<String> {
    let mut failures = Vec::new();
    let state = harness.state();
    let permissions = harness.platform.permissions();
    let live = harness.platform.live_video_streams();

    if live > 1 {
        failures.push(format!("{} live video streams", live));
    }
    if state.has_capture() != permissions.both_granted() {
        failures.push(format!("state {} with permissions {}", state, permissions));
    }
    if !state.has_capture() && (live != 0 || harness.handle.stream_id().is_some()) {
        failures.push(format!("stream left open in state {}", state));
    }
    if !state.has_capture() && harness.handle.is_acquiring() {
        failures.push(format!("acquisition still running in state {}", state));
    }
    if state == SupervisorState::Active && harness.handle.stream_id().is_none() {
        failures.push("active without a stream".to_string());
    }
    if state == SupervisorState::Terminated {
        failures.push("terminated by permission flapping".to_string());
    }

    failures
}
