//! Scenario harness
//!
//! Wires a supervisor to the simulated host. Meant for paused-clock tokio
//! tests: `settle` and `advance` move virtual time.

use std::sync::Arc;
use std::time::Duration;

use proctor_core::{ProctorResult, SupervisorState};
use proctor_runtime::{HostPlatform, ProctoringSupervisor, SupervisorConfig, SupervisorHandle};

use crate::{RecordingHost, RecordingSink, RecordingSurface, ScriptedDetector, SimulatedPlatform};

/// Supervisor plus every simulated collaborator
pub struct Harness {
    pub platform: Arc<SimulatedPlatform>,
    pub detector: Arc<ScriptedDetector>,
    pub sink: Arc<RecordingSink>,
    pub surface: Arc<RecordingSurface>,
    pub host: Arc<RecordingHost>,
    pub handle: SupervisorHandle,
    pub config: SupervisorConfig,
}

impl Harness {
    /// Spawn with default configuration, still `Idle`
    pub fn new() -> ProctorResult<Self> {
        Self::with_parts(SupervisorConfig::default(), SimulatedPlatform::new(), ScriptedDetector::default())
    }

    pub fn with_config(config: SupervisorConfig) -> ProctorResult<Self> {
        Self::with_parts(config, SimulatedPlatform::new(), ScriptedDetector::default())
    }

    pub fn with_parts(
        config: SupervisorConfig,
        platform: SimulatedPlatform,
        detector: ScriptedDetector,
    ) -> ProctorResult<Self> {
        let platform = Arc::new(platform);
        let detector = Arc::new(detector);
        let sink = Arc::new(RecordingSink::default());
        let surface = Arc::new(RecordingSurface::new());
        let host = Arc::new(RecordingHost::new());

        let handle = ProctoringSupervisor::spawn(
            HostPlatform {
                permissions: platform.clone(),
                devices: platform.clone(),
                detector: detector.clone(),
                sink: sink.clone(),
                surface: Some(surface.clone()),
                host: host.clone(),
            },
            config.clone(),
        )?;

        Ok(Harness {
            platform,
            detector,
            sink,
            surface,
            host,
            handle,
            config,
        })
    }

    /// Spawn and start; the first permission poll has completed on return
    pub async fn started() -> ProctorResult<Self> {
        let harness = Self::new()?;
        harness.handle.start().await?;
        harness.settle().await;
        Ok(harness)
    }

    /// Grant both permissions and wait for the next poll to pick it up
    pub async fn activate(&self) -> ProctorResult<()> {
        self.platform.grant_all();
        self.poll().await;
        match self.handle.state() {
            SupervisorState::Active => Ok(()),
            state => Err(proctor_core::ProctorError::InvalidState(state)),
        }
    }

    /// Let queued work run without crossing a poll boundary
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    /// One permission poll interval, plus settling
    pub async fn poll(&self) {
        self.advance(self.config.permission_poll_interval).await;
    }

    /// One sampling interval, plus settling
    pub async fn tick(&self) {
        self.advance(self.config.sample_interval).await;
    }

    pub async fn ticks(&self, count: u32) {
        for _ in 0..count {
            self.tick().await;
        }
    }

    pub async fn advance(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
        self.settle().await;
    }

    pub fn state(&self) -> SupervisorState {
        self.handle.state()
    }
}
