//! Simulated host platform
//!
//! Permissions, devices, the rendering sink and the overlay surface of a
//! browser-like host, all driven from test code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use proctor_core::{
    AcquisitionError, Detection, DeviceKind, FrameSize, MediaConstraints, PermissionState, PermissionStatus,
    StreamId,
};
use proctor_media::{
    MediaDevices, MediaStream, PermissionChange, PermissionChangeReceiver, PermissionPlatform, VideoSink,
};
use proctor_vision::DrawingSurface;

/// Stream handed out by the simulated devices
pub struct SimulatedStream {
    id: StreamId,
    constraints: MediaConstraints,
    live: Arc<AtomicBool>,
}

impl MediaStream for SimulatedStream {
    fn id(&self) -> StreamId {
        self.id.clone()
    }

    fn constraints(&self) -> MediaConstraints {
        self.constraints
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

struct IssuedStream {
    constraints: MediaConstraints,
    live: Arc<AtomicBool>,
}

struct SimState {
    permissions: PermissionState,
    /// Answer given when a request hits a `prompt` permission
    accept_prompts: bool,
    failing_queries: bool,
    acquisition_failure: Option<AcquisitionError>,
    acquire_delay: Option<Duration>,
    push_changes: bool,
    feed: Option<mpsc::UnboundedSender<PermissionChange>>,
    issued: Vec<IssuedStream>,
    queries: u64,
}

/// Browser-like permission and device host
pub struct SimulatedPlatform {
    state: Mutex<SimState>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        SimulatedPlatform {
            state: Mutex::new(SimState {
                permissions: PermissionState::default(),
                accept_prompts: true,
                failing_queries: false,
                acquisition_failure: None,
                acquire_delay: None,
                push_changes: false,
                feed: None,
                issued: Vec::new(),
                queries: 0,
            }),
        }
    }
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer permission change notifications to subscribers
    pub fn with_change_feed(self) -> Self {
        self.state.lock().push_changes = true;
        self
    }

    pub fn permissions(&self) -> PermissionState {
        self.state.lock().permissions
    }

    /// Change a permission as the user would in the browser settings.
    /// Revoking ends the tracks of that device.
    pub fn set_permission(&self, device: DeviceKind, status: PermissionStatus) {
        let mut state = self.state.lock();
        state.permissions.set(device, status);

        if !status.is_granted() {
            for stream in &state.issued {
                let uses_device = match device {
                    DeviceKind::Camera => stream.constraints.video,
                    DeviceKind::Microphone => stream.constraints.audio,
                };
                if uses_device {
                    stream.live.store(false, Ordering::SeqCst);
                }
            }
        }

        if let Some(feed) = &state.feed {
            let _ = feed.send(PermissionChange { device, status });
        }
    }

    pub fn grant(&self, device: DeviceKind) {
        self.set_permission(device, PermissionStatus::Granted);
    }

    pub fn revoke(&self, device: DeviceKind) {
        self.set_permission(device, PermissionStatus::Denied);
    }

    pub fn grant_all(&self) {
        for device in DeviceKind::ALL {
            self.grant(device);
        }
    }

    /// How the simulated user answers permission prompts
    pub fn accept_prompts(&self, accept: bool) {
        self.state.lock().accept_prompts = accept;
    }

    /// Make permission queries fail (the monitor treats this as denied)
    pub fn fail_queries(&self, failing: bool) {
        self.state.lock().failing_queries = failing;
    }

    /// Make every acquisition fail with `failure`, or succeed again with `None`
    pub fn fail_acquisition(&self, failure: Option<AcquisitionError>) {
        self.state.lock().acquisition_failure = failure;
    }

    pub fn set_acquire_delay(&self, delay: Option<Duration>) {
        self.state.lock().acquire_delay = delay;
    }

    /// Streams with a video track that are still live
    pub fn live_video_streams(&self) -> usize {
        self.state
            .lock()
            .issued
            .iter()
            .filter(|stream| stream.constraints.video && stream.live.load(Ordering::SeqCst))
            .count()
    }

    pub fn live_streams(&self) -> usize {
        self.state
            .lock()
            .issued
            .iter()
            .filter(|stream| stream.live.load(Ordering::SeqCst))
            .count()
    }

    pub fn issued_streams(&self) -> usize {
        self.state.lock().issued.len()
    }

    pub fn queries(&self) -> u64 {
        self.state.lock().queries
    }

    fn check_access(&self, constraints: MediaConstraints) -> Result<(), AcquisitionError> {
        let mut state = self.state.lock();
        if let Some(failure) = state.acquisition_failure.clone() {
            return Err(failure);
        }

        let mut prompted = Vec::new();
        for device in DeviceKind::ALL {
            let requested = match device {
                DeviceKind::Camera => constraints.video,
                DeviceKind::Microphone => constraints.audio,
            };
            if !requested {
                continue;
            }
            match state.permissions.get(device) {
                PermissionStatus::Granted => {}
                PermissionStatus::Prompt if state.accept_prompts => prompted.push(device),
                _ => {
                    return Err(AcquisitionError::Other(format!(
                        "NotAllowedError: {} permission denied",
                        device
                    )))
                }
            }
        }

        for device in prompted {
            state.permissions.set(device, PermissionStatus::Granted);
            if let Some(feed) = &state.feed {
                let _ = feed.send(PermissionChange {
                    device,
                    status: PermissionStatus::Granted,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionPlatform for SimulatedPlatform {
    async fn query(&self, device: DeviceKind) -> Result<PermissionStatus, String> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.failing_queries {
            return Err("permissions query not supported".into());
        }
        Ok(state.permissions.get(device))
    }

    fn subscribe(&self) -> Option<PermissionChangeReceiver> {
        let mut state = self.state.lock();
        if !state.push_changes {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.feed = Some(tx);
        Some(rx)
    }
}

#[async_trait]
impl MediaDevices for SimulatedPlatform {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError> {
        let delay = self.state.lock().acquire_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_access(constraints)?;

        let mut state = self.state.lock();
        let id = StreamId::new(format!("sim-stream-{}", state.issued.len()));
        let live = Arc::new(AtomicBool::new(true));
        state.issued.push(IssuedStream {
            constraints,
            live: Arc::clone(&live),
        });

        Ok(Box::new(SimulatedStream {
            id,
            constraints,
            live,
        }))
    }
}

/// Video element stand-in that records what it renders
pub struct RecordingSink {
    display: FrameSize,
    frame: FrameSize,
    attached: Mutex<Option<StreamId>>,
    attaches: Mutex<u64>,
    reject: AtomicBool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(FrameSize::new(640, 480))
    }
}

impl RecordingSink {
    pub fn new(display: FrameSize) -> Self {
        RecordingSink {
            display,
            frame: display,
            attached: Mutex::new(None),
            attaches: Mutex::new(0),
            reject: AtomicBool::new(false),
        }
    }

    /// Frames arrive at a different resolution than they are displayed
    pub fn with_frame_size(mut self, frame: FrameSize) -> Self {
        self.frame = frame;
        self
    }

    pub fn reject_streams(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn attaches(&self) -> u64 {
        *self.attaches.lock()
    }
}

impl VideoSink for RecordingSink {
    fn attach(&self, stream: &dyn MediaStream) -> Result<(), String> {
        if self.reject.load(Ordering::SeqCst) {
            return Err("MEDIA_ERR_SRC_NOT_SUPPORTED".into());
        }
        *self.attached.lock() = Some(stream.id());
        *self.attaches.lock() += 1;
        Ok(())
    }

    fn detach(&self) {
        *self.attached.lock() = None;
    }

    fn attached(&self) -> Option<StreamId> {
        self.attached.lock().clone()
    }

    fn display_size(&self) -> FrameSize {
        self.display
    }

    fn frame_size(&self) -> FrameSize {
        self.frame
    }
}

#[derive(Default)]
struct SurfaceState {
    size: FrameSize,
    detections: Vec<Detection>,
    clears: u64,
    landmark_draws: u64,
}

/// Canvas stand-in that keeps what is currently drawn
#[derive(Default)]
pub struct RecordingSurface {
    state: Mutex<SurfaceState>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> FrameSize {
        self.state.lock().size
    }

    /// Detections currently on the surface
    pub fn drawn(&self) -> Vec<Detection> {
        self.state.lock().detections.clone()
    }

    pub fn clears(&self) -> u64 {
        self.state.lock().clears
    }

    pub fn landmark_draws(&self) -> u64 {
        self.state.lock().landmark_draws
    }
}

impl DrawingSurface for RecordingSurface {
    fn match_dimensions(&self, size: FrameSize) {
        self.state.lock().size = size;
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.detections.clear();
        state.clears += 1;
    }

    fn draw_detections(&self, detections: &[Detection]) {
        self.state.lock().detections.extend_from_slice(detections);
    }

    fn draw_landmarks(&self, _detections: &[Detection]) {
        self.state.lock().landmark_draws += 1;
    }
}
