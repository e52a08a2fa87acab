//! Proctoring Supervisor - one state machine for the whole exam attempt
//!
//! The supervisor is an actor: a single spawned task owns the permission
//! monitor subscription, the capture session and the face presence monitor,
//! and is the only writer of `SupervisorState`. Everything else talks to it
//! through a `SupervisorHandle`.
//!
//! - Commands (start, recover, teardown, ...) arrive on a bounded queue
//! - Permission snapshots and monitor events arrive on an internal queue, in
//!   the order they happened
//! - State is published on a `watch` channel, violations on a `broadcast`
//!
//! Stream acquisition runs in its own task and reports back as an event, so
//! permission changes and commands are still handled while a device is
//! being opened.
//!
//! Every capture session carries a `SessionGeneration`, advanced on each
//! acquisition and on each stream failure. Acquisition results and monitor
//! events for a generation that is no longer current are discarded, so a
//! revocation processed before a late sample always wins.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use proctor_core::{
    AcquisitionError, DegradedCause, DeviceKind, MediaConstraints, PermissionState, ProctorError,
    ProctorResult, SessionGeneration, StreamId, SupervisorState, ViolationEvent,
};
use proctor_media::{CaptureSession, MediaDevices, PermissionMonitor, PermissionPlatform, VideoSink};
use proctor_vision::{DrawingSurface, FaceDetector, FacePresenceMonitor, MonitorEvent, MonitorStats};

use crate::{next_state, RevocationAction, SupervisorConfig, Trigger};

/// Where the host should send the candidate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    /// The start screen of the exam flow
    Start,
}

/// Why the attempt ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownReason {
    ExamSubmitted,
    /// The host is already navigating elsewhere
    NavigatedAway,
    UserLeft,
    PermissionLost,
}

impl TeardownReason {
    pub fn navigation(self) -> Option<NavigationTarget> {
        match self {
            TeardownReason::ExamSubmitted | TeardownReason::PermissionLost => {
                Some(NavigationTarget::Start)
            }
            TeardownReason::NavigatedAway | TeardownReason::UserLeft => None,
        }
    }
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeardownReason::ExamSubmitted => "exam_submitted",
            TeardownReason::NavigatedAway => "navigated_away",
            TeardownReason::UserLeft => "user_left",
            TeardownReason::PermissionLost => "permission_lost",
        };
        f.write_str(s)
    }
}

/// Host callbacks. Called from the supervisor task; must not block.
pub trait SupervisorHost: Send + Sync {
    fn on_violation(&self, _violation: &ViolationEvent) {}

    fn on_state_change(&self, _state: SupervisorState) {}

    fn navigate(&self, _target: NavigationTarget) {}
}

/// Host that ignores every callback
pub struct NoopHost;

impl SupervisorHost for NoopHost {}

/// Capabilities handed in by the embedding application
#[derive(Clone)]
pub struct HostPlatform {
    pub permissions: Arc<dyn PermissionPlatform>,
    pub devices: Arc<dyn MediaDevices>,
    pub detector: Arc<dyn FaceDetector>,
    /// Rendering sink for the supervised stream
    pub sink: Arc<dyn VideoSink>,
    /// Optional overlay surface
    pub surface: Option<Arc<dyn DrawingSurface>>,
    pub host: Arc<dyn SupervisorHost>,
}

/// Supervisor counters
#[derive(Clone, Debug, Default, Serialize)]
pub struct SupervisorStats {
    pub transitions: u64,
    pub permission_changes: u64,
    pub violations: u64,
    pub samples: u64,
    /// Monitor events for a session that was no longer current
    pub stale_samples: u64,
    pub acquisitions: u64,
    pub acquisition_failures: u64,
    pub model_load_failures: u64,
}

type Reply<T> = oneshot::Sender<ProctorResult<T>>;

enum Command {
    Start(Reply<()>),
    Recover(Reply<SupervisorState>),
    Leave(Reply<()>),
    Teardown(TeardownReason, Reply<()>),
    Bind(Arc<dyn VideoSink>, Reply<()>),
    SinkError(String),
}

enum Event {
    Permissions(PermissionState),
    Monitor(SessionGeneration, MonitorEvent),
    Acquired(SessionGeneration, CaptureSession, Result<StreamId, AcquisitionError>),
}

/// Stream acquisition running off the supervisor task
struct PendingAcquisition {
    generation: SessionGeneration,
    task: JoinHandle<()>,
    /// `recover()` caller waiting on the outcome
    reply: Option<Reply<SupervisorState>>,
}

/// Read-mostly view of the supervisor for handles
#[derive(Default)]
struct SharedView {
    permissions: PermissionState,
    degraded: Option<DegradedCause>,
    generation: SessionGeneration,
    stream: Option<StreamId>,
    acquiring: bool,
    bound: bool,
    stats: SupervisorStats,
    monitor: MonitorStats,
}

/// Proctoring supervisor task
pub struct ProctoringSupervisor {
    config: SupervisorConfig,
    platform: HostPlatform,
    permissions: Arc<PermissionMonitor>,
    monitor: FacePresenceMonitor,
    capture: Option<CaptureSession>,
    pending: Option<PendingAcquisition>,
    generation: SessionGeneration,
    snapshot: PermissionState,
    degraded: Option<DegradedCause>,
    stats: SupervisorStats,
    state_tx: watch::Sender<SupervisorState>,
    violations: broadcast::Sender<ViolationEvent>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    shared: Arc<Mutex<SharedView>>,
}

impl ProctoringSupervisor {
    /// Spawn a supervisor in `Idle` and return its handle.
    ///
    /// Create one per exam attempt and share the handle across screens.
    pub fn spawn(platform: HostPlatform, config: SupervisorConfig) -> ProctorResult<SupervisorHandle> {
        config.validate()?;

        let (command_tx, commands) = mpsc::channel(config.command_buffer);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);
        let (violations, _) = broadcast::channel(config.violation_buffer);
        let shared = Arc::new(Mutex::new(SharedView::default()));

        let permissions = Arc::new(PermissionMonitor::with_config(
            Arc::clone(&platform.permissions),
            Arc::clone(&platform.devices),
            config.permission_monitor(),
        ));
        let monitor = fresh_monitor(&config, &platform);

        let handle = SupervisorHandle {
            commands: command_tx,
            state: state_rx,
            violations: violations.clone(),
            permissions: Arc::clone(&permissions),
            shared: Arc::clone(&shared),
        };

        let supervisor = ProctoringSupervisor {
            config,
            platform,
            permissions,
            monitor,
            capture: None,
            pending: None,
            generation: SessionGeneration::ZERO,
            snapshot: PermissionState::default(),
            degraded: None,
            stats: SupervisorStats::default(),
            state_tx,
            violations,
            commands,
            events_tx,
            events,
            shared,
        };

        tokio::spawn(supervisor.run());
        Ok(handle)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Every handle dropped: nobody is left to supervise for
                    None => self.terminate(Trigger::Teardown, TeardownReason::NavigatedAway),
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }

            self.sync_view();
            if self.state().is_terminal() {
                break;
            }
        }
        tracing::debug!("supervisor task finished");
    }

    fn state(&self) -> SupervisorState {
        *self.state_tx.borrow()
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = if self.apply(Trigger::Start) {
                    let events = self.events_tx.clone();
                    self.permissions.start(move |snapshot| {
                        let _ = events.send(Event::Permissions(snapshot));
                    });
                    Ok(())
                } else {
                    Err(ProctorError::InvalidState(self.state()))
                };
                self.respond(reply, result);
            }
            Command::Recover(reply) => self.recover(reply),
            Command::Leave(reply) => {
                let state = self.state();
                let result = if state == SupervisorState::AwaitingPermissions {
                    self.terminate(Trigger::UserLeft, TeardownReason::UserLeft);
                    Ok(())
                } else {
                    Err(ProctorError::InvalidState(state))
                };
                self.respond(reply, result);
            }
            Command::Teardown(reason, reply) => {
                self.terminate(Trigger::Teardown, reason);
                self.respond(reply, Ok(()));
            }
            Command::Bind(sink, reply) => {
                let result = self.rebind(sink);
                self.respond(reply, result);
            }
            Command::SinkError(detail) => self.on_sink_error(detail),
        }
    }

    /// Replies go out after the view is current
    fn respond<T>(&self, reply: Reply<T>, result: ProctorResult<T>) {
        self.sync_view();
        let _ = reply.send(result);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Permissions(snapshot) => self.on_permissions(snapshot),
            Event::Monitor(generation, event) => self.on_monitor(generation, event),
            Event::Acquired(generation, capture, result) => self.on_acquired(generation, capture, result),
        }
    }

    /// Move along the transition table. Returns whether the state changed.
    fn apply(&mut self, trigger: Trigger) -> bool {
        let from = self.state();
        match next_state(from, trigger, &self.config.revocation) {
            Some(to) => {
                self.set_state(from, to, trigger);
                true
            }
            None => false,
        }
    }

    fn set_state(&mut self, from: SupervisorState, to: SupervisorState, trigger: Trigger) {
        self.state_tx.send_replace(to);
        self.stats.transitions += 1;
        tracing::info!(%from, state = %to, %trigger, generation = %self.generation, "supervisor transition");
        self.platform.host.on_state_change(to);
    }

    fn on_permissions(&mut self, next: PermissionState) {
        let previous = std::mem::replace(&mut self.snapshot, next);
        self.stats.permission_changes += 1;
        tracing::debug!(permissions = %next, "permission snapshot");

        match self.state() {
            SupervisorState::Idle | SupervisorState::Terminated => {}
            SupervisorState::AwaitingPermissions => {
                if next.both_granted() {
                    self.activate();
                } else {
                    self.on_revoked(next.revoked_since(&previous));
                }
            }
            SupervisorState::Active | SupervisorState::Degraded => {
                self.on_revoked(next.missing());
            }
        }
    }

    fn on_revoked(&mut self, devices: Vec<DeviceKind>) {
        if devices.is_empty() {
            return;
        }

        for device in &devices {
            let violation = ViolationEvent::permission_revoked(*device).for_generation(self.generation);
            self.forward(violation);
        }

        let policy = self.config.revocation;
        let action = devices
            .iter()
            .map(|device| policy.action_for(*device))
            .fold(RevocationAction::Suspend, RevocationAction::stricter);
        let trigger = match devices.iter().find(|device| policy.action_for(**device) == action) {
            Some(DeviceKind::Microphone) => Trigger::MicrophoneRevoked,
            _ => Trigger::CameraRevoked,
        };

        let from = self.state();
        match next_state(from, trigger, &policy) {
            Some(SupervisorState::Terminated) => self.terminate(trigger, TeardownReason::PermissionLost),
            Some(to) => {
                self.release_capture();
                self.set_state(from, to, trigger);
            }
            None => {}
        }
    }

    /// Both permissions granted: create the session and start acquiring
    fn activate(&mut self) {
        if self.apply(Trigger::PermissionsGranted) {
            self.begin_acquisition(None);
        }
    }

    /// Open the supervised stream under a new generation, off the
    /// supervisor task. The outcome arrives as `Event::Acquired`.
    fn begin_acquisition(&mut self, reply: Option<Reply<SupervisorState>>) {
        self.cancel_acquisition();
        self.generation = self.generation.next();
        let generation = self.generation;

        let mut capture = CaptureSession::new(Arc::clone(&self.platform.devices), generation);
        let sink = Arc::clone(&self.platform.sink);
        let events = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = match capture.bind(sink) {
                Ok(()) => capture.acquire(MediaConstraints::VIDEO).await,
                Err(err) => Err(err),
            };
            let _ = events.send(Event::Acquired(generation, capture, result));
        });

        tracing::debug!(%generation, "acquiring capture stream");
        self.pending = Some(PendingAcquisition {
            generation,
            task,
            reply,
        });
    }

    fn cancel_acquisition(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        // Dropping the unfinished future stops any stream it opened
        pending.task.abort();
        tracing::debug!(generation = %pending.generation, "acquisition cancelled");
        if let Some(reply) = pending.reply {
            let _ = reply.send(Err(ProctorError::DeviceAcquisitionFailed(AcquisitionError::Cancelled)));
        }
    }

    fn on_acquired(
        &mut self,
        generation: SessionGeneration,
        mut capture: CaptureSession,
        result: Result<StreamId, AcquisitionError>,
    ) {
        let pending = match self.pending.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.pending = other;
                tracing::debug!(%generation, "discarding stale acquisition");
                capture.release();
                return;
            }
        };

        // The host may have swapped sinks while the device was opening
        let result = result.and_then(|id| {
            let current = Arc::clone(&self.platform.sink);
            match capture.sink() {
                Some(bound) if Arc::ptr_eq(&bound, &current) => Ok(id),
                _ => capture.bind(current).map(|()| id),
            }
        });
        self.capture = Some(capture);

        match (result, pending.reply) {
            (Ok(id), reply) => {
                self.stats.acquisitions += 1;
                tracing::info!(%generation, stream = %id, "capture session active");
                match reply {
                    Some(reply) => {
                        let state = self.finish_recovery();
                        self.respond(reply, Ok(state));
                    }
                    None => self.arm_monitor(),
                }
            }
            (Err(err), reply) => {
                self.stream_failed(err.to_string());
                if let Some(reply) = reply {
                    self.respond(reply, Err(ProctorError::DeviceAcquisitionFailed(err)));
                }
            }
        }
    }

    fn arm_monitor(&mut self) {
        let Some(source) = self.capture.as_ref().and_then(|capture| capture.sink()) else {
            return;
        };

        let events = self.events_tx.clone();
        let armed = self.monitor.arm(self.generation, source, move |generation, event| {
            let _ = events.send(Event::Monitor(generation, event));
        });

        if let Err(err) = armed {
            self.degrade(DegradedCause::DetectionUnavailable(format!(
                "detection unavailable: {}",
                err
            )));
        }
    }

    fn on_monitor(&mut self, generation: SessionGeneration, event: MonitorEvent) {
        let current = self.capture.is_some()
            && self.state().has_capture()
            && generation == self.generation
            && self.monitor.is_armed();
        if !current {
            self.stats.stale_samples += 1;
            tracing::debug!(%generation, current = %self.generation, "discarding stale monitor event");
            return;
        }

        match event {
            MonitorEvent::Armed => {
                tracing::debug!(%generation, "face presence monitor armed");
            }
            MonitorEvent::Sample { sample, violation } => {
                self.stats.samples += 1;
                tracing::debug!(%generation, face_count = sample.face_count, "detection sample");
                if let Some(violation) = violation {
                    self.forward(violation);
                }
            }
            MonitorEvent::ModelLoadFailed(reason) => {
                self.stats.model_load_failures += 1;
                tracing::warn!(%generation, error = %reason, "face detection unavailable");
                // Video stays bound; only detection is lost
                self.degrade(DegradedCause::DetectionUnavailable(format!(
                    "detection unavailable: {}",
                    reason
                )));
            }
        }
    }

    fn on_sink_error(&mut self, detail: String) {
        if !self.state().has_capture() {
            tracing::debug!(%detail, "sink error outside a capture session ignored");
            return;
        }
        self.drop_stream(format!("video sink error: {}", detail));
    }

    fn rebind(&mut self, sink: Arc<dyn VideoSink>) -> ProctorResult<()> {
        self.platform.sink = Arc::clone(&sink);
        let Some(capture) = self.capture.as_mut() else {
            return Ok(());
        };
        if let Err(err) = capture.bind(sink) {
            self.drop_stream(format!("video sink error: {}", err));
            return Err(ProctorError::DeviceAcquisitionFailed(err));
        }
        if self.monitor.is_armed() {
            self.arm_monitor();
        }
        Ok(())
    }

    /// The stream can no longer be rendered: release it and degrade
    fn drop_stream(&mut self, detail: String) {
        self.monitor.disarm();
        if let Some(capture) = self.capture.as_mut() {
            capture.release();
        }
        self.stream_failed(detail);
    }

    fn recover(&mut self, reply: Reply<SupervisorState>) {
        let state = self.state();
        if state != SupervisorState::Degraded || self.pending.is_some() {
            self.respond(reply, Err(ProctorError::InvalidState(state)));
            return;
        }

        if self.monitor.is_failed() {
            tracing::info!(generation = %self.generation, "replacing failed face presence monitor");
            self.monitor = fresh_monitor(&self.config, &self.platform);
        }

        let stream_lost = matches!(self.degraded, Some(DegradedCause::StreamUnavailable(_)));
        let usable = self
            .capture
            .as_ref()
            .map(|capture| capture.is_live() && capture.is_bound())
            .unwrap_or(false);

        if stream_lost || !usable {
            self.monitor.disarm();
            if let Some(mut capture) = self.capture.take() {
                capture.release();
            }
            // Answered from on_acquired
            self.begin_acquisition(Some(reply));
            return;
        }

        let state = self.finish_recovery();
        self.respond(reply, Ok(state));
    }

    fn finish_recovery(&mut self) -> SupervisorState {
        self.degraded = None;
        self.apply(Trigger::Recovered);
        self.arm_monitor();
        self.state()
    }

    fn stream_failed(&mut self, detail: String) {
        self.stats.acquisition_failures += 1;
        tracing::warn!(generation = %self.generation, error = %detail, "stream unavailable");
        let violation = ViolationEvent::stream_failed(detail.clone()).for_generation(self.generation);
        self.forward(violation);
        self.monitor.disarm();
        // Anything still queued for the failed stream is stale
        self.generation = self.generation.next();
        self.degrade(DegradedCause::StreamUnavailable(detail));
    }

    fn degrade(&mut self, cause: DegradedCause) {
        self.degraded = Some(cause);
        self.apply(Trigger::AcquisitionFailed);
    }

    fn forward(&mut self, violation: ViolationEvent) {
        self.stats.violations += 1;
        tracing::warn!(kind = %violation.kind, detail = %violation.detail, "violation");
        // No subscribers is fine
        let _ = self.violations.send(violation.clone());
        self.platform.host.on_violation(&violation);
    }

    fn release_capture(&mut self) {
        self.cancel_acquisition();
        self.monitor.disarm();
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
        self.degraded = None;
    }

    fn terminate(&mut self, trigger: Trigger, reason: TeardownReason) {
        let from = self.state();
        if from.is_terminal() {
            return;
        }

        self.permissions.stop();
        self.release_capture();
        self.set_state(from, SupervisorState::Terminated, trigger);
        tracing::info!(%reason, "supervision ended");

        if let Some(target) = reason.navigation() {
            self.platform.host.navigate(target);
        }
    }

    fn sync_view(&self) {
        let mut view = self.shared.lock();
        view.permissions = self.snapshot;
        view.degraded = self.degraded.clone();
        view.generation = self.generation;
        view.stream = self.capture.as_ref().and_then(|capture| capture.stream_id());
        view.acquiring = self.pending.is_some();
        view.bound = self.capture.as_ref().map(|capture| capture.is_bound()).unwrap_or(false);
        view.stats = self.stats.clone();
        view.monitor = self.monitor.stats();
    }
}

fn fresh_monitor(config: &SupervisorConfig, platform: &HostPlatform) -> FacePresenceMonitor {
    let monitor = FacePresenceMonitor::with_config(Arc::clone(&platform.detector), config.face_monitor());
    match (&platform.surface, config.overlay) {
        (Some(surface), true) => monitor.with_overlay(Arc::clone(surface)),
        _ => monitor,
    }
}

/// Cloneable handle to a running supervisor
#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SupervisorState>,
    violations: broadcast::Sender<ViolationEvent>,
    permissions: Arc<PermissionMonitor>,
    shared: Arc<Mutex<SharedView>>,
}

impl SupervisorHandle {
    /// Idle → AwaitingPermissions; starts permission monitoring
    pub async fn start(&self) -> ProctorResult<()> {
        self.call(Command::Start).await
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver of every state change
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Wait until the supervisor reaches `target`
    pub async fn wait_for(&self, target: SupervisorState) -> ProctorResult<()> {
        let mut state = self.state.clone();
        let reached = state.wait_for(|state| *state == target).await.is_ok();
        if reached {
            Ok(())
        } else if self.state().is_terminal() {
            Err(ProctorError::Terminated)
        } else {
            Err(ProctorError::ChannelClosed)
        }
    }

    /// Violation stream for alerting and audit
    pub fn violations(&self) -> broadcast::Receiver<ViolationEvent> {
        self.violations.subscribe()
    }

    pub async fn request_camera(&self) -> ProctorResult<()> {
        self.ensure_running()?;
        self.permissions.request_camera().await
    }

    pub async fn request_microphone(&self) -> ProctorResult<()> {
        self.ensure_running()?;
        self.permissions.request_microphone().await
    }

    /// Is prompting for `device` meaningful right now?
    pub fn can_request(&self, device: DeviceKind) -> bool {
        !self.state().is_terminal() && self.permissions.can_request(device)
    }

    /// Rejection reason of the last request for `device`
    pub fn permission_error(&self, device: DeviceKind) -> Option<String> {
        self.permissions.last_error(device)
    }

    /// Degraded → Active, re-acquiring and re-arming as needed
    pub async fn recover(&self) -> ProctorResult<SupervisorState> {
        self.call(Command::Recover).await
    }

    /// Candidate leaves before supervision began
    pub async fn leave(&self) -> ProctorResult<()> {
        self.call(Command::Leave).await
    }

    /// End the attempt. The supervisor cannot be restarted afterwards.
    pub async fn teardown(&self, reason: TeardownReason) -> ProctorResult<()> {
        self.call(|reply| Command::Teardown(reason, reply)).await
    }

    /// Swap the rendering sink without re-acquiring the stream.
    /// A sink that rejects the live stream degrades supervision.
    pub async fn bind_sink(&self, sink: Arc<dyn VideoSink>) -> ProctorResult<()> {
        self.call(|reply| Command::Bind(sink, reply)).await
    }

    /// The rendering sink failed
    pub async fn report_sink_error(&self, detail: impl Into<String>) -> ProctorResult<()> {
        self.ensure_running()?;
        self.commands
            .send(Command::SinkError(detail.into()))
            .await
            .map_err(|_| self.closed())
    }

    pub fn permissions(&self) -> PermissionState {
        self.shared.lock().permissions
    }

    pub fn degraded_cause(&self) -> Option<DegradedCause> {
        self.shared.lock().degraded.clone()
    }

    /// Generation of the current or last capture session
    pub fn generation(&self) -> SessionGeneration {
        self.shared.lock().generation
    }

    /// Supervised stream, if one is live
    pub fn stream_id(&self) -> Option<StreamId> {
        self.shared.lock().stream.clone()
    }

    /// Is a stream being opened right now?
    pub fn is_acquiring(&self) -> bool {
        self.shared.lock().acquiring
    }

    /// Is the supervised stream rendered by the sink?
    pub fn is_bound(&self) -> bool {
        self.shared.lock().bound
    }

    pub fn stats(&self) -> SupervisorStats {
        self.shared.lock().stats.clone()
    }

    /// Face monitor counters as of the last event the supervisor processed
    pub fn monitor_stats(&self) -> MonitorStats {
        self.shared.lock().monitor.clone()
    }

    fn ensure_running(&self) -> ProctorResult<()> {
        if self.state().is_terminal() {
            Err(ProctorError::Terminated)
        } else {
            Ok(())
        }
    }

    fn closed(&self) -> ProctorError {
        if self.state().is_terminal() {
            ProctorError::Terminated
        } else {
            ProctorError::ChannelClosed
        }
    }

    async fn call<T, F>(&self, command: F) -> ProctorResult<T>
    where
        F: FnOnce(Reply<T>) -> Command,
    {
        self.ensure_running()?;
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())?
    }
}

impl fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
