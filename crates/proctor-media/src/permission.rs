//! Permission Monitor - camera and microphone grant tracking
//!
//! Polls the platform at a fixed interval and, where the platform offers
//! change notifications, applies pushed changes as they arrive. Polling is
//! kept as the fallback either way. The callback fires only when the
//! snapshot actually changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use proctor_core::{
    DeviceKind, MediaConstraints, PermissionState, PermissionStatus, ProctorError, ProctorResult,
};

use crate::{MediaDevices, PermissionChange, PermissionChangeReceiver, PermissionPlatform};

/// Callback fired with every new snapshot
pub type PermissionCallback = Arc<dyn Fn(PermissionState) + Send + Sync>;

/// Permission monitor configuration
#[derive(Clone, Debug)]
pub struct PermissionMonitorConfig {
    /// Polling interval
    pub poll_interval: Duration,
    /// Subscribe to platform change events when offered
    pub prefer_events: bool,
}

impl Default for PermissionMonitorConfig {
    fn default() -> Self {
        PermissionMonitorConfig {
            poll_interval: Duration::from_millis(1000),
            prefer_events: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PermissionStats {
    pub polls: u64,
    pub pushed_changes: u64,
    pub query_failures: u64,
    pub changes_reported: u64,
}

struct MonitorShared {
    snapshot: Option<PermissionState>,
    errors: HashMap<DeviceKind, String>,
    stats: PermissionStats,
}

impl MonitorShared {
    /// Record a snapshot, returning whether it changed
    fn record(&mut self, next: PermissionState) -> bool {
        let changed = self.snapshot != Some(next);
        self.snapshot = Some(next);
        changed
    }
}

/// Callback slot, present only while the monitor is running. Held for the
/// whole callback so `stop()` waits out one already in progress.
type CallbackSlot = Mutex<Option<PermissionCallback>>;

fn publish(shared: &Mutex<MonitorShared>, on_change: &CallbackSlot, next: PermissionState) {
    if !shared.lock().record(next) {
        return;
    }
    let slot = on_change.lock();
    if let Some(callback) = slot.as_ref() {
        shared.lock().stats.changes_reported += 1;
        callback(next);
    }
}

/// Camera + microphone permission monitor
pub struct PermissionMonitor {
    platform: Arc<dyn PermissionPlatform>,
    devices: Arc<dyn MediaDevices>,
    config: PermissionMonitorConfig,
    shared: Arc<Mutex<MonitorShared>>,
    on_change: Arc<CallbackSlot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PermissionMonitor {
    pub fn new(platform: Arc<dyn PermissionPlatform>, devices: Arc<dyn MediaDevices>) -> Self {
        Self::with_config(platform, devices, PermissionMonitorConfig::default())
    }

    pub fn with_config(
        platform: Arc<dyn PermissionPlatform>,
        devices: Arc<dyn MediaDevices>,
        config: PermissionMonitorConfig,
    ) -> Self {
        PermissionMonitor {
            platform,
            devices,
            config,
            shared: Arc::new(Mutex::new(MonitorShared {
                snapshot: None,
                errors: HashMap::new(),
                stats: PermissionStats::default(),
            })),
            on_change: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Begin polling. Restarts the monitor if it is already running.
    ///
    /// The first completed poll always reports its snapshot. The callback
    /// must not call back into the monitor.
    pub fn start<F>(&self, on_change: F)
    where
        F: Fn(PermissionState) + Send + Sync + 'static,
    {
        self.stop();

        self.shared.lock().snapshot = None;
        *self.on_change.lock() = Some(Arc::new(on_change));

        let platform = Arc::clone(&self.platform);
        let shared = Arc::clone(&self.shared);
        let on_change = Arc::clone(&self.on_change);
        let poll_interval = self.config.poll_interval;
        let mut changes = if self.config.prefer_events {
            platform.subscribe()
        } else {
            None
        };

        tracing::debug!(
            interval_ms = poll_interval.as_millis() as u64,
            pushed = changes.is_some(),
            "permission monitor started"
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let snapshot = poll_once(platform.as_ref(), &shared).await;
                        publish(&shared, &on_change, snapshot);
                    }
                    change = next_change(&mut changes) => match change {
                        Some(change) => apply_change(&shared, &on_change, change),
                        None => {
                            tracing::debug!("permission change feed closed, polling only");
                            changes = None;
                        }
                    },
                }
            }
        });
        *self.task.lock() = Some(task);
    }

    /// Cancel polling. No callback fires once this returns; a callback
    /// already running is waited for.
    pub fn stop(&self) {
        *self.on_change.lock() = None;
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("permission monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Prompt the platform for camera access
    pub async fn request_camera(&self) -> ProctorResult<()> {
        self.request(DeviceKind::Camera).await
    }

    /// Prompt the platform for microphone access
    pub async fn request_microphone(&self) -> ProctorResult<()> {
        self.request(DeviceKind::Microphone).await
    }

    /// Prompt the platform directly for one device.
    ///
    /// Success optimistically marks the device granted; rejection stores the
    /// reason without touching the snapshot.
    pub async fn request(&self, device: DeviceKind) -> ProctorResult<()> {
        let constraints = match device {
            DeviceKind::Camera => MediaConstraints::VIDEO,
            DeviceKind::Microphone => MediaConstraints::AUDIO,
        };

        match self.devices.get_user_media(constraints).await {
            Ok(stream) => {
                // Prompt stream only; the supervised stream is acquired separately
                stream.stop();

                let next = {
                    let mut shared = self.shared.lock();
                    shared.errors.remove(&device);
                    let mut next = shared.snapshot.unwrap_or_default();
                    next.set(device, PermissionStatus::Granted);
                    next
                };
                publish(&self.shared, &self.on_change, next);
                tracing::info!(%device, "permission granted on request");
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                self.shared.lock().errors.insert(device, reason.clone());
                tracing::warn!(%device, %reason, "permission request rejected");
                Err(ProctorError::permission_denied(device, reason))
            }
        }
    }

    /// Most recent snapshot, if any poll has completed
    pub fn snapshot(&self) -> Option<PermissionState> {
        self.shared.lock().snapshot
    }

    /// Most recent snapshot, `prompt` for anything not yet observed
    pub fn current(&self) -> PermissionState {
        self.snapshot().unwrap_or_default()
    }

    /// Rejection reason of the last request for `device`
    pub fn last_error(&self, device: DeviceKind) -> Option<String> {
        self.shared.lock().errors.get(&device).cloned()
    }

    /// A request only makes sense while the device is not granted
    pub fn can_request(&self, device: DeviceKind) -> bool {
        !self.current().get(device).is_granted()
    }

    pub fn stats(&self) -> PermissionStats {
        self.shared.lock().stats.clone()
    }
}

impl Drop for PermissionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn query_or_deny(platform: &dyn PermissionPlatform, device: DeviceKind) -> (PermissionStatus, bool) {
    match platform.query(device).await {
        Ok(status) => (status, false),
        Err(reason) => {
            tracing::debug!(%device, %reason, "permission query failed, treating as denied");
            (PermissionStatus::Denied, true)
        }
    }
}

async fn poll_once(platform: &dyn PermissionPlatform, shared: &Mutex<MonitorShared>) -> PermissionState {
    let ((camera, camera_failed), (microphone, microphone_failed)) = tokio::join!(
        query_or_deny(platform, DeviceKind::Camera),
        query_or_deny(platform, DeviceKind::Microphone),
    );

    let mut guard = shared.lock();
    guard.stats.polls += 1;
    guard.stats.query_failures += camera_failed as u64 + microphone_failed as u64;

    PermissionState::new(camera, microphone)
}

fn apply_change(shared: &Mutex<MonitorShared>, on_change: &CallbackSlot, change: PermissionChange) {
    let next = {
        let mut guard = shared.lock();
        guard.stats.pushed_changes += 1;
        let mut next = guard.snapshot.unwrap_or_default();
        next.set(change.device, change.status);
        next
    };
    publish(shared, on_change, next);
}

async fn next_change(changes: &mut Option<PermissionChangeReceiver>) -> Option<PermissionChange> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proctor_core::{AcquisitionError, StreamId};
    use tokio::sync::mpsc;

    use crate::MediaStream;

    #[derive(Default)]
    struct FakePlatform {
        state: Mutex<PermissionState>,
        failing: Mutex<bool>,
        feed: Mutex<Option<PermissionChangeReceiver>>,
    }

    #[async_trait]
    impl PermissionPlatform for FakePlatform {
        async fn query(&self, device: DeviceKind) -> Result<PermissionStatus, String> {
            if *self.failing.lock() {
                return Err("query unsupported".into());
            }
            Ok(self.state.lock().get(device))
        }

        fn subscribe(&self) -> Option<PermissionChangeReceiver> {
            self.feed.lock().take()
        }
    }

    struct PromptStream;

    impl MediaStream for PromptStream {
        fn id(&self) -> StreamId {
            StreamId::new("prompt")
        }
        fn constraints(&self) -> MediaConstraints {
            MediaConstraints::VIDEO
        }
        fn is_live(&self) -> bool {
            false
        }
        fn stop(&self) {}
    }

    struct FakeDevices {
        reject: bool,
    }

    #[async_trait]
    impl MediaDevices for FakeDevices {
        async fn get_user_media(
            &self,
            _constraints: MediaConstraints,
        ) -> Result<Box<dyn MediaStream>, AcquisitionError> {
            if self.reject {
                Err(AcquisitionError::Other("NotAllowedError".into()))
            } else {
                Ok(Box::new(PromptStream))
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<PermissionState>>>, impl Fn(PermissionState) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |state| sink.lock().push(state))
    }

    fn monitor(platform: Arc<FakePlatform>, reject: bool) -> PermissionMonitor {
        PermissionMonitor::new(platform, Arc::new(FakeDevices { reject }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_only_changes() {
        let platform = Arc::new(FakePlatform::default());
        let monitor = monitor(Arc::clone(&platform), false);
        let (seen, on_change) = recorder();

        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        // Four polls, one distinct snapshot
        assert_eq!(seen.lock().len(), 1);
        assert!(monitor.stats().polls >= 4);

        platform.state.lock().camera = PermissionStatus::Granted;
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].camera, PermissionStatus::Granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_is_denied() {
        let platform = Arc::new(FakePlatform::default());
        *platform.state.lock() = PermissionState::all_granted();
        *platform.failing.lock() = true;
        let monitor = monitor(Arc::clone(&platform), false);
        let (seen, on_change) = recorder();

        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            seen.lock()[0],
            PermissionState::new(PermissionStatus::Denied, PermissionStatus::Denied)
        );
        assert_eq!(monitor.stats().query_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_callback_after_stop() {
        let platform = Arc::new(FakePlatform::default());
        let monitor = monitor(Arc::clone(&platform), false);
        let (seen, on_change) = recorder();

        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(10)).await;
        monitor.stop();

        *platform.state.lock() = PermissionState::all_granted();
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(seen.lock().len(), 1);
        assert!(!monitor.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_running_callback() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let platform = Arc::new(FakePlatform::default());
        let monitor = PermissionMonitor::with_config(
            Arc::clone(&platform) as Arc<dyn PermissionPlatform>,
            Arc::new(FakeDevices { reject: false }),
            PermissionMonitorConfig {
                poll_interval: Duration::from_millis(20),
                prefer_events: false,
            },
        );
        let entered = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicU32::new(0));
        let (e, f) = (Arc::clone(&entered), Arc::clone(&finished));

        monitor.start(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            f.fetch_add(1, Ordering::SeqCst);
        });
        while entered.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        monitor.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        *platform.state.lock() = PermissionState::all_granted();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushed_change_applied_before_next_poll() {
        let platform = Arc::new(FakePlatform::default());
        let (tx, rx) = mpsc::unbounded_channel();
        *platform.feed.lock() = Some(rx);
        let monitor = monitor(Arc::clone(&platform), false);
        let (seen, on_change) = recorder();

        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(10)).await;

        tx.send(PermissionChange {
            device: DeviceKind::Microphone,
            status: PermissionStatus::Granted,
        })
        .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].microphone, PermissionStatus::Granted);
        assert_eq!(monitor.stats().pushed_changes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_grants_optimistically() {
        let platform = Arc::new(FakePlatform::default());
        let monitor = monitor(Arc::clone(&platform), false);
        let (seen, on_change) = recorder();
        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(monitor.can_request(DeviceKind::Camera));
        monitor.request_camera().await.unwrap();

        assert_eq!(monitor.current().camera, PermissionStatus::Granted);
        assert!(!monitor.can_request(DeviceKind::Camera));
        assert_eq!(seen.lock().last().unwrap().camera, PermissionStatus::Granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_rejection_keeps_snapshot() {
        let platform = Arc::new(FakePlatform::default());
        let monitor = monitor(Arc::clone(&platform), true);
        let (_seen, on_change) = recorder();
        monitor.start(on_change);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = monitor.current();

        let err = monitor.request_microphone().await.unwrap_err();

        assert!(matches!(
            err,
            ProctorError::PermissionDenied {
                device: DeviceKind::Microphone,
                ..
            }
        ));
        assert_eq!(monitor.current(), before);
        assert!(monitor
            .last_error(DeviceKind::Microphone)
            .unwrap()
            .contains("NotAllowedError"));
    }
}
