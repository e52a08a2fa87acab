//! End-to-end supervision scenarios against the simulated host

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;

use proctor_core::{
    AcquisitionError, DegradedCause, Detection, DeviceKind, FrameSize, PermissionStatus, ProctorError,
    SupervisorState, ViolationKind,
};
use proctor_media::VideoSink;
use proctor_runtime::{
    HostPlatform, NavigationTarget, ProctoringSupervisor, RevocationPolicy, SupervisorConfig, SupervisorHandle,
    TeardownReason,
};
use proctor_vision::{FaceDetector, FaceModel};

use crate::{Harness, RecordingHost, RecordingSink, ScriptedDetector, SimulatedPlatform};

async fn active() -> Harness {
    let harness = Harness::started().await.unwrap();
    harness.activate().await.unwrap();
    harness
}

#[tokio::test(start_paused = true)]
async fn test_starts_awaiting_permissions() {
    let harness = Harness::new().unwrap();
    assert_eq!(harness.state(), SupervisorState::Idle);

    harness.handle.start().await.unwrap();
    harness.settle().await;

    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert_eq!(harness.platform.live_streams(), 0);
    assert!(matches!(
        harness.handle.start().await,
        Err(ProctorError::InvalidState(SupervisorState::AwaitingPermissions))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_camera_only_then_microphone() {
    let harness = Harness::started().await.unwrap();

    harness.platform.grant(DeviceKind::Camera);
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert!(harness.handle.stream_id().is_none());

    harness.platform.grant(DeviceKind::Microphone);
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::Active);
    assert!(harness.handle.stream_id().is_some());
    assert!(harness.handle.is_bound());
    assert_eq!(harness.platform.live_video_streams(), 1);
    assert_eq!(harness.sink.attached(), harness.handle.stream_id());
    assert_eq!(harness.detector.loads(), FaceModel::PIPELINE.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_one_face_three_ticks_no_violations() {
    let harness = active().await;

    harness.ticks(3).await;

    assert!(harness.host.violations().is_empty());
    assert_eq!(harness.handle.stats().samples, 3);
    assert_eq!(harness.handle.stats().violations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_face_one_event_per_tick() {
    let harness = active().await;
    let mut violations = harness.handle.violations();
    harness.detector.set_faces(0);

    harness.ticks(3).await;

    assert_eq!(harness.host.violations_of(ViolationKind::NoFaceDetected), 3);
    assert_eq!(harness.host.violations().len(), 3);
    for _ in 0..3 {
        let violation = violations.try_recv().unwrap();
        assert_eq!(violation.kind, ViolationKind::NoFaceDetected);
        assert_eq!(violation.generation, Some(harness.handle.generation()));
    }
    assert!(violations.try_recv().is_err());
    // Violations are advisory
    assert_eq!(harness.state(), SupervisorState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_face_count_classification() {
    let harness = active().await;
    harness.detector.queue_faces(&[2, 1, 3]);

    harness.ticks(3).await;

    let kinds: Vec<_> = harness.host.violations().iter().map(|v| v.kind).collect();
    assert_eq!(
        kinds,
        vec![ViolationKind::MultipleFacesDetected, ViolationKind::MultipleFacesDetected]
    );
    assert_eq!(harness.handle.stats().samples, 3);
}

#[tokio::test(start_paused = true)]
async fn test_camera_revoked_releases_session() {
    let harness = active().await;
    harness.tick().await;
    let samples = harness.handle.stats().samples;

    harness.platform.revoke(DeviceKind::Camera);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert_eq!(harness.platform.live_video_streams(), 0);
    assert!(harness.sink.attached().is_none());
    assert!(harness.handle.stream_id().is_none());
    assert_eq!(harness.host.violations_of(ViolationKind::PermissionRevoked), 1);

    // Monitor disarmed: no more samples
    harness.ticks(2).await;
    assert_eq!(harness.handle.stats().samples, samples);
    assert!(harness.surface.drawn().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_regrant_starts_new_generation() {
    let harness = active().await;
    let first = harness.handle.generation();

    harness.platform.revoke(DeviceKind::Microphone);
    harness.poll().await;
    harness.platform.grant(DeviceKind::Microphone);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Active);
    assert!(first.is_superseded_by(harness.handle.generation()));
    assert_eq!(harness.platform.live_video_streams(), 1);
    // Models are loaded once per monitor instance
    assert_eq!(harness.detector.loads().len(), 3);

    harness.tick().await;
    assert_eq!(harness.handle.stats().samples, 1);
}

#[tokio::test(start_paused = true)]
async fn test_revocation_wins_over_inflight_sample() {
    let harness = active().await;
    harness.detector.set_faces(0);
    harness.detector.set_delay(Some(Duration::from_millis(2500)));

    // The sample starts at the next tick and is still running when the
    // revocation is polled
    harness.tick().await;
    harness.platform.revoke(DeviceKind::Camera);
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);

    harness.advance(Duration::from_secs(5)).await;

    assert_eq!(harness.host.violations_of(ViolationKind::NoFaceDetected), 0);
    assert_eq!(harness.handle.stats().samples, 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_samples_skipped() {
    let harness = active().await;
    harness.detector.set_delay(Some(Duration::from_millis(4000)));

    // Inference started at the first tick ends after the second one fired
    harness.ticks(3).await;

    let monitor = harness.handle.monitor_stats();
    assert_eq!(monitor.samples, 1);
    assert!(monitor.skipped_ticks >= 1);
    assert_eq!(harness.detector.inferences(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_model_load_failure_degrades_keeps_video() {
    let harness = Harness::with_parts(
        SupervisorConfig::default(),
        SimulatedPlatform::new(),
        ScriptedDetector::default(),
    )
    .unwrap();
    harness.detector.fail_model(Some(FaceModel::Landmarks));
    harness.handle.start().await.unwrap();
    harness.settle().await;

    harness.platform.grant_all();
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Degraded);
    assert!(matches!(
        harness.handle.degraded_cause(),
        Some(DegradedCause::DetectionUnavailable(_))
    ));
    assert!(harness.sink.attached().is_some());
    assert!(harness.handle.is_bound());
    assert_eq!(harness.handle.stats().model_load_failures, 1);

    // Not retried silently
    harness.ticks(2).await;
    assert_eq!(harness.detector.loads().len(), 2);
    assert_eq!(harness.state(), SupervisorState::Degraded);
}

#[tokio::test(start_paused = true)]
async fn test_recover_with_fresh_monitor() {
    let harness = Harness::new().unwrap();
    harness.detector.fail_model(Some(FaceModel::Descriptor));
    harness.handle.start().await.unwrap();
    harness.activate().await.unwrap_err();
    assert_eq!(harness.state(), SupervisorState::Degraded);
    let stream = harness.handle.stream_id();

    harness.detector.fail_model(None);
    let state = harness.handle.recover().await.unwrap();
    harness.settle().await;

    assert_eq!(state, SupervisorState::Active);
    assert_eq!(harness.state(), SupervisorState::Active);
    // Stream was fine; only detection was restarted
    assert_eq!(harness.handle.stream_id(), stream);
    assert_eq!(harness.detector.loads().len(), 3 + 3);

    harness.tick().await;
    assert_eq!(harness.handle.stats().samples, 1);
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_and_recovery() {
    let harness = Harness::started().await.unwrap();
    harness
        .platform
        .fail_acquisition(Some(AcquisitionError::DeviceBusy("in use by another app".into())));

    harness.platform.grant_all();
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Degraded);
    assert_eq!(harness.host.violations_of(ViolationKind::StreamAcquisitionFailed), 1);
    assert!(matches!(
        harness.handle.degraded_cause(),
        Some(DegradedCause::StreamUnavailable(_))
    ));

    let retry = harness.handle.recover().await;
    assert!(matches!(retry, Err(ProctorError::DeviceAcquisitionFailed(AcquisitionError::DeviceBusy(_)))));
    assert_eq!(harness.state(), SupervisorState::Degraded);

    harness.platform.fail_acquisition(None);
    assert_eq!(harness.handle.recover().await.unwrap(), SupervisorState::Active);
    assert_eq!(harness.platform.live_video_streams(), 1);
    assert!(harness.handle.degraded_cause().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_recover_outside_degraded_rejected() {
    let harness = active().await;
    assert!(matches!(
        harness.handle.recover().await,
        Err(ProctorError::InvalidState(SupervisorState::Active))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_sink_error_degrades() {
    let harness = active().await;

    harness.handle.report_sink_error("MEDIA_ERR_DECODE").await.unwrap();
    harness.settle().await;

    assert_eq!(harness.state(), SupervisorState::Degraded);
    assert_eq!(harness.host.violations_of(ViolationKind::StreamAcquisitionFailed), 1);
    assert_eq!(harness.platform.live_video_streams(), 0);

    assert_eq!(harness.handle.recover().await.unwrap(), SupervisorState::Active);
    assert_eq!(harness.platform.live_video_streams(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sink_rejecting_stream_degrades() {
    let harness = Harness::started().await.unwrap();
    harness.sink.reject_streams(true);

    harness.platform.grant_all();
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Degraded);
    assert_eq!(harness.platform.live_video_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_swap_sink_keeps_stream() {
    let harness = active().await;
    let stream = harness.handle.stream_id();
    let next_screen = Arc::new(RecordingSink::new(FrameSize::new(320, 240)));

    harness.handle.bind_sink(next_screen.clone()).await.unwrap();
    harness.settle().await;

    assert!(harness.sink.attached().is_none());
    assert_eq!(next_screen.attached(), stream);
    assert_eq!(harness.platform.issued_streams(), 1);

    harness.tick().await;
    assert_eq!(harness.handle.stats().samples, 1);
    assert_eq!(harness.state(), SupervisorState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_swap_to_rejecting_sink_degrades() {
    let harness = active().await;
    let next_screen = Arc::new(RecordingSink::new(FrameSize::new(320, 240)));
    next_screen.reject_streams(true);

    let result = harness.handle.bind_sink(next_screen.clone()).await;

    assert!(matches!(result, Err(ProctorError::DeviceAcquisitionFailed(_))));
    assert_eq!(harness.state(), SupervisorState::Degraded);
    assert!(matches!(harness.handle.degraded_cause(), Some(DegradedCause::StreamUnavailable(_))));
    assert_eq!(harness.host.violations_of(ViolationKind::StreamAcquisitionFailed), 1);
    assert_eq!(harness.platform.live_video_streams(), 0);
    assert!(harness.handle.stream_id().is_none());

    harness.tick().await;
    assert_eq!(harness.handle.stats().samples, 0);

    next_screen.reject_streams(false);
    assert_eq!(harness.handle.recover().await.unwrap(), SupervisorState::Active);
    assert_eq!(next_screen.attached(), harness.handle.stream_id());
    assert_eq!(harness.platform.live_video_streams(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlay_drawn_and_cleared() {
    let harness = active().await;
    harness.detector.set_faces(2);

    harness.tick().await;
    assert_eq!(harness.surface.size(), FrameSize::new(640, 480));
    assert_eq!(harness.surface.drawn().len(), 2);
    assert!(harness.surface.landmark_draws() >= 1);

    harness.handle.teardown(TeardownReason::NavigatedAway).await.unwrap();
    assert!(harness.surface.drawn().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overlay_disabled() {
    let config = SupervisorConfig {
        overlay: false,
        ..Default::default()
    };
    let harness = Harness::with_config(config).unwrap();
    harness.handle.start().await.unwrap();
    harness.activate().await.unwrap();

    harness.tick().await;
    assert_eq!(harness.surface.clears(), 0);
    assert!(harness.surface.drawn().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_silences_everything() {
    let harness = active().await;
    harness.detector.set_faces(0);
    harness.tick().await;

    harness.handle.teardown(TeardownReason::ExamSubmitted).await.unwrap();
    assert_eq!(harness.state(), SupervisorState::Terminated);
    assert_eq!(harness.host.navigations(), vec![NavigationTarget::Start]);
    assert_eq!(harness.platform.live_streams(), 0);

    let callbacks = harness.host.callbacks();
    let queries = harness.platform.queries();
    let inferences = harness.detector.inferences();

    harness.platform.revoke(DeviceKind::Camera);
    harness.advance(Duration::from_secs(10)).await;

    assert_eq!(harness.host.callbacks(), callbacks);
    assert_eq!(harness.platform.queries(), queries);
    assert_eq!(harness.detector.inferences(), inferences);
}

#[tokio::test(start_paused = true)]
async fn test_terminated_rejects_operations() {
    let harness = active().await;
    let screen = harness.handle.clone();
    harness.handle.teardown(TeardownReason::NavigatedAway).await.unwrap();

    assert!(harness.host.navigations().is_empty());
    assert!(matches!(screen.request_camera().await, Err(ProctorError::Terminated)));
    assert!(matches!(screen.recover().await, Err(ProctorError::Terminated)));
    assert!(matches!(screen.start().await, Err(ProctorError::Terminated)));
    assert!(matches!(
        screen.teardown(TeardownReason::ExamSubmitted).await,
        Err(ProctorError::Terminated)
    ));
    assert!(!screen.can_request(DeviceKind::Camera));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_inflight_acquisition() {
    let harness = Harness::started().await.unwrap();
    harness.platform.set_acquire_delay(Some(Duration::from_secs(30)));
    harness.platform.grant_all();
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::Active);

    harness.handle.teardown(TeardownReason::NavigatedAway).await.unwrap();

    assert_eq!(harness.state(), SupervisorState::Terminated);
    harness.advance(Duration::from_secs(40)).await;
    assert_eq!(harness.platform.issued_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_revocation_during_slow_acquisition() {
    let harness = Harness::started().await.unwrap();
    harness.platform.set_acquire_delay(Some(Duration::from_secs(5)));
    harness.platform.grant_all();
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::Active);
    assert!(harness.handle.is_acquiring());
    assert!(harness.handle.stream_id().is_none());

    harness.platform.revoke(DeviceKind::Camera);
    harness.poll().await;

    // Handled at the next poll, not after the device opens
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert!(!harness.handle.is_acquiring());
    assert_eq!(harness.host.violations_of(ViolationKind::PermissionRevoked), 1);

    harness.advance(Duration::from_secs(6)).await;
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert_eq!(harness.host.violations_of(ViolationKind::StreamAcquisitionFailed), 0);
    assert_eq!(harness.platform.issued_streams(), 0);
    assert_eq!(harness.platform.live_streams(), 0);
    assert_eq!(harness.handle.stats().acquisitions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_commands_served_while_acquiring() {
    let harness = Harness::started().await.unwrap();
    harness.platform.set_acquire_delay(Some(Duration::from_secs(2)));
    harness.platform.grant_all();
    harness.poll().await;
    assert!(harness.handle.is_acquiring());

    let next_screen = Arc::new(RecordingSink::new(FrameSize::new(320, 240)));
    harness.handle.bind_sink(next_screen.clone()).await.unwrap();
    assert!(harness.handle.is_acquiring());
    assert!(matches!(
        harness.handle.recover().await,
        Err(ProctorError::InvalidState(SupervisorState::Active))
    ));

    harness.advance(Duration::from_secs(3)).await;

    assert!(!harness.handle.is_acquiring());
    assert_eq!(harness.state(), SupervisorState::Active);
    assert!(harness.handle.stream_id().is_some());
    assert_eq!(next_screen.attached(), harness.handle.stream_id());
    assert!(harness.sink.attached().is_none());
    assert_eq!(harness.handle.stats().acquisitions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_leave_while_awaiting() {
    let harness = Harness::started().await.unwrap();

    harness.handle.leave().await.unwrap();

    assert_eq!(harness.state(), SupervisorState::Terminated);
    assert!(harness.host.navigations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_leave_rejected_once_active() {
    let harness = active().await;
    assert!(matches!(
        harness.handle.leave().await,
        Err(ProctorError::InvalidState(SupervisorState::Active))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_suspends_on_microphone_loss() {
    let harness = active().await;

    harness.platform.revoke(DeviceKind::Microphone);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert!(harness.host.navigations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_strict_policy_terminates_on_microphone_loss() {
    let harness = Harness::with_config(SupervisorConfig::strict()).unwrap();
    harness.handle.start().await.unwrap();
    harness.activate().await.unwrap();

    harness.platform.revoke(DeviceKind::Camera);
    harness.poll().await;
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);

    harness.platform.grant(DeviceKind::Camera);
    harness.poll().await;
    harness.platform.revoke(DeviceKind::Microphone);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Terminated);
    assert_eq!(harness.host.navigations(), vec![NavigationTarget::Start]);
    assert_eq!(harness.platform.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_both_revoked_stricter_action_wins() {
    let config = SupervisorConfig {
        revocation: RevocationPolicy::strict(),
        ..Default::default()
    };
    let harness = Harness::with_config(config).unwrap();
    harness.handle.start().await.unwrap();
    harness.activate().await.unwrap();

    harness.platform.revoke(DeviceKind::Camera);
    harness.platform.revoke(DeviceKind::Microphone);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::Terminated);
    assert_eq!(harness.host.violations_of(ViolationKind::PermissionRevoked), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pushed_revocation_beats_next_poll() {
    let harness = Harness::with_parts(
        SupervisorConfig::default(),
        SimulatedPlatform::new().with_change_feed(),
        ScriptedDetector::default(),
    )
    .unwrap();
    harness.handle.start().await.unwrap();
    harness.activate().await.unwrap();

    harness.platform.revoke(DeviceKind::Camera);
    harness.settle().await;

    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert_eq!(harness.platform.live_video_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_requests_through_shared_handle() {
    let harness = Harness::started().await.unwrap();
    let instructions = harness.handle.clone();
    let sections = harness.handle.clone();

    assert!(instructions.can_request(DeviceKind::Camera));
    instructions.request_camera().await.unwrap();
    harness.settle().await;
    assert!(!sections.can_request(DeviceKind::Camera));
    assert_eq!(sections.state(), SupervisorState::AwaitingPermissions);

    sections.request_microphone().await.unwrap();
    harness.settle().await;

    assert_eq!(instructions.state(), SupervisorState::Active);
    assert_eq!(sections.permissions().microphone, PermissionStatus::Granted);
    // Prompt streams are not kept
    assert_eq!(harness.platform.live_streams(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_request_reports_reason() {
    let harness = Harness::started().await.unwrap();
    harness.platform.accept_prompts(false);

    let err = harness.handle.request_microphone().await.unwrap_err();

    assert!(matches!(err, ProctorError::PermissionDenied { device: DeviceKind::Microphone, .. }));
    assert!(err.is_recoverable());
    assert!(harness.handle.permission_error(DeviceKind::Microphone).is_some());
    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
}

#[tokio::test(start_paused = true)]
async fn test_query_failure_treated_as_denied() {
    let harness = active().await;

    harness.platform.fail_queries(true);
    harness.poll().await;

    assert_eq!(harness.state(), SupervisorState::AwaitingPermissions);
    assert_eq!(harness.handle.permissions().camera, PermissionStatus::Denied);
}

#[tokio::test(start_paused = true)]
async fn test_transient_sample_failure_skipped() {
    let harness = active().await;
    harness.detector.fail_samples(1);

    harness.ticks(2).await;

    assert_eq!(harness.handle.monitor_stats().transient_failures, 1);
    assert_eq!(harness.handle.stats().samples, 1);
    assert!(harness.host.violations().is_empty());
    assert_eq!(harness.state(), SupervisorState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_tears_down() {
    let harness = active().await;
    let platform = Arc::clone(&harness.platform);
    let Harness { handle, .. } = harness;
    drop(handle);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(platform.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions_reported_to_host() {
    let harness = active().await;
    harness.handle.teardown(TeardownReason::ExamSubmitted).await.unwrap();

    assert_eq!(
        harness.host.states(),
        vec![
            SupervisorState::AwaitingPermissions,
            SupervisorState::Active,
            SupervisorState::Terminated,
        ]
    );
}

/// Reports a video sink failure from inside its first inference, so the
/// failure is queued ahead of that inference's sample
#[derive(Default)]
struct FailingSinkDetector {
    handle: Mutex<Option<SupervisorHandle>>,
}

#[async_trait]
impl FaceDetector for FailingSinkDetector {
    async fn load_model(&self, _model: FaceModel, _uri: &str) -> Result<(), String> {
        Ok(())
    }

    async fn detect_all(&self, _source: &dyn VideoSink) -> Result<Vec<Detection>, String> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle
                .report_sink_error("MEDIA_ERR_DECODE")
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_sample_queued_behind_sink_error_discarded() {
    let platform = Arc::new(SimulatedPlatform::new());
    let detector = Arc::new(FailingSinkDetector::default());
    let host = Arc::new(RecordingHost::new());
    let config = SupervisorConfig::default();
    let handle = ProctoringSupervisor::spawn(
        HostPlatform {
            permissions: platform.clone(),
            devices: platform.clone(),
            detector: detector.clone(),
            sink: Arc::new(RecordingSink::default()),
            surface: None,
            host: host.clone(),
        },
        config.clone(),
    )
    .unwrap();

    handle.start().await.unwrap();
    platform.grant_all();
    tokio::time::sleep(config.permission_poll_interval + Duration::from_millis(10)).await;
    assert_eq!(handle.state(), SupervisorState::Active);
    *detector.handle.lock() = Some(handle.clone());

    tokio::time::sleep(config.sample_interval + Duration::from_millis(10)).await;

    assert_eq!(handle.state(), SupervisorState::Degraded);
    assert_eq!(host.violations_of(ViolationKind::StreamAcquisitionFailed), 1);
    assert_eq!(host.violations_of(ViolationKind::NoFaceDetected), 0);
    assert_eq!(handle.stats().samples, 0);
    assert_eq!(handle.stats().stale_samples, 1);
    assert_eq!(platform.live_video_streams(), 0);
}

fn status() -> impl Strategy<Value = PermissionStatus> {
    prop_oneof![
        Just(PermissionStatus::Granted),
        Just(PermissionStatus::Denied),
        Just(PermissionStatus::Prompt),
    ]
}

fn run_paused<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_capture_iff_both_granted(
        snapshots in proptest::collection::vec((status(), status()), 1..6)
    ) {
        run_paused(async move {
            let harness = Harness::started().await.unwrap();
            for (camera, microphone) in snapshots {
                harness.platform.set_permission(DeviceKind::Camera, camera);
                harness.platform.set_permission(DeviceKind::Microphone, microphone);
                harness.poll().await;

                let both = camera.is_granted() && microphone.is_granted();
                assert_eq!(harness.state().has_capture(), both);
                assert_eq!(harness.handle.stream_id().is_some(), both);
                assert_eq!(harness.platform.live_video_streams(), usize::from(both));
            }
        });
    }
}
