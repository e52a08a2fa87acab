//! Face Presence Monitor
//!
//! Periodically samples the rendered video, classifies the face count and
//! reports each sample to the owner.
//!
//! - Models are loaded once per monitor instance, in pipeline order
//! - A load failure is terminal for the instance: it is reported once and
//!   never retried silently
//! - Ticks that fire while an inference is still running are skipped, not
//!   queued
//! - A failed sample is transient: logged, counted, not a violation

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use proctor_core::{Detection, DetectionSample, ProctorError, ProctorResult, SessionGeneration, ViolationEvent};
use proctor_media::VideoSink;

use crate::{DrawingSurface, FaceDetector, FaceModel, Overlay};

/// Default sampling period
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(3000);

/// Default model location
pub const DEFAULT_MODEL_URI: &str = "/models";

/// Monitor configuration
#[derive(Clone, Debug)]
pub struct FaceMonitorConfig {
    /// Time between samples
    pub sample_interval: Duration,
    /// Where the detection models are loaded from
    pub model_uri: String,
}

impl Default for FaceMonitorConfig {
    fn default() -> Self {
        FaceMonitorConfig {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            model_uri: DEFAULT_MODEL_URI.to_string(),
        }
    }
}

/// Lifecycle of a monitor instance
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    #[default]
    Disarmed,
    LoadingModels,
    Sampling,
    /// Model loading failed; the instance is unusable
    Failed(String),
}

/// Something the monitor reports to its owner
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    /// Models are loaded and sampling has started
    Armed,
    /// One completed sample and its classification
    Sample {
        sample: DetectionSample,
        violation: Option<ViolationEvent>,
    },
    /// Models could not be loaded. Terminal for this instance.
    ModelLoadFailed(String),
}

/// Monitor counters
#[derive(Clone, Debug, Default)]
pub struct MonitorStats {
    pub samples: u64,
    pub violations: u64,
    /// Ticks dropped because an inference was still in flight
    pub skipped_ticks: u64,
    pub transient_failures: u64,
}

/// Owner callback: every event carries the generation it was armed for
pub type MonitorCallback = Arc<dyn Fn(SessionGeneration, MonitorEvent) + Send + Sync>;

type Inference = Pin<Box<dyn Future<Output = Result<Vec<Detection>, String>> + Send>>;

/// Classify a sample by face count
pub fn classify(sample: &DetectionSample) -> Option<ViolationEvent> {
    match sample.face_count {
        0 => Some(ViolationEvent::no_face(sample.timestamp)),
        1 => None,
        n => Some(ViolationEvent::multiple_faces(sample.timestamp, n)),
    }
}

#[derive(Default)]
struct MonitorShared {
    phase: MonitorPhase,
    models_loaded: bool,
    stats: MonitorStats,
}

/// Face presence monitor
pub struct FacePresenceMonitor {
    detector: Arc<dyn FaceDetector>,
    config: FaceMonitorConfig,
    surface: Option<Arc<dyn DrawingSurface>>,
    shared: Arc<Mutex<MonitorShared>>,
    /// Liveness of the current arming; replaced on every arm
    live: Arc<AtomicBool>,
    generation: Option<SessionGeneration>,
    task: Option<JoinHandle<()>>,
}

impl FacePresenceMonitor {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self::with_config(detector, FaceMonitorConfig::default())
    }

    pub fn with_config(detector: Arc<dyn FaceDetector>, config: FaceMonitorConfig) -> Self {
        FacePresenceMonitor {
            detector,
            config,
            surface: None,
            shared: Arc::new(Mutex::new(MonitorShared::default())),
            live: Arc::new(AtomicBool::new(false)),
            generation: None,
            task: None,
        }
    }

    /// Draw detections onto `surface` while armed
    pub fn with_overlay(mut self, surface: Arc<dyn DrawingSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Start sampling `source` for `generation`.
    ///
    /// Loads the models first if this instance has not loaded them yet.
    /// Fails immediately on an instance whose model loading already failed.
    pub fn arm<F>(&mut self, generation: SessionGeneration, source: Arc<dyn VideoSink>, on_event: F) -> ProctorResult<()>
    where
        F: Fn(SessionGeneration, MonitorEvent) + Send + Sync + 'static,
    {
        if let MonitorPhase::Failed(reason) = &self.shared.lock().phase {
            return Err(ProctorError::ModelLoadFailed(reason.clone()));
        }

        self.disarm();

        let live = Arc::new(AtomicBool::new(true));
        self.live = Arc::clone(&live);
        self.generation = Some(generation);

        let on_event: MonitorCallback = Arc::new(on_event);
        let emit = move |event: MonitorEvent| {
            if live.load(Ordering::SeqCst) {
                on_event(generation, event);
            }
        };

        let detector = Arc::clone(&self.detector);
        let shared = Arc::clone(&self.shared);
        let surface = self.surface.clone();
        let config = self.config.clone();

        tracing::debug!(generation = %generation, "arming face presence monitor");

        self.task = Some(tokio::spawn(async move {
            if !shared.lock().models_loaded {
                shared.lock().phase = MonitorPhase::LoadingModels;
                for model in FaceModel::PIPELINE {
                    if let Err(reason) = detector.load_model(model, &config.model_uri).await {
                        let reason = format!("{}: {}", model, reason);
                        tracing::error!(generation = %generation, error = %reason, "face model load failed");
                        shared.lock().phase = MonitorPhase::Failed(reason.clone());
                        emit(MonitorEvent::ModelLoadFailed(reason));
                        return;
                    }
                }
                shared.lock().models_loaded = true;
            }

            shared.lock().phase = MonitorPhase::Sampling;
            emit(MonitorEvent::Armed);

            let overlay = surface.map(|surface| Overlay::new(surface, source.display_size()));

            let period = config.sample_interval;
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut in_flight: Option<Inference> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if in_flight.is_some() {
                            shared.lock().stats.skipped_ticks += 1;
                            tracing::debug!(generation = %generation, "inference still running, skipping tick");
                            continue;
                        }
                        let detector = Arc::clone(&detector);
                        let source = Arc::clone(&source);
                        in_flight = Some(Box::pin(async move {
                            detector.detect_all(source.as_ref()).await
                        }));
                    }
                    result = next_inference(&mut in_flight) => {
                        in_flight = None;
                        match result {
                            Ok(detections) => {
                                let sample = DetectionSample::new(Utc::now(), source.frame_size(), detections);
                                let violation = classify(&sample).map(|v| v.for_generation(generation));
                                if let Some(overlay) = &overlay {
                                    overlay.render(&sample);
                                }
                                {
                                    let mut shared = shared.lock();
                                    shared.stats.samples += 1;
                                    if violation.is_some() {
                                        shared.stats.violations += 1;
                                    }
                                }
                                emit(MonitorEvent::Sample { sample, violation });
                            }
                            Err(reason) => {
                                shared.lock().stats.transient_failures += 1;
                                tracing::warn!(generation = %generation, error = %reason, "detection sample failed");
                            }
                        }
                    }
                }
            }
        }));

        Ok(())
    }

    /// Stop sampling and clear the overlay. Safe when never armed.
    pub fn disarm(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            if let Some(generation) = self.generation {
                tracing::debug!(generation = %generation, "face presence monitor disarmed");
            }
        }
        if let Some(surface) = &self.surface {
            surface.clear();
        }
        let mut shared = self.shared.lock();
        if !matches!(shared.phase, MonitorPhase::Failed(_)) {
            shared.phase = MonitorPhase::Disarmed;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some() && self.live.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> MonitorPhase {
        self.shared.lock().phase.clone()
    }

    /// Has model loading failed on this instance?
    pub fn is_failed(&self) -> bool {
        matches!(self.shared.lock().phase, MonitorPhase::Failed(_))
    }

    /// Generation of the current or last arming
    pub fn generation(&self) -> Option<SessionGeneration> {
        self.generation
    }

    pub fn stats(&self) -> MonitorStats {
        self.shared.lock().stats.clone()
    }
}

impl Drop for FacePresenceMonitor {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn next_inference(in_flight: &mut Option<Inference>) -> Result<Vec<Detection>, String> {
    match in_flight {
        Some(inference) => inference.as_mut().await,
        None => std::future::pending().await,
    }
}
