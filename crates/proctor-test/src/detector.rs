//! Scripted face detector

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use proctor_core::{Detection, FaceBox};
use proctor_media::VideoSink;
use proctor_vision::{FaceDetector, FaceModel};

struct Script {
    /// Face counts for the next samples, in order
    queue: VecDeque<usize>,
    /// Face count once the queue is empty
    steady: usize,
    transient_failures: u32,
    failing_model: Option<FaceModel>,
    delay: Option<Duration>,
    loads: Vec<FaceModel>,
    inferences: u64,
}

/// Face detector whose answers are set by the test
pub struct ScriptedDetector {
    script: Mutex<Script>,
}

impl Default for ScriptedDetector {
    fn default() -> Self {
        Self::with_faces(1)
    }
}

impl ScriptedDetector {
    /// Detector that always sees `faces` faces
    pub fn with_faces(faces: usize) -> Self {
        ScriptedDetector {
            script: Mutex::new(Script {
                queue: VecDeque::new(),
                steady: faces,
                transient_failures: 0,
                failing_model: None,
                delay: None,
                loads: Vec::new(),
                inferences: 0,
            }),
        }
    }

    /// Change the visible face count from the next sample on
    pub fn set_faces(&self, faces: usize) {
        let mut script = self.script.lock();
        script.queue.clear();
        script.steady = faces;
    }

    /// Queue face counts for the next samples
    pub fn queue_faces(&self, faces: &[usize]) {
        self.script.lock().queue.extend(faces.iter().copied());
    }

    /// Fail the next `count` samples
    pub fn fail_samples(&self, count: u32) {
        self.script.lock().transient_failures = count;
    }

    /// Fail loading `model`, or stop failing with `None`
    pub fn fail_model(&self, model: Option<FaceModel>) {
        self.script.lock().failing_model = model;
    }

    /// Inference latency
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.script.lock().delay = delay;
    }

    pub fn loads(&self) -> Vec<FaceModel> {
        self.script.lock().loads.clone()
    }

    pub fn inferences(&self) -> u64 {
        self.script.lock().inferences
    }
}

fn detections(faces: usize) -> Vec<Detection> {
    (0..faces)
        .map(|i| {
            let x = 40.0 + i as f32 * 200.0;
            Detection::new(FaceBox::new(x, 80.0, 160.0, 160.0), 0.92)
                .with_landmarks(vec![(x + 50.0, 140.0), (x + 110.0, 140.0), (x + 80.0, 200.0)])
                .with_descriptor(vec![0.0; 128])
        })
        .collect()
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn load_model(&self, model: FaceModel, uri: &str) -> Result<(), String> {
        let mut script = self.script.lock();
        script.loads.push(model);
        if script.failing_model == Some(model) {
            return Err(format!("failed to fetch {}/{}", uri, model));
        }
        Ok(())
    }

    async fn detect_all(&self, source: &dyn VideoSink) -> Result<Vec<Detection>, String> {
        let delay = self.script.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock();
        script.inferences += 1;

        if source.attached().is_none() {
            return Err("video source has no frame".into());
        }
        if script.transient_failures > 0 {
            script.transient_failures -= 1;
            return Err("inference backend busy".into());
        }

        let faces = match script.queue.pop_front() {
            Some(faces) => faces,
            None => script.steady,
        };
        Ok(detections(faces))
    }
}
