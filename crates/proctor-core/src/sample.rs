//! Detection samples
//!
//! A sample is produced once per sampling tick and is not retained after
//! it has been classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame or a display surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        FrameSize { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned face box in pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        FaceBox { x, y, width, height }
    }

    /// Scale by independent x/y factors
    pub fn scaled(&self, sx: f32, sy: f32) -> FaceBox {
        FaceBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

/// One detected face: localization + landmarks + descriptor
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    /// Localization box
    pub face: FaceBox,
    /// Localization confidence [0.0 - 1.0]
    pub score: f32,
    /// Landmark points (68-point layout when available)
    pub landmarks: Vec<(f32, f32)>,
    /// Face descriptor vector (128-d when available)
    pub descriptor: Vec<f32>,
}

impl Detection {
    pub fn new(face: FaceBox, score: f32) -> Self {
        Detection {
            face,
            score,
            landmarks: Vec::new(),
            descriptor: Vec::new(),
        }
    }

    pub fn with_landmarks(mut self, landmarks: Vec<(f32, f32)>) -> Self {
        self.landmarks = landmarks;
        self
    }

    pub fn with_descriptor(mut self, descriptor: Vec<f32>) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Scale box and landmarks by independent x/y factors
    pub fn scaled(&self, sx: f32, sy: f32) -> Detection {
        Detection {
            face: self.face.scaled(sx, sy),
            score: self.score,
            landmarks: self
                .landmarks
                .iter()
                .map(|(x, y)| (x * sx, y * sy))
                .collect(),
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Result of one sampling tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionSample {
    pub timestamp: DateTime<Utc>,
    pub face_count: usize,
    /// Frame size the detections are expressed in
    pub frame: FrameSize,
    pub raw_detections: Vec<Detection>,
}

impl DetectionSample {
    pub fn new(timestamp: DateTime<Utc>, frame: FrameSize, raw_detections: Vec<Detection>) -> Self {
        DetectionSample {
            timestamp,
            face_count: raw_detections.len(),
            frame,
            raw_detections,
        }
    }
}
