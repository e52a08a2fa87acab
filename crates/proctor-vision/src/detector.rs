//! Face detection inference capability
//!
//! Detection is a three-stage pipeline: coarse localization, landmark
//! extraction and descriptor extraction. Each stage has its own model.

use std::fmt;

use async_trait::async_trait;

use proctor_core::Detection;
use proctor_media::VideoSink;

/// One of the cooperating models of the detection pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceModel {
    /// Coarse face localization (tiny detector)
    Localization,
    /// 68-point landmark extraction
    Landmarks,
    /// Face descriptor extraction
    Descriptor,
}

impl FaceModel {
    /// Load order of the full pipeline
    pub const PIPELINE: [FaceModel; 3] = [
        FaceModel::Localization,
        FaceModel::Landmarks,
        FaceModel::Descriptor,
    ];

    /// Manifest name under the model URI
    pub fn manifest_name(self) -> &'static str {
        match self {
            FaceModel::Localization => "tiny_face_detector_model",
            FaceModel::Landmarks => "face_landmark_68_model",
            FaceModel::Descriptor => "face_recognition_model",
        }
    }
}

impl fmt::Display for FaceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_name())
    }
}

/// Face detection inference (host capability)
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Load one model from `uri`
    async fn load_model(&self, model: FaceModel, uri: &str) -> Result<(), String>;

    /// Run localization + landmarks + descriptors on the frame currently
    /// rendered by `source`
    async fn detect_all(&self, source: &dyn VideoSink) -> Result<Vec<Detection>, String>;
}
