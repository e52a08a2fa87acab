//! Proctor Vision - Face presence supervision
//!
//! Face presence as a per-tick signal, not identity. This is NOT face
//! recognition: descriptors are computed by the inference pipeline but only
//! the number of faces in frame matters here.
//!
//! # Pipeline
//!
//! Load models (once) → sample every interval → classify face count → emit
//!
//! - 0 faces: NoFaceDetected
//! - 1 face: nothing
//! - 2+ faces: MultipleFacesDetected

pub mod detector;
pub mod overlay;
pub mod monitor;

pub use detector::*;
pub use overlay::*;
pub use monitor::*;
