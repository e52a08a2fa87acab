//! Detection overlay
//!
//! Purely cosmetic: boxes and landmarks drawn over the live video. Nothing
//! in supervision depends on it.

use std::sync::Arc;

use proctor_core::{Detection, DetectionSample, FrameSize};

/// Drawing surface (canvas equivalent)
pub trait DrawingSurface: Send + Sync {
    /// Resize the surface to the display size of the video
    fn match_dimensions(&self, size: FrameSize);

    fn clear(&self);

    fn draw_detections(&self, detections: &[Detection]);

    fn draw_landmarks(&self, detections: &[Detection]);
}

/// Rescale detections from frame coordinates to display coordinates
pub fn resize_detections(detections: &[Detection], from: FrameSize, to: FrameSize) -> Vec<Detection> {
    if from.is_empty() || to.is_empty() || from == to {
        return detections.to_vec();
    }
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    detections.iter().map(|d| d.scaled(sx, sy)).collect()
}

/// Overlay bound to one surface for the lifetime of one arming
pub struct Overlay {
    surface: Arc<dyn DrawingSurface>,
    display: FrameSize,
}

impl Overlay {
    pub fn new(surface: Arc<dyn DrawingSurface>, display: FrameSize) -> Self {
        surface.match_dimensions(display);
        Overlay { surface, display }
    }

    /// Redraw for one sample
    pub fn render(&self, sample: &DetectionSample) {
        let resized = resize_detections(&sample.raw_detections, sample.frame, self.display);
        self.surface.clear();
        self.surface.draw_detections(&resized);
        self.surface.draw_landmarks(&resized);
    }

    pub fn clear(&self) {
        self.surface.clear();
    }
}
