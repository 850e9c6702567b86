use image::GrayImage;

use crate::shared::face_box::FaceBox;

/// Domain interface for face detection on a single-channel image.
///
/// Boxes come back in the detector's scan order; callers must not rely
/// on any particular sort.
pub trait FaceDetector: Send {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
