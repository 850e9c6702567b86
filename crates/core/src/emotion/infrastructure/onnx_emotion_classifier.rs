//! FER+ emotion classifier on ONNX Runtime.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::emotion::domain::emotion_classifier::{
    ClassificationFailure, ClassificationOutcome, EmotionClassifier, EmotionLabel,
};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::build_session;

/// FER+ input resolution (single channel).
const INPUT_SIZE: u32 = 64;

/// Output logit order of the FER+ model.
const FERPLUS_CLASSES: [EmotionLabel; 8] = [
    EmotionLabel::Neutral,
    EmotionLabel::Happy,
    EmotionLabel::Surprise,
    EmotionLabel::Sad,
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Contempt,
];

pub struct OnnxEmotionClassifier {
    session: ort::session::Session,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: build_session(model_path)?,
        })
    }

    fn infer(&mut self, face: &Frame) -> Result<EmotionLabel, Box<dyn std::error::Error>> {
        let input = preprocess(&face.to_grayscale());
        let outputs = self
            .session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.as_slice().ok_or("Cannot get emotion logit slice")?;
        best_label(logits).ok_or_else(|| {
            format!(
                "expected {} emotion logits, got {}",
                FERPLUS_CLASSES.len(),
                logits.len()
            )
            .into()
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, face: &Frame) -> ClassificationOutcome {
        if face.is_empty() {
            return ClassificationOutcome::Failed(ClassificationFailure::EmptyRegion);
        }
        match self.infer(face) {
            Ok(label) => ClassificationOutcome::Label(label),
            Err(e) => ClassificationOutcome::Failed(ClassificationFailure::Inference(e.to_string())),
        }
    }
}

/// Resizes to 64×64 and lays out as `[1, 1, 64, 64]` raw intensities (0..255).
fn preprocess(gray: &GrayImage) -> ndarray::Array4<f32> {
    let resized = imageops::resize(gray, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let s = INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, s, s));
    for (x, y, px) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = px.0[0] as f32;
    }
    tensor
}

/// Argmax over the FER+ logits; `None` if the count is wrong or any is NaN.
fn best_label(logits: &[f32]) -> Option<EmotionLabel> {
    if logits.len() != FERPLUS_CLASSES.len() || logits.iter().any(|v| v.is_nan()) {
        return None;
    }
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| FERPLUS_CLASSES[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rstest::rstest;

    #[rstest]
    #[case(0, EmotionLabel::Neutral)]
    #[case(1, EmotionLabel::Happy)]
    #[case(4, EmotionLabel::Angry)]
    #[case(7, EmotionLabel::Contempt)]
    fn test_best_label_follows_ferplus_order(#[case] hot: usize, #[case] expected: EmotionLabel) {
        let mut logits = [-1.0f32; 8];
        logits[hot] = 3.5;
        assert_eq!(best_label(&logits), Some(expected));
    }

    #[test]
    fn test_best_label_rejects_wrong_count() {
        assert_eq!(best_label(&[1.0, 2.0, 3.0]), None);
        assert_eq!(best_label(&[]), None);
    }

    #[test]
    fn test_best_label_rejects_nan() {
        let mut logits = [0.0f32; 8];
        logits[2] = f32::NAN;
        assert_eq!(best_label(&logits), None);
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let gray = GrayImage::from_pixel(120, 90, Luma([200]));
        let tensor = preprocess(&gray);
        assert_eq!(tensor.shape(), &[1, 1, 64, 64]);
        assert!(tensor.iter().all(|&v| (v - 200.0).abs() < 1.0));
    }
}
