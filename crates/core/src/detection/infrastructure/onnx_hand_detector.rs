//! Two-stage MediaPipe hand tracker on ONNX Runtime.
//!
//! A palm detector finds hand anchors on the whole frame; each palm box is
//! expanded into a square hand crop and a landmark model regresses the 21
//! keypoints inside it. Crops are axis-aligned (no palm rotation).
use std::path::Path;

use crate::detection::domain::hand_detector::{
    HandDetector, HandLandmark, HandObservation, HAND_LANDMARK_COUNT,
};
use crate::detection::infrastructure::math::{nms, sigmoid};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::build_session;

/// Palm detector input resolution.
const PALM_INPUT_SIZE: u32 = 192;

/// Landmark model input resolution.
const LANDMARK_INPUT_SIZE: u32 = 224;

/// Anchors for the 192×192 palm model: 24×24×2 + 12×12×6.
const NUM_ANCHORS: usize = 2016;

/// Palm regressor width: box (4) + 7 keypoints (14).
const PALM_REGRESSOR_STRIDE: usize = 18;

const NMS_IOU_THRESH: f32 = 0.3;

/// Palm box to hand crop: side multiplier and vertical shift (in box heights).
const HAND_CROP_SCALE: f32 = 2.6;
const HAND_CROP_SHIFT_Y: f32 = -0.5;

pub struct OnnxHandDetector {
    palm_session: ort::session::Session,
    landmark_session: ort::session::Session,
    anchors: Vec<[f32; 2]>,
    confidence: f32,
    max_hands: usize,
}

/// Square sampling window in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct CropWindow {
    x0: f32,
    y0: f32,
    side: f32,
}

impl OnnxHandDetector {
    pub fn new(
        palm_model: &Path,
        landmark_model: &Path,
        confidence: f32,
        max_hands: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            palm_session: build_session(palm_model)?,
            landmark_session: build_session(landmark_model)?,
            anchors: generate_anchors(),
            confidence,
            max_hands,
        })
    }

    /// Palm boxes `[x1, y1, x2, y2]` in frame pixels, best first.
    fn detect_palms(&mut self, frame: &Frame) -> Result<Vec<[f32; 4]>, Box<dyn std::error::Error>> {
        let window = CropWindow {
            x0: 0.0,
            y0: 0.0,
            side: frame.width().max(frame.height()) as f32,
        };
        let input = sample_square(frame, window, PALM_INPUT_SIZE);
        let outputs = self
            .palm_session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;

        if outputs.len() < 2 {
            return Err(format!("palm model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get palm regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get palm score slice")?;

        let (boxes, box_scores) = decode_palms(
            reg_data,
            score_data,
            &self.anchors,
            window.side,
            self.confidence,
        );
        let keep = nms(&boxes, &box_scores, NMS_IOU_THRESH);
        Ok(keep.into_iter().map(|i| boxes[i]).collect())
    }

    fn detect_landmarks(
        &mut self,
        frame: &Frame,
        window: CropWindow,
    ) -> Result<Option<HandObservation>, Box<dyn std::error::Error>> {
        let input = sample_square(frame, window, LANDMARK_INPUT_SIZE);
        let outputs = self
            .landmark_session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;

        if outputs.len() < 2 {
            return Err(
                format!("hand landmark model expected 2+ outputs, got {}", outputs.len()).into(),
            );
        }
        let coords = outputs[0].try_extract_array::<f32>()?;
        let presence = outputs[1].try_extract_array::<f32>()?;
        let coords = coords.as_slice().ok_or("Cannot get landmark slice")?;
        let presence = presence
            .as_slice()
            .and_then(|s| s.first().copied())
            .ok_or("Cannot get hand presence score")?;

        if presence < self.confidence {
            return Ok(None);
        }
        if coords.len() < HAND_LANDMARK_COUNT * 3 {
            return Err(format!(
                "expected {} landmark values, got {}",
                HAND_LANDMARK_COUNT * 3,
                coords.len()
            )
            .into());
        }
        Ok(Some(landmarks_to_frame(
            coords,
            window,
            frame.width(),
            frame.height(),
        )))
    }
}

impl HandDetector for OnnxHandDetector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<HandObservation>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let palms = self.detect_palms(frame)?;
        let mut hands = Vec::new();
        for palm in palms {
            if hands.len() >= self.max_hands {
                break;
            }
            if let Some(hand) = self.detect_landmarks(frame, hand_crop(&palm))? {
                hands.push(hand);
            }
        }
        log::debug!("Hands: {} found", hands.len());
        Ok(hands)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Samples `window` into a `size × size` RGB tensor in [0,1], NHWC.
///
/// Nearest-neighbor; pixels outside the frame are black, which
/// letterboxes non-square frames.
fn sample_square(frame: &Frame, window: CropWindow, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_w = frame.width() as i64;
    let src_h = frame.height() as i64;
    let s = size as usize;
    let step = window.side / size as f32;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, s, s, 3));
    for y in 0..s {
        let src_y = (window.y0 + (y as f32 + 0.5) * step).floor() as i64;
        if src_y < 0 || src_y >= src_h {
            continue;
        }
        for x in 0..s {
            let src_x = (window.x0 + (x as f32 + 0.5) * step).floor() as i64;
            if src_x < 0 || src_x >= src_w {
                continue;
            }
            for c in 0..3 {
                tensor[[0, y, x, c]] = src[[src_y as usize, src_x as usize, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

// ---------------------------------------------------------------------------
// Palm decoding
// ---------------------------------------------------------------------------

/// Anchor centers for the palm model, normalized to the input square.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = PALM_INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

/// Decodes confident palm boxes into frame pixels of a `side`-px square.
fn decode_palms(
    regressors: &[f32],
    raw_scores: &[f32],
    anchors: &[[f32; 2]],
    side: f32,
    confidence: f32,
) -> (Vec<[f32; 4]>, Vec<f32>) {
    let input = PALM_INPUT_SIZE as f32;
    let mut boxes = Vec::new();
    let mut scores = Vec::new();

    for (i, (&raw, anchor)) in raw_scores.iter().zip(anchors).enumerate() {
        let score = sigmoid(raw);
        if score < confidence {
            continue;
        }
        let offset = i * PALM_REGRESSOR_STRIDE;
        let Some(reg) = regressors.get(offset..offset + 4) else {
            break;
        };
        let cx = anchor[0] + reg[0] / input;
        let cy = anchor[1] + reg[1] / input;
        let w = reg[2] / input;
        let h = reg[3] / input;
        boxes.push([
            (cx - w / 2.0) * side,
            (cy - h / 2.0) * side,
            (cx + w / 2.0) * side,
            (cy + h / 2.0) * side,
        ]);
        scores.push(score);
    }
    (boxes, scores)
}

/// Square crop around the whole hand, grown from the palm box.
fn hand_crop(palm: &[f32; 4]) -> CropWindow {
    let w = palm[2] - palm[0];
    let h = palm[3] - palm[1];
    let cx = (palm[0] + palm[2]) / 2.0;
    let cy = (palm[1] + palm[3]) / 2.0 + HAND_CROP_SHIFT_Y * h;
    let side = w.max(h) * HAND_CROP_SCALE;
    CropWindow {
        x0: cx - side / 2.0,
        y0: cy - side / 2.0,
        side,
    }
}

/// Maps landmark-model output (input-pixel units) to frame-normalized points.
fn landmarks_to_frame(
    coords: &[f32],
    window: CropWindow,
    frame_w: u32,
    frame_h: u32,
) -> HandObservation {
    let scale = window.side / LANDMARK_INPUT_SIZE as f32;
    let landmarks = coords
        .chunks_exact(3)
        .take(HAND_LANDMARK_COUNT)
        .map(|p| HandLandmark {
            x: (window.x0 + p[0] * scale) / frame_w as f32,
            y: (window.y0 + p[1] * scale) / frame_h as f32,
            z: p[2] / LANDMARK_INPUT_SIZE as f32,
        })
        .collect();
    HandObservation::new(landmarks)
}
