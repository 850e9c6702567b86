use crate::detection::domain::hand_detector::{HandObservation, HAND_CONNECTIONS};
use crate::emotion::domain::emotion_classifier::EmotionLabel;
use crate::overlay::drawing::{draw_line, draw_rect, draw_text, fill_circle, Rgb, GLYPH_SIZE};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const FACE_BOX_COLOR: Rgb = [0, 0, 255];
const FACE_BOX_THICKNESS: i32 = 2;
const LABEL_COLOR: Rgb = [0, 255, 0];
const LABEL_SCALE: i32 = 2;
/// Gap between the label baseline and the top edge of its box.
const LABEL_GAP: i32 = 10;
const BONE_COLOR: Rgb = [224, 224, 224];
const BONE_THICKNESS: i32 = 2;
const JOINT_COLOR: Rgb = [255, 0, 0];
const JOINT_RADIUS: i32 = 2;

/// A detected face and, if classification succeeded, its label.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedFace {
    pub face: FaceBox,
    pub label: Option<EmotionLabel>,
}

/// Draws perception results onto the frame in place.
///
/// Hands go first, then every face rectangle, then every label, so labels
/// are never painted over by a neighbouring rectangle.
#[derive(Default)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn draw_hands(&self, frame: &mut Frame, hands: &[HandObservation]) {
        for hand in hands {
            let points = hand.to_pixels(frame.width(), frame.height());
            for &(a, b) in &HAND_CONNECTIONS {
                if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
                    draw_line(frame, pa, pb, BONE_THICKNESS, BONE_COLOR);
                }
            }
            for &(x, y) in &points {
                fill_circle(frame, x, y, JOINT_RADIUS, JOINT_COLOR);
            }
        }
    }

    pub fn draw_faces(&self, frame: &mut Frame, faces: &[AnnotatedFace]) {
        for annotated in faces {
            draw_rect(frame, &annotated.face, FACE_BOX_THICKNESS, FACE_BOX_COLOR);
        }
        for annotated in faces {
            if let Some(label) = annotated.label {
                let top = annotated.face.y - LABEL_GAP - GLYPH_SIZE * LABEL_SCALE;
                draw_text(
                    frame,
                    annotated.face.x,
                    top,
                    label.as_str(),
                    LABEL_SCALE,
                    LABEL_COLOR,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::hand_detector::{HandLandmark, HAND_LANDMARK_COUNT};

    fn blank(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn count_color(frame: &Frame, color: Rgb) -> usize {
        frame
            .data()
            .chunks_exact(3)
            .filter(|p| *p == color.as_slice())
            .count()
    }

    #[test]
    fn test_no_faces_draws_nothing() {
        let mut frame = blank(64, 64);
        OverlayRenderer::new().draw_faces(&mut frame, &[]);
        assert!(frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_unlabelled_face_gets_box_only() {
        let mut frame = blank(100, 100);
        let faces = [AnnotatedFace {
            face: FaceBox::new(40, 40, 30, 30),
            label: None,
        }];
        OverlayRenderer::new().draw_faces(&mut frame, &faces);
        assert!(count_color(&frame, FACE_BOX_COLOR) > 0);
        assert_eq!(count_color(&frame, LABEL_COLOR), 0);
    }

    #[test]
    fn test_label_sits_above_its_box() {
        let mut frame = blank(200, 200);
        let faces = [AnnotatedFace {
            face: FaceBox::new(20, 100, 60, 60),
            label: Some(EmotionLabel::Happy),
        }];
        OverlayRenderer::new().draw_faces(&mut frame, &faces);

        let width = frame.width() as usize;
        let label_rows: Vec<usize> = frame
            .data()
            .chunks_exact(3)
            .enumerate()
            .filter(|(_, p)| *p == LABEL_COLOR.as_slice())
            .map(|(i, _)| i / width)
            .collect();
        assert!(!label_rows.is_empty());
        assert!(label_rows.iter().all(|&row| row < 100 - LABEL_GAP as usize + 1));
    }

    #[test]
    fn test_labels_drawn_over_rectangles() {
        let mut frame = blank(200, 200);
        // second box's top edge runs through the first face's label
        let faces = [
            AnnotatedFace {
                face: FaceBox::new(10, 60, 80, 80),
                label: Some(EmotionLabel::Surprise),
            },
            AnnotatedFace {
                face: FaceBox::new(0, 40, 150, 150),
                label: None,
            },
        ];
        OverlayRenderer::new().draw_faces(&mut frame, &faces);
        let label_top = 60 - LABEL_GAP - GLYPH_SIZE * LABEL_SCALE;
        let row = 40usize;
        assert!(label_top <= row as i32);
        let w = frame.width() as usize;
        let row_pixels = &frame.data()[row * w * 3..(row + 1) * w * 3];
        assert!(row_pixels
            .chunks_exact(3)
            .any(|p| p == LABEL_COLOR.as_slice()));
    }

    #[test]
    fn test_hand_skeleton_drawn() {
        let mut frame = blank(100, 100);
        let landmarks = (0..HAND_LANDMARK_COUNT)
            .map(|i| HandLandmark {
                x: 0.2 + i as f32 * 0.03,
                y: 0.5,
                z: 0.0,
            })
            .collect();
        OverlayRenderer::new().draw_hands(&mut frame, &[HandObservation::new(landmarks)]);
        assert!(count_color(&frame, JOINT_COLOR) > 0);
        assert!(count_color(&frame, BONE_COLOR) > 0);
    }

    #[test]
    fn test_hand_off_frame_is_clipped() {
        let mut frame = blank(50, 50);
        let landmarks = vec![
            HandLandmark {
                x: -3.0,
                y: 4.0,
                z: 0.0,
            };
            HAND_LANDMARK_COUNT
        ];
        OverlayRenderer::new().draw_hands(&mut frame, &[HandObservation::new(landmarks)]);
        assert!(frame.data().iter().all(|&v| v == 0));
    }
}
