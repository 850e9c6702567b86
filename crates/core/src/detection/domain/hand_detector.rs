use crate::shared::frame::Frame;

/// Number of landmarks in one MediaPipe-style hand skeleton.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Bone segments between landmark indices: palm, then thumb to pinky.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (0, 5),
    (9, 13),
    (13, 17),
    (5, 9),
    (0, 17),
    (1, 2),
    (2, 3),
    (3, 4),
    (5, 6),
    (6, 7),
    (7, 8),
    (9, 10),
    (10, 11),
    (11, 12),
    (13, 14),
    (14, 15),
    (15, 16),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// One keypoint, `x`/`y` normalized to the frame (0..1), `z` relative depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Landmark set for one detected hand, in model keypoint order.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub landmarks: Vec<HandLandmark>,
}

impl HandObservation {
    pub fn new(landmarks: Vec<HandLandmark>) -> Self {
        Self { landmarks }
    }

    /// Landmarks scaled to pixel coordinates of a `width × height` frame.
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<(i32, i32)> {
        self.landmarks
            .iter()
            .map(|lm| {
                (
                    (lm.x * width as f32).round() as i32,
                    (lm.y * height as f32).round() as i32,
                )
            })
            .collect()
    }
}

/// Domain interface for hand landmark detection.
///
/// Implementations keep no state between calls.
pub trait HandDetector: Send {
    fn detect(&mut self, frame: &Frame)
        -> Result<Vec<HandObservation>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connections_reference_valid_landmarks() {
        for &(a, b) in &HAND_CONNECTIONS {
            assert!(a < HAND_LANDMARK_COUNT);
            assert!(b < HAND_LANDMARK_COUNT);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_every_landmark_is_connected() {
        for i in 0..HAND_LANDMARK_COUNT {
            assert!(HAND_CONNECTIONS.iter().any(|&(a, b)| a == i || b == i));
        }
    }

    #[test]
    fn test_to_pixels_scales_and_rounds() {
        let obs = HandObservation::new(vec![
            HandLandmark {
                x: 0.5,
                y: 0.25,
                z: 0.0,
            },
            HandLandmark {
                x: 0.0,
                y: 1.0,
                z: -0.1,
            },
        ]);
        assert_eq!(obs.to_pixels(640, 480), vec![(320, 120), (0, 480)]);
    }
}
