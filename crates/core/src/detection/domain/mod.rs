pub mod face_detector;
pub mod hand_detector;
