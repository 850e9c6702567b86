pub mod haar_cascade;
pub mod haar_cascade_detector;
mod math;
pub mod onnx_hand_detector;
