//! Real-time face, hand and emotion overlay for a webcam feed.
//!
//! The [`pipeline::loop_driver::LoopDriver`] pulls one camera frame per tick,
//! runs hand landmarks, Haar-cascade face detection and per-face emotion
//! classification over it, draws the results and publishes the annotated
//! frame plus a status panel text to host-provided sinks.

pub mod capture;
pub mod detection;
pub mod emotion;
pub mod overlay;
pub mod pipeline;
pub mod shared;
pub mod status;
