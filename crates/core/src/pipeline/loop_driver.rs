use std::time::Instant;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::hand_detector::HandDetector;
use crate::emotion::domain::emotion_classifier::{ClassificationOutcome, EmotionClassifier};
use crate::overlay::overlay_renderer::{AnnotatedFace, OverlayRenderer};
use crate::pipeline::clock::Clock;
use crate::pipeline::display_buffer::DisplayBuffer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::sinks::{StatusSink, VideoSink};
use crate::shared::constants::CAMERA_UNAVAILABLE_TEXT;
use crate::status::domain::status_composer::{compose, StatusSnapshot};
use crate::status::domain::system_context::SystemContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

/// The three perception stages, run in this order every tick.
pub struct Perception {
    pub hands: Box<dyn HandDetector>,
    pub faces: Box<dyn FaceDetector>,
    pub emotions: Box<dyn EmotionClassifier>,
}

/// Where each tick's results go.
pub struct Outputs {
    pub video: Box<dyn VideoSink>,
    pub status: Box<dyn StatusSink>,
}

/// Pulls one frame per tick, runs perception on it, annotates it and
/// publishes the result.
///
/// Owns the frame source. `stop` (or drop) releases it exactly once;
/// after that every tick is a no-op. Only emotion classification is
/// fault-isolated per face; any other stage error ends the tick with `Err`.
pub struct LoopDriver {
    source: Box<dyn FrameSource>,
    perception: Perception,
    renderer: OverlayRenderer,
    context: SystemContext,
    outputs: Outputs,
    clock: Box<dyn Clock>,
    logger: Box<dyn PipelineLogger>,
    state: DriverState,
    ticks: usize,
}

impl LoopDriver {
    pub fn new(
        source: Box<dyn FrameSource>,
        perception: Perception,
        context: SystemContext,
        outputs: Outputs,
        clock: Box<dyn Clock>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            perception,
            renderer: OverlayRenderer::new(),
            context,
            outputs,
            clock,
            logger,
            state: DriverState::Running,
            ticks: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Number of ticks that published a frame.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn tick(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.state == DriverState::Stopped {
            return Ok(());
        }

        let mut frame = match self.source.read() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Frame read failed: {e}");
                self.outputs.status.publish(CAMERA_UNAVAILABLE_TEXT);
                return Ok(());
            }
        };

        let t0 = Instant::now();
        let hands = self.perception.hands.detect(&frame)?;
        self.renderer.draw_hands(&mut frame, &hands);
        let t1 = Instant::now();
        self.logger
            .timing("hands", t1.duration_since(t0).as_secs_f64() * 1000.0);

        let gray = frame.to_grayscale();
        let faces = self.perception.faces.detect(&gray)?;
        let t2 = Instant::now();
        self.logger
            .timing("faces", t2.duration_since(t1).as_secs_f64() * 1000.0);

        let mut annotated = Vec::with_capacity(faces.len());
        for face in faces {
            let label = match self.perception.emotions.classify(&frame.crop(&face)) {
                ClassificationOutcome::Label(label) => Some(label),
                ClassificationOutcome::Failed(reason) => {
                    log::warn!(
                        "Emotion classification failed for face at ({}, {}): {reason}",
                        face.x,
                        face.y
                    );
                    None
                }
            };
            annotated.push(AnnotatedFace { face, label });
        }
        let t3 = Instant::now();
        self.logger
            .timing("emotions", t3.duration_since(t2).as_secs_f64() * 1000.0);

        self.renderer.draw_faces(&mut frame, &annotated);

        let snapshot = StatusSnapshot {
            faces: annotated.len(),
            hands: hands.len(),
            emotions: annotated.iter().filter_map(|a| a.label).collect(),
            time: self.clock.now(),
        };
        let text = compose(&snapshot, &self.context);
        self.outputs.status.publish(&text);
        self.outputs.video.publish(DisplayBuffer::from_frame(&frame));

        self.logger
            .timing("render", t3.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", snapshot.faces as f64);
        self.logger.metric("hands", snapshot.hands as f64);
        self.logger.metric("labels", snapshot.emotions.len() as f64);
        self.ticks += 1;
        self.logger.tick(self.ticks);
        Ok(())
    }

    /// Releases the camera and stops ticking. Idempotent.
    pub fn stop(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        self.state = DriverState::Stopped;
        self.source.release();
        self.logger
            .info(&format!("Loop driver stopped after {} ticks", self.ticks));
        self.logger.summary();
    }
}

impl Drop for LoopDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
