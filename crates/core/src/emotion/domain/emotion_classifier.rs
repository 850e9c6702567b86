use std::fmt;

use crate::shared::frame::Frame;

/// Dominant facial expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    Contempt,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
            Self::Contempt => "contempt",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassificationFailure {
    /// The crop had no pixels (face box entirely outside the frame).
    EmptyRegion,
    /// The model could not be run or returned unusable output.
    Inference(String),
}

impl fmt::Display for ClassificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRegion => f.write_str("empty face region"),
            Self::Inference(reason) => write!(f, "inference failed: {reason}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassificationOutcome {
    Label(EmotionLabel),
    Failed(ClassificationFailure),
}

/// Best-effort emotion classification of one cropped face.
///
/// Failure is an outcome, not an error: one bad face must not abort the
/// others, so implementations never panic or return early on bad input.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, face: &Frame) -> ClassificationOutcome;
}
