use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera stream ended")]
    EndOfStream,
    #[error("failed to decode camera frame: {0}")]
    Decode(String),
    #[error("camera already released")]
    Released,
}

/// Produces one raw frame per request from a single capture device.
///
/// Owned exclusively by the loop driver. `release` is called exactly once
/// on shutdown; reads after that fail with [`CaptureError::Released`].
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;

    fn release(&mut self);
}

/// Stand-in for a camera that could not be opened at startup.
///
/// Every read fails, so the driver keeps reporting the camera as
/// unavailable instead of the process exiting.
pub struct UnavailableFrameSource {
    reason: String,
}

impl UnavailableFrameSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl FrameSource for UnavailableFrameSource {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::DeviceUnavailable(self.reason.clone()))
    }

    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_source_always_fails() {
        let mut source = UnavailableFrameSource::new("no /dev/video0");
        for _ in 0..3 {
            let err = source.read().unwrap_err();
            assert!(err.to_string().contains("no /dev/video0"));
        }
    }
}
