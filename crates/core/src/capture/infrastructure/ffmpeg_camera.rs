use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

#[cfg(target_os = "linux")]
const CAPTURE_FORMAT: &str = "v4l2";
#[cfg(target_os = "linux")]
const DEFAULT_DEVICE: &str = "/dev/video0";

#[cfg(target_os = "macos")]
const CAPTURE_FORMAT: &str = "avfoundation";
#[cfg(target_os = "macos")]
const DEFAULT_DEVICE: &str = "0";

#[cfg(target_os = "windows")]
const CAPTURE_FORMAT: &str = "dshow";
#[cfg(target_os = "windows")]
const DEFAULT_DEVICE: &str = "video=Integrated Camera";

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_FORMAT: &str = "v4l2";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const DEFAULT_DEVICE: &str = "/dev/video0";

/// Reads webcam frames through libavdevice (v4l2 / avfoundation / dshow).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// The device uses whatever resolution and pixel format it defaults to.
pub struct FfmpegCamera {
    device: Option<OpenDevice>,
    frame_index: usize,
}

struct OpenDevice {
    input_ctx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    stream_index: usize,
}

// Safety: FfmpegCamera is only used from the loop driver's thread.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// Opens `device`, or the platform default capture device.
    pub fn open(device: Option<&str>) -> Result<Self, CaptureError> {
        let device = device.unwrap_or(DEFAULT_DEVICE);
        ffmpeg_next::init().map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == CAPTURE_FORMAT)
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!(
                    "capture backend '{CAPTURE_FORMAT}' not compiled into ffmpeg"
                ))
            })?;

        let input_ctx =
            ffmpeg_next::format::open_with(&device, &format, ffmpeg_next::Dictionary::new())
                .map_err(|e| CaptureError::DeviceUnavailable(format!("{device}: {e}")))?
                .input();

        let stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("{device}: no video stream")))?;
        let stream_index = stream.index();

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{device}: {e}")))?;

        log::info!(
            "Opened camera {device} via {CAPTURE_FORMAT} ({}x{})",
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            device: Some(OpenDevice {
                input_ctx,
                decoder,
                scaler: None,
                stream_index,
            }),
            frame_index: 0,
        })
    }
}

impl FrameSource for FfmpegCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let device = self.device.as_mut().ok_or(CaptureError::Released)?;
        let frame = device.next_frame(self.frame_index)?;
        self.frame_index += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        if self.device.take().is_some() {
            log::info!("Camera released");
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.release();
    }
}

impl OpenDevice {
    /// Feeds packets to the decoder until one full picture comes out.
    fn next_frame(&mut self, index: usize) -> Result<Frame, CaptureError> {
        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded, index);
            }

            let Some((stream, packet)) = self.input_ctx.packets().next() else {
                return Err(CaptureError::EndOfStream);
            };
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| CaptureError::Decode(e.to_string()))?;
        }
    }

    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        index: usize,
    ) -> Result<Frame, CaptureError> {
        let width = decoded.width();
        let height = decoded.height();

        if self.scaler.is_none() {
            let scaler = ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
            self.scaler = Some(scaler);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(CaptureError::Decode("scaler missing".into()));
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let pixels = extract_rgb_pixels(rgb_frame.data(0), rgb_frame.stride(0), width, height);
        Ok(Frame::new(pixels, width, height, 3, index))
    }
}

/// Copies a strided RGB24 plane into a tightly-packed pixel buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn extract_rgb_pixels(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
