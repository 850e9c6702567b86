use image::GrayImage;
use ndarray::ArrayView3;

use crate::shared::face_box::FaceBox;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Lives for exactly one tick of the loop driver. Overlays are drawn
/// directly into `data`, so the frame that reaches the display is the
/// same buffer the detectors saw.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel intensity using ITU-R BT.601 luma weights.
    pub fn to_grayscale(&self) -> GrayImage {
        let channels = self.channels as usize;
        let luma: Vec<u8> = self
            .data
            .chunks_exact(channels)
            .map(|px| {
                if channels < 3 {
                    return px[0];
                }
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().min(255.0) as u8
            })
            .collect();
        GrayImage::from_raw(self.width, self.height, luma)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the part of `face` that lies inside the frame.
    ///
    /// Returns an empty (0×0) frame when the box misses the frame entirely.
    pub fn crop(&self, face: &FaceBox) -> Frame {
        let (x1, y1, x2, y2) = face.clamped_corners(self.width, self.height);
        let crop_w = x2 - x1;
        let crop_h = y2 - y1;
        let channels = self.channels as usize;
        let stride = self.width as usize * channels;

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1..y2 {
            let start = row * stride + x1 * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels, self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
