use crate::shared::frame::Frame;

/// Pixel buffer handed to the video sink.
///
/// Rows are stored bottom row first (the frame flipped vertically);
/// channel order is the frame's own, untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl DisplayBuffer {
    pub fn from_frame(frame: &Frame) -> Self {
        let row_len = frame.width() as usize * frame.channels() as usize;
        let mut data = Vec::with_capacity(frame.data().len());
        if row_len > 0 {
            for row in frame.data().chunks_exact(row_len).rev() {
                data.extend_from_slice(row);
            }
        }
        Self {
            data,
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
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

    /// Top-down RGBA copy for toolkits that expect row 0 at the top.
    pub fn to_top_down_rgba(&self) -> Vec<u8> {
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        if row_len == 0 {
            return rgba;
        }
        for row in self.data.chunks_exact(row_len).rev() {
            for px in row.chunks_exact(channels) {
                match channels {
                    1 | 2 => rgba.extend_from_slice(&[px[0], px[0], px[0], 255]),
                    _ => rgba.extend_from_slice(&[px[0], px[1], px[2], 255]),
                }
            }
        }
        rgba
    }

    /// Top-down frame copy, undoing the display flip.
    #[cfg(test)]
    pub(crate) fn to_frame(&self) -> Frame {
        let row_len = self.width as usize * self.channels as usize;
        let mut data = Vec::with_capacity(self.data.len());
        if row_len > 0 {
            for row in self.data.chunks_exact(row_len).rev() {
                data.extend_from_slice(row);
            }
        }
        Frame::new(data, self.width, self.height, self.channels, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×3 frame whose rows are filled with 1, 2, 3.
    fn striped() -> Frame {
        let mut data = Vec::new();
        for row in 1..=3u8 {
            data.extend(std::iter::repeat(row).take(2 * 3));
        }
        Frame::new(data, 2, 3, 3, 0)
    }

    #[test]
    fn test_bottom_row_first() {
        let buffer = DisplayBuffer::from_frame(&striped());
        assert_eq!(&buffer.data()[..6], &[3; 6]);
        assert_eq!(&buffer.data()[12..], &[1; 6]);
        assert_eq!((buffer.width(), buffer.height()), (2, 3));
    }

    #[test]
    fn test_channel_order_preserved() {
        let frame = Frame::new(vec![10, 20, 30], 1, 1, 3, 0);
        assert_eq!(DisplayBuffer::from_frame(&frame).data(), &[10, 20, 30]);
    }

    #[test]
    fn test_top_down_rgba_restores_orientation() {
        let rgba = DisplayBuffer::from_frame(&striped()).to_top_down_rgba();
        assert_eq!(rgba.len(), 2 * 3 * 4);
        assert_eq!(&rgba[..4], &[1, 1, 1, 255]);
        assert_eq!(&rgba[20..], &[3, 3, 3, 255]);
    }

    #[test]
    fn test_to_frame_round_trips_pixels() {
        let frame = striped();
        assert_eq!(DisplayBuffer::from_frame(&frame).to_frame().data(), frame.data());
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        let buffer = DisplayBuffer::from_frame(&frame);
        assert!(buffer.data().is_empty());
        assert!(buffer.to_top_down_rgba().is_empty());
    }
}
