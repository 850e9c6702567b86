/// Axis-aligned face rectangle in frame pixel coordinates.
///
/// Detector output is normally inside the frame, but every consumer clips
/// through [`FaceBox::clamped_corners`] rather than trusting that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// `(x1, y1, x2, y2)` clipped to a `frame_w × frame_h` frame, with
    /// `x1 <= x2` and `y1 <= y2` always holding.
    pub fn clamped_corners(&self, frame_w: u32, frame_h: u32) -> (usize, usize, usize, usize) {
        let fw = frame_w as i64;
        let fh = frame_h as i64;
        let x1 = (self.x as i64).clamp(0, fw);
        let y1 = (self.y as i64).clamp(0, fh);
        let x2 = (self.right() as i64).clamp(x1, fw);
        let y2 = (self.bottom() as i64).clamp(y1, fh);
        (x1 as usize, y1 as usize, x2 as usize, y2 as usize)
    }
}
