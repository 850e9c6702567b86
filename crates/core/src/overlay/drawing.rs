//! Raster primitives over an RGB [`Frame`]. Everything clips to the frame.

use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

pub type Rgb = [u8; 3];

/// Glyph cell side of the bitmap font, before scaling.
pub const GLYPH_SIZE: i32 = 8;

pub fn set_pixel(frame: &mut Frame, x: i32, y: i32, color: Rgb) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let channels = frame.channels() as usize;
    let at = (y as usize * w as usize + x as usize) * channels;
    let n = channels.min(3);
    frame.data_mut()[at..at + n].copy_from_slice(&color[..n]);
}

/// Square brush of side `thickness` anchored on `(x, y)`.
fn stamp(frame: &mut Frame, x: i32, y: i32, thickness: i32, color: Rgb) {
    let lo = -(thickness / 2);
    let hi = thickness - 1 + lo;
    for dy in lo..=hi {
        for dx in lo..=hi {
            set_pixel(frame, x + dx, y + dy, color);
        }
    }
}

/// Bresenham line.
pub fn draw_line(
    frame: &mut Frame,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    thickness: i32,
    color: Rgb,
) {
    let thickness = thickness.max(1);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;
    loop {
        stamp(frame, x, y, thickness, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Rectangle outline along the box edges (right/bottom edges inclusive).
pub fn draw_rect(frame: &mut Frame, face: &FaceBox, thickness: i32, color: Rgb) {
    let (x0, y0) = (face.x, face.y);
    let (x1, y1) = (face.right(), face.bottom());
    draw_line(frame, (x0, y0), (x1, y0), thickness, color);
    draw_line(frame, (x1, y0), (x1, y1), thickness, color);
    draw_line(frame, (x1, y1), (x0, y1), thickness, color);
    draw_line(frame, (x0, y1), (x0, y0), thickness, color);
}

pub fn fill_circle(frame: &mut Frame, cx: i32, cy: i32, radius: i32, color: Rgb) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                set_pixel(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Draws `text` with its top-left corner at `(x, y)`.
///
/// Characters outside the basic Latin set advance the cursor blank.
pub fn draw_text(frame: &mut Frame, x: i32, y: i32, text: &str, scale: i32, color: Rgb) {
    let scale = scale.max(1);
    let mut cursor = x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            set_pixel(
                                frame,
                                cursor + col * scale + sx,
                                y + row as i32 * scale + sy,
                                color,
                            );
                        }
                    }
                }
            }
        }
        cursor += GLYPH_SIZE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = [255, 0, 0];

    fn blank(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> Rgb {
        let at = ((y * frame.width() + x) * 3) as usize;
        let d = frame.data();
        [d[at], d[at + 1], d[at + 2]]
    }

    fn lit(frame: &Frame) -> usize {
        frame
            .data()
            .chunks_exact(3)
            .filter(|p| p.iter().any(|&v| v != 0))
            .count()
    }

    #[test]
    fn test_set_pixel_out_of_bounds_is_ignored() {
        let mut frame = blank(4, 4);
        set_pixel(&mut frame, -1, 0, RED);
        set_pixel(&mut frame, 4, 2, RED);
        set_pixel(&mut frame, 2, 40, RED);
        assert_eq!(lit(&frame), 0);
        set_pixel(&mut frame, 3, 3, RED);
        assert_eq!(pixel(&frame, 3, 3), RED);
    }

    #[test]
    fn test_horizontal_line_covers_endpoints() {
        let mut frame = blank(10, 5);
        draw_line(&mut frame, (1, 2), (8, 2), 1, RED);
        assert_eq!(lit(&frame), 8);
        assert_eq!(pixel(&frame, 1, 2), RED);
        assert_eq!(pixel(&frame, 8, 2), RED);
    }

    #[test]
    fn test_line_partly_outside_is_clipped() {
        let mut frame = blank(10, 10);
        draw_line(&mut frame, (-20, -20), (30, 30), 1, RED);
        assert_eq!(lit(&frame), 10);
    }

    #[test]
    fn test_rect_outline_leaves_interior() {
        let mut frame = blank(20, 20);
        draw_rect(&mut frame, &FaceBox::new(5, 5, 10, 10), 1, RED);
        assert_eq!(pixel(&frame, 5, 5), RED);
        assert_eq!(pixel(&frame, 15, 15), RED);
        assert_eq!(pixel(&frame, 10, 10), [0, 0, 0]);
        assert_eq!(lit(&frame), 40);
    }

    #[test]
    fn test_rect_outside_frame_draws_nothing() {
        let mut frame = blank(20, 20);
        draw_rect(&mut frame, &FaceBox::new(50, 50, 10, 10), 2, RED);
        assert_eq!(lit(&frame), 0);
    }

    #[test]
    fn test_fill_circle_radius_one() {
        let mut frame = blank(5, 5);
        fill_circle(&mut frame, 2, 2, 1, RED);
        assert_eq!(lit(&frame), 5);
    }

    #[test]
    fn test_text_draws_inside_its_cell() {
        let mut frame = blank(40, 20);
        draw_text(&mut frame, 2, 2, "A", 2, RED);
        let drawn = lit(&frame);
        assert!(drawn > 0);
        for y in 0..20 {
            for x in 0..40 {
                if pixel(&frame, x, y) == RED {
                    assert!((2..18).contains(&x) && (2..18).contains(&y));
                }
            }
        }
    }

    #[test]
    fn test_text_above_frame_is_clipped() {
        let mut frame = blank(40, 20);
        draw_text(&mut frame, 0, -100, "happy", 2, RED);
        assert_eq!(lit(&frame), 0);
    }
}
