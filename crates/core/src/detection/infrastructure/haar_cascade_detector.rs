//! Multi-scale sliding-window face detector over a boosted Haar cascade.
//!
//! Scans an image pyramid, evaluates the cascade on each window with
//! variance-normalized feature responses, then merges overlapping hits
//! the way OpenCV's `groupRectangles` does.

use std::collections::HashMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::haar_cascade::{CascadeError, HaarCascade};
use crate::detection::infrastructure::math::{find, union};
use crate::shared::constants::{
    CASCADE_MIN_FACE_SIZE, CASCADE_MIN_NEIGHBORS, CASCADE_SCALE_FACTOR,
};
use crate::shared::face_box::FaceBox;

/// Relative tolerance for two hits to count as the same face.
const GROUP_EPS: f64 = 0.2;

/// Slack on the stage threshold, absorbing float error in the sums.
const STAGE_EPS: f64 = 1e-5;

/// Pyramid and grouping parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    /// Window growth per pyramid level; must exceed 1.
    pub scale_factor: f64,
    /// A merged face needs more than this many raw hits.
    pub min_neighbors: usize,
    /// Smallest window side, in source pixels.
    pub min_size: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: CASCADE_SCALE_FACTOR,
            min_neighbors: CASCADE_MIN_NEIGHBORS,
            min_size: CASCADE_MIN_FACE_SIZE,
        }
    }
}

pub struct HaarCascadeDetector {
    cascade: HaarCascade,
    params: CascadeParams,
}

impl HaarCascadeDetector {
    pub fn new(cascade_path: &Path, params: CascadeParams) -> Result<Self, CascadeError> {
        let cascade = HaarCascade::load(cascade_path)?;
        log::info!(
            "Loaded Haar cascade {} ({} stages, {}x{} window)",
            cascade_path.display(),
            cascade.stages.len(),
            cascade.window_width,
            cascade.window_height
        );
        Ok(Self::from_cascade(cascade, params))
    }

    pub fn from_cascade(cascade: HaarCascade, params: CascadeParams) -> Self {
        let params = CascadeParams {
            scale_factor: if params.scale_factor > 1.0 {
                params.scale_factor
            } else {
                log::warn!(
                    "Scale factor {} must exceed 1, using {CASCADE_SCALE_FACTOR}",
                    params.scale_factor
                );
                CASCADE_SCALE_FACTOR
            },
            ..params
        };
        Self { cascade, params }
    }

    /// Raw window hits across the pyramid, in source coordinates.
    fn candidates(&self, gray: &GrayImage) -> Vec<FaceBox> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = (self.cascade.window_width, self.cascade.window_height);
        let mut hits = Vec::new();

        for factor in pyramid_scales(
            img_w,
            img_h,
            win_w,
            win_h,
            self.params.scale_factor,
            self.params.min_size,
        ) {
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                continue;
            }

            let integral = if (scaled_w, scaled_h) == (img_w, img_h) {
                IntegralImage::new(gray)
            } else {
                IntegralImage::new(&imageops::resize(
                    gray,
                    scaled_w,
                    scaled_h,
                    FilterType::Triangle,
                ))
            };

            let window_w = (win_w as f64 * factor).round() as i32;
            let window_h = (win_h as f64 * factor).round() as i32;
            let step = if factor > 2.0 { 1 } else { 2 };

            for y in (0..=scaled_h - win_h).step_by(step) {
                for x in (0..=scaled_w - win_w).step_by(step) {
                    if self.passes(&integral, x, y) {
                        hits.push(FaceBox::new(
                            (x as f64 * factor).round() as i32,
                            (y as f64 * factor).round() as i32,
                            window_w,
                            window_h,
                        ));
                    }
                }
            }
        }
        hits
    }

    /// Runs every stage on the window at `(x, y)`; false on first rejection.
    fn passes(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        let (win_w, win_h) = (self.cascade.window_width, self.cascade.window_height);

        let area = ((win_w - 2) * (win_h - 2)) as f64;
        let sum = integral.sum(x + 1, y + 1, win_w - 2, win_h - 2) as f64;
        let sq_sum = integral.sq_sum(x + 1, y + 1, win_w - 2, win_h - 2) as f64;
        let variance = area * sq_sum - sum * sum;
        let norm = if variance > 0.0 { variance.sqrt() } else { 1.0 };

        for stage in &self.cascade.stages {
            let mut total = 0.0f64;
            for wc in &stage.classifiers {
                let mut idx = 0usize;
                let leaf = loop {
                    let node = &wc.nodes[idx];
                    let value = self.feature_response(integral, node.feature, x, y) / norm;
                    let next = if value < node.threshold as f64 {
                        node.left
                    } else {
                        node.right
                    };
                    if next <= 0 {
                        break wc.leaves[(-next) as usize];
                    }
                    idx = next as usize;
                };
                total += leaf as f64;
            }
            if total < stage.threshold as f64 - STAGE_EPS {
                return false;
            }
        }
        true
    }

    fn feature_response(&self, integral: &IntegralImage, feature: usize, x: u32, y: u32) -> f64 {
        self.cascade.features[feature]
            .rects
            .iter()
            .map(|r| r.weight as f64 * integral.sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }
}

impl FaceDetector for HaarCascadeDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let hits = self.candidates(gray);
        let faces = group_rectangles(&hits, self.params.min_neighbors, GROUP_EPS);
        log::debug!("Cascade: {} raw hits -> {} faces", hits.len(), faces.len());
        Ok(faces)
    }
}

/// Scale factors whose window fits the image and meets `min_size`.
fn pyramid_scales(
    img_w: u32,
    img_h: u32,
    win_w: u32,
    win_h: u32,
    scale_factor: f64,
    min_size: u32,
) -> Vec<f64> {
    let mut scales = Vec::new();
    let mut factor = 1.0f64;
    loop {
        let window_w = (win_w as f64 * factor).round() as u32;
        let window_h = (win_h as f64 * factor).round() as u32;
        if window_w > img_w || window_h > img_h {
            break;
        }
        if window_w >= min_size && window_h >= min_size {
            scales.push(factor);
        }
        factor *= scale_factor;
    }
    scales
}

/// Summed-area tables with a zero top row and left column.
struct IntegralImage {
    stride: usize,
    sum: Vec<i64>,
    sq_sum: Vec<i64>,
}

impl IntegralImage {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0i64; stride * (h + 1)];
        let mut sq_sum = vec![0i64; stride * (h + 1)];
        let pixels = gray.as_raw();

        for y in 0..h {
            let mut row_sum = 0i64;
            let mut row_sq = 0i64;
            for x in 0..w {
                let v = pixels[y * w + x] as i64;
                row_sum += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row_sum;
                sq_sum[at] = sq_sum[at - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        Self::rect(&self.sum, self.stride, x, y, w, h)
    }

    fn sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        Self::rect(&self.sq_sum, self.stride, x, y, w, h)
    }

    fn rect(table: &[i64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> i64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    }
}

fn similar(a: &FaceBox, b: &FaceBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    (a.x - b.x).abs() as f64 <= delta
        && (a.y - b.y).abs() as f64 <= delta
        && (a.right() - b.right()).abs() as f64 <= delta
        && (a.bottom() - b.bottom()).abs() as f64 <= delta
}

/// Clusters similar hits, averages each cluster, and keeps clusters with
/// more than `min_neighbors` members that are not swallowed by a
/// stronger enclosing cluster. `min_neighbors == 0` returns hits as-is.
fn group_rectangles(hits: &[FaceBox], min_neighbors: usize, eps: f64) -> Vec<FaceBox> {
    if min_neighbors == 0 || hits.is_empty() {
        return hits.to_vec();
    }

    let n = hits.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&hits[i], &hits[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    // (x, y, w, h, count) per cluster, in first-seen order
    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut acc: Vec<[i64; 5]> = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        let root = find(&mut parent, i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            acc.push([0; 5]);
            acc.len() - 1
        });
        let a = &mut acc[slot];
        a[0] += hit.x as i64;
        a[1] += hit.y as i64;
        a[2] += hit.width as i64;
        a[3] += hit.height as i64;
        a[4] += 1;
    }

    let clusters: Vec<(FaceBox, usize)> = acc
        .iter()
        .map(|a| {
            let count = a[4] as f64;
            let avg = |v: i64| (v as f64 / count).round() as i32;
            (FaceBox::new(avg(a[0]), avg(a[1]), avg(a[2]), avg(a[3])), a[4] as usize)
        })
        .collect();

    clusters
        .iter()
        .enumerate()
        .filter(|&(_, &(_, n1))| n1 > min_neighbors)
        .filter(|&(i, &(r1, n1))| {
            !clusters.iter().enumerate().any(|(j, &(r2, n2))| {
                if j == i || n2 <= min_neighbors {
                    return false;
                }
                let dx = (r2.width as f64 * eps).round() as i32;
                let dy = (r2.height as f64 * eps).round() as i32;
                r1.x >= r2.x - dx
                    && r1.y >= r2.y - dy
                    && r1.right() <= r2.right() + dx
                    && r1.bottom() <= r2.bottom() + dy
                    && (n2 > n1.max(3) || n1 < 3)
            })
        })
        .map(|(_, &(r, _))| r)
        .collect()
}
