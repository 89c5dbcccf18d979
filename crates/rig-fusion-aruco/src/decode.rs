//! Reading marker bits from an image-space quad.
//!
//! The quad is mapped from a canonical square of side [`CANONICAL_SIDE`],
//! split into `marker_size + 2 * border_bits` cells per side. Each cell is
//! sampled at its centre with a 3x3 box mean; the black/white threshold is
//! Otsu's over a grid three times finer than the cells.

use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;
use nalgebra::Point2;
use rig_fusion_core::{homography_from_4pt, GrayImageView, Homography};

const CANONICAL_SIDE: f64 = 100.0;
/// Threshold grid refinement relative to the cell grid.
const THRESHOLD_SUBDIV: usize = 3;

#[derive(Clone, Debug)]
pub struct DecodeParams {
    /// Width of the black border, in cells.
    pub border_bits: usize,
    /// Minimum fraction of border cells that must read black.
    pub min_border_score: f32,
    /// Also try white-on-black markers.
    pub detect_inverted: bool,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            border_bits: 1,
            min_border_score: 0.85,
            detect_inverted: false,
        }
    }
}

/// A quad whose bits matched a dictionary entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedMarker {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    /// `border_score * (1 - hamming / bits)`, in `[0, 1]`.
    pub score: f32,
    pub border_score: f32,
    /// Inner bits as read (row-major, black = 1).
    pub code: u64,
    pub inverted: bool,
    /// Marker corners in the marker's own order: top-left, top-right,
    /// bottom-right, bottom-left of the dictionary pattern.
    pub corners: [Point2<f64>; 4],
}

/// Read and match the marker inside `quad`.
///
/// `quad` must be clockwise on screen. The returned corners are re-ordered so
/// that index 0 is the dictionary's top-left corner regardless of the
/// in-plane rotation the marker was observed at.
pub fn decode_marker_in_quad(
    image: &GrayImageView<'_>,
    quad: &[Point2<f64>; 4],
    params: &DecodeParams,
    matcher: &Matcher,
) -> Option<DecodedMarker> {
    let dict = matcher.dictionary();
    let layout = CellLayout::new(dict.marker_size, params.border_bits)?;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(CANONICAL_SIDE, 0.0),
        Point2::new(CANONICAL_SIDE, CANONICAL_SIDE),
        Point2::new(0.0, CANONICAL_SIDE),
    ];
    let h = homography_from_4pt(&square, quad)?;

    let cells = sample_grid(image, &h, layout.cells)?;
    let threshold_samples = sample_grid(image, &h, layout.cells * THRESHOLD_SUBDIV);
    let threshold = otsu_threshold_from_samples(threshold_samples.as_deref().unwrap_or(&cells));

    let polarities: &[bool] = if params.detect_inverted {
        &[false, true]
    } else {
        &[false]
    };
    let (code, border_score, inverted) = polarities
        .iter()
        .map(|&inv| {
            let (code, border) = layout.read(&cells, threshold, inv);
            (code, border, inv)
        })
        .filter(|&(_, border, _)| border >= params.min_border_score)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let m = matcher.match_code(code)?;
    let bit_count = dict.bit_count().max(1) as f32;
    let score = (border_score * (1.0 - m.hamming as f32 / bit_count)).clamp(0.0, 1.0);
    let rot = m.rotation as usize;

    Some(DecodedMarker {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score,
        code,
        inverted,
        corners: std::array::from_fn(|i| quad[(i + rot) % 4]),
    })
}

#[derive(Clone, Copy, Debug)]
struct CellLayout {
    bits: usize,
    border: usize,
    cells: usize,
}

impl CellLayout {
    fn new(bits: usize, border: usize) -> Option<Self> {
        (bits > 0 && bits * bits <= 64).then_some(Self {
            bits,
            border,
            cells: bits + 2 * border,
        })
    }

    fn is_border(&self, cx: usize, cy: usize) -> bool {
        let far = self.cells - self.border;
        cx < self.border || cy < self.border || cx >= far || cy >= far
    }

    /// Inner code and the black fraction of the border cells.
    fn read(&self, samples: &[u8], threshold: u8, inverted: bool) -> (u64, f32) {
        let mut code = 0u64;
        let (mut black_border, mut border_total) = (0u32, 0u32);
        for (i, &v) in samples.iter().enumerate() {
            let (cx, cy) = (i % self.cells, i / self.cells);
            let black = (v < threshold) != inverted;
            if self.is_border(cx, cy) {
                border_total += 1;
                black_border += black as u32;
            } else if black {
                code |= 1u64 << ((cy - self.border) * self.bits + (cx - self.border));
            }
        }
        let border_score = if border_total == 0 {
            1.0
        } else {
            black_border as f32 / border_total as f32
        };
        (code, border_score)
    }
}

/// 3x3 means at the centres of an `n x n` grid over the canonical square,
/// row-major. `None` if any sample falls off the image.
fn sample_grid(image: &GrayImageView<'_>, h: &Homography, n: usize) -> Option<Vec<u8>> {
    let step = CANONICAL_SIDE / n as f64;
    (0..n * n)
        .map(|i| {
            let p = Point2::new(
                ((i % n) as f64 + 0.5) * step,
                ((i / n) as f64 + 0.5) * step,
            );
            box_mean_3x3(image, h.apply(p))
        })
        .collect()
}

fn box_mean_3x3(image: &GrayImageView<'_>, p: Point2<f64>) -> Option<u8> {
    if !p.x.is_finite() || !p.y.is_finite() {
        return None;
    }
    let (x, y) = (p.x.floor() as i64, p.y.floor() as i64);
    let inside = x >= 1 && y >= 1 && x + 1 < image.width as i64 && y + 1 < image.height as i64;
    if !inside {
        return None;
    }
    let (x, y) = (x as i32, y as i32);
    let sum: u32 = (-1..=1)
        .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| image.get(x + dx, y + dy) as u32)
        .sum();
    Some((sum / 9) as u8)
}
