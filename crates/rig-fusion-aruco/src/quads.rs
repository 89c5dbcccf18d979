//! Dark-blob segmentation and quadrilateral fitting.
//!
//! Candidates come from 4-connected components of the local-mean threshold
//! mask. Each component is reduced to four extreme pixels: the pixel farthest
//! from the centroid, the pixel farthest from that one, and the two pixels
//! farthest on either side of the resulting diagonal.

use crate::threshold::adaptive_threshold_mask;
use nalgebra::{Point2, Vector2};
use rig_fusion_core::GrayImageView;
use std::collections::VecDeque;

/// Segmentation parameters for quad proposals.
#[derive(Clone, Debug)]
pub struct QuadParams {
    /// Half-size of the local-mean window in pixels.
    pub window_radius: usize,
    /// A pixel is dark when it is this much below its local mean.
    pub threshold_constant: f32,
    /// Components smaller than this (in pixels) are ignored.
    pub min_component_px: usize,
    /// Shortest acceptable quad side in pixels.
    pub min_side_px: f64,
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            window_radius: 10,
            threshold_constant: 10.0,
            min_component_px: 64,
            min_side_px: 16.0,
        }
    }
}

/// Candidate quad in continuous pixel coordinates (pixel `i` spans `[i, i+1)`).
///
/// Corners are clockwise on screen (y down) starting from the corner closest
/// to the image origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Point2<f64>; 4],
    /// Number of pixels in the source component.
    pub area_px: usize,
}

/// Segment dark blobs and fit one quad per blob.
pub fn propose_quads(img: &GrayImageView<'_>, params: &QuadParams) -> Vec<Quad> {
    let mask = adaptive_threshold_mask(img, params.window_radius, params.threshold_constant);
    let (w, h) = (img.width, img.height);
    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();
    let mut component: Vec<(usize, usize)> = Vec::new();

    for start in 0..w * h {
        if !mask[start] || visited[start] {
            continue;
        }

        component.clear();
        let mut touches_border = false;
        visited[start] = true;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (x, y) = (idx % w, idx / w);
            component.push((x, y));
            if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                touches_border = true;
            }

            let mut visit = |n: usize| {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        if touches_border || component.len() < params.min_component_px {
            continue;
        }
        if let Some(corners) = fit_quad(&component, params.min_side_px) {
            out.push(Quad {
                corners,
                area_px: component.len(),
            });
        }
    }

    out
}

fn fit_quad(pixels: &[(usize, usize)], min_side_px: f64) -> Option<[Point2<f64>; 4]> {
    let centers: Vec<Point2<f64>> = pixels
        .iter()
        .map(|&(x, y)| Point2::new(x as f64 + 0.5, y as f64 + 0.5))
        .collect();
    let n = centers.len() as f64;
    let centroid = Point2::from(
        centers
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords)
            / n,
    );

    let a = farthest_from(&centers, centroid)?;
    let b = farthest_from(&centers, centers[a])?;
    let ab = centers[b] - centers[a];

    let mut side_pos = (0.0f64, None);
    let mut side_neg = (0.0f64, None);
    for (i, p) in centers.iter().enumerate() {
        let ap = p - centers[a];
        let cross = ab.x * ap.y - ab.y * ap.x;
        if cross > side_pos.0 {
            side_pos = (cross, Some(i));
        }
        if cross < side_neg.0 {
            side_neg = (cross, Some(i));
        }
    }
    let (c, d) = (side_pos.1?, side_neg.1?);

    // a, c, b, d walk the outline; outward corner offsets move each pixel
    // center onto the blob boundary.
    let mut corners = [a, c, b, d].map(|i| {
        let p = centers[i];
        let sx = (p.x - centroid.x).signum();
        let sy = (p.y - centroid.y).signum();
        Point2::new(p.x + 0.5 * sx, p.y + 0.5 * sy)
    });

    if signed_area(&corners) < 0.0 {
        corners.swap(1, 3);
    }
    let area = signed_area(&corners);
    if !(area > 0.0) {
        return None;
    }

    let start = (0..4)
        .min_by(|&i, &j| {
            let si = corners[i].x + corners[i].y;
            let sj = corners[j].x + corners[j].y;
            si.total_cmp(&sj)
        })
        .unwrap_or(0);
    corners.rotate_left(start);

    let shortest = (0..4)
        .map(|i| (corners[(i + 1) % 4] - corners[i]).norm())
        .fold(f64::INFINITY, f64::min);
    if shortest < min_side_px {
        return None;
    }

    Some(corners)
}

fn farthest_from(points: &[Point2<f64>], from: Point2<f64>) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p - from).norm_squared()))
        .max_by(|l, r| l.1.total_cmp(&r.1))
        .map(|(i, _)| i)
}

/// Shoelace area; positive for clockwise-on-screen (y down) order.
pub(crate) fn signed_area(c: &[Point2<f64>; 4]) -> f64 {
    let mut acc = 0.0;
    for i in 0..4 {
        let p = c[i];
        let q = c[(i + 1) % 4];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rig_fusion_core::GrayImage;

    fn white_with_square(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> GrayImage {
        let mut img = GrayImage::filled(w, h, 255);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.data[y * w + x] = 0;
            }
        }
        img
    }

    #[test]
    fn axis_aligned_square_yields_exact_corners() {
        let img = white_with_square(100, 80, 30, 20, 30);
        let quads = propose_quads(&img.view(), &QuadParams::default());
        assert_eq!(quads.len(), 1);
        let c = quads[0].corners;
        let expected = [(30.0, 20.0), (60.0, 20.0), (60.0, 50.0), (30.0, 50.0)];
        for (got, (ex, ey)) in c.iter().zip(expected) {
            assert_relative_eq!(got.x, ex, epsilon = 1e-9);
            assert_relative_eq!(got.y, ey, epsilon = 1e-9);
        }
        assert!(signed_area(&c) > 0.0);
    }

    #[test]
    fn small_and_border_touching_blobs_are_ignored() {
        let mut img = white_with_square(100, 100, 10, 10, 5);
        for y in 40..80 {
            for x in 0..30 {
                img.data[y * 100 + x] = 0;
            }
        }
        let quads = propose_quads(&img.view(), &QuadParams::default());
        assert!(quads.is_empty());
    }

    #[test]
    fn signed_area_is_positive_for_screen_clockwise() {
        let cw = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert_relative_eq!(signed_area(&cw), 4.0);
        let mut ccw = cw;
        ccw.swap(1, 3);
        assert_relative_eq!(signed_area(&ccw), -4.0);
    }
}
