//! Four-point homographies: `dst ~ H * src`.
//!
//! Solved with the normalized DLT: both point sets are moved to zero mean and
//! mean radius `sqrt(2)`, `A h = 0` is solved by SVD, and the result is
//! de-normalized and scaled so `H[2,2] == 1`.

use nalgebra::{Matrix3, Point2, SMatrix, Vector3};

/// Planar projective map `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v.x / v.z, v.y / v.z)
    }
}

/// Similarity taking `pts` to zero mean and mean radius `sqrt(2)`.
fn conditioning(pts: &[Point2<f64>; 4]) -> Option<([Point2<f64>; 4], Matrix3<f64>)> {
    let c = pts.iter().fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0)) / 4.0;
    let radius = pts
        .iter()
        .map(|p| (p.x - c.x).hypot(p.y - c.y))
        .sum::<f64>()
        / 4.0;
    if !radius.is_finite() || radius < 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / radius;
    let t = Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0);
    Some((pts.map(|p| Point2::new(s * (p.x - c.x), s * (p.y - c.y))), t))
}

/// True when any three of the (conditioned) points are collinear.
fn has_collinear_triple(pts: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let (ab, ac) = (pts[b] - pts[a], pts[c] - pts[a]);
        (ab.x * ac.y - ab.y * ac.x).abs() < 1e-9
    })
}

/// Homography taking each `src[i]` to `dst[i]`.
///
/// Returns `None` for degenerate input: repeated points, three collinear
/// points on either side, or non-finite coordinates.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let (src_n, t_src) = conditioning(src)?;
    let (dst_n, t_dst) = conditioning(dst)?;
    if has_collinear_triple(&src_n) || has_collinear_triple(&dst_n) {
        return None;
    }

    // Eight equations in nine unknowns; the last row stays zero so the
    // system is square.
    let mut a = SMatrix::<f64, 9, 9>::zeros();
    for (k, (p, q)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let row_u = [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u];
        let row_v = [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v];
        for c in 0..9 {
            a[(2 * k, c)] = row_u[c];
            a[(2 * k + 1, c)] = row_v[c];
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let null = v_t.row(svd.singular_values.imin());
    let hn = Matrix3::from_fn(|r, c| null[3 * r + c]);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if !scale.is_finite() || scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}
