//! Pinhole intrinsics with Brown–Conrady distortion.

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Five-coefficient Brown–Conrady model, driver order `[k1, k2, p1, p2, k3]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

const UNDISTORT_ITERS: usize = 20;

impl BrownConrady {
    /// Build from a coefficient slice; missing trailing entries are zero and
    /// extra entries are ignored.
    pub fn from_coeffs(coeffs: &[f64]) -> Self {
        let c = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        Self {
            k1: c(0),
            k2: c(1),
            p1: c(2),
            p2: c(3),
            k3: c(4),
        }
    }

    pub fn coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_identity(&self) -> bool {
        self.coeffs().iter().all(|c| *c == 0.0)
    }

    /// Distort a normalized image point.
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2;
        let xy = x * y;
        let dx = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;
        Point2::new(x * radial + dx, y * radial + dy)
    }

    /// Fixed-point inversion of [`distort`](Self::distort).
    pub fn undistort(&self, p: Point2<f64>) -> Point2<f64> {
        if self.is_identity() {
            return p;
        }
        let mut u = p;
        for _ in 0..UNDISTORT_ITERS {
            let d = self.distort(u);
            u = Point2::new(u.x - (d.x - p.x), u.y - (d.y - p.y));
        }
        u
    }
}

/// Color camera intrinsics as reported once by the driver at stream start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub ppx: f64,
    pub ppy: f64,
    #[serde(default)]
    pub distortion: BrownConrady,
}

impl CameraIntrinsics {
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.ppx, //
            0.0, self.fy, self.ppy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Pixel → undistorted normalized image coordinates.
    pub fn pixel_to_normalized(&self, px: Point2<f64>) -> Point2<f64> {
        let distorted = Point2::new((px.x - self.ppx) / self.fx, (px.y - self.ppy) / self.fy);
        self.distortion.undistort(distorted)
    }

    /// Camera-frame point → pixel. `None` behind the camera.
    pub fn project(&self, p: &Vector3<f64>) -> Option<Point2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        let d = self.distortion.distort(Point2::new(p.x / p.z, p.y / p.z));
        Some(Point2::new(
            self.fx * d.x + self.ppx,
            self.fy * d.y + self.ppy,
        ))
    }
}
