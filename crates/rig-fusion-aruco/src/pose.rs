//! Single-marker pose from four image corners.
//!
//! Corners are undistorted to normalized image coordinates, a plane-induced
//! homography is fitted from the marker's `Z = 0` model to them, and the
//! homography is decomposed into rotation and translation.

use nalgebra::{Matrix3, Point2, Rotation3, Vector3};
use rig_fusion_core::{homography_from_4pt, CameraIntrinsics, MarkerPose, RotationVector};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("marker length must be positive and finite, got {0}")]
    InvalidMarkerLength(f64),
    #[error("corner coordinates are not finite")]
    NonFiniteCorners,
    #[error("degenerate corner configuration")]
    Degenerate,
}

/// Marker model corners on `Z = 0`, in the marker's corner order
/// (top-left, top-right, bottom-right, bottom-left; +y up).
pub fn marker_object_points(marker_length: f64) -> [Point2<f64>; 4] {
    let h = 0.5 * marker_length;
    [
        Point2::new(-h, h),
        Point2::new(h, h),
        Point2::new(h, -h),
        Point2::new(-h, -h),
    ]
}

/// Estimate the marker pose in the camera frame.
///
/// `corners` are pixel positions with pixel centers at integer coordinates,
/// ordered like [`marker_object_points`].
pub fn estimate_marker_pose(
    corners: &[Point2<f64>; 4],
    intrinsics: &CameraIntrinsics,
    marker_length: f64,
) -> Result<MarkerPose, PoseError> {
    if !(marker_length.is_finite() && marker_length > 0.0) {
        return Err(PoseError::InvalidMarkerLength(marker_length));
    }
    if corners.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(PoseError::NonFiniteCorners);
    }
    if crate::quads::signed_area(corners).abs() < 1e-9 {
        return Err(PoseError::Degenerate);
    }

    let normalized = corners.map(|c| intrinsics.pixel_to_normalized(c));
    let object = marker_object_points(marker_length);
    let h = homography_from_4pt(&object, &normalized).ok_or(PoseError::Degenerate)?;

    let (rotation, translation) = decompose_planar_homography(&h.h)?;
    Ok(MarkerPose::new(
        RotationVector::from_rotation_matrix(&rotation),
        translation,
    ))
}

/// Split `H ~ [r1 r2 t]` (normalized camera, `K = I`) into a proper rotation
/// and a translation with positive depth.
fn decompose_planar_homography(
    h: &Matrix3<f64>,
) -> Result<(Rotation3<f64>, Vector3<f64>), PoseError> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let denom = 0.5 * (h1.norm() + h2.norm());
    if !(denom > 1e-12) {
        return Err(PoseError::Degenerate);
    }
    let lambda = 1.0 / denom;

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::Degenerate);
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::Degenerate);
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }
    if !r_orth.iter().all(|v| v.is_finite()) || !t.iter().all(|v| v.is_finite()) {
        return Err(PoseError::Degenerate);
    }

    Ok((Rotation3::from_matrix_unchecked(r_orth), t))
}
