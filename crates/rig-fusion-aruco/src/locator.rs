//! The marker-locator boundary and the square-marker implementation.

use crate::decode::{decode_marker_in_quad, DecodeParams};
use crate::pose::estimate_marker_pose;
use crate::quads::{propose_quads, QuadParams};
use crate::{Dictionary, DictionaryError, Matcher};
use nalgebra::{Point2, Vector2};
use rig_fusion_core::{BgrImage, CameraIntrinsics, MarkerPose};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error("no dictionary file configured for `{0}`")]
    NoDictionary(String),
    #[error("marker length must be positive and finite, got {0}")]
    InvalidMarkerLength(f64),
}

/// One located marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerObservation {
    pub id: u32,
    /// Corners in marker order (top-left, top-right, bottom-right,
    /// bottom-left), pixel centers at integer coordinates.
    pub corners: [Point2<f64>; 4],
    /// Marker pose relative to the color camera.
    pub pose: MarkerPose,
    pub hamming: u8,
    pub score: f32,
}

/// Finds markers of one dictionary and physical size in a color image.
pub trait MarkerLocator {
    /// All markers found in `image`, best first. Never fails: a frame without
    /// a usable marker yields an empty list.
    fn locate(&self, image: &BgrImage) -> Vec<MarkerObservation>;
}

impl<T: MarkerLocator + ?Sized> MarkerLocator for &T {
    fn locate(&self, image: &BgrImage) -> Vec<MarkerObservation> {
        (**self).locate(image)
    }
}

impl<T: MarkerLocator + ?Sized> MarkerLocator for Box<T> {
    fn locate(&self, image: &BgrImage) -> Vec<MarkerObservation> {
        (**self).locate(image)
    }
}

/// Tuning for [`SquareMarkerLocator`].
#[derive(Clone, Debug)]
pub struct LocatorParams {
    /// Physical marker edge length; sets the translation unit.
    pub marker_length: f64,
    pub quads: QuadParams,
    pub decode: DecodeParams,
    pub max_hamming: u8,
    /// When set, markers with other ids are dropped.
    pub target_id: Option<u32>,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            marker_length: 0.1592,
            quads: QuadParams::default(),
            decode: DecodeParams::default(),
            max_hamming: 1,
            target_id: None,
        }
    }
}

/// Threshold, segment, decode and solve pose for square binary markers.
#[derive(Clone, Debug)]
pub struct SquareMarkerLocator {
    matcher: Matcher,
    intrinsics: CameraIntrinsics,
    params: LocatorParams,
}

impl SquareMarkerLocator {
    pub fn new(
        dictionary: Dictionary,
        intrinsics: CameraIntrinsics,
        params: LocatorParams,
    ) -> Result<Self, LocatorError> {
        if !(params.marker_length.is_finite() && params.marker_length > 0.0) {
            return Err(LocatorError::InvalidMarkerLength(params.marker_length));
        }
        log::debug!(
            "marker locator: dictionary {} ({} codes, {}x{} bits), length {}",
            dictionary.name,
            dictionary.codes.len(),
            dictionary.marker_size,
            dictionary.marker_size,
            params.marker_length
        );
        Ok(Self {
            matcher: Matcher::new(dictionary, params.max_hamming),
            intrinsics,
            params,
        })
    }

    /// Build from a dictionary JSON file, checking that the file holds the
    /// dictionary the caller asked for.
    pub fn from_dictionary_file(
        name: &str,
        path: Option<&Path>,
        intrinsics: CameraIntrinsics,
        params: LocatorParams,
    ) -> Result<Self, LocatorError> {
        let path = path.ok_or_else(|| LocatorError::NoDictionary(name.to_string()))?;
        let dictionary = Dictionary::load_json(path)?;
        if dictionary.name != name {
            log::warn!(
                "dictionary file {} holds `{}`, configured `{}`",
                path.display(),
                dictionary.name,
                name
            );
        }
        Self::new(dictionary, intrinsics, params)
    }

    pub fn dictionary(&self) -> &Dictionary {
        self.matcher.dictionary()
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }
}

impl MarkerLocator for SquareMarkerLocator {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    fn locate(&self, image: &BgrImage) -> Vec<MarkerObservation> {
        if !image.is_well_formed() {
            log::warn!(
                "skipping {}x{} frame with {} bytes",
                image.width,
                image.height,
                image.data.len()
            );
            return Vec::new();
        }
        let gray = image.to_gray();
        let view = gray.view();
        let quads = propose_quads(&view, &self.params.quads);

        let mut out: Vec<MarkerObservation> = Vec::new();
        for quad in &quads {
            let Some(det) =
                decode_marker_in_quad(&view, &quad.corners, &self.params.decode, &self.matcher)
            else {
                continue;
            };
            if self.params.target_id.is_some_and(|id| id != det.id) {
                continue;
            }

            // Decoding works on pixel areas; pose and callers expect pixel centers.
            let corners = det.corners.map(|c| c - Vector2::new(0.5, 0.5));
            match estimate_marker_pose(&corners, &self.intrinsics, self.params.marker_length) {
                Ok(pose) => out.push(MarkerObservation {
                    id: det.id,
                    corners,
                    pose,
                    hamming: det.hamming,
                    score: det.score,
                }),
                Err(err) => log::debug!("marker {} dropped: {err}", det.id),
            }
        }

        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut seen = Vec::with_capacity(out.len());
        out.retain(|o| {
            if seen.contains(&o.id) {
                false
            } else {
                seen.push(o.id);
                true
            }
        });

        log::debug!("{} quads, {} markers", quads.len(), out.len());
        out
    }
}
