//! Square binary fiducial markers: dictionaries, location and pose.
//!
//! The pipeline behind [`SquareMarkerLocator`]:
//! - local-mean thresholding and dark-blob quad proposals,
//! - bit sampling inside each quad through a homography, matched against a
//!   [`Dictionary`] in all four rotations,
//! - single-marker pose from the four reordered corners.
//!
//! Dictionaries are loaded from JSON at runtime; none are compiled in.

mod decode;
mod dictionary;
mod locator;
mod matcher;
mod pose;
mod quads;
mod threshold;

pub use decode::{decode_marker_in_quad, DecodeParams, DecodedMarker};
pub use dictionary::{Dictionary, DictionaryError};
pub use locator::{LocatorError, LocatorParams, MarkerLocator, MarkerObservation, SquareMarkerLocator};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use pose::{estimate_marker_pose, marker_object_points, PoseError};
pub use quads::{propose_quads, Quad, QuadParams};
