//! Dictionary metadata and packed marker codes.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("marker_size {marker_size} implies {bits} bits > 64 (unsupported)")]
    TooManyBits { marker_size: usize, bits: usize },
    #[error("dictionary `{0}` has no codes")]
    Empty(String),
    #[error("code #{index} ({code:#x}) does not fit in {bits} bits")]
    CodeOutOfRange { index: usize, code: u64, bits: usize },
}

/// An ArUco-style marker dictionary.
///
/// Loaded at runtime from JSON of the form
/// `{"name": "...", "marker_size": 5, "max_correction_bits": 3, "codes": [..]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: String,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order with **black = 1**.
    pub codes: Vec<u64>,
}

impl Dictionary {
    pub fn new(
        name: impl Into<String>,
        marker_size: usize,
        max_correction_bits: u8,
        codes: Vec<u64>,
    ) -> Result<Self, DictionaryError> {
        let dict = Self {
            name: name.into(),
            marker_size,
            max_correction_bits,
            codes,
        };
        dict.validate()?;
        Ok(dict)
    }

    /// Load and validate a dictionary from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let raw = fs::read_to_string(path)?;
        let dict: Self = serde_json::from_str(&raw)?;
        dict.validate()?;
        Ok(dict)
    }

    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    fn validate(&self) -> Result<(), DictionaryError> {
        let bits = self.bit_count();
        if bits > 64 {
            return Err(DictionaryError::TooManyBits {
                marker_size: self.marker_size,
                bits,
            });
        }
        if self.codes.is_empty() {
            return Err(DictionaryError::Empty(self.name.clone()));
        }
        if bits < 64 {
            if let Some((index, &code)) = self
                .codes
                .iter()
                .enumerate()
                .find(|(_, &c)| c >> bits != 0)
            {
                return Err(DictionaryError::CodeOutOfRange { index, code, bits });
            }
        }
        Ok(())
    }
}
