//! Difference hash (dHash) fingerprints of listing photos.
//!
//! The image is converted to grayscale and resized to `(N + 1) x N`. Each row
//! then yields one bit per adjacent column pair: 1 when the right pixel is
//! brighter than the left one. Bits are packed eight per byte, row-major.
//!
//! The hash survives resizing and recompression. Flips, rotations and crops
//! produce unrelated fingerprints.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FingerprintParseError, SimilarityError};

/// Grid size giving 256-bit fingerprints
pub const DEFAULT_GRID_SIZE: u32 = 16;

/// Fixed-length bit vector produced by [`DifferenceHasher`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn bit_len(&self) -> usize {
        self.0.len() * 8
    }

    /// Number of differing bits. Both fingerprints must have the same length.
    pub fn hamming_distance(&self, other: &Fingerprint) -> Result<u32, SimilarityError> {
        if self.0.len() != other.0.len() {
            return Err(SimilarityError::LengthMismatch {
                left: self.bit_len(),
                right: other.bit_len(),
            });
        }

        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_hex(hex: &str) -> Result<Self, FingerprintParseError> {
        if hex.len() % 2 != 0 || !hex.is_ascii() {
            return Err(FingerprintParseError(hex.to_string()));
        }

        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map(Self)
            .map_err(|_| FingerprintParseError(hex.to_string()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.to_hex()
    }
}

/// Computes difference hashes on an `N x N` comparison grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferenceHasher {
    grid_size: u32,
}

impl DifferenceHasher {
    pub fn new(grid_size: u32) -> Self {
        Self { grid_size }
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Length in bits of every fingerprint this hasher produces.
    pub fn bit_len(&self) -> usize {
        let n = self.grid_size as usize;
        let cells = n * n;
        cells.div_ceil(8) * 8
    }

    pub fn fingerprint(&self, image: &DynamicImage) -> Fingerprint {
        let n = self.grid_size;
        let gray = image.to_luma8();
        let small = imageops::resize(&gray, n + 1, n, FilterType::Lanczos3);

        let mut bytes = Vec::with_capacity(self.bit_len() / 8);
        let mut current: u8 = 0;
        let mut filled = 0;

        for y in 0..n {
            for x in 0..n {
                let left = small.get_pixel(x, y)[0];
                let right = small.get_pixel(x + 1, y)[0];

                if right > left {
                    current |= 1 << (7 - filled);
                }

                filled += 1;
                if filled == 8 {
                    bytes.push(current);
                    current = 0;
                    filled = 0;
                }
            }
        }

        if filled > 0 {
            bytes.push(current);
        }

        Fingerprint(bytes)
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}
