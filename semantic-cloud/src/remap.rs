//! Raw segmentation class → output class remapping.
//!
//! The segmentation model predicts `num_classes` raw classes. A fixed table
//! folds them into the (usually smaller) output class space stored in the
//! map. Raw indices outside the table are unknown: they become the
//! background class when background is included, otherwise the point is
//! dropped.

use serde::{Deserialize, Serialize};

/// Background class used when none is configured.
pub const DEFAULT_BACKGROUND_CLASS: u16 = 7;

/// Largest output class a table may produce. Voxel histograms are indexed
/// by output class.
pub const MAX_OUTPUT_CLASS: u16 = 1023;

/// Remap table errors (fatal at load time).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    /// Table length differs from the declared class count
    #[error("class remap has {actual} entries, expected num_classes = {expected}")]
    LengthMismatch {
        /// Declared number of raw classes
        expected: usize,
        /// Entries in the table
        actual: usize,
    },

    /// No raw classes declared
    #[error("num_classes must be positive")]
    Empty,

    /// An output or background class exceeds [`MAX_OUTPUT_CLASS`]
    #[error("output class {class} exceeds the maximum of {max}")]
    ClassOutOfRange {
        /// Offending class
        class: u16,
        /// Largest allowed class
        max: u16,
    },
}

/// Immutable raw→output class table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRemapTable {
    remap: Vec<u16>,
    include_background: bool,
    background_class: u16,
}

impl ClassRemapTable {
    /// Create a validated table.
    pub fn new(
        num_classes: usize,
        remap: Vec<u16>,
        include_background: bool,
        background_class: u16,
    ) -> Result<Self, RemapError> {
        if num_classes == 0 {
            return Err(RemapError::Empty);
        }
        if remap.len() != num_classes {
            return Err(RemapError::LengthMismatch {
                expected: num_classes,
                actual: remap.len(),
            });
        }
        let outputs = remap.iter().copied().chain([background_class]);
        if let Some(class) = outputs.into_iter().find(|&c| c > MAX_OUTPUT_CLASS) {
            return Err(RemapError::ClassOutOfRange {
                class,
                max: MAX_OUTPUT_CLASS,
            });
        }
        Ok(Self {
            remap,
            include_background,
            background_class,
        })
    }

    /// Identity table over `num_classes` raw classes.
    pub fn identity(
        num_classes: usize,
        include_background: bool,
        background_class: u16,
    ) -> Result<Self, RemapError> {
        let remap = (0..num_classes)
            .map(|c| c.min(u16::MAX as usize) as u16)
            .collect();
        Self::new(num_classes, remap, include_background, background_class)
    }

    /// Number of raw classes the table covers.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.remap.len()
    }

    /// True if unknown and unprojectable points keep the background class.
    #[inline]
    pub fn include_background(&self) -> bool {
        self.include_background
    }

    /// Configured background class.
    #[inline]
    pub fn background_class(&self) -> u16 {
        self.background_class
    }

    /// Output class for a raw class, or `None` if the point is dropped.
    #[inline]
    pub fn remap(&self, raw: u16) -> Option<u16> {
        match self.remap.get(raw as usize) {
            Some(&class) => Some(class),
            None => self.background(),
        }
    }

    /// Class for points that cannot be classified.
    #[inline]
    pub fn background(&self) -> Option<u16> {
        self.include_background.then_some(self.background_class)
    }

    /// Size of the output class space (`0..=max(remap, background)`).
    pub fn num_output_classes(&self) -> usize {
        let max_remap = self.remap.iter().copied().max().unwrap_or(0);
        max_remap.max(self.background_class) as usize + 1
    }
}
