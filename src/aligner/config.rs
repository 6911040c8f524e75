use serde::{Deserialize, Serialize};

use crate::aligner::cube::{CubeShape, StorageKind};

/// Sequences at most this long always use dense score storage
pub const DEFAULT_ROLLING_MIN_LENGTH: usize = 100;

/// Cubes with at most this many cells always use dense score storage
pub const DEFAULT_ROLLING_MIN_CELLS: usize = 5_000_000;

pub const DEFAULT_GAP_SYMBOL: u8 = b'-';

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Rolling storage is only considered when the longest sequence exceeds this length
    pub rolling_min_length: usize,

    /// Rolling storage is only considered when the cube holds more cells than this
    pub rolling_min_cells: usize,

    /// Reject alignments whose cube would hold more cells than this. The predecessor trace
    /// always needs one byte per cell, regardless of score storage.
    pub max_cells: Option<usize>,

    /// Symbol used for gaps in the aligned rows
    pub gap_symbol: u8,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            rolling_min_length: DEFAULT_ROLLING_MIN_LENGTH,
            rolling_min_cells: DEFAULT_ROLLING_MIN_CELLS,
            max_cells: None,
            gap_symbol: DEFAULT_GAP_SYMBOL,
        }
    }
}

impl AlignerConfig {
    pub fn storage_for(&self, shape: &CubeShape, cells: usize) -> StorageKind {
        if shape.max_len() > self.rolling_min_length && cells > self.rolling_min_cells {
            StorageKind::Rolling
        } else {
            StorageKind::Dense
        }
    }
}
