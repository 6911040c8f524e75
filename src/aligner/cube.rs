//! Score storage for the three-dimensional DP cube.
//!
//! Cells are addressed by prefix lengths `(i, j, k)`. The fill visits cells with `i` as the
//! outer index, so a cell in layer `i` only ever reads layers `i - 1` and `i`. [`RollingCube`]
//! exploits this by keeping just those two layers in memory.

use std::fmt::{Display, Formatter};

use crate::errors::ThreewayError;

/// Dimensions of a score cube: the lengths of the three sequences
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CubeShape {
    pub m: usize,
    pub n: usize,
    pub p: usize,
}

impl CubeShape {
    pub fn new(m: usize, n: usize, p: usize) -> Self {
        Self { m, n, p }
    }

    pub fn max_len(&self) -> usize {
        self.m.max(self.n).max(self.p)
    }

    /// Number of cells in one i-layer, `(n + 1) * (p + 1)`.
    pub fn layer_cells(&self) -> Option<usize> {
        (self.n + 1).checked_mul(self.p + 1)
    }

    /// Number of cells in the full cube, or `None` if that overflows `usize`.
    pub fn cells(&self) -> Option<usize> {
        self.layer_cells()?.checked_mul(self.m + 1)
    }

    /// Cell count, checked against an optional admission limit.
    pub fn checked_cells(&self, limit: Option<usize>) -> Result<usize, ThreewayError> {
        let Some(cells) = self.cells() else {
            return Err(ThreewayError::TooManyCells { cells: usize::MAX, limit: limit.unwrap_or(usize::MAX) });
        };

        match limit {
            Some(limit) if cells > limit => Err(ThreewayError::TooManyCells { cells, limit }),
            _ => Ok(cells)
        }
    }

    #[inline(always)]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * (self.n + 1) + j) * (self.p + 1) + k
    }

    #[inline(always)]
    fn layer_index(&self, j: usize, k: usize) -> usize {
        j * (self.p + 1) + k
    }
}

/// Which score storage backs an alignment
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Every cell of the cube is kept
    Dense,

    /// Only the two most recent i-layers are kept
    Rolling,
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Rolling => write!(f, "rolling"),
        }
    }
}

pub trait CubeStorage {
    /// Called before the first cell of layer `i` is written.
    fn begin_layer(&mut self, i: usize);

    /// Score of cell `(i, j, k)`. Cells that are no longer stored read as negative infinity.
    fn get(&self, i: usize, j: usize, k: usize) -> f64;

    fn set(&mut self, i: usize, j: usize, k: usize, score: f64);
}

/// Flat array over all `(m + 1)(n + 1)(p + 1)` cells
pub struct DenseCube {
    shape: CubeShape,
    scores: Vec<f64>,
}

impl DenseCube {
    pub fn new(shape: CubeShape, cells: usize) -> Self {
        Self {
            shape,
            scores: vec![f64::NEG_INFINITY; cells],
        }
    }
}

impl CubeStorage for DenseCube {
    #[inline]
    fn begin_layer(&mut self, _: usize) { }

    #[inline(always)]
    fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.scores[self.shape.linear_index(i, j, k)]
    }

    #[inline(always)]
    fn set(&mut self, i: usize, j: usize, k: usize, score: f64) {
        let ix = self.shape.linear_index(i, j, k);
        self.scores[ix] = score;
    }
}

/// Two alternating i-layers. Layer `i` lives in slot `i % 2`.
pub struct RollingCube {
    shape: CubeShape,
    current: usize,
    layers: [Vec<f64>; 2],
}

impl RollingCube {
    pub fn new(shape: CubeShape, layer_cells: usize) -> Self {
        Self {
            shape,
            current: 0,
            layers: [vec![f64::NEG_INFINITY; layer_cells], vec![f64::NEG_INFINITY; layer_cells]],
        }
    }

    #[inline(always)]
    fn is_stored(&self, i: usize) -> bool {
        i == self.current || i + 1 == self.current
    }
}

impl CubeStorage for RollingCube {
    fn begin_layer(&mut self, i: usize) {
        self.current = i;

        // The slot still holds layer i - 2, which nothing reads anymore
        self.layers[i % 2].fill(f64::NEG_INFINITY);
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        if !self.is_stored(i) {
            return f64::NEG_INFINITY;
        }

        self.layers[i % 2][self.shape.layer_index(j, k)]
    }

    #[inline(always)]
    fn set(&mut self, i: usize, j: usize, k: usize, score: f64) {
        debug_assert_eq!(i, self.current, "Only the current layer can be written");

        let ix = self.shape.layer_index(j, k);
        self.layers[i % 2][ix] = score;
    }
}
