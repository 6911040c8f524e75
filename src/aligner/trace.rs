use crate::aligner::cube::CubeShape;

/// The move that leads into a cell, named by which sequences advance.
///
/// A sequence that does not advance receives a gap symbol in the corresponding alignment
/// column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Move {
    /// Residues from all three sequences
    All = 0,

    /// Gap in the third sequence
    SkipK = 1,

    /// Gap in the second sequence
    SkipJ = 2,

    /// Gap in the first sequence
    SkipI = 3,

    /// Residue from the first sequence only
    OnlyI = 4,

    /// Residue from the second sequence only
    OnlyJ = 5,

    /// Residue from the third sequence only
    OnlyK = 6,
}

impl Move {
    /// Candidate evaluation order. On ties, the earliest move in this list wins.
    pub const ORDER: [Move; 7] = [
        Move::All,
        Move::SkipK,
        Move::SkipJ,
        Move::SkipI,
        Move::OnlyI,
        Move::OnlyJ,
        Move::OnlyK,
    ];

    /// Whether the first, second and third sequence advance with this move.
    #[inline]
    pub fn advances(self) -> (bool, bool, bool) {
        match self {
            Self::All => (true, true, true),
            Self::SkipK => (true, true, false),
            Self::SkipJ => (true, false, true),
            Self::SkipI => (false, true, true),
            Self::OnlyI => (true, false, false),
            Self::OnlyJ => (false, true, false),
            Self::OnlyK => (false, false, true),
        }
    }

    /// The cell this move departs from when it ends in `(i, j, k)`.
    #[inline]
    pub fn predecessor(self, i: usize, j: usize, k: usize) -> (usize, usize, usize) {
        let (di, dj, dk) = self.advances();

        (i - di as usize, j - dj as usize, k - dk as usize)
    }
}

/// The winning move of every cell in the cube, one byte per cell.
///
/// Backtracking walks from the terminal cell to the origin, so unlike the scores, no part of
/// this trace can be released during the fill.
pub struct TraceArena {
    shape: CubeShape,
    moves: Vec<Option<Move>>,
}

impl TraceArena {
    pub fn new(shape: CubeShape, cells: usize) -> Self {
        Self {
            shape,
            moves: vec![None; cells],
        }
    }

    pub fn shape(&self) -> CubeShape {
        self.shape
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<Move> {
        self.moves[self.shape.linear_index(i, j, k)]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, k: usize, mv: Move) {
        let ix = self.shape.linear_index(i, j, k);
        self.moves[ix] = Some(mv);
    }

    /// Moves on the optimal path, from the origin to the terminal cell.
    pub fn path(&self) -> Vec<Move> {
        let CubeShape { m, n, p } = self.shape;
        let mut path = Vec::with_capacity(m + n + p);

        let (mut i, mut j, mut k) = (m, n, p);
        while let Some(mv) = self.get(i, j, k) {
            path.push(mv);
            (i, j, k) = mv.predecessor(i, j, k);
        }

        debug_assert_eq!((i, j, k), (0, 0, 0), "Backtrace did not end at the origin");

        path.reverse();
        path
    }
}
