use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

use crate::aligner::trace::Move;

fn rows_as_strings<S>(rows: &[Vec<u8>; 3], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(rows.iter().map(|row| String::from_utf8_lossy(row)))
}

fn symbol_as_char<S>(symbol: &u8, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_char(char::from(*symbol))
}

/// An optimal alignment of three sequences.
///
/// All three rows have the same length. Each row is the original sequence with gap symbols
/// interleaved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThreewayAlignment {
    #[serde(serialize_with = "rows_as_strings")]
    rows: [Vec<u8>; 3],
    score: f64,
    #[serde(serialize_with = "symbol_as_char")]
    gap_symbol: u8,
}

impl ThreewayAlignment {
    /// Expand a path of moves over the original sequences into aligned rows.
    pub fn from_path(seqs: [&[u8]; 3], path: &[Move], score: f64, gap_symbol: u8) -> Self {
        let mut rows = [
            Vec::with_capacity(path.len()),
            Vec::with_capacity(path.len()),
            Vec::with_capacity(path.len()),
        ];
        let mut positions = [0usize; 3];

        for mv in path {
            let (di, dj, dk) = mv.advances();

            for (row_ix, advances) in [di, dj, dk].into_iter().enumerate() {
                if advances {
                    rows[row_ix].push(seqs[row_ix][positions[row_ix]]);
                    positions[row_ix] += 1;
                } else {
                    rows[row_ix].push(gap_symbol);
                }
            }
        }

        Self { rows, score, gap_symbol }
    }

    /// Optimal score, as stored in the terminal cell of the cube.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.rows[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> [&[u8]; 3] {
        [&self.rows[0], &self.rows[1], &self.rows[2]]
    }

    pub fn row(&self, ix: usize) -> &[u8] {
        &self.rows[ix]
    }

    pub fn gap_symbol(&self) -> u8 {
        self.gap_symbol
    }

    /// Total number of gap symbols over all three rows.
    pub fn gap_count(&self) -> usize {
        self.rows.iter()
            .map(|row| row.iter().filter(|&&c| c == self.gap_symbol).count())
            .sum()
    }

    /// The row with gap symbols removed, which is the original input sequence.
    pub fn ungapped(&self, ix: usize) -> Vec<u8> {
        self.rows[ix].iter()
            .copied()
            .filter(|&c| c != self.gap_symbol)
            .collect()
    }
}

impl Display for ThreewayAlignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", String::from_utf8_lossy(row))?;
        }

        Ok(())
    }
}
