//! Independent sum-of-pairs scoring of an existing three-row alignment.
//!
//! This is a validation utility: it never optimizes, it only re-scores columns.

use itertools::izip;

use crate::errors::ThreewayError;
use crate::scoring::matrix::SubstitutionMatrix;

/// Sum-of-pairs score of three equal-length aligned rows.
///
/// Per column, every gap symbol among the three is charged `gap` twice when at least one
/// residue is present, and residue pairs contribute their substitution score. Residues are
/// looked up in ascending byte order.
pub fn sum_of_pairs_score(
    rows: [&[u8]; 3],
    gap: f64,
    matrix: &SubstitutionMatrix,
    gap_symbol: u8,
) -> Result<f64, ThreewayError> {
    let [r1, r2, r3] = rows;
    if r1.len() != r2.len() || r1.len() != r3.len() {
        return Err(ThreewayError::UnequalAlignedLength(r1.len(), r2.len(), r3.len()));
    }

    if matrix.contains(gap_symbol) {
        return Err(ThreewayError::GapSymbolInAlphabet(gap_symbol));
    }

    let two_gaps = 2.0 * gap;
    let mut score = 0.0;

    for (col, (&c1, &c2, &c3)) in izip!(r1, r2, r3).enumerate() {
        let mut residues = [0u8; 3];
        let mut num_residues = 0;

        for (row_ix, c) in [c1, c2, c3].into_iter().enumerate() {
            if c == gap_symbol {
                continue;
            }

            if !matrix.contains(c) {
                return Err(ThreewayError::UnknownSymbol { symbol: c, sequence: row_ix, position: col });
            }

            residues[num_residues] = c;
            num_residues += 1;
        }

        let residues = &mut residues[..num_residues];
        residues.sort_unstable();

        // Both symbols were checked against the alphabet above
        let pair = |a: u8, b: u8| matrix.score(a, b).unwrap_or(0.0);

        score += match *residues {
            [] => 0.0,
            [_] => two_gaps,
            [a, b] => two_gaps + pair(a, b),
            [a, b, c] => pair(a, b) + pair(a, c) + pair(b, c),
            _ => unreachable!(),
        };
    }

    Ok(score)
}
