//! Residue substitution tables.
//!
//! A [`SubstitutionMatrix`] maps an ordered pair of alphabet symbols to a real-valued score.
//! Lookups are ordered (`score(a, b)` reads row `a`, column `b`), so asymmetric tables are
//! supported, although all standard matrices are symmetric.

use std::io::BufRead;

use crate::errors::ThreewayError;

/// Symbol order of the built-in amino acid matrices
pub const AMINO_ALPHABET: &[u8; 24] = b"ARNDCQEGHILKMFPSTWYVBZX*";

/// BLOSUM62, NCBI reference values
#[rustfmt::skip]
const BLOSUM62: [i8; 24 * 24] = [
//   A   R   N   D   C   Q   E   G   H   I   L   K   M   F   P   S   T   W   Y   V   B   Z   X   *
     4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1,  0, -4, // A
    -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1,  0, -1, -4, // R
    -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  3,  0, -1, -4, // N
    -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4,  1, -1, -4, // D
     0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -3, -2, -4, // C
    -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0,  3, -1, -4, // Q
    -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4, // E
     0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -2, -1, -4, // G
    -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0,  0, -1, -4, // H
    -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3, -3, -1, -4, // I
    -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4, -3, -1, -4, // L
    -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0,  1, -1, -4, // K
    -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3, -1, -1, -4, // M
    -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3, -3, -1, -4, // F
    -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -1, -2, -4, // P
     1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0,  0,  0, -4, // S
     0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1,  0, -4, // T
    -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -3, -2, -4, // W
    -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -2, -1, -4, // Y
     0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3, -2, -1, -4, // V
    -2, -1,  3,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4,  1, -1, -4, // B
    -1,  0,  0,  1, -3,  3,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4, // Z
     0, -1, -1, -1, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -2,  0,  0, -2, -1, -1, -1, -1, -1, -4, // X
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1, // *
];

/// Index value marking a byte that is not part of the alphabet
const NOT_IN_ALPHABET: u8 = u8::MAX;

#[derive(Clone, Debug)]
pub struct SubstitutionMatrix {
    alphabet: Vec<u8>,
    symbol_to_index: [u8; 256],
    scores: Vec<f64>,
}

impl SubstitutionMatrix {
    /// Build a matrix from an alphabet and a row-major `alphabet.len() x alphabet.len()` table.
    pub fn from_scores(alphabet: &[u8], scores: Vec<f64>) -> Result<Self, ThreewayError> {
        if alphabet.is_empty() || alphabet.len() >= NOT_IN_ALPHABET as usize {
            return Err(ThreewayError::MatrixFormat(
                format!("alphabet size must be between 1 and {}, got {}", NOT_IN_ALPHABET - 1, alphabet.len())
            ));
        }

        if scores.len() != alphabet.len() * alphabet.len() {
            return Err(ThreewayError::MatrixFormat(
                format!("expected {} scores for an alphabet of {} symbols, got {}",
                        alphabet.len() * alphabet.len(), alphabet.len(), scores.len())
            ));
        }

        let mut symbol_to_index = [NOT_IN_ALPHABET; 256];
        for (ix, &symbol) in alphabet.iter().enumerate() {
            if symbol_to_index[symbol as usize] != NOT_IN_ALPHABET {
                return Err(ThreewayError::MatrixFormat(
                    format!("symbol '{}' occurs twice in the alphabet", symbol.escape_ascii())
                ));
            }

            symbol_to_index[symbol as usize] = ix as u8;
        }

        Ok(Self {
            alphabet: alphabet.to_vec(),
            symbol_to_index,
            scores,
        })
    }

    pub fn blosum62() -> Self {
        let scores = BLOSUM62.iter().map(|&v| v as f64).collect();

        // The built-in table is square over its own alphabet
        Self::from_scores(AMINO_ALPHABET, scores)
            .unwrap_or_else(|_| unreachable!("BLOSUM62 table is well-formed"))
    }

    /// Parse a matrix in NCBI text format: `#` comment lines, a header line listing the column
    /// symbols, then one line per row starting with the row symbol.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ThreewayError> {
        let mut header: Option<Vec<u8>> = None;
        let mut rows: Vec<(u8, Vec<f64>)> = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let columns = match &header {
                Some(columns) => columns,
                None => {
                    let symbols = trimmed.split_whitespace()
                        .map(|tok| single_symbol(tok, lineno))
                        .collect::<Result<Vec<_>, _>>()?;

                    header = Some(symbols);
                    continue;
                }
            };

            let mut fields = trimmed.split_whitespace();
            let row_symbol = fields.next()
                .map(|tok| single_symbol(tok, lineno))
                .transpose()?
                .ok_or_else(|| ThreewayError::MatrixFormat(format!("line {}: missing row symbol", lineno + 1)))?;

            let values = fields
                .map(|tok| tok.parse::<f64>()
                    .map_err(|e| ThreewayError::MatrixFormat(format!("line {}: invalid score '{tok}' ({e})", lineno + 1))))
                .collect::<Result<Vec<_>, _>>()?;

            if values.len() != columns.len() {
                return Err(ThreewayError::MatrixFormat(
                    format!("line {}: expected {} scores, found {}", lineno + 1, columns.len(), values.len())
                ));
            }

            rows.push((row_symbol, values));
        }

        let Some(columns) = header else {
            return Err(ThreewayError::MatrixFormat("no header line found".to_string()));
        };

        if rows.len() != columns.len() {
            return Err(ThreewayError::MatrixFormat(
                format!("expected {} rows, found {}", columns.len(), rows.len())
            ));
        }

        // Rows may be listed in any order, but must cover exactly the header symbols
        let mut scores = vec![0.0; columns.len() * columns.len()];
        let mut seen = vec![false; columns.len()];
        for (row_symbol, values) in rows {
            let Some(row_ix) = columns.iter().position(|&c| c == row_symbol) else {
                return Err(ThreewayError::MatrixFormat(
                    format!("row symbol '{}' does not appear in the header", row_symbol.escape_ascii())
                ));
            };

            if seen[row_ix] {
                return Err(ThreewayError::MatrixFormat(
                    format!("row '{}' occurs twice", row_symbol.escape_ascii())
                ));
            }

            seen[row_ix] = true;
            scores[row_ix * columns.len()..(row_ix + 1) * columns.len()].copy_from_slice(&values);
        }

        Self::from_scores(&columns, scores)
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    #[inline]
    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        match self.symbol_to_index[symbol as usize] {
            NOT_IN_ALPHABET => None,
            ix => Some(ix as usize),
        }
    }

    #[inline]
    pub fn contains(&self, symbol: u8) -> bool {
        self.index_of(symbol).is_some()
    }

    /// Score of aligning symbol `a` against symbol `b`, if both are part of the alphabet.
    pub fn score(&self, a: u8, b: u8) -> Option<f64> {
        Some(self.score_by_index(self.index_of(a)?, self.index_of(b)?))
    }

    /// Score lookup on alphabet indices as returned by [`Self::index_of`] or [`Self::encode`].
    #[inline(always)]
    pub fn score_by_index(&self, a: usize, b: usize) -> f64 {
        self.scores[a * self.alphabet.len() + b]
    }

    /// Translate a sequence to alphabet indices.
    ///
    /// `seq_ix` only identifies the sequence in the returned error.
    pub fn encode(&self, seq: &[u8], seq_ix: usize) -> Result<Vec<usize>, ThreewayError> {
        seq.iter()
            .enumerate()
            .map(|(pos, &symbol)| self.index_of(symbol)
                .ok_or(ThreewayError::UnknownSymbol { symbol, sequence: seq_ix, position: pos }))
            .collect()
    }
}

fn single_symbol(token: &str, lineno: usize) -> Result<u8, ThreewayError> {
    match token.as_bytes() {
        [symbol] => Ok(*symbol),
        _ => Err(ThreewayError::MatrixFormat(
            format!("line {}: expected a single-character symbol, found '{token}'", lineno + 1)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blosum62_spot_checks() {
        let m = SubstitutionMatrix::blosum62();

        assert_eq!(m.score(b'A', b'A'), Some(4.0));
        assert_eq!(m.score(b'W', b'W'), Some(11.0));
        assert_eq!(m.score(b'A', b'R'), Some(-1.0));
        assert_eq!(m.score(b'*', b'*'), Some(1.0));
        assert_eq!(m.score(b'a', b'A'), None);
    }

    #[test]
    fn test_blosum62_is_symmetric() {
        let m = SubstitutionMatrix::blosum62();
        for &a in AMINO_ALPHABET {
            for &b in AMINO_ALPHABET {
                assert_eq!(m.score(a, b), m.score(b, a));
            }
        }
    }

    #[test]
    fn test_encode_rejects_unknown_symbol() {
        let m = SubstitutionMatrix::blosum62();

        assert_eq!(m.encode(b"ARN", 0).unwrap(), vec![0, 1, 2]);

        match m.encode(b"AR-N", 2) {
            Err(ThreewayError::UnknownSymbol { symbol, sequence, position }) => {
                assert_eq!(symbol, b'-');
                assert_eq!(sequence, 2);
                assert_eq!(position, 2);
            },
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_scores_asymmetric() {
        let m = SubstitutionMatrix::from_scores(b"AB", vec![4.0, 1.0, 0.0, 3.0]).unwrap();

        assert_eq!(m.score(b'A', b'B'), Some(1.0));
        assert_eq!(m.score(b'B', b'A'), Some(0.0));
    }

    #[test]
    fn test_from_scores_validation() {
        assert!(SubstitutionMatrix::from_scores(b"", vec![]).is_err());
        assert!(SubstitutionMatrix::from_scores(b"AB", vec![1.0; 3]).is_err());
        assert!(SubstitutionMatrix::from_scores(b"AA", vec![1.0; 4]).is_err());
    }

    #[test]
    fn test_parse_ncbi_format() {
        let text = "\
# Toy matrix
   A  C  G
G -1 -2  5
A  4 -1 -1
C -1  9 -2
";
        let m = SubstitutionMatrix::from_reader(text.as_bytes()).unwrap();

        assert_eq!(m.alphabet(), b"ACG");
        assert_eq!(m.score(b'A', b'A'), Some(4.0));
        assert_eq!(m.score(b'C', b'C'), Some(9.0));
        assert_eq!(m.score(b'G', b'A'), Some(-1.0));
        assert_eq!(m.score(b'G', b'G'), Some(5.0));
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let text = "  A C\nA 1 0\nC 0\n";
        assert!(matches!(SubstitutionMatrix::from_reader(text.as_bytes()), Err(ThreewayError::MatrixFormat(_))));

        let missing_row = "  A C\nA 1 0\n";
        assert!(matches!(SubstitutionMatrix::from_reader(missing_row.as_bytes()), Err(ThreewayError::MatrixFormat(_))));
    }
}
