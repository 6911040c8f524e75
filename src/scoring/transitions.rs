//! Residue transition weights, used to derive a gap penalty from an indel rate.

use std::io::Read;

use crate::errors::ThreewayError;

/// Non-negative co-occurrence weights between every ordered pair of alphabet symbols.
#[derive(Clone, Debug)]
pub struct TransitionTable {
    alphabet: Vec<u8>,
    weights: Vec<f64>,
}

impl TransitionTable {
    /// Build a table from an alphabet and a row-major `alphabet.len() x alphabet.len()`
    /// weight matrix.
    pub fn new(alphabet: &[u8], weights: Vec<f64>) -> Result<Self, ThreewayError> {
        if weights.len() != alphabet.len() * alphabet.len() {
            return Err(ThreewayError::TransitionTableFormat(
                format!("expected {} weights for an alphabet of {} symbols, got {}",
                        alphabet.len() * alphabet.len(), alphabet.len(), weights.len())
            ));
        }

        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ThreewayError::TransitionTableFormat(
                format!("weights must be finite and non-negative, found {w}")
            ));
        }

        Ok(Self {
            alphabet: alphabet.to_vec(),
            weights,
        })
    }

    /// Read a square CSV table. The header row lists the column symbols (its first cell is
    /// ignored), and each following row starts with its row symbol.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ThreewayError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = csv_reader.headers()?
            .iter()
            .skip(1)
            .map(symbol_from_field)
            .collect::<Result<Vec<_>, _>>()?;

        let mut weights = vec![0.0; columns.len() * columns.len()];
        let mut seen = vec![false; columns.len()];

        for record in csv_reader.records() {
            let record = record?;
            let mut fields = record.iter();

            let row_symbol = fields.next()
                .map(symbol_from_field)
                .transpose()?
                .ok_or_else(|| ThreewayError::TransitionTableFormat("empty row".to_string()))?;

            let Some(row_ix) = columns.iter().position(|&c| c == row_symbol) else {
                return Err(ThreewayError::TransitionTableFormat(
                    format!("row symbol '{}' does not appear in the header", row_symbol.escape_ascii())
                ));
            };

            if seen[row_ix] {
                return Err(ThreewayError::TransitionTableFormat(
                    format!("row '{}' occurs twice", row_symbol.escape_ascii())
                ));
            }
            seen[row_ix] = true;

            let row = &mut weights[row_ix * columns.len()..(row_ix + 1) * columns.len()];
            for (col_ix, field) in fields.enumerate() {
                row[col_ix] = field.parse::<f64>()
                    .map_err(|e| ThreewayError::TransitionTableFormat(format!("invalid weight '{field}' ({e})")))?;
            }
        }

        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(ThreewayError::TransitionTableFormat(
                format!("missing row for symbol '{}'", columns[missing].escape_ascii())
            ));
        }

        Self::new(&columns, weights)
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    pub fn num_symbols(&self) -> usize {
        self.alphabet.len()
    }

    #[inline]
    pub fn weight_by_index(&self, from: usize, to: usize) -> f64 {
        self.weights[from * self.alphabet.len() + to]
    }

    /// Iterate over the rows of the table, in alphabet order.
    pub fn rows(&self) -> impl Iterator<Item=&[f64]> + '_ {
        self.weights.chunks_exact(self.alphabet.len().max(1))
    }
}

fn symbol_from_field(field: &str) -> Result<u8, ThreewayError> {
    match field.as_bytes() {
        [symbol] => Ok(*symbol),
        _ => Err(ThreewayError::TransitionTableFormat(
            format!("expected a single-character symbol, found '{field}'")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv() {
        let data = "\
,A,C,G
A,0.5,0.1,0.1
G,0.1,0.0,0.4
C,0.1,0.3,0.0
";
        let table = TransitionTable::from_csv_reader(data.as_bytes()).unwrap();

        assert_eq!(table.alphabet(), b"ACG");
        assert_eq!(table.weight_by_index(0, 0), 0.5);
        assert_eq!(table.weight_by_index(1, 1), 0.3);
        assert_eq!(table.weight_by_index(2, 2), 0.4);
        assert_eq!(table.weight_by_index(2, 0), 0.1);

        // Rows are stored in header order, not file order
        let rows: Vec<&[f64]> = table.rows().collect();
        assert_eq!(rows[1], &[0.1, 0.3, 0.0]);
    }

    #[test]
    fn test_rejects_negative_weights() {
        assert!(matches!(
            TransitionTable::new(b"AB", vec![1.0, -0.5, 0.5, 1.0]),
            Err(ThreewayError::TransitionTableFormat(_))
        ));
    }

    #[test]
    fn test_rejects_missing_rows() {
        let data = ",A,C\nA,0.5,0.5\n";
        assert!(matches!(
            TransitionTable::from_csv_reader(data.as_bytes()),
            Err(ThreewayError::TransitionTableFormat(_))
        ));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let data = ",A,C\nA,0.5,0.5\nC,0.5\n";
        assert!(TransitionTable::from_csv_reader(data.as_bytes()).is_err());
    }
}
