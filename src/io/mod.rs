pub mod fasta;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::errors::ThreewayError;
use crate::scoring::{GapPenalty, SubstitutionMatrix, TransitionTable};

pub use fasta::{open_fasta, read_sequences, write_alignment_fasta, NamedSequence};

/// Load a substitution matrix in NCBI text format.
pub fn load_matrix(path: &Path) -> Result<SubstitutionMatrix, ThreewayError> {
    let file = File::open(path).map(BufReader::new)?;

    SubstitutionMatrix::from_reader(file)
}

/// Load a transition table from a CSV file.
pub fn load_transitions(path: &Path) -> Result<TransitionTable, ThreewayError> {
    let file = File::open(path).map(BufReader::new)?;

    TransitionTable::from_csv_reader(file)
}

/// Resolve a gap penalty. The transition table is only read when an indel rate needs it.
pub fn resolve_gap_penalty(penalty: GapPenalty, transitions: Option<&Path>) -> Result<f64, ThreewayError> {
    match penalty {
        GapPenalty::Fixed(_) => penalty.resolve(None),
        GapPenalty::IndelRate(_) => {
            let table = transitions.map(load_transitions).transpose()?;

            penalty.resolve(table.as_ref())
        },
    }
}
