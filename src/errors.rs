use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

#[derive(Debug)]
pub enum ThreewayError {
    /// An input sequence (identified by record name or input slot) has no residues
    EmptySequence(String),

    /// The same record identifier occurs more than once in a sequence source
    DuplicateIdentifier(String),

    /// A residue is not part of the substitution table's alphabet
    UnknownSymbol { symbol: u8, sequence: usize, position: usize },

    /// The configured gap symbol is also a residue of the substitution table's alphabet
    GapSymbolInAlphabet(u8),

    /// Aligned rows passed to the sum-of-pairs scorer differ in length
    UnequalAlignedLength(usize, usize, usize),

    /// A three-way alignment needs exactly three input records
    WrongRecordCount(usize),

    /// A substitution matrix file could not be parsed
    MatrixFormat(String),

    /// A transition table could not be parsed or holds invalid weights
    TransitionTableFormat(String),

    /// The score cube would exceed the configured number of cells
    TooManyCells { cells: usize, limit: usize },

    /// Error variant when reading or writing tabular data failed
    CsvError { source: csv::Error },

    /// Other IO errors
    IOError(io::Error),

    /// Other miscellaneous errors
    Other,
}

impl Error for ThreewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            Self::CsvError { ref source } => Some(source),
            Self::IOError(ref source) => Some(source),
            _ => None
        }
    }
}

impl From<io::Error> for ThreewayError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<csv::Error> for ThreewayError {
    fn from(value: csv::Error) -> Self {
        Self::CsvError {
            source: value
        }
    }
}

impl Display for ThreewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::EmptySequence(ref name) =>
                write!(f, "Sequence '{name}' is empty!"),
            Self::DuplicateIdentifier(ref name) =>
                write!(f, "Duplicate sequence ID: {name}"),
            Self::UnknownSymbol { symbol, sequence, position } =>
                write!(f, "Found unrecognized character '{}' in sequence {} at position {}!",
                       symbol.escape_ascii(), sequence + 1, position + 1),
            Self::GapSymbolInAlphabet(symbol) =>
                write!(f, "Gap symbol '{}' is also a residue of the substitution matrix!", symbol.escape_ascii()),
            Self::UnequalAlignedLength(l1, l2, l3) =>
                write!(f, "Sequences are not properly aligned! (row lengths: {l1}, {l2}, {l3})"),
            Self::WrongRecordCount(n) =>
                write!(f, "Expected exactly three sequences, found {n}!"),
            Self::MatrixFormat(ref msg) =>
                write!(f, "Invalid substitution matrix: {msg}"),
            Self::TransitionTableFormat(ref msg) =>
                write!(f, "Invalid transition table: {msg}"),
            Self::TooManyCells { cells, limit } =>
                write!(f, "Alignment requires {cells} DP cells, which exceeds the limit of {limit}!"),
            Self::CsvError { source: _ } =>
                write!(f, "Could not read tabular data!"),
            Self::IOError(ref err) =>
                err.fmt(f),
            Self::Other =>
                write!(f, "Threeway error!")
        }
    }
}
