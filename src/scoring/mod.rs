pub mod matrix;
pub mod transitions;
pub mod gap_penalty;
pub mod sum_of_pairs;

pub use matrix::SubstitutionMatrix;
pub use transitions::TransitionTable;
pub use gap_penalty::compute_gap_penalty;
pub use sum_of_pairs::sum_of_pairs_score;

use serde::Serialize;

use crate::errors::ThreewayError;

/// Where the linear gap penalty of an alignment comes from
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum GapPenalty {
    /// Use the given (negative) penalty as is
    Fixed(f64),

    /// Derive the penalty from an indel rate and a transition table
    IndelRate(f64),
}

impl GapPenalty {
    /// Resolve to a scalar penalty. Indel rates require a transition table.
    pub fn resolve(&self, transitions: Option<&TransitionTable>) -> Result<f64, ThreewayError> {
        match *self {
            Self::Fixed(gap) => Ok(gap),
            Self::IndelRate(rate) => transitions
                .map(|table| compute_gap_penalty(rate, table))
                .ok_or_else(|| ThreewayError::TransitionTableFormat(
                    "a transition table is required to derive a gap penalty from an indel rate".to_string()
                )),
        }
    }
}
