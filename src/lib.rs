pub mod errors;
pub mod scoring;
pub mod aligner;
pub mod io;

pub use aligner::{AlignerConfig, ThreewayAligner, ThreewayAlignment};
pub use errors::ThreewayError;
pub use scoring::{compute_gap_penalty, sum_of_pairs_score, GapPenalty, SubstitutionMatrix, TransitionTable};
