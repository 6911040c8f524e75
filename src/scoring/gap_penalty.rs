//! Derive a linear gap penalty from an empirical indel rate.
//!
//! The penalty is the expected log-odds score of the transition model (in half-bits, the
//! scale of BLOSUM-style matrices), scaled by a factor that grows as indels get rarer.

use tracing::debug;

use crate::scoring::transitions::TransitionTable;

/// Indel rates below this value are treated as this value
pub const INDEL_RATE_FLOOR: f64 = 0.001;

/// Harshest gap penalty that will be returned
pub const MIN_GAP_PENALTY: f64 = -20.0;

/// Mildest gap penalty that will be returned
pub const MAX_GAP_PENALTY: f64 = -0.5;

/// Background frequency of each symbol: its row sum divided by the grand total of the table.
///
/// Returns the frequencies together with the grand total.
pub fn background_frequencies(table: &TransitionTable) -> (Vec<f64>, f64) {
    let mut marginals = Vec::with_capacity(table.num_symbols());
    let mut total = 0.0;

    for row in table.rows() {
        let mut marginal = 0.0;
        for &w in row {
            marginal += w;
            total += w;
        }

        marginals.push(marginal);
    }

    for q in marginals.iter_mut() {
        *q /= total;
    }

    (marginals, total)
}

/// Expected pairwise score `sum p_ij * 2 * log2(p_ij / (q_i * q_j))` over all symbol pairs.
///
/// Pairs where either the joint probability or the background product is not positive are
/// skipped.
pub fn expected_score(table: &TransitionTable) -> f64 {
    let (q, total) = background_frequencies(table);
    if total <= 0.0 {
        return 0.0;
    }

    let mut expected = 0.0;
    for (i, row) in table.rows().enumerate() {
        for (j, &w) in row.iter().enumerate() {
            let p_ij = w / total;
            let q_i_q_j = q[i] * q[j];

            if q_i_q_j > 0.0 && p_ij > 0.0 {
                let log_odds = 2.0 * (p_ij / q_i_q_j).log2();
                expected += p_ij * log_odds;
            }
        }
    }

    expected
}

/// Linear gap penalty for the given indel rate, clamped to
/// `[MIN_GAP_PENALTY, MAX_GAP_PENALTY]`.
pub fn compute_gap_penalty(indel_rate: f64, table: &TransitionTable) -> f64 {
    let expected = expected_score(table);

    // NaN rates end up on the floor as well
    let rate = if indel_rate >= INDEL_RATE_FLOOR { indel_rate } else { INDEL_RATE_FLOOR };
    let scaling_factor = -1.0 - 0.5 * (0.1 / rate);

    let gap = (expected * scaling_factor).clamp(MIN_GAP_PENALTY, MAX_GAP_PENALTY);
    debug!(indel_rate, expected_score = expected, scaling_factor, gap, "Derived gap penalty");

    gap
}
