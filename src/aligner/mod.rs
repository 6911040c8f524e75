pub mod alignment;
pub mod config;
pub mod cube;
pub mod trace;

use tracing::{debug, debug_span, trace};

use crate::errors::ThreewayError;
use crate::scoring::{compute_gap_penalty, SubstitutionMatrix, TransitionTable};

pub use alignment::ThreewayAlignment;
pub use config::AlignerConfig;
use cube::{CubeShape, CubeStorage, DenseCube, RollingCube, StorageKind};
use trace::{Move, TraceArena};

/// Exact three-sequence aligner with a linear gap penalty.
///
/// Interior cells score columns as the sum of pairs: a residue pair contributes its
/// substitution score and each gap symbol in a column with residues is charged twice.
/// Cells on the faces of the cube (one sequence exhausted) use the pairwise recurrence of
/// the two remaining sequences, and axis cells are `length * gap`.
pub struct ThreewayAligner<'a> {
    matrix: &'a SubstitutionMatrix,
    config: AlignerConfig,
}

impl<'a> ThreewayAligner<'a> {
    pub fn new(matrix: &'a SubstitutionMatrix, config: AlignerConfig) -> Self {
        Self { matrix, config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Optimal alignment of `s1`, `s2` and `s3` under the given (negative) gap penalty.
    pub fn align(&self, s1: &[u8], s2: &[u8], s3: &[u8], gap: f64) -> Result<ThreewayAlignment, ThreewayError> {
        let seqs = [s1, s2, s3];

        for (ix, seq) in seqs.iter().enumerate() {
            if seq.is_empty() {
                return Err(ThreewayError::EmptySequence(format!("#{}", ix + 1)));
            }
        }

        if self.matrix.contains(self.config.gap_symbol) {
            return Err(ThreewayError::GapSymbolInAlphabet(self.config.gap_symbol));
        }

        let e1 = self.matrix.encode(s1, 0)?;
        let e2 = self.matrix.encode(s2, 1)?;
        let e3 = self.matrix.encode(s3, 2)?;

        let shape = CubeShape::new(s1.len(), s2.len(), s3.len());
        let cells = shape.checked_cells(self.config.max_cells)?;
        let storage = self.config.storage_for(&shape, cells);

        let span = debug_span!("threeway_align", m = shape.m, n = shape.n, p = shape.p);
        let _enter = span.enter();

        debug!(cells, %storage, "Initializing cube");
        let mut trace = TraceArena::new(shape, cells);

        let score = match storage {
            StorageKind::Dense => {
                let mut cube = DenseCube::new(shape, cells);
                self.fill(&mut cube, &mut trace, [&e1, &e2, &e3], gap);
                cube.get(shape.m, shape.n, shape.p)
            },
            StorageKind::Rolling => {
                let layer_cells = shape.layer_cells().unwrap_or(cells);
                let mut cube = RollingCube::new(shape, layer_cells);
                self.fill(&mut cube, &mut trace, [&e1, &e2, &e3], gap);
                cube.get(shape.m, shape.n, shape.p)
            },
        };

        debug!("Backtracking to build alignment");
        let path = trace.path();
        let alignment = ThreewayAlignment::from_path(seqs, &path, score, self.config.gap_symbol);

        debug!(score, columns = alignment.len(), "Alignment done");

        Ok(alignment)
    }

    /// Derive the gap penalty from an indel rate, then align.
    pub fn align_with_indel_rate(
        &self,
        s1: &[u8],
        s2: &[u8],
        s3: &[u8],
        indel_rate: f64,
        transitions: &TransitionTable,
    ) -> Result<ThreewayAlignment, ThreewayError> {
        let gap = compute_gap_penalty(indel_rate, transitions);

        self.align(s1, s2, s3, gap)
    }

    /// Fill score storage and trace, one i-layer at a time.
    fn fill<S: CubeStorage>(&self, cube: &mut S, trace: &mut TraceArena, seqs: [&[usize]; 3], gap: f64) {
        let [s1, s2, s3] = seqs;
        let shape = trace.shape();
        let two_gaps = 2.0 * gap;
        let b = |x: usize, y: usize| self.matrix.score_by_index(x, y);

        for i in 0..=shape.m {
            cube.begin_layer(i);

            if i % 10 == 0 {
                trace!("Processing i={i}/{}", shape.m);
            }

            for j in 0..=shape.n {
                for k in 0..=shape.p {
                    let (mv, score) = match (i > 0, j > 0, k > 0) {
                        (false, false, false) => {
                            cube.set(0, 0, 0, 0.0);
                            continue;
                        },

                        // Axes
                        (true, false, false) => (Move::OnlyI, i as f64 * gap),
                        (false, true, false) => (Move::OnlyJ, j as f64 * gap),
                        (false, false, true) => (Move::OnlyK, k as f64 * gap),

                        // Faces
                        (false, true, true) => first_max([
                            (Move::SkipI, cube.get(0, j-1, k-1) + b(s2[j-1], s3[k-1])),
                            (Move::OnlyJ, cube.get(0, j-1, k) + gap),
                            (Move::OnlyK, cube.get(0, j, k-1) + gap),
                        ]),
                        (true, false, true) => first_max([
                            (Move::SkipJ, cube.get(i-1, 0, k-1) + b(s1[i-1], s3[k-1])),
                            (Move::OnlyI, cube.get(i-1, 0, k) + gap),
                            (Move::OnlyK, cube.get(i, 0, k-1) + gap),
                        ]),
                        (true, true, false) => first_max([
                            (Move::SkipK, cube.get(i-1, j-1, 0) + b(s1[i-1], s2[j-1])),
                            (Move::OnlyI, cube.get(i-1, j, 0) + gap),
                            (Move::OnlyJ, cube.get(i, j-1, 0) + gap),
                        ]),

                        // Interior
                        (true, true, true) => {
                            let b12 = b(s1[i-1], s2[j-1]);
                            let b13 = b(s1[i-1], s3[k-1]);
                            let b23 = b(s2[j-1], s3[k-1]);

                            first_max(Move::ORDER.map(|mv| {
                                let (pi, pj, pk) = mv.predecessor(i, j, k);
                                let prev = cube.get(pi, pj, pk);

                                let score = match mv {
                                    Move::All => prev + b12 + b13 + b23,
                                    Move::SkipK => prev + b12 + two_gaps,
                                    Move::SkipJ => prev + b13 + two_gaps,
                                    Move::SkipI => prev + b23 + two_gaps,
                                    Move::OnlyI | Move::OnlyJ | Move::OnlyK => prev + two_gaps,
                                };

                                (mv, score)
                            }))
                        }
                    };

                    cube.set(i, j, k, score);
                    trace.set(i, j, k, mv);
                }
            }
        }
    }
}

/// The first candidate with the maximal score. Later candidates only win when strictly
/// better.
#[inline(always)]
fn first_max<const N: usize>(candidates: [(Move, f64); N]) -> (Move, f64) {
    let mut best = candidates[0];
    for &candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::scoring::sum_of_pairs_score;
    use super::*;

    /// A = 4, B = 4, A/B = 0
    fn ab_matrix() -> SubstitutionMatrix {
        SubstitutionMatrix::from_scores(b"AB", vec![4.0, 0.0, 0.0, 4.0]).unwrap()
    }

    /// Independent Needleman-Wunsch score with a linear gap penalty
    fn pairwise_score(matrix: &SubstitutionMatrix, a: &[u8], b: &[u8], gap: f64) -> f64 {
        let mut prev: Vec<f64> = (0..=b.len()).map(|j| j as f64 * gap).collect();
        for i in 1..=a.len() {
            let mut curr = vec![i as f64 * gap; b.len() + 1];
            for j in 1..=b.len() {
                let diag = prev[j-1] + matrix.score(a[i-1], b[j-1]).unwrap();
                curr[j] = diag.max(prev[j] + gap).max(curr[j-1] + gap);
            }
            prev = curr;
        }

        prev[b.len()]
    }

    fn forced_rolling() -> AlignerConfig {
        AlignerConfig {
            rolling_min_length: 0,
            rolling_min_cells: 0,
            ..AlignerConfig::default()
        }
    }

    #[test]
    fn test_identical_sequences() {
        let matrix = ab_matrix();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        let aln = aligner.align(b"AAA", b"AAA", b"AAA", -2.0).unwrap();

        assert_eq!(aln.score(), 36.0);
        assert_eq!(aln.rows(), [b"AAA".as_slice(), b"AAA", b"AAA"]);
        assert_eq!(aln.gap_count(), 0);
    }

    #[test]
    fn test_single_gap_column() {
        let matrix = ab_matrix();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        let aln = aligner.align(b"AB", b"A", b"A", -5.0).unwrap();

        assert_eq!(aln.rows(), [b"AB".as_slice(), b"A-", b"A-"]);
        assert_eq!(aln.score(), 2.0);

        let rescored = sum_of_pairs_score(aln.rows(), -5.0, &matrix, b'-').unwrap();
        assert_eq!(rescored, aln.score());
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let matrix = ab_matrix();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        assert!(matches!(aligner.align(b"A", b"", b"", -1.0), Err(ThreewayError::EmptySequence(_))));
        assert!(matches!(aligner.align(b"A", b"A", b"", -1.0), Err(ThreewayError::EmptySequence(_))));
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let matrix = ab_matrix();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        assert!(matches!(
            aligner.align(b"AB", b"AC", b"A", -1.0),
            Err(ThreewayError::UnknownSymbol { symbol: b'C', sequence: 1, position: 1 })
        ));
    }

    #[test]
    fn test_admission_limit() {
        let matrix = ab_matrix();
        let config = AlignerConfig { max_cells: Some(27), ..AlignerConfig::default() };
        let aligner = ThreewayAligner::new(&matrix, config);

        assert!(aligner.align(b"AA", b"AA", b"AA", -1.0).is_ok());
        assert!(matches!(
            aligner.align(b"AAA", b"AA", b"AA", -1.0),
            Err(ThreewayError::TooManyCells { cells: 36, limit: 27 })
        ));
    }

    #[test]
    fn test_tie_break_prefers_earlier_moves() {
        // With a zero gap penalty and zero scores every move ties, so the path is all-diagonal
        // as far as possible, then single advances of the first sequence.
        let matrix = SubstitutionMatrix::from_scores(b"A", vec![0.0]).unwrap();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        let aln = aligner.align(b"AAA", b"A", b"A", 0.0).unwrap();
        assert_eq!(aln.rows(), [b"AAA".as_slice(), b"--A", b"--A"]);
    }

    #[test]
    fn test_custom_gap_symbol() {
        let matrix = ab_matrix();
        let config = AlignerConfig { gap_symbol: b'.', ..AlignerConfig::default() };
        let aligner = ThreewayAligner::new(&matrix, config);

        let aln = aligner.align(b"AB", b"A", b"A", -5.0).unwrap();
        assert_eq!(aln.rows(), [b"AB".as_slice(), b"A.", b"A."]);
    }

    #[test]
    fn test_gap_symbol_in_alphabet() {
        // BLOSUM62 scores '*', so it cannot double as the gap symbol
        let matrix = SubstitutionMatrix::blosum62();
        let config = AlignerConfig { gap_symbol: b'*', ..AlignerConfig::default() };
        let aligner = ThreewayAligner::new(&matrix, config);

        assert!(matches!(
            aligner.align(b"A*A", b"AA", b"A*", -3.0),
            Err(ThreewayError::GapSymbolInAlphabet(b'*'))
        ));

        let ab = ab_matrix();
        let config = AlignerConfig { gap_symbol: b'B', ..AlignerConfig::default() };
        assert!(matches!(
            ThreewayAligner::new(&ab, config).align(b"A", b"A", b"A", -1.0),
            Err(ThreewayError::GapSymbolInAlphabet(b'B'))
        ));
    }

    #[test]
    fn test_blosum62_alignment_rescores() {
        let matrix = SubstitutionMatrix::blosum62();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        let s1 = b"HEAGAWGHEE";
        let s2 = b"HEAGAWGHE";
        let s3 = b"HDAGAWGHEE";
        let aln = aligner.align(s1, s2, s3, -4.0).unwrap();

        for (ix, seq) in [s1.as_slice(), s2, s3].into_iter().enumerate() {
            assert_eq!(aln.ungapped(ix), seq);
        }

        // The path starts with a full column, so the cube and sum-of-pairs conventions agree
        assert_eq!(aln.rows()[0][0], b'H');
        assert_eq!(aln.rows()[1][0], b'H');
        assert_eq!(aln.rows()[2][0], b'H');
        let rescored = sum_of_pairs_score(aln.rows(), -4.0, &matrix, b'-').unwrap();
        assert_eq!(rescored, aln.score());
    }

    #[test]
    fn test_faces_match_pairwise_alignment() {
        let matrix = SubstitutionMatrix::blosum62();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());

        let s1 = b"MKV";
        let s2 = b"PAWHEAE";
        let s3 = b"HEAGAWGHEE";
        let gap = -3.0;

        let e1 = matrix.encode(s1, 0).unwrap();
        let e2 = matrix.encode(s2, 1).unwrap();
        let e3 = matrix.encode(s3, 2).unwrap();

        let shape = CubeShape::new(s1.len(), s2.len(), s3.len());
        let cells = shape.cells().unwrap();
        let mut cube = DenseCube::new(shape, cells);
        let mut trace = TraceArena::new(shape, cells);
        aligner.fill(&mut cube, &mut trace, [&e1, &e2, &e3], gap);

        assert_eq!(cube.get(0, s2.len(), s3.len()), pairwise_score(&matrix, s2, s3, gap));
        assert_eq!(cube.get(s1.len(), 0, s3.len()), pairwise_score(&matrix, s1, s3, gap));
        assert_eq!(cube.get(s1.len(), s2.len(), 0), pairwise_score(&matrix, s1, s2, gap));
        assert_eq!(cube.get(s1.len(), 0, 0), s1.len() as f64 * gap);
    }

    #[test]
    fn test_rolling_storage_matches_dense() {
        let matrix = SubstitutionMatrix::blosum62();
        let dense = ThreewayAligner::new(&matrix, AlignerConfig::default());
        let rolling = ThreewayAligner::new(&matrix, forced_rolling());

        let s1 = b"MKVLAAGIVGLLLAW";
        let s2 = b"MKVAAGLVGLLAW";
        let s3 = b"MRVLAGIIGLLW";

        let a = dense.align(s1, s2, s3, -2.5).unwrap();
        let b = rolling.align(s1, s2, s3, -2.5).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_align_with_indel_rate() {
        let matrix = ab_matrix();
        let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());
        let transitions = TransitionTable::new(b"AB", vec![0.4, 0.1, 0.1, 0.4]).unwrap();

        let gap = compute_gap_penalty(0.05, &transitions);
        let via_rate = aligner.align_with_indel_rate(b"ABBA", b"ABA", b"BBA", 0.05, &transitions).unwrap();
        let direct = aligner.align(b"ABBA", b"ABA", b"BBA", gap).unwrap();

        assert_eq!(via_rate, direct);
    }

    fn protein(max_len: usize) -> impl Strategy<Value=Vec<u8>> {
        proptest::collection::vec(proptest::sample::select(b"ARNDCQEGHILKMFPSTWYV".to_vec()), 1..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn alignment_rows_are_consistent(s1 in protein(8), s2 in protein(8), s3 in protein(8)) {
            let matrix = SubstitutionMatrix::blosum62();
            let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());
            let aln = aligner.align(&s1, &s2, &s3, -4.0).unwrap();

            let max_len = s1.len().max(s2.len()).max(s3.len());
            prop_assert!(aln.len() >= max_len);
            prop_assert!(aln.len() <= s1.len() + s2.len() + s3.len());
            prop_assert_eq!(aln.row(0).len(), aln.len());
            prop_assert_eq!(aln.row(1).len(), aln.len());
            prop_assert_eq!(aln.row(2).len(), aln.len());

            prop_assert_eq!(aln.ungapped(0), s1);
            prop_assert_eq!(aln.ungapped(1), s2);
            prop_assert_eq!(aln.ungapped(2), s3);

            // No column consists of gaps only
            for col in 0..aln.len() {
                prop_assert!((0..3).any(|r| aln.row(r)[col] != b'-'));
            }
        }

        #[test]
        fn score_is_permutation_invariant(s1 in protein(7), s2 in protein(7), s3 in protein(7)) {
            let matrix = SubstitutionMatrix::blosum62();
            let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());
            let gap = -3.0;

            let base = aligner.align(&s1, &s2, &s3, gap).unwrap().score();
            for [a, b, c] in [[&s1, &s3, &s2], [&s2, &s1, &s3], [&s2, &s3, &s1], [&s3, &s1, &s2], [&s3, &s2, &s1]] {
                prop_assert_eq!(aligner.align(a, b, c, gap).unwrap().score(), base);
            }
        }

        #[test]
        fn identical_runs_align_without_gaps(len in 1usize..12, symbol in proptest::sample::select(b"ARNDCQEGHILKMFPSTWYV".to_vec())) {
            let matrix = SubstitutionMatrix::blosum62();
            let aligner = ThreewayAligner::new(&matrix, AlignerConfig::default());
            let seq = vec![symbol; len];

            let aln = aligner.align(&seq, &seq, &seq, -2.0).unwrap();
            let self_score = matrix.score(symbol, symbol).unwrap();

            prop_assert_eq!(aln.gap_count(), 0);
            prop_assert_eq!(aln.score(), 3.0 * self_score * len as f64);
        }

        #[test]
        fn rolling_and_dense_agree(s1 in protein(10), s2 in protein(10), s3 in protein(10)) {
            let matrix = SubstitutionMatrix::blosum62();
            let dense = ThreewayAligner::new(&matrix, AlignerConfig::default());
            let rolling = ThreewayAligner::new(&matrix, forced_rolling());

            prop_assert_eq!(dense.align(&s1, &s2, &s3, -1.5).unwrap(), rolling.align(&s1, &s2, &s3, -1.5).unwrap());
        }
    }
}
