//! Position-specific scoring matrix recognizers.
//!
//! A recognizer is a leaf of the organism tree. It holds a position weight
//! matrix (PWM) of base probabilities and scores DNA windows with the
//! derived log-odds matrix against a uniform background.

use rand::Rng;
use rand::seq::index;

use super::factory::OrganismFactory;
use super::placement::{LockedSite, Placement, rank_and_truncate};
use crate::schema::PssmConfig;

/// Bases in column order.
pub const BASES: [u8; 4] = *b"acgt";

/// Column index of a base, case-insensitive.
#[inline]
pub fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_lowercase() {
        b'a' => Some(0),
        b'c' => Some(1),
        b'g' => Some(2),
        b't' => Some(3),
        _ => None,
    }
}

/// Column index of the complementary base (a<->t, c<->g).
#[inline]
fn complement(index: usize) -> usize {
    3 - index
}

/// PSSM recognizer node.
#[derive(Debug, Clone)]
pub struct PssmRecognizer {
    id: usize,
    pwm: Vec<[f64; 4]>,
    scoring_matrix: Vec<[f64; 4]>,
    /// Best-scoring bases of every column.
    optimal_bases: Vec<Vec<u8>>,
    config: PssmConfig,
}

impl PssmRecognizer {
    /// Create a recognizer from PWM columns in `a, c, g, t` order.
    pub fn new(pwm: Vec<[f64; 4]>, config: PssmConfig) -> Self {
        let mut recognizer = Self {
            id: 0,
            pwm,
            scoring_matrix: Vec::new(),
            optimal_bases: Vec::new(),
            config,
        };
        recognizer.recalculate_pssm();
        recognizer
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Number of columns.
    #[inline]
    pub fn length(&self) -> usize {
        self.pwm.len()
    }

    pub fn pwm(&self) -> &[[f64; 4]] {
        &self.pwm
    }

    pub fn scoring_matrix(&self) -> &[[f64; 4]] {
        &self.scoring_matrix
    }

    pub fn config(&self) -> &PssmConfig {
        &self.config
    }

    /// Best-scoring bases of every column.
    pub fn optimal_bases(&self) -> &[Vec<u8>] {
        &self.optimal_bases
    }

    /// Every base string reaching the maximal score.
    ///
    /// The count is the product of the tie sizes per column, so a matrix
    /// with many uninformative columns yields exponentially many strings.
    pub fn optimal_combinations(&self) -> Vec<String> {
        let mut combinations = vec![String::new()];
        for bases in &self.optimal_bases {
            combinations = combinations
                .iter()
                .flat_map(|prefix| {
                    bases.iter().map(move |&b| {
                        let mut next = prefix.clone();
                        next.push(b as char);
                        next
                    })
                })
                .collect();
        }
        combinations
    }

    /// Rebuild the log-odds matrix and optimal bases from the PWM.
    ///
    /// `score = log2(4 * p + pseudo_count)`, i.e. log-odds against a
    /// uniform 0.25 background.
    pub fn recalculate_pssm(&mut self) {
        let pseudo_count = self.config.pseudo_count;
        self.scoring_matrix = self
            .pwm
            .iter()
            .map(|column| column.map(|p| (4.0 * p + pseudo_count).log2()))
            .collect();

        self.optimal_bases = self
            .scoring_matrix
            .iter()
            .map(|column| {
                let best = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                BASES
                    .iter()
                    .zip(column)
                    .filter(|&(_, score)| *score == best)
                    .map(|(&b, _)| b)
                    .collect()
            })
            .collect();
    }

    /// Score a window of exactly `length()` bases.
    ///
    /// With reverse complement scanning the complementary strand is scored
    /// column by column and the larger of both sums is returned. Bases other
    /// than a, c, g, t contribute nothing.
    pub fn get_score(&self, window: &[u8]) -> f64 {
        let mut forward = 0.0;
        let mut reverse = 0.0;
        let length = window.len();

        for i in 0..length {
            let j = length - i - 1;
            if let Some(b) = base_index(window[i]) {
                forward += self.scoring_matrix[i][b];
            }
            if let Some(b) = base_index(window[j]) {
                reverse += self.scoring_matrix[j][complement(b)];
            }
        }

        if forward > reverse || !self.config.scan_reverse_complement {
            forward
        } else {
            reverse
        }
    }

    /// Rank every window of the sequence and keep the best options.
    ///
    /// No overlap filtering happens here; the parent connector rejects
    /// conflicting combinations.
    pub fn get_placement(
        &self,
        sequence: &[u8],
        seq_len: usize,
        automatic_options: usize,
        use_automatic_options: bool,
    ) -> Vec<Placement> {
        let seq_len = seq_len.min(sequence.len());
        let length = self.length();
        if length == 0 || length > seq_len {
            return Vec::new();
        }

        let mut candidates: Vec<Placement> = (0..=seq_len - length)
            .map(|start| {
                let energy = self.get_score(&sequence[start..start + length]);
                Placement {
                    position: start as f64 + length as f64 / 2.0,
                    energy,
                    lock_vector: vec![LockedSite {
                        id: self.id,
                        position: start,
                        length,
                    }],
                    recognizer_scores: vec![energy],
                }
            })
            .collect();

        let budget = if use_automatic_options {
            automatic_options
        } else {
            self.config.placement_options
        };
        rank_and_truncate(&mut candidates, budget);
        candidates
    }

    /// Apply the configured matrix mutations, each with its own probability.
    pub fn mutate<R: Rng + ?Sized>(&mut self, factory: &OrganismFactory, rng: &mut R) {
        let config = &self.config;

        if rng.r#gen::<f64>() < config.mutate_probability_random_col {
            let column = rng.gen_range(0..self.pwm.len());
            self.pwm[column] = factory.random_pwm_column(rng);
        }

        if rng.r#gen::<f64>() < config.mutate_probability_flip_col && self.pwm.len() >= 2 {
            let picked = index::sample(rng, self.pwm.len(), 2);
            self.pwm.swap(picked.index(0), picked.index(1));
        }

        if rng.r#gen::<f64>() < config.mutate_probability_flip_row {
            let picked = index::sample(rng, BASES.len(), 2);
            let (row1, row2) = (picked.index(0), picked.index(1));
            for column in &mut self.pwm {
                column.swap(row1, row2);
            }
        }

        if rng.r#gen::<f64>() < config.mutate_probability_shift_left {
            self.pwm.rotate_left(1);
        }

        if rng.r#gen::<f64>() < config.mutate_probability_shift_right {
            self.pwm.rotate_right(1);
        }

        if rng.r#gen::<f64>() < config.mutate_probability_increase_pwm
            && self.pwm.len() < config.max_columns
        {
            let column = factory.random_pwm_column(rng);
            if rng.gen_bool(0.5) {
                self.pwm.insert(0, column);
            } else {
                self.pwm.push(column);
            }
        }

        if rng.r#gen::<f64>() < config.mutate_probability_decrease_pwm
            && self.pwm.len() > config.min_columns
        {
            // The last column is never the one removed.
            let column = rng.gen_range(0..self.pwm.len() - 1);
            self.pwm.remove(column);
        }

        self.recalculate_pssm();
    }

    /// Most probable base of every column, uppercased when its probability
    /// reaches `UPPER_PRINT_PROBABILITY`.
    pub fn consensus(&self) -> String {
        self.pwm
            .iter()
            .map(|column| {
                let mut best = 0;
                for b in 1..BASES.len() {
                    if column[b] > column[best] {
                        best = b;
                    }
                }
                let base = BASES[best] as char;
                if column[best] >= self.config.upper_print_probability {
                    base.to_ascii_uppercase()
                } else {
                    base
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OrganismsConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config() -> PssmConfig {
        PssmConfig {
            pseudo_count: 0.1,
            placement_options: 3,
            ..PssmConfig::default()
        }
    }

    fn all_a(length: usize) -> Vec<[f64; 4]> {
        vec![[1.0, 0.0, 0.0, 0.0]; length]
    }

    #[test]
    fn test_scoring_matrix_log_odds() {
        let pssm = PssmRecognizer::new(vec![[0.25, 0.25, 0.25, 0.25]], config());
        let expected = (1.0f64 + 0.1).log2();
        for score in pssm.scoring_matrix()[0] {
            assert!((score - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_window_score() {
        let pseudo_count = 0.1;
        let pssm = PssmRecognizer::new(all_a(4), config());
        let placements = pssm.get_placement(b"aaaa", 4, 0, false);

        assert_eq!(placements.len(), 1);
        let expected = 4.0 * (4.0f64 * 1.0 + pseudo_count).log2();
        assert!((placements[0].energy - expected).abs() < 1e-12);
        assert_eq!(placements[0].lock_vector[0].position, 0);
        assert!((placements[0].position - 2.0).abs() < 1e-12);
        assert_eq!(placements[0].recognizer_scores, vec![placements[0].energy]);
    }

    #[test]
    fn test_placement_budget_and_order() {
        let pssm = PssmRecognizer::new(
            vec![[0.7, 0.1, 0.1, 0.1], [0.1, 0.1, 0.7, 0.1]],
            config(),
        );
        let sequence = b"acgtagctagatcgatgcag";

        let static_budget = pssm.get_placement(sequence, sequence.len(), 0, false);
        assert_eq!(static_budget.len(), 3);

        let automatic = pssm.get_placement(sequence, sequence.len(), 5, true);
        assert_eq!(automatic.len(), 5);
        for pair in automatic.windows(2) {
            assert!(pair[0].energy >= pair[1].energy);
        }
        // "ag" at 4 is a best window
        assert!(automatic[0].energy > automatic[4].energy);
    }

    #[test]
    fn test_window_longer_than_sequence() {
        let pssm = PssmRecognizer::new(all_a(6), config());
        assert!(pssm.get_placement(b"aaaa", 4, 10, true).is_empty());
    }

    #[test]
    fn test_reverse_complement_keeps_best_strand() {
        let forward_only = PssmRecognizer::new(all_a(3), config());
        let both = PssmRecognizer::new(
            all_a(3),
            PssmConfig {
                scan_reverse_complement: true,
                ..config()
            },
        );
        // "ttt" complements to "aaa"
        assert!(both.get_score(b"ttt") > forward_only.get_score(b"ttt"));
        assert!((both.get_score(b"ttt") - forward_only.get_score(b"aaa")).abs() < 1e-12);
        assert!((both.get_score(b"aaa") - forward_only.get_score(b"aaa")).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_combination_ties() {
        let pssm = PssmRecognizer::new(
            vec![[0.5, 0.5, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]],
            config(),
        );
        let mut combos = pssm.optimal_combinations();
        combos.sort();
        assert_eq!(combos, vec!["at".to_string(), "ct".to_string()]);
    }

    #[test]
    fn test_consensus_uppercase() {
        let pssm = PssmRecognizer::new(
            vec![[0.95, 0.05, 0.0, 0.0], [0.1, 0.2, 0.6, 0.1]],
            config(),
        );
        assert_eq!(pssm.consensus(), "Ag");
    }

    #[test]
    fn test_mutation_respects_column_bounds() {
        let full = OrganismsConfig::default();
        let factory = OrganismFactory::new(full.clone()).unwrap();
        let pssm_config = PssmConfig {
            mutate_probability_increase_pwm: 1.0,
            mutate_probability_decrease_pwm: 0.0,
            ..full.pssm.clone()
        };
        let mut rng = StdRng::seed_from_u64(42);

        let mut pssm = PssmRecognizer::new(all_a(pssm_config.max_columns), pssm_config.clone());
        pssm.mutate(&factory, &mut rng);
        assert_eq!(pssm.length(), pssm_config.max_columns);

        let shrink_config = PssmConfig {
            mutate_probability_increase_pwm: 0.0,
            mutate_probability_decrease_pwm: 1.0,
            ..pssm_config
        };
        let mut pssm = PssmRecognizer::new(all_a(shrink_config.min_columns), shrink_config.clone());
        for _ in 0..10 {
            pssm.mutate(&factory, &mut rng);
        }
        assert_eq!(pssm.length(), shrink_config.min_columns);
    }

    /// Mutation config with every operator disabled except the ones `enable` sets.
    fn single_operator(enable: impl FnOnce(&mut PssmConfig)) -> PssmConfig {
        let mut config = PssmConfig {
            mutate_probability_random_col: 0.0,
            mutate_probability_flip_col: 0.0,
            mutate_probability_flip_row: 0.0,
            mutate_probability_shift_left: 0.0,
            mutate_probability_shift_right: 0.0,
            mutate_probability_increase_pwm: 0.0,
            mutate_probability_decrease_pwm: 0.0,
            ..PssmConfig::default()
        };
        enable(&mut config);
        config
    }

    fn factory() -> OrganismFactory {
        OrganismFactory::new(OrganismsConfig::default()).unwrap()
    }

    fn distinct_columns() -> Vec<[f64; 4]> {
        vec![
            [0.7, 0.1, 0.1, 0.1],
            [0.1, 0.7, 0.1, 0.1],
            [0.1, 0.1, 0.7, 0.1],
        ]
    }

    #[test]
    fn test_row_flip_swaps_one_pair_and_recomputes_matrix() {
        let factory = factory();
        let column = [0.1, 0.2, 0.3, 0.4];
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = single_operator(|c| c.mutate_probability_flip_row = 1.0);
            let mut pssm = PssmRecognizer::new(vec![column; 3], config);
            pssm.mutate(&factory, &mut rng);

            let flipped = pssm.pwm()[0];
            let changed: Vec<usize> = (0..4).filter(|&b| flipped[b] != column[b]).collect();
            assert_eq!(changed.len(), 2, "seed {}: {:?}", seed, flipped);
            let (i, j) = (changed[0], changed[1]);
            assert_eq!(flipped[i], column[j]);
            assert_eq!(flipped[j], column[i]);
            assert!(pssm.pwm().iter().all(|c| *c == flipped));

            for (probabilities, scores) in pssm.pwm().iter().zip(pssm.scoring_matrix()) {
                for b in 0..4 {
                    let expected = (4.0 * probabilities[b] + pssm.config().pseudo_count).log2();
                    assert!((scores[b] - expected).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_increase_adds_column_at_either_end() {
        let factory = factory();
        let columns = distinct_columns();
        let (mut front, mut back) = (false, false);
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = single_operator(|c| c.mutate_probability_increase_pwm = 1.0);
            let mut pssm = PssmRecognizer::new(columns.clone(), config);
            pssm.mutate(&factory, &mut rng);

            assert_eq!(pssm.length(), 4);
            assert_eq!(pssm.scoring_matrix().len(), 4);
            if pssm.pwm()[1..] == columns[..] {
                front = true;
            } else {
                assert_eq!(&pssm.pwm()[..3], &columns[..]);
                back = true;
            }
        }
        assert!(front && back);
    }

    #[test]
    fn test_decrease_removes_one_column_keeping_last() {
        let factory = factory();
        let columns = distinct_columns();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = single_operator(|c| c.mutate_probability_decrease_pwm = 1.0);
            let mut pssm = PssmRecognizer::new(columns.clone(), config);
            pssm.mutate(&factory, &mut rng);

            assert_eq!(pssm.length(), 2);
            assert_eq!(pssm.pwm()[1], columns[2]);
            assert!(columns[..2].contains(&pssm.pwm()[0]));
        }
    }

    #[test]
    fn test_column_flip_swaps_two_columns() {
        let factory = factory();
        let columns = distinct_columns()[..2].to_vec();
        let mut rng = StdRng::seed_from_u64(42);
        let config = single_operator(|c| c.mutate_probability_flip_col = 1.0);
        let mut pssm = PssmRecognizer::new(columns.clone(), config);
        pssm.mutate(&factory, &mut rng);

        assert_eq!(pssm.pwm(), &[columns[1], columns[0]]);
        assert_eq!(pssm.consensus(), "ca");
    }

    #[test]
    fn test_column_flip_needs_two_columns() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(42);
        let config = single_operator(|c| c.mutate_probability_flip_col = 1.0);
        let mut pssm = PssmRecognizer::new(vec![[0.7, 0.1, 0.1, 0.1]], config);
        pssm.mutate(&factory, &mut rng);
        assert_eq!(pssm.pwm(), &[[0.7, 0.1, 0.1, 0.1]]);
    }

    #[test]
    fn test_shift_right_wraps_around() {
        let factory = factory();
        let columns = distinct_columns();
        let mut rng = StdRng::seed_from_u64(1);
        let config = single_operator(|c| c.mutate_probability_shift_right = 1.0);
        let mut pssm = PssmRecognizer::new(columns.clone(), config);
        pssm.mutate(&factory, &mut rng);

        assert_eq!(pssm.pwm(), &[columns[2], columns[0], columns[1]]);
    }

    #[test]
    fn test_random_column_replaces_exactly_one() {
        let factory = factory();
        // Generated columns are multiples of 0.05, so they never equal this one.
        let marker = [0.33, 0.33, 0.33, 0.01];
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = single_operator(|c| c.mutate_probability_random_col = 1.0);
            let mut pssm = PssmRecognizer::new(vec![marker; 3], config);
            pssm.mutate(&factory, &mut rng);

            assert_eq!(pssm.length(), 3);
            let replaced: Vec<&[f64; 4]> = pssm.pwm().iter().filter(|c| **c != marker).collect();
            assert_eq!(replaced.len(), 1);
            let total: f64 = replaced[0].iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_shift_is_circular() {
        let full = OrganismsConfig::default();
        let factory = OrganismFactory::new(full.clone()).unwrap();
        let pssm_config = PssmConfig {
            mutate_probability_random_col: 0.0,
            mutate_probability_flip_col: 0.0,
            mutate_probability_flip_row: 0.0,
            mutate_probability_shift_left: 1.0,
            mutate_probability_shift_right: 0.0,
            mutate_probability_increase_pwm: 0.0,
            mutate_probability_decrease_pwm: 0.0,
            ..full.pssm
        };
        let columns = vec![
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let mut pssm = PssmRecognizer::new(columns.clone(), pssm_config);
        pssm.mutate(&factory, &mut rng);

        assert_eq!(pssm.pwm()[0], columns[1]);
        assert_eq!(pssm.pwm()[2], columns[0]);
    }
}
