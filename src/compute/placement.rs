//! Placement candidates shared by recognizers and connectors.
//!
//! A placement is one way of laying a subtree onto a sequence. Recognizers
//! produce one candidate per scanned window; connectors combine the
//! candidates of their children. Every candidate carries the intervals its
//! recognizers occupy (the lock vector) so that combinations claiming the
//! same bases can be rejected further up the tree.

/// Energy reported for a sequence on which no non-overlapping placement exists.
pub const NO_PLACEMENT_ENERGY: f64 = -1000.0;

/// Interval of the sequence reserved by one recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedSite {
    /// Id of the recognizer holding the interval.
    pub id: usize,
    /// First base of the interval.
    pub position: usize,
    /// Interval width.
    pub length: usize,
}

impl LockedSite {
    /// End of the half-open interval `[position, position + length)`.
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// Half-open interval overlap test.
    #[inline]
    pub fn overlaps(&self, other: &LockedSite) -> bool {
        self.position < other.end() && other.position < self.end()
    }
}

/// A ranked placement option for a subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Center of the subtree on the sequence.
    pub position: f64,
    /// Combined energy of the subtree.
    pub energy: f64,
    /// Intervals reserved by the recognizers of the subtree.
    pub lock_vector: Vec<LockedSite>,
    /// Individual recognizer scores, in lock vector order.
    pub recognizer_scores: Vec<f64>,
}

impl Placement {
    /// Failure value returned when no feasible placement exists.
    pub fn none() -> Self {
        Self {
            position: 0.0,
            energy: NO_PLACEMENT_ENERGY,
            lock_vector: Vec::new(),
            recognizer_scores: Vec::new(),
        }
    }

    /// True if any interval of `self` overlaps any interval of `other`.
    pub fn conflicts_with(&self, other: &Placement) -> bool {
        self.lock_vector
            .iter()
            .any(|a| other.lock_vector.iter().any(|b| a.overlaps(b)))
    }

    /// Merge two non-conflicting placements under a connector.
    pub fn combine(first: &Placement, second: &Placement, spacer_energy: f64) -> Self {
        let mut lock_vector = Vec::with_capacity(first.lock_vector.len() + second.lock_vector.len());
        lock_vector.extend_from_slice(&first.lock_vector);
        lock_vector.extend_from_slice(&second.lock_vector);

        let mut recognizer_scores =
            Vec::with_capacity(first.recognizer_scores.len() + second.recognizer_scores.len());
        recognizer_scores.extend_from_slice(&first.recognizer_scores);
        recognizer_scores.extend_from_slice(&second.recognizer_scores);

        Self {
            position: (first.position + second.position) / 2.0,
            energy: first.energy + second.energy + spacer_energy,
            lock_vector,
            recognizer_scores,
        }
    }
}

/// Sort candidates by descending energy (stable) and keep the best `budget`.
pub fn rank_and_truncate(candidates: &mut Vec<Placement>, budget: usize) {
    candidates.sort_by(|a, b| b.energy.total_cmp(&a.energy));
    candidates.truncate(budget);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(position: usize, length: usize) -> LockedSite {
        LockedSite {
            id: 0,
            position,
            length,
        }
    }

    fn single(position: usize, length: usize, energy: f64) -> Placement {
        Placement {
            position: position as f64 + length as f64 / 2.0,
            energy,
            lock_vector: vec![site(position, length)],
            recognizer_scores: vec![energy],
        }
    }

    #[test]
    fn test_overlap_half_open() {
        assert!(site(0, 4).overlaps(&site(3, 2)));
        assert!(site(3, 2).overlaps(&site(0, 4)));
        assert!(!site(0, 4).overlaps(&site(4, 2)));
        assert!(!site(4, 2).overlaps(&site(0, 4)));
        // Containment
        assert!(site(0, 10).overlaps(&site(2, 2)));
    }

    #[test]
    fn test_combine_concatenates() {
        let a = single(0, 2, 1.5);
        let b = single(6, 2, 2.5);
        let merged = Placement::combine(&a, &b, 0.5);

        assert!((merged.energy - 4.5).abs() < 1e-12);
        assert!((merged.position - 4.0).abs() < 1e-12);
        assert_eq!(merged.lock_vector.len(), 2);
        assert_eq!(merged.recognizer_scores, vec![1.5, 2.5]);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_rank_and_truncate() {
        let mut candidates = vec![single(0, 1, 1.0), single(1, 1, 3.0), single(2, 1, 2.0)];
        rank_and_truncate(&mut candidates, 2);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].energy, 3.0);
        assert_eq!(candidates[1].energy, 2.0);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let mut candidates = vec![single(0, 1, 1.0), single(5, 1, 1.0)];
        rank_and_truncate(&mut candidates, 10);
        assert_eq!(candidates[0].lock_vector[0].position, 0);
    }

    #[test]
    fn test_sentinel() {
        let none = Placement::none();
        assert_eq!(none.energy, NO_PLACEMENT_ENERGY);
        assert!(none.lock_vector.is_empty());
    }
}
