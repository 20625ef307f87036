//! Connector nodes and the spacer energy model.
//!
//! A connector joins two subtrees and scores the distance between their
//! centers with a log-likelihood ratio: a Gaussian spacer model normalized
//! over the distances a sequence can show, against the distance
//! distribution of two uniformly random positions.

use rand::Rng;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use super::factory::OrganismFactory;
use super::node::Node;
use super::placement::{Placement, rank_and_truncate};
use crate::schema::ConnectorConfig;

/// Lower bound applied to densities and normalizers before taking logs.
const DENSITY_FLOOR: f64 = 1e-100;

/// Connector node.
#[derive(Debug, Clone)]
pub struct Connector {
    id: usize,
    mu: f64,
    sigma: f64,
    config: ConnectorConfig,
    pub(crate) left: Box<Node>,
    pub(crate) right: Box<Node>,
}

impl Connector {
    /// Create a connector; a negative sigma is clamped to 0.
    pub fn new(mu: f64, sigma: f64, config: ConnectorConfig, left: Node, right: Node) -> Self {
        Self {
            id: 0,
            mu,
            sigma: sigma.max(0.0),
            config,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
    }

    pub fn set_sigma(&mut self, sigma: f64) {
        self.sigma = sigma.max(0.0);
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn left(&self) -> &Node {
        &self.left
    }

    pub fn right(&self) -> &Node {
        &self.right
    }

    pub fn set_left(&mut self, node: Node) -> Node {
        std::mem::replace(&mut *self.left, node)
    }

    pub fn set_right(&mut self, node: Node) -> Node {
        std::mem::replace(&mut *self.right, node)
    }

    /// Spacer density of `distance`, normalized by the Gaussian mass inside
    /// the observable range `[-(L-1), L-1]`.
    fn spacer_probability(&self, distance: f64, seq_len: usize) -> f64 {
        let normal = if self.sigma > 0.0 {
            Normal::new(self.mu, self.sigma).ok()
        } else {
            None
        };

        let (density, auc) = match normal {
            Some(normal) => {
                let max_distance = seq_len.saturating_sub(1) as f64;
                let auc = normal.cdf(max_distance) - normal.cdf(-max_distance);
                (normal.pdf(distance), auc)
            }
            None => {
                let density = if distance == self.mu { 1.0 } else { 0.0 };
                (density, 1.0)
            }
        };

        density.max(DENSITY_FLOOR) / auc.max(DENSITY_FLOOR)
    }

    /// Probability of observing `distance` between two uniformly random
    /// positions of a sequence of length `seq_len`.
    fn null_probability(distance: f64, seq_len: usize) -> f64 {
        if seq_len < 2 {
            return 1.0;
        }
        let length = seq_len as f64;
        ((length - distance.abs()) / (length * (length - 1.0))).max(DENSITY_FLOOR)
    }

    /// `log2(spacer / null)` for a distance between daughter positions.
    pub fn spacer_log_ratio(&self, distance: f64, seq_len: usize) -> f64 {
        let numerator = self.spacer_probability(distance, seq_len);
        let denominator = Self::null_probability(distance, seq_len);
        (numerator / denominator).log2()
    }

    /// Energy contributed by this connector, weighted by `TAU`.
    pub fn get_energy(&self, distance: f64, seq_len: usize) -> f64 {
        self.config.tau * self.spacer_log_ratio(distance, seq_len)
    }

    /// Combine the ranked placements of both children.
    ///
    /// Pairs whose recognizers claim overlapping intervals are dropped. The
    /// result is ranked and truncated to the same budget the children use.
    pub fn get_placement(
        &self,
        sequence: &[u8],
        seq_len: usize,
        automatic_options: usize,
        use_automatic_options: bool,
    ) -> Vec<Placement> {
        let left = self
            .left
            .get_placement(sequence, seq_len, automatic_options, use_automatic_options);
        let right = self
            .right
            .get_placement(sequence, seq_len, automatic_options, use_automatic_options);

        let mut candidates = Vec::with_capacity(left.len() * right.len());
        for first in &left {
            for second in &right {
                if first.conflicts_with(second) {
                    continue;
                }
                let distance = second.position - first.position;
                let spacer_energy = self.get_energy(distance, seq_len);
                candidates.push(Placement::combine(first, second, spacer_energy));
            }
        }

        let budget = if use_automatic_options {
            automatic_options
        } else {
            self.config.placement_options
        };
        rank_and_truncate(&mut candidates, budget);
        candidates
    }

    /// Apply the configured spacer mutations, each with its own probability.
    pub fn mutate<R: Rng + ?Sized>(&mut self, _factory: &OrganismFactory, rng: &mut R) {
        if rng.r#gen::<f64>() < self.config.mutate_probability_sigma {
            let delta = bounded_delta(rng, self.config.mutate_variance_sigma);
            self.sigma = (self.sigma + delta).max(0.0);
        }

        if rng.r#gen::<f64>() < self.config.mutate_probability_mu {
            let delta = bounded_delta(rng, self.config.mutate_variance_mu);
            self.mu += delta;
        }

        if rng.r#gen::<f64>() < self.config.mutate_probability_swap {
            std::mem::swap(&mut self.left, &mut self.right);
        }
    }
}

/// Uniform value in `[-variance, variance]`.
fn bounded_delta<R: Rng + ?Sized>(rng: &mut R, variance: f64) -> f64 {
    if variance > 0.0 {
        rng.gen_range(-variance..=variance)
    } else {
        0.0
    }
}
