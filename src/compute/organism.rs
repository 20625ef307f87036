//! Organisms: a root node plus the whole-tree operations.
//!
//! An organism owns its tree exclusively. Node ids are renumbered in-order
//! after every structural edit, so random picks by in-order index and
//! lookups by id agree.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use rand::Rng;

use super::factory::OrganismFactory;
use super::node::{Node, ParentLink};
use super::placement::Placement;
use super::stats::{geometric_mean, gini_rsv};
use crate::schema::{CumulativeFitMethod, EnergyThresholdMethod, OrganismConfig, OrganismRecord};

/// Penalty per node outside `[MIN_NODES, MAX_NODES]`.
const COMPLEXITY_PENALTY_FACTOR: f64 = 300.0;

/// Where a node hangs in an organism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// The node is the root.
    Root,
    /// The node is a child of a connector.
    Child(ParentLink),
}

/// Aggregated fitness over a sequence set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessSummary {
    pub score: f64,
    /// Geometric mean of the per-sequence Gini-RSV of recognizer scores.
    pub avg_gini: f64,
}

/// One candidate binding model.
#[derive(Debug, Clone)]
pub struct Organism {
    id: u64,
    root: Node,
    num_nodes: usize,
    num_recognizers: usize,
    is_tracked: bool,
    config: OrganismConfig,
}

impl Organism {
    /// Wrap `root` into an organism and number its nodes.
    pub fn new(id: u64, root: Node, config: OrganismConfig) -> Self {
        let mut organism = Self {
            id,
            root,
            num_nodes: 0,
            num_recognizers: 0,
            is_tracked: false,
            config,
        };
        organism.reset_ids();
        organism
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    pub fn is_tracked(&self) -> bool {
        self.is_tracked
    }

    pub fn set_is_tracked(&mut self, is_tracked: bool) {
        self.is_tracked = is_tracked;
    }

    pub fn config(&self) -> &OrganismConfig {
        &self.config
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Replace the whole tree, returning the previous one.
    pub fn set_root(&mut self, root: Node) -> Node {
        let previous = std::mem::replace(&mut self.root, root);
        self.reset_ids();
        previous
    }

    #[inline]
    pub fn count_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn count_recognizers(&self) -> usize {
        self.num_recognizers
    }

    /// Renumber nodes in-order from 0 and refresh the cached counts.
    pub fn reset_ids(&mut self) {
        self.root.reset_id(0);
        self.num_nodes = self.root.count_nodes();
        self.num_recognizers = self.root.count_recognizers();
    }

    /// Node at in-order position `index`.
    pub fn get_node(&self, index: usize) -> Option<&Node> {
        self.root.get_node(index)
    }

    pub fn get_node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.root.get_node_mut(index)
    }

    /// Location of the node carrying `id`; `None` if no node has it.
    pub fn get_parent(&self, id: usize) -> Option<ParentRef> {
        if self.root.id() == id {
            return Some(ParentRef::Root);
        }
        self.root.get_parent(id).map(ParentRef::Child)
    }

    /// Put `node` where the node carrying `id` is and renumber the tree.
    ///
    /// Returns the displaced subtree, or `None` if no node has `id` (the
    /// tree is left untouched).
    pub fn replace_node(&mut self, id: usize, node: Node) -> Option<Node> {
        let displaced = match self.get_parent(id)? {
            ParentRef::Root => std::mem::replace(&mut self.root, node),
            ParentRef::Child(link) => self.root.replace_child(link, node)?,
        };
        self.reset_ids();
        Some(displaced)
    }

    /// Best placement of the organism on `sequence`.
    ///
    /// Returns [`Placement::none`] when every combination overlaps.
    pub fn get_seq_fitness(&self, sequence: &str) -> Placement {
        let bytes = sequence.as_bytes();
        let automatic_options = (self.root.max_recognizer_length() + 1) * self.num_recognizers;

        let placements = self.root.get_placement(
            bytes,
            bytes.len(),
            automatic_options,
            self.config.automatic_placement_options,
        );

        let Some(mut best) = placements.into_iter().next() else {
            warn!(
                "organism {}: no feasible placement on a sequence of length {}",
                self.id,
                bytes.len()
            );
            return Placement::none();
        };

        if self.config.energy_threshold_method == EnergyThresholdMethod::Floor {
            best.energy = best.energy.max(self.config.energy_threshold_param);
        }
        best
    }

    /// Sum or mean of the best energies over `sequences`.
    pub fn get_seq_set_fitness<S: AsRef<str>>(&self, sequences: &[S]) -> f64 {
        let energies: Vec<f64> = sequences
            .iter()
            .map(|s| self.get_seq_fitness(s.as_ref()).energy)
            .collect();
        self.aggregate(&energies)
    }

    /// Energy aggregate plus how unevenly the recognizers contribute.
    ///
    /// `avg_gini` is 1.0 when no sequence produced recognizer scores.
    pub fn get_discriminative_fitness<S: AsRef<str>>(&self, sequences: &[S]) -> FitnessSummary {
        let placements: Vec<Placement> = sequences
            .iter()
            .map(|s| self.get_seq_fitness(s.as_ref()))
            .collect();
        let energies: Vec<f64> = placements.iter().map(|p| p.energy).collect();

        FitnessSummary {
            score: self.aggregate(&energies),
            avg_gini: average_gini(&placements),
        }
    }

    /// Boltzmann fitness: share of the binding mass falling on positives.
    ///
    /// `score = P / (P + scale * N)` with `P` and `N` the sums of
    /// `exp(energy)` over positives and negatives, and
    /// `scale = genome_length / total negative length` (integer division)
    /// standing in for a genome-sized background.
    pub fn get_boltz_fitness<S: AsRef<str>>(
        &self,
        positives: &[S],
        negatives: &[S],
        genome_length: usize,
    ) -> FitnessSummary {
        let positive_placements: Vec<Placement> = positives
            .iter()
            .map(|s| self.get_seq_fitness(s.as_ref()))
            .collect();
        let positive_mass: f64 = positive_placements.iter().map(|p| p.energy.exp()).sum();

        let negative_mass: f64 = negatives
            .iter()
            .map(|s| self.get_seq_fitness(s.as_ref()).energy.exp())
            .sum();
        let negative_length: usize = negatives.iter().map(|s| s.as_ref().len()).sum();
        let scale = if negative_length == 0 {
            0.0
        } else {
            (genome_length / negative_length) as f64
        };

        let denominator = positive_mass + scale * negative_mass;
        let score = if denominator > 0.0 {
            positive_mass / denominator
        } else {
            0.0
        };

        FitnessSummary {
            score,
            avg_gini: average_gini(&positive_placements),
        }
    }

    /// Complexity penalty relative to the population.
    ///
    /// The base term scales the population's mean fitness by how many
    /// recognizers this organism has compared to the population mean. Node
    /// counts outside `[MIN_NODES, MAX_NODES]` add a steep linear penalty.
    pub fn get_complexity(&self, mean_fitness: f64, mean_recognizers: f64) -> f64 {
        let base_penalty = if mean_recognizers == 0.0 {
            0.0
        } else {
            mean_fitness * self.num_recognizers as f64 / mean_recognizers
        };

        let nodes = self.num_nodes;
        let out_of_bounds = if nodes < self.config.min_nodes {
            self.config.min_nodes - nodes
        } else {
            nodes.saturating_sub(self.config.max_nodes)
        };

        base_penalty + out_of_bounds as f64 * COMPLEXITY_PENALTY_FACTOR
    }

    /// Apply the genetic operators, each gated by its own draw.
    ///
    /// In order: substitute a random subtree with a fresh recognizer, rise a
    /// random node into its parent's slot, sink a random node under a fresh
    /// connector, and mutate a random node in place.
    pub fn mutate<R: Rng + ?Sized>(&mut self, factory: &OrganismFactory, rng: &mut R) {
        if rng.r#gen::<f64>() < self.config.mutate_probability_substitute_pssm {
            let id = self.random_node_id(rng);
            let length = factory.config().organism_factory.pwm_length;
            let recognizer = factory.create_pssm(length, rng);
            self.replace_node(id, Node::Recognizer(recognizer));
            debug!("organism {}: substituted node {} with a recognizer", self.id, id);
        }

        if rng.r#gen::<f64>() < self.config.mutate_probability_rise_child {
            let id = self.random_node_id(rng);
            if let Some(ParentRef::Child(link)) = self.get_parent(id) {
                if let Some(risen) = self.root.find(id).cloned() {
                    self.replace_node(link.parent_id, risen);
                    debug!("organism {}: node {} rose over {}", self.id, id, link.parent_id);
                }
            }
        }

        if rng.r#gen::<f64>() < self.config.mutate_probability_sunk_child {
            let id = self.random_node_id(rng);
            if let Some(sunk) = self.root.find(id).cloned() {
                let mut connector = factory.create_connection(0.0, rng);
                if rng.gen_bool(0.5) {
                    connector.set_left(sunk);
                } else {
                    connector.set_right(sunk);
                }
                self.replace_node(id, Node::Connector(connector));
                debug!("organism {}: node {} sunk under a new connector", self.id, id);
            }
        }

        if rng.r#gen::<f64>() < self.config.mutate_probability_node_mutation {
            let index = rng.gen_range(0..self.num_nodes);
            if let Some(node) = self.root.get_node_mut(index) {
                node.mutate(factory, rng);
            }
            // Recognizer widths may have changed.
            self.reset_ids();
        }
    }

    fn random_node_id<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let index = rng.gen_range(0..self.num_nodes);
        self.root.get_node(index).map_or(index, Node::id)
    }

    /// Sequence and a map line marking where every recognizer binds.
    ///
    /// Unbound bases are `-`; bound ones repeat the recognizer id digits
    /// over its interval.
    pub fn binding_map(&self, sequence: &str) -> String {
        let sequence = sequence.to_ascii_lowercase();
        let placement = self.get_seq_fitness(&sequence);

        let mut map = vec![b'-'; sequence.len()];
        for site in &placement.lock_vector {
            let digits = site.id.to_string();
            let label = digits.bytes().cycle().take(site.length);
            for (slot, digit) in map.iter_mut().skip(site.position).zip(label) {
                *slot = digit;
            }
        }

        format!("{}\n{}", sequence, String::from_utf8_lossy(&map))
    }

    /// Write the binding maps of a sorted copy of `sequences` to `path`.
    pub fn export_results<S: AsRef<str>, P: AsRef<Path>>(
        &self,
        sequences: &[S],
        path: P,
    ) -> io::Result<()> {
        let mut sorted: Vec<&str> = sequences.iter().map(|s| s.as_ref()).collect();
        sorted.sort_unstable();

        let mut writer = BufWriter::new(File::create(path)?);
        for sequence in sorted {
            writeln!(writer)?;
            writeln!(writer, "{}", self.binding_map(sequence))?;
        }
        writer.flush()
    }

    /// Persisted form of the organism.
    pub fn to_record(&self) -> OrganismRecord {
        OrganismRecord {
            root_node: self.root.to_record(),
            is_tracked: self.is_tracked,
        }
    }

    fn aggregate(&self, energies: &[f64]) -> f64 {
        let total: f64 = energies.iter().sum();
        match self.config.cumulative_fit_method {
            CumulativeFitMethod::Sum => total,
            CumulativeFitMethod::Mean if energies.is_empty() => 0.0,
            CumulativeFitMethod::Mean => total / energies.len() as f64,
        }
    }
}

/// Geometric mean of the Gini-RSV of every non-empty score vector.
fn average_gini(placements: &[Placement]) -> f64 {
    let ginis: Vec<f64> = placements
        .iter()
        .filter(|p| !p.recognizer_scores.is_empty())
        .map(|p| gini_rsv(&p.recognizer_scores))
        .collect();

    if ginis.is_empty() {
        1.0
    } else {
        geometric_mean(&ginis)
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "***** Organism {} *****", self.id)?;
        self.root.render(f, 1)
    }
}
