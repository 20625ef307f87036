//! Subtree crossover between two organisms.

use log::debug;
use rand::Rng;

use super::factory::OrganismFactory;
use super::organism::Organism;

/// A child and how much of it came from each parent.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub child: Organism,
    /// Fraction of the child's nodes inherited from the first parent.
    pub similarity_to_first: f64,
    /// Fraction of the child's nodes inherited from the second parent.
    pub similarity_to_second: f64,
}

/// Both children of one crossover.
#[derive(Debug, Clone)]
pub struct CrossoverResult {
    /// Copy of the first parent carrying a subtree of the second.
    pub first: Offspring,
    /// Copy of the second parent carrying a subtree of the first.
    pub second: Offspring,
}

impl CrossoverResult {
    /// Similarity mass when each child is paired with the parent it was
    /// copied from.
    pub fn direct_pairing_similarity(&self) -> f64 {
        self.first.similarity_to_first + self.second.similarity_to_second
    }

    /// Similarity mass when the children are paired crosswise.
    pub fn swapped_pairing_similarity(&self) -> f64 {
        self.first.similarity_to_second + self.second.similarity_to_first
    }
}

impl OrganismFactory {
    /// Swap one random subtree between copies of both parents.
    ///
    /// The parents are left untouched; children receive fresh ids.
    pub fn crossover<R: Rng + ?Sized>(
        &mut self,
        first: &Organism,
        second: &Organism,
        rng: &mut R,
    ) -> CrossoverResult {
        let first_index = rng.gen_range(0..first.count_nodes());
        let second_index = rng.gen_range(0..second.count_nodes());
        self.crossover_at(first, second, first_index, second_index)
    }

    /// Swap the subtrees at in-order positions `first_index` and
    /// `second_index`. Positions past the end fall back to the root.
    pub fn crossover_at(
        &mut self,
        first: &Organism,
        second: &Organism,
        first_index: usize,
        second_index: usize,
    ) -> CrossoverResult {
        let mut first_child = first.clone();
        let mut second_child = second.clone();
        first_child.set_id(self.next_id());
        second_child.set_id(self.next_id());
        first_child.reset_ids();
        second_child.reset_ids();

        let from_first = first_child
            .get_node(first_index)
            .unwrap_or_else(|| first_child.root())
            .clone();
        let from_second = second_child
            .get_node(second_index)
            .unwrap_or_else(|| second_child.root())
            .clone();

        let nodes_from_first = from_first.count_nodes();
        let nodes_from_second = from_second.count_nodes();
        let first_target = from_first.id();
        let second_target = from_second.id();

        first_child.replace_node(first_target, from_second);
        second_child.replace_node(second_target, from_first);

        debug!(
            "crossover {} x {}: swapped {} nodes for {} nodes into {} and {}",
            first.id(),
            second.id(),
            nodes_from_first,
            nodes_from_second,
            first_child.id(),
            second_child.id()
        );

        let first_nodes = first_child.count_nodes() as f64;
        let second_nodes = second_child.count_nodes() as f64;
        let nodes_from_first = nodes_from_first as f64;
        let nodes_from_second = nodes_from_second as f64;

        CrossoverResult {
            first: Offspring {
                child: first_child,
                similarity_to_first: (first_nodes - nodes_from_second) / first_nodes,
                similarity_to_second: nodes_from_second / first_nodes,
            },
            second: Offspring {
                child: second_child,
                similarity_to_first: nodes_from_first / second_nodes,
                similarity_to_second: (second_nodes - nodes_from_first) / second_nodes,
            },
        }
    }
}
