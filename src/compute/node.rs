//! Organism tree nodes.
//!
//! Nodes are either recognizers (leaves) or connectors (internal nodes with
//! exactly two children). Ids are assigned in-order (left subtree, node,
//! right subtree) by [`Node::reset_id`]; lookups by id return the first
//! match, searching left subtrees before right ones.

use std::fmt;

use rand::Rng;

use super::connector::Connector;
use super::factory::OrganismFactory;
use super::placement::Placement;
use super::pssm::PssmRecognizer;
use crate::schema::{NodeRecord, PwmColumn};

/// Which child slot of a connector holds a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Location of a node under its parent connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Id of the parent connector.
    pub parent_id: usize,
    /// Slot holding the child.
    pub side: Side,
}

/// A node of an organism tree.
#[derive(Debug, Clone)]
pub enum Node {
    Recognizer(PssmRecognizer),
    Connector(Connector),
}

impl Node {
    #[inline]
    pub fn id(&self) -> usize {
        match self {
            Node::Recognizer(r) => r.id(),
            Node::Connector(c) => c.id(),
        }
    }

    #[inline]
    pub fn is_connector(&self) -> bool {
        matches!(self, Node::Connector(_))
    }

    #[inline]
    pub fn is_recognizer(&self) -> bool {
        matches!(self, Node::Recognizer(_))
    }

    /// Size of the subtree rooted here.
    pub fn count_nodes(&self) -> usize {
        match self {
            Node::Recognizer(_) => 1,
            Node::Connector(c) => c.left.count_nodes() + c.right.count_nodes() + 1,
        }
    }

    /// Number of recognizers in the subtree.
    pub fn count_recognizers(&self) -> usize {
        match self {
            Node::Recognizer(_) => 1,
            Node::Connector(c) => c.left.count_recognizers() + c.right.count_recognizers(),
        }
    }

    /// Width of the widest recognizer in the subtree.
    pub fn max_recognizer_length(&self) -> usize {
        match self {
            Node::Recognizer(r) => r.length(),
            Node::Connector(c) => c
                .left
                .max_recognizer_length()
                .max(c.right.max_recognizer_length()),
        }
    }

    /// Node at in-order position `index` of this subtree.
    pub fn get_node(&self, index: usize) -> Option<&Node> {
        match self {
            Node::Recognizer(_) => (index == 0).then_some(self),
            Node::Connector(c) => {
                let left_nodes = c.left.count_nodes();
                if index < left_nodes {
                    c.left.get_node(index)
                } else if index == left_nodes {
                    Some(self)
                } else {
                    c.right.get_node(index - left_nodes - 1)
                }
            }
        }
    }

    /// Mutable node at in-order position `index` of this subtree.
    pub fn get_node_mut(&mut self, index: usize) -> Option<&mut Node> {
        let left_nodes = match self {
            Node::Recognizer(_) => return (index == 0).then_some(self),
            Node::Connector(c) => c.left.count_nodes(),
        };
        if index == left_nodes {
            return Some(self);
        }
        match self {
            Node::Connector(c) => {
                if index < left_nodes {
                    c.left.get_node_mut(index)
                } else {
                    c.right.get_node_mut(index - left_nodes - 1)
                }
            }
            Node::Recognizer(_) => None,
        }
    }

    /// First node carrying `id`.
    pub fn find(&self, id: usize) -> Option<&Node> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Node::Recognizer(_) => None,
            Node::Connector(c) => c.left.find(id).or_else(|| c.right.find(id)),
        }
    }

    /// Mutable access to the first node carrying `id`.
    pub fn find_mut(&mut self, id: usize) -> Option<&mut Node> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Node::Recognizer(_) => None,
            Node::Connector(c) => match c.left.find_mut(id) {
                Some(node) => Some(node),
                None => c.right.find_mut(id),
            },
        }
    }

    /// Parent connector of the strict descendant carrying `id`.
    pub fn get_parent(&self, id: usize) -> Option<ParentLink> {
        let Node::Connector(c) = self else {
            return None;
        };
        if c.left.id() == id {
            return Some(ParentLink {
                parent_id: c.id(),
                side: Side::Left,
            });
        }
        if c.right.id() == id {
            return Some(ParentLink {
                parent_id: c.id(),
                side: Side::Right,
            });
        }
        c.left.get_parent(id).or_else(|| c.right.get_parent(id))
    }

    /// Replace the strict descendant carrying `id` with `node`, returning the
    /// displaced subtree. `None` (and `node` dropped) if no descendant has `id`.
    pub fn set_child(&mut self, node: Node, id: usize) -> Option<Node> {
        let link = self.get_parent(id)?;
        self.replace_child(link, node)
    }

    /// Put `node` into the slot described by `link`.
    pub fn replace_child(&mut self, link: ParentLink, node: Node) -> Option<Node> {
        match self.find_mut(link.parent_id)? {
            Node::Connector(parent) => Some(match link.side {
                Side::Left => parent.set_left(node),
                Side::Right => parent.set_right(node),
            }),
            Node::Recognizer(_) => None,
        }
    }

    /// Renumber the subtree in-order starting at `start`; returns the first
    /// unused id.
    pub fn reset_id(&mut self, start: usize) -> usize {
        match self {
            Node::Recognizer(r) => {
                r.set_id(start);
                start + 1
            }
            Node::Connector(c) => {
                let own = c.left.reset_id(start);
                c.set_id(own);
                c.right.reset_id(own + 1)
            }
        }
    }

    /// Recognizers of the subtree, left to right.
    pub fn get_all_recognizers(&self) -> Vec<&PssmRecognizer> {
        let mut recognizers = Vec::new();
        self.collect_recognizers(&mut recognizers);
        recognizers
    }

    fn collect_recognizers<'a>(&'a self, out: &mut Vec<&'a PssmRecognizer>) {
        match self {
            Node::Recognizer(r) => out.push(r),
            Node::Connector(c) => {
                c.left.collect_recognizers(out);
                c.right.collect_recognizers(out);
            }
        }
    }

    /// Ranked placement options of the subtree on `sequence`.
    pub fn get_placement(
        &self,
        sequence: &[u8],
        seq_len: usize,
        automatic_options: usize,
        use_automatic_options: bool,
    ) -> Vec<Placement> {
        match self {
            Node::Recognizer(r) => {
                r.get_placement(sequence, seq_len, automatic_options, use_automatic_options)
            }
            Node::Connector(c) => {
                c.get_placement(sequence, seq_len, automatic_options, use_automatic_options)
            }
        }
    }

    /// Apply the node's own mutation operators.
    pub fn mutate<R: Rng + ?Sized>(&mut self, factory: &OrganismFactory, rng: &mut R) {
        match self {
            Node::Recognizer(r) => r.mutate(factory, rng),
            Node::Connector(c) => c.mutate(factory, rng),
        }
    }

    /// Persisted form of the subtree.
    pub fn to_record(&self) -> NodeRecord {
        match self {
            Node::Recognizer(r) => NodeRecord::Pssm {
                pwm: r.pwm().iter().copied().map(PwmColumn::from_array).collect(),
            },
            Node::Connector(c) => NodeRecord::Connector {
                mu: c.mu(),
                sigma: c.sigma(),
                node1: Box::new(c.left.to_record()),
                node2: Box::new(c.right.to_record()),
            },
        }
    }

    /// Indented tree rendering, one line per node.
    pub(crate) fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "   |".repeat(depth);
        match self {
            Node::Recognizer(r) => writeln!(f, "{} - {}", indent, r.consensus()),
            Node::Connector(c) => {
                writeln!(f, "{} - C{} m: {} s: {}", indent, c.id(), c.mu(), c.sigma())?;
                c.left.render(f, depth + 1)?;
                c.right.render(f, depth + 1)
            }
        }
    }
}

impl From<PssmRecognizer> for Node {
    fn from(recognizer: PssmRecognizer) -> Self {
        Node::Recognizer(recognizer)
    }
}

impl From<Connector> for Node {
    fn from(connector: Connector) -> Self {
        Node::Connector(connector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConnectorConfig, PssmConfig};

    fn leaf(base: usize) -> Node {
        let mut column = [0.0; 4];
        column[base] = 1.0;
        Node::Recognizer(PssmRecognizer::new(vec![column], PssmConfig::default()))
    }

    fn join(left: Node, right: Node) -> Node {
        Node::Connector(Connector::new(
            4.0,
            1.0,
            ConnectorConfig::default(),
            left,
            right,
        ))
    }

    /// ((a, c), g): in-order ids a=0, C=1, c=2, root=3, g=4
    fn sample_tree() -> Node {
        let mut tree = join(join(leaf(0), leaf(1)), leaf(2));
        assert_eq!(tree.reset_id(0), 5);
        tree
    }

    #[test]
    fn test_counts() {
        let tree = sample_tree();
        assert_eq!(tree.count_nodes(), 5);
        assert_eq!(tree.count_recognizers(), 3);
        assert_eq!(tree.count_nodes(), 2 * tree.count_recognizers() - 1);
    }

    #[test]
    fn test_in_order_ids() {
        let tree = sample_tree();
        assert_eq!(tree.id(), 3);
        for index in 0..tree.count_nodes() {
            assert_eq!(tree.get_node(index).unwrap().id(), index);
        }
        assert!(tree.get_node(5).is_none());
        assert!(tree.get_node(1).unwrap().is_connector());
        assert!(tree.get_node(4).unwrap().is_recognizer());
    }

    #[test]
    fn test_get_node_mut_matches_get_node() {
        let mut tree = sample_tree();
        for index in 0..5 {
            assert_eq!(tree.get_node_mut(index).unwrap().id(), index);
        }
        assert!(tree.get_node_mut(9).is_none());
    }

    #[test]
    fn test_get_node_mut_edits_both_subtrees() {
        let mut tree = sample_tree();
        for index in [1, 3] {
            match tree.get_node_mut(index) {
                Some(Node::Connector(c)) => c.set_mu(10.0 + index as f64),
                _ => panic!("expected connector at {}", index),
            }
        }
        match tree.get_node_mut(4) {
            Some(Node::Recognizer(r)) => r.set_id(40),
            _ => panic!("expected recognizer at 4"),
        }

        match tree.get_node(1) {
            Some(Node::Connector(c)) => assert_eq!(c.mu(), 11.0),
            _ => panic!("expected connector at 1"),
        }
        match &tree {
            Node::Connector(c) => {
                assert_eq!(c.mu(), 13.0);
                assert_eq!(c.right().id(), 40);
            }
            Node::Recognizer(_) => panic!("expected connector root"),
        }
    }

    #[test]
    fn test_get_parent() {
        let tree = sample_tree();
        assert_eq!(
            tree.get_parent(0),
            Some(ParentLink {
                parent_id: 1,
                side: Side::Left
            })
        );
        assert_eq!(
            tree.get_parent(4),
            Some(ParentLink {
                parent_id: 3,
                side: Side::Right
            })
        );
        assert_eq!(tree.get_parent(3), None);
        assert_eq!(tree.get_parent(42), None);
    }

    #[test]
    fn test_set_child() {
        let mut tree = sample_tree();
        let displaced = tree.set_child(leaf(3), 1).unwrap();
        assert_eq!(displaced.count_nodes(), 3);
        assert_eq!(tree.count_nodes(), 3);

        tree.reset_id(0);
        assert!(tree.set_child(leaf(0), 7).is_none());
    }

    #[test]
    fn test_all_recognizers_left_to_right() {
        let tree = sample_tree();
        let firsts: Vec<[f64; 4]> = tree
            .get_all_recognizers()
            .iter()
            .map(|r| r.pwm()[0])
            .collect();
        assert_eq!(
            firsts,
            vec![
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0]
            ]
        );
    }

    #[test]
    fn test_to_record_shape() {
        let tree = sample_tree();
        match tree.to_record() {
            NodeRecord::Connector { node1, node2, .. } => {
                assert!(matches!(*node1, NodeRecord::Connector { .. }));
                assert!(matches!(*node2, NodeRecord::Pssm { .. }));
            }
            NodeRecord::Pssm { .. } => panic!("expected connector root"),
        }
    }
}
