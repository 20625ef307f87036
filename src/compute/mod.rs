//! Compute module - Organism trees, placement search and genetic operators.

mod connector;
mod crossover;
mod factory;
mod node;
mod organism;
mod placement;
mod pssm;
mod stats;

pub use connector::*;
pub use crossover::*;
pub use factory::*;
pub use node::*;
pub use organism::*;
pub use placement::*;
pub use pssm::*;
pub use stats::*;
