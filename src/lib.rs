//! Motif organisms - Tree-structured transcription factor binding models.
//!
//! An organism is a binary tree whose leaves are position-specific scoring
//! matrices (recognizers) and whose internal nodes are connectors scoring the
//! spacing between the subtrees they join. The crate finds the best
//! non-overlapping placement of an organism on DNA sequences, turns it into
//! fitness values, and provides the mutation and crossover operators used
//! by an evolutionary search.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types and the persisted organism layout
//! - `compute`: Nodes, placement search, fitness models, genetic operators
//!
//! # Example
//!
//! ```rust,no_run
//! use motif_organisms::{
//!     compute::OrganismFactory,
//!     schema::OrganismsConfig,
//! };
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let config = OrganismsConfig::from_path("config.json").unwrap();
//! let mut factory = OrganismFactory::new(config).unwrap();
//! let mut rng = StdRng::seed_from_u64(42);
//!
//! let mut organism = factory.get_organism(&mut rng);
//! organism.mutate(&factory, &mut rng);
//!
//! let fitness = organism.get_seq_set_fitness(&["acgtacgtggcatt", "ttgacagctagc"]);
//! println!("{}", organism);
//! println!("Fitness: {:.3}", fitness);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{FitnessSummary, Organism, OrganismFactory, Placement};
pub use schema::{OrganismRecord, OrganismsConfig};
