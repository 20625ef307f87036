//! Schema module - Configuration and persisted record types for organisms.

mod config;
mod record;

pub use config::*;
pub use record::*;
