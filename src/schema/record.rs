//! Persisted organism layout.
//!
//! Organisms are stored as a JSON array of `{"rootNode": <node>}` objects,
//! where a node is either a connector or a PSSM recognizer tagged by
//! `objectType`. Node ids are not stored; they are re-issued on import.

use serde::{Deserialize, Serialize};

/// One persisted organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismRecord {
    #[serde(rename = "rootNode")]
    pub root_node: NodeRecord,
    #[serde(rename = "isTracked", default, skip_serializing_if = "is_false")]
    pub is_tracked: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One persisted tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "objectType")]
pub enum NodeRecord {
    #[serde(rename = "connector")]
    Connector {
        mu: f64,
        sigma: f64,
        node1: Box<NodeRecord>,
        node2: Box<NodeRecord>,
    },
    #[serde(rename = "pssm")]
    Pssm { pwm: Vec<PwmColumn> },
}

/// Base probabilities of a single PWM column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PwmColumn {
    pub a: f64,
    pub c: f64,
    pub g: f64,
    pub t: f64,
}

impl PwmColumn {
    /// Probabilities in `a, c, g, t` order.
    pub fn to_array(self) -> [f64; 4] {
        [self.a, self.c, self.g, self.t]
    }

    pub fn from_array(column: [f64; 4]) -> Self {
        Self {
            a: column[0],
            c: column[1],
            g: column[2],
            t: column[3],
        }
    }
}

impl NodeRecord {
    /// Check the structural constraints an importable tree must satisfy.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self {
            NodeRecord::Connector {
                mu,
                sigma,
                node1,
                node2,
            } => {
                if !mu.is_finite() || !sigma.is_finite() {
                    return Err(RecordError::NonFiniteSpacer);
                }
                if *sigma < 0.0 {
                    return Err(RecordError::NegativeSigma(*sigma));
                }
                node1.validate()?;
                node2.validate()
            }
            NodeRecord::Pssm { pwm } => {
                if pwm.is_empty() {
                    return Err(RecordError::EmptyPwm);
                }
                for (i, column) in pwm.iter().enumerate() {
                    if column
                        .to_array()
                        .iter()
                        .any(|p| !p.is_finite() || *p < 0.0)
                    {
                        return Err(RecordError::InvalidColumn(i));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Organism import/export errors.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to access organism file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed organism JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Recognizer has an empty PWM")]
    EmptyPwm,
    #[error("PWM column {0} holds a negative or non-finite probability")]
    InvalidColumn(usize),
    #[error("Connector sigma {0} is negative")]
    NegativeSigma(f64),
    #[error("Connector mu/sigma must be finite")]
    NonFiniteSpacer,
}
