//! Configuration types for organisms, their nodes and the organism factory.
//!
//! Keys follow the JSON layout used by configuration files:
//! `SCREAMING_SNAKE_CASE` parameters grouped into `organism`, `organismFactory`,
//! `connector` and `pssm` sections. Every key is required; a missing key is a
//! parse error, so a component can never be built from an incomplete config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration, one section per component.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrganismsConfig {
    /// Organism-level fitness and mutation parameters.
    pub organism: OrganismConfig,
    /// Random generation parameters.
    pub organism_factory: FactoryConfig,
    /// Connector node parameters.
    pub connector: ConnectorConfig,
    /// Recognizer (PSSM) node parameters.
    pub pssm: PssmConfig,
}

/// How per-sequence energies are combined over a sequence set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CumulativeFitMethod {
    /// Sum of energies.
    Sum,
    /// Arithmetic mean of energies.
    #[default]
    Mean,
}

/// Post-processing applied to the best placement energy of a sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnergyThresholdMethod {
    /// Energies are reported as computed.
    #[default]
    None,
    /// Energies below `ENERGY_THRESHOLD_PARAM` are raised to it.
    Floor,
}

/// Organism configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct OrganismConfig {
    pub cumulative_fit_method: CumulativeFitMethod,
    pub energy_threshold_method: EnergyThresholdMethod,
    pub energy_threshold_param: f64,
    pub mutate_probability_substitute_pssm: f64,
    pub mutate_probability_rise_child: f64,
    pub mutate_probability_sunk_child: f64,
    pub mutate_probability_node_mutation: f64,
    /// Lower bound on node count before the complexity penalty applies.
    pub min_nodes: usize,
    /// Upper bound on node count before the complexity penalty applies.
    pub max_nodes: usize,
    /// Derive the placement budget from the organism's shape instead of
    /// the per-node `PLACEMENT_OPTIONS`.
    pub automatic_placement_options: bool,
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            cumulative_fit_method: CumulativeFitMethod::Mean,
            energy_threshold_method: EnergyThresholdMethod::None,
            energy_threshold_param: -10.0,
            mutate_probability_substitute_pssm: 0.1,
            mutate_probability_rise_child: 0.05,
            mutate_probability_sunk_child: 0.05,
            mutate_probability_node_mutation: 0.5,
            min_nodes: 3,
            max_nodes: 15,
            automatic_placement_options: true,
        }
    }
}

/// Organism factory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FactoryConfig {
    /// Probability that the root of a new organism is a connector.
    pub initial_connector_probability: f64,
    /// Factor applied to the connector probability at each tree level.
    pub reducer_probability_factor: f64,
    pub min_mu: i64,
    pub max_mu: i64,
    pub min_sigma: i64,
    pub max_sigma: i64,
    /// Number of columns of freshly generated recognizers.
    pub pwm_length: usize,
    /// Granularity of generated probabilities; must divide `PWM_PROBABILITY_BASE`.
    pub pwm_probability_step: u32,
    pub pwm_probability_base: u32,
    pub pwm_probability_decimals: i32,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            initial_connector_probability: 0.5,
            reducer_probability_factor: 0.5,
            min_mu: 0,
            max_mu: 20,
            min_sigma: 1,
            max_sigma: 5,
            pwm_length: 4,
            pwm_probability_step: 5,
            pwm_probability_base: 100,
            pwm_probability_decimals: 2,
        }
    }
}

/// Connector node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ConnectorConfig {
    pub mutate_probability_sigma: f64,
    pub mutate_probability_mu: f64,
    pub mutate_probability_swap: f64,
    /// Maximum absolute change applied to sigma by a mutation.
    pub mutate_variance_sigma: f64,
    /// Maximum absolute change applied to mu by a mutation.
    pub mutate_variance_mu: f64,
    /// Weight of the spacer term in the combined energy.
    pub tau: f64,
    pub placement_options: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            mutate_probability_sigma: 0.1,
            mutate_probability_mu: 0.1,
            mutate_probability_swap: 0.1,
            mutate_variance_sigma: 1.0,
            mutate_variance_mu: 1.0,
            tau: 1.0,
            placement_options: 50,
        }
    }
}

/// Recognizer (PSSM) node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PssmConfig {
    pub mutate_probability_random_col: f64,
    pub mutate_probability_flip_col: f64,
    pub mutate_probability_flip_row: f64,
    pub mutate_probability_shift_left: f64,
    pub mutate_probability_shift_right: f64,
    pub mutate_probability_increase_pwm: f64,
    pub mutate_probability_decrease_pwm: f64,
    pub min_columns: usize,
    pub max_columns: usize,
    pub pseudo_count: f64,
    pub placement_options: usize,
    pub scan_reverse_complement: bool,
    /// Columns whose best base reaches this probability render in uppercase.
    pub upper_print_probability: f64,
}

impl Default for PssmConfig {
    fn default() -> Self {
        Self {
            mutate_probability_random_col: 0.1,
            mutate_probability_flip_col: 0.1,
            mutate_probability_flip_row: 0.1,
            mutate_probability_shift_left: 0.1,
            mutate_probability_shift_right: 0.1,
            mutate_probability_increase_pwm: 0.1,
            mutate_probability_decrease_pwm: 0.1,
            min_columns: 2,
            max_columns: 10,
            pseudo_count: 0.01,
            placement_options: 50,
            scan_reverse_complement: false,
            upper_print_probability: 0.9,
        }
    }
}

impl OrganismsConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file and validate it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.organism.validate()?;
        self.organism_factory.validate()?;
        self.connector.validate()?;
        self.pssm.validate()?;

        let length = self.organism_factory.pwm_length;
        if length < self.pssm.min_columns || length > self.pssm.max_columns {
            return Err(ConfigError::InvalidBounds(format!(
                "PWM_LENGTH {} outside [{}, {}]",
                length, self.pssm.min_columns, self.pssm.max_columns
            )));
        }
        Ok(())
    }
}

fn check_probability(value: f64, name: &str) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            name: name.to_string(),
            value,
        })
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    min: T,
    max: T,
    name: &str,
) -> Result<(), ConfigError> {
    if min > max {
        Err(ConfigError::InvalidBounds(format!(
            "{} min ({}) > max ({})",
            name, min, max
        )))
    } else {
        Ok(())
    }
}

impl OrganismConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability(
            self.mutate_probability_substitute_pssm,
            "MUTATE_PROBABILITY_SUBSTITUTE_PSSM",
        )?;
        check_probability(
            self.mutate_probability_rise_child,
            "MUTATE_PROBABILITY_RISE_CHILD",
        )?;
        check_probability(
            self.mutate_probability_sunk_child,
            "MUTATE_PROBABILITY_SUNK_CHILD",
        )?;
        check_probability(
            self.mutate_probability_node_mutation,
            "MUTATE_PROBABILITY_NODE_MUTATION",
        )?;
        check_bounds(self.min_nodes, self.max_nodes, "nodes")?;
        if !self.energy_threshold_param.is_finite() {
            return Err(ConfigError::NonFinite("ENERGY_THRESHOLD_PARAM".to_string()));
        }
        Ok(())
    }
}

impl FactoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability(
            self.initial_connector_probability,
            "INITIAL_CONNECTOR_PROBABILITY",
        )?;
        // A factor of 1.0 with a connector probability of 1.0 never terminates.
        if !(0.0..1.0).contains(&self.reducer_probability_factor) {
            return Err(ConfigError::InvalidProbability {
                name: "REDUCER_PROBABILITY_FACTOR".to_string(),
                value: self.reducer_probability_factor,
            });
        }
        check_bounds(self.min_mu, self.max_mu, "mu")?;
        check_bounds(self.min_sigma, self.max_sigma, "sigma")?;
        if self.min_sigma < 0 {
            return Err(ConfigError::InvalidBounds(format!(
                "MIN_SIGMA ({}) must be non-negative",
                self.min_sigma
            )));
        }
        if self.pwm_probability_step == 0
            || self.pwm_probability_base == 0
            || self.pwm_probability_base % self.pwm_probability_step != 0
        {
            return Err(ConfigError::InvalidProbabilityStep {
                step: self.pwm_probability_step,
                base: self.pwm_probability_base,
            });
        }
        if self.pwm_length == 0 {
            return Err(ConfigError::InvalidBounds(
                "PWM_LENGTH must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConnectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability(self.mutate_probability_sigma, "MUTATE_PROBABILITY_SIGMA")?;
        check_probability(self.mutate_probability_mu, "MUTATE_PROBABILITY_MU")?;
        check_probability(self.mutate_probability_swap, "MUTATE_PROBABILITY_SWAP")?;
        if self.mutate_variance_sigma < 0.0 || self.mutate_variance_mu < 0.0 {
            return Err(ConfigError::InvalidBounds(
                "mutation variances must be non-negative".to_string(),
            ));
        }
        if !self.tau.is_finite() {
            return Err(ConfigError::NonFinite("TAU".to_string()));
        }
        if self.placement_options == 0 {
            return Err(ConfigError::InvalidPlacementOptions);
        }
        Ok(())
    }
}

impl PssmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability(
            self.mutate_probability_random_col,
            "MUTATE_PROBABILITY_RANDOM_COL",
        )?;
        check_probability(self.mutate_probability_flip_col, "MUTATE_PROBABILITY_FLIP_COL")?;
        check_probability(self.mutate_probability_flip_row, "MUTATE_PROBABILITY_FLIP_ROW")?;
        check_probability(
            self.mutate_probability_shift_left,
            "MUTATE_PROBABILITY_SHIFT_LEFT",
        )?;
        check_probability(
            self.mutate_probability_shift_right,
            "MUTATE_PROBABILITY_SHIFT_RIGHT",
        )?;
        check_probability(
            self.mutate_probability_increase_pwm,
            "MUTATE_PROBABILITY_INCREASE_PWM",
        )?;
        check_probability(
            self.mutate_probability_decrease_pwm,
            "MUTATE_PROBABILITY_DECREASE_PWM",
        )?;
        if self.min_columns == 0 {
            return Err(ConfigError::InvalidBounds(
                "MIN_COLUMNS must be at least 1".to_string(),
            ));
        }
        check_bounds(self.min_columns, self.max_columns, "columns")?;
        if self.pseudo_count.is_nan() || self.pseudo_count < 0.0 {
            return Err(ConfigError::InvalidBounds(format!(
                "PSEUDO_COUNT ({}) must be non-negative",
                self.pseudo_count
            )));
        }
        if self.placement_options == 0 {
            return Err(ConfigError::InvalidPlacementOptions);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: String, value: f64 },
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
    #[error("PWM_PROBABILITY_STEP {step} must be a non-zero divisor of PWM_PROBABILITY_BASE {base}")]
    InvalidProbabilityStep { step: u32, base: u32 },
    #[error("PLACEMENT_OPTIONS must be at least 1")]
    InvalidPlacementOptions,
    #[error("{0} must be finite")]
    NonFinite(String),
}
