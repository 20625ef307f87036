//! Organism factory: random generation, id issuing and import/export.

use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

use super::connector::Connector;
use super::node::Node;
use super::organism::Organism;
use super::pssm::PssmRecognizer;
use crate::schema::{ConfigError, NodeRecord, OrganismRecord, OrganismsConfig, RecordError};

/// Builds organisms and their nodes from configuration.
///
/// The factory is the only issuer of organism ids. Every node it creates
/// receives a copy of the matching configuration section.
#[derive(Debug, Clone)]
pub struct OrganismFactory {
    last_id: u64,
    config: OrganismsConfig,
}

impl OrganismFactory {
    /// Create a factory, rejecting configurations that fail validation.
    pub fn new(config: OrganismsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { last_id: 0, config })
    }

    pub fn config(&self) -> &OrganismsConfig {
        &self.config
    }

    /// Issue a new organism id. The first id is 1.
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Generate a random organism.
    ///
    /// The root is a connector with `INITIAL_CONNECTOR_PROBABILITY`; each
    /// level below multiplies that probability by `REDUCER_PROBABILITY_FACTOR`.
    pub fn get_organism<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Organism {
        let factory = &self.config.organism_factory;
        let root = if rng.r#gen::<f64>() < factory.initial_connector_probability {
            let probability =
                factory.initial_connector_probability * factory.reducer_probability_factor;
            Node::Connector(self.create_connection(probability, rng))
        } else {
            Node::Recognizer(self.create_pssm(factory.pwm_length, rng))
        };

        let id = self.next_id();
        Organism::new(id, root, self.config.organism.clone())
    }

    /// Random connector whose children are connectors with `probability`,
    /// recognizers otherwise.
    pub fn create_connection<R: Rng + ?Sized>(&self, probability: f64, rng: &mut R) -> Connector {
        let factory = &self.config.organism_factory;
        let mu = rng.gen_range(factory.min_mu..=factory.max_mu) as f64;
        let sigma = rng.gen_range(factory.min_sigma..=factory.max_sigma) as f64;

        let left = self.create_child(probability, rng);
        let right = self.create_child(probability, rng);

        Connector::new(mu, sigma, self.config.connector.clone(), left, right)
    }

    fn create_child<R: Rng + ?Sized>(&self, probability: f64, rng: &mut R) -> Node {
        if rng.r#gen::<f64>() < probability {
            let reduced = probability * self.config.organism_factory.reducer_probability_factor;
            Node::Connector(self.create_connection(reduced, rng))
        } else {
            Node::Recognizer(self.create_pssm(self.config.organism_factory.pwm_length, rng))
        }
    }

    /// Random recognizer with `length` columns.
    pub fn create_pssm<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> PssmRecognizer {
        let pwm = (0..length).map(|_| self.random_pwm_column(rng)).collect();
        PssmRecognizer::new(pwm, self.config.pssm.clone())
    }

    /// Random PWM column in `a, c, g, t` order.
    ///
    /// An integer budget of `BASE / STEP` units is split by up to three
    /// uniform draws, the remainder (or zero padding) fills the fourth base,
    /// and the shuffled units are scaled back to probabilities.
    pub fn random_pwm_column<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; 4] {
        let factory = &self.config.organism_factory;
        let budget = factory.pwm_probability_base / factory.pwm_probability_step;

        let mut units: Vec<u32> = Vec::with_capacity(4);
        let mut remaining = budget;
        while remaining > 0 && units.len() < 3 {
            let drawn = rng.gen_range(0..=remaining);
            units.push(drawn);
            remaining -= drawn;
        }
        if remaining > 0 {
            units.push(remaining);
        } else {
            units.resize(4, 0);
        }
        units.shuffle(rng);

        let scale = f64::from(factory.pwm_probability_step) / f64::from(factory.pwm_probability_base);
        let rounding = 10f64.powi(factory.pwm_probability_decimals);
        let mut column = [0.0; 4];
        for (slot, unit) in column.iter_mut().zip(units) {
            *slot = (f64::from(unit) * scale * rounding).round() / rounding;
        }
        column
    }

    /// Build a node tree from its persisted form.
    pub fn node_from_record(&self, record: &NodeRecord) -> Node {
        match record {
            NodeRecord::Connector {
                mu,
                sigma,
                node1,
                node2,
            } => Node::Connector(Connector::new(
                *mu,
                *sigma,
                self.config.connector.clone(),
                self.node_from_record(node1),
                self.node_from_record(node2),
            )),
            NodeRecord::Pssm { pwm } => Node::Recognizer(PssmRecognizer::new(
                pwm.iter().map(|column| column.to_array()).collect(),
                self.config.pssm.clone(),
            )),
        }
    }

    /// Build an organism from its persisted form, issuing a fresh id.
    pub fn organism_from_record(&mut self, record: &OrganismRecord) -> Result<Organism, RecordError> {
        record.root_node.validate()?;
        let root = self.node_from_record(&record.root_node);
        let mut organism = Organism::new(self.next_id(), root, self.config.organism.clone());
        organism.set_is_tracked(record.is_tracked);
        Ok(organism)
    }

    /// Import organisms from a JSON array of records.
    pub fn import_organisms(&mut self, json: &str) -> Result<Vec<Organism>, RecordError> {
        let records: Vec<OrganismRecord> = serde_json::from_str(json)?;
        records
            .iter()
            .map(|record| self.organism_from_record(record))
            .collect()
    }

    /// Import organisms from a JSON file.
    pub fn import_organisms_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<Vec<Organism>, RecordError> {
        let json = fs::read_to_string(path)?;
        self.import_organisms(&json)
    }

    /// Serialize organisms to a pretty-printed JSON array.
    pub fn export_organisms(organisms: &[Organism]) -> Result<String, RecordError> {
        let records: Vec<OrganismRecord> = organisms.iter().map(Organism::to_record).collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Write organisms to a JSON file.
    pub fn export_organisms_to_path<P: AsRef<Path>>(
        organisms: &[Organism],
        path: P,
    ) -> Result<(), RecordError> {
        let json = Self::export_organisms(organisms)?;
        fs::write(path, json)?;
        Ok(())
    }
}
