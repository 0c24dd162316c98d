//! Model-description schema consumed by the encoding pipeline
//!
//! The model-definition parser is an external collaborator; this module
//! only holds the slice of its output the encoder needs: ordered entity
//! and feature names, adjacency relations, interleave declarations, the
//! output field name and the training/inference mode.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A named, typed, directed edge set between two entity types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencySpec {
    /// Key of the edge list inside each sample
    pub name: String,
    /// Entity type messages originate from
    pub source: String,
    /// Entity type messages arrive at
    pub dest: String,
    /// Whether every edge of this relation carries a parameter
    #[serde(default)]
    pub has_parameters: bool,
}

impl AdjacencySpec {
    /// Create a parameterless relation
    pub fn new(name: &str, source: &str, dest: &str) -> Self {
        AdjacencySpec {
            name: name.to_string(),
            source: source.to_string(),
            dest: dest.to_string(),
            has_parameters: false,
        }
    }

    /// Declare that every edge carries a parameter
    pub fn with_parameters(mut self) -> Self {
        self.has_parameters = true;
        self
    }

    /// Name of the per-destination sequence field this relation emits
    pub fn seq_field(&self) -> String {
        format!("seq_{}_{}", self.source, self.dest)
    }
}

/// A per-sample declared arrival cadence for one destination entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveSpec {
    /// Key of the pattern (list of source-entity tokens) inside each sample
    pub name: String,
    /// Destination entity whose aggregation the pattern orders
    pub dest: String,
}

impl InterleaveSpec {
    /// Create an interleave declaration
    pub fn new(name: &str, dest: &str) -> Self {
        InterleaveSpec {
            name: name.to_string(),
            dest: dest.to_string(),
        }
    }
}

/// Whether records carry the training label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Extract the declared output field into each record
    Training,
    /// Encode inputs only; the output field may be absent
    Inference,
}

impl Mode {
    /// True in [`Mode::Training`]
    pub fn is_training(self) -> bool {
        matches!(self, Mode::Training)
    }
}

/// Everything the encoder needs to know about the model's data contract
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Entity names, in declaration order
    pub entities: Vec<String>,
    /// Per-node feature field names
    pub features: Vec<String>,
    /// Extra sample fields copied through untouched
    #[serde(default)]
    pub additional_inputs: Vec<String>,
    /// Field holding the training label
    pub output: String,
    /// Directed edge sets between entity types
    pub adjacencies: Vec<AdjacencySpec>,
    /// Arrival-order declarations for shared destinations
    #[serde(default)]
    pub interleaves: Vec<InterleaveSpec>,
}

impl GraphSchema {
    /// Load a schema from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path)?;
        let schema: GraphSchema = serde_json::from_reader(BufReader::new(file))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Save the schema to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Validate internal consistency
    ///
    /// Adjacency endpoints and interleave destinations must name declared
    /// entities. Adjacency names must be unique, and so must their
    /// `(source, dest)` pairs: two relations over the same pair would
    /// collide on the `seq_<source>_<dest>` record field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.entities.is_empty() {
            return Err(crate::GraphFeedError::InvalidSchema(
                "at least one entity must be declared".to_string(),
            ));
        }

        let mut entity_set = HashSet::new();
        for entity in &self.entities {
            if !entity_set.insert(entity.as_str()) {
                return Err(crate::GraphFeedError::InvalidSchema(format!(
                    "entity '{}' is declared twice",
                    entity
                )));
            }
        }

        let mut adj_names = HashSet::new();
        let mut adj_pairs = HashSet::new();
        for adj in &self.adjacencies {
            if !adj_names.insert(adj.name.as_str()) {
                return Err(crate::GraphFeedError::InvalidSchema(format!(
                    "adjacency '{}' is declared twice",
                    adj.name
                )));
            }
            if !adj_pairs.insert((adj.source.as_str(), adj.dest.as_str())) {
                return Err(crate::GraphFeedError::InvalidSchema(format!(
                    "two adjacencies declared from '{}' to '{}'; their sequence fields would collide",
                    adj.source, adj.dest
                )));
            }
            for endpoint in [&adj.source, &adj.dest] {
                if !entity_set.contains(endpoint.as_str()) {
                    return Err(crate::GraphFeedError::InvalidSchema(format!(
                        "adjacency '{}' references undeclared entity '{}'",
                        adj.name, endpoint
                    )));
                }
            }
        }

        let mut interleave_names = HashSet::new();
        for interleave in &self.interleaves {
            if !interleave_names.insert(interleave.name.as_str()) {
                return Err(crate::GraphFeedError::InvalidSchema(format!(
                    "interleave '{}' is declared twice",
                    interleave.name
                )));
            }
            if !entity_set.contains(interleave.dest.as_str()) {
                return Err(crate::GraphFeedError::InvalidSchema(format!(
                    "interleave '{}' references undeclared entity '{}'",
                    interleave.name, interleave.dest
                )));
            }
        }

        Ok(())
    }
}
