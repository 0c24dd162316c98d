//! # Graphfeed: heterogeneous graph samples, tensor-ready
//!
//! This library converts heterogeneous-graph samples (multiple entity
//! types, typed directed edges, optional edge parameters, per-node
//! features) stored as JSON or JSON-in-tar.gz archives into flat records
//! of integer and float sequences, ready for batched message-passing
//! computation in an external tensor runtime.
//!
//! ## Features
//!
//! - **Entity indexing**: dense zero-based node indices per entity type
//! - **Adjacency encoding**: parallel src/dst/seq arrays per relation
//! - **Interleave scheduling**: ordered aggregation slots when one
//!   destination entity receives messages from several source entities
//! - **Streaming sources**: directories of JSON files or tar.gz archives,
//!   with incremental parsing of JSON sample arrays
//! - **Lazy pipelines**: per-sample failures are reported and skipped
//!   without aborting the stream

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Schema types consumed from the model description
pub mod schema;

/// Raw sample access over parsed JSON
pub mod sample;

/// The graph-to-tensor encoding core
pub mod encode;

/// Streaming sample sources (directories, archives, JSON arrays)
pub mod source;

/// Lazy record pipelines over whole datasets
pub mod pipeline;

// Re-export commonly used types
pub use encode::{EncodedRecord, FieldValue, SampleEncoder};
pub use pipeline::{ReadOptions, RecordStream};
pub use sample::Sample;
pub use schema::{AdjacencySpec, GraphSchema, InterleaveSpec, Mode};

use std::path::PathBuf;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum GraphFeedError {
    /// A name declared in the schema is missing from a sample
    #[error("field '{0}' is declared in the model description but missing from the sample")]
    ConfigMismatch(String),

    /// An adjacency or interleave references an entity with no index
    #[error("'{context}' references entity '{entity}' which was never indexed")]
    UnknownEntityMapping {
        /// Adjacency or interleave name that made the reference
        context: String,
        /// The entity that has no index
        entity: String,
    },

    /// An edge references a node id absent from its entity's node list
    #[error("adjacency '{adjacency}' references undefined {entity} node '{node}'")]
    UnknownNodeId {
        /// Adjacency relation the edge belongs to
        adjacency: String,
        /// Entity the node id was resolved against
        entity: String,
        /// The unresolved node id
        node: String,
    },

    /// A node id appears twice in one entity's node list
    #[error("duplicate node id '{node}' in entity '{entity}'")]
    DuplicateNodeId {
        /// Entity whose list holds the duplicate
        entity: String,
        /// The repeated node id
        node: String,
    },

    /// A relation mixes edges with and without parameters
    #[error("adjacency '{0}' mixes edges with and without parameters")]
    RaggedParameters(String),

    /// A sample value has the wrong shape or type
    #[error("malformed sample: {0}")]
    MalformedSample(String),

    /// An archive is unreadable or missing its data member
    #[error("malformed archive {path}: {reason}")]
    MalformedArchive {
        /// Path of the offending archive
        path: PathBuf,
        /// What went wrong while reading it
        reason: String,
    },

    /// A dataset directory contains no readable sample files
    #[error("no .json or .tar.gz samples found in {0}")]
    EmptyDataset(PathBuf),

    /// The schema itself is inconsistent
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// JSON parse or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphFeedError {
    /// Whether this error condemns a single sample rather than the whole
    /// dataset. Sample-level errors are reported and the stream moves on
    /// to the next sample.
    pub fn is_sample_error(&self) -> bool {
        matches!(
            self,
            GraphFeedError::ConfigMismatch(_)
                | GraphFeedError::UnknownEntityMapping { .. }
                | GraphFeedError::UnknownNodeId { .. }
                | GraphFeedError::DuplicateNodeId { .. }
                | GraphFeedError::RaggedParameters(_)
                | GraphFeedError::MalformedSample(_)
                | GraphFeedError::Json(_)
        )
    }
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, GraphFeedError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        encode::{EncodedRecord, FieldValue, SampleEncoder},
        pipeline::{ReadOptions, RecordStream},
        sample::Sample,
        schema::{AdjacencySpec, GraphSchema, InterleaveSpec, Mode},
        GraphFeedError, Result,
    };
}
