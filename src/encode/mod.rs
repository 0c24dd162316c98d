//! The graph-to-tensor encoding core
//!
//! One [`SampleEncoder`] holds the immutable schema for an encoding
//! session and turns raw samples into [`EncodedRecord`]s, one at a
//! time: entity indexing, adjacency flattening, interleave scheduling,
//! record assembly. All per-sample state is local to one `encode` call.

mod adjacency;
mod indexer;
mod interleave;
mod record;

pub use adjacency::{encode_adjacency, EncodedAdjacency, ParamColumn};
pub use indexer::EntityIndex;
pub use interleave::InterleaveSchedule;
pub use record::{assemble, EncodedRecord, FieldValue};

use crate::sample::Sample;
use crate::schema::{GraphSchema, Mode};
use crate::Result;

/// Encodes samples against one fixed schema
#[derive(Clone, Debug)]
pub struct SampleEncoder {
    schema: GraphSchema,
    mode: Mode,
}

impl SampleEncoder {
    /// Create an encoder; the schema is validated once here
    pub fn new(schema: GraphSchema, mode: Mode) -> Result<Self> {
        schema.validate()?;
        Ok(SampleEncoder { schema, mode })
    }

    /// The schema this encoder applies
    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// Training or inference
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Encode one sample into a flat record
    pub fn encode(&self, sample: &Sample) -> Result<EncodedRecord> {
        let index = EntityIndex::build(sample, &self.schema.entities)?;

        let adjacencies = self
            .schema
            .adjacencies
            .iter()
            .map(|spec| encode_adjacency(sample, spec, &index))
            .collect::<Result<Vec<_>>>()?;

        let schedules = self
            .schema
            .interleaves
            .iter()
            .map(|spec| InterleaveSchedule::build(sample, spec, &adjacencies))
            .collect::<Result<Vec<_>>>()?;

        assemble(
            sample,
            &self.schema,
            self.mode,
            &index,
            &adjacencies,
            &schedules,
        )
    }

    /// Parse and encode one JSON sample document
    pub fn encode_json(&self, text: &str) -> Result<EncodedRecord> {
        self.encode(&Sample::from_json(text)?)
    }
}
