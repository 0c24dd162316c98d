//! Flat tensor-ready records and their assembly

use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use serde_json::Value;

use super::adjacency::{EncodedAdjacency, ParamColumn};
use super::indexer::EntityIndex;
use super::interleave::InterleaveSchedule;
use crate::sample::Sample;
use crate::schema::{GraphSchema, Mode};
use crate::{GraphFeedError, Result};

/// One value of an encoded record field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A single node count
    Count(usize),
    /// A flat integer sequence (node indices, seq ranks, slot positions)
    Indices(Vec<usize>),
    /// A flat float sequence
    Floats(Vec<f64>),
    /// A nested float sequence (one row per node or edge)
    FloatRows(Vec<Vec<f64>>),
}

impl FieldValue {
    /// Number of elements (rows, for nested values)
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Count(_) => 1,
            FieldValue::Indices(values) => values.len(),
            FieldValue::Floats(values) => values.len(),
            FieldValue::FloatRows(rows) => rows.len(),
        }
    }

    /// Whether the value holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The count payload, if this is a count
    pub fn as_count(&self) -> Option<usize> {
        match self {
            FieldValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// The integer payload, if this is an index sequence
    pub fn as_indices(&self) -> Option<&[usize]> {
        match self {
            FieldValue::Indices(values) => Some(values),
            _ => None,
        }
    }

    /// The float payload, if this is a flat float sequence
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            FieldValue::Floats(values) => Some(values),
            _ => None,
        }
    }

    /// View the value as a rank-1 float array
    ///
    /// Counts become one-element arrays; nested values return `None`.
    pub fn to_array1(&self) -> Option<Array1<f64>> {
        match self {
            FieldValue::Count(n) => Some(Array1::from(vec![*n as f64])),
            FieldValue::Indices(values) => {
                Some(values.iter().map(|&v| v as f64).collect())
            }
            FieldValue::Floats(values) => Some(Array1::from(values.clone())),
            FieldValue::FloatRows(_) => None,
        }
    }

    /// View a nested value as a rank-2 float array
    ///
    /// Returns `None` unless every row has the same length.
    pub fn to_array2(&self) -> Option<Array2<f64>> {
        let rows = match self {
            FieldValue::FloatRows(rows) => rows,
            _ => return None,
        };
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), width), flat).ok()
    }
}

/// A float out of a JSON number
pub(crate) fn number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// A float vector out of a JSON list of numbers
pub(crate) fn number_list(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

/// Convert a declared feature or additional-input value
///
/// Accepts a list of numbers or a list of number lists; anything else
/// fails the sample.
fn convert_feature(field: &str, value: &Value) -> Result<FieldValue> {
    let items = value.as_array().ok_or_else(|| {
        GraphFeedError::MalformedSample(format!(
            "field '{}' must be a list of numbers, got {}",
            field, value
        ))
    })?;

    if items.iter().all(|item| item.is_number()) {
        let floats = items.iter().filter_map(Value::as_f64).collect();
        return Ok(FieldValue::Floats(floats));
    }

    items
        .iter()
        .map(|item| {
            number_list(item).ok_or_else(|| {
                GraphFeedError::MalformedSample(format!(
                    "field '{}' mixes numbers and non-numbers",
                    field
                ))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(FieldValue::FloatRows)
}

/// Extract the training output, coercing a scalar to a one-element list
fn convert_output(field: &str, value: &Value) -> Result<Vec<f64>> {
    if let Some(scalar) = number(value) {
        return Ok(vec![scalar]);
    }
    number_list(value).ok_or_else(|| {
        GraphFeedError::MalformedSample(format!(
            "output field '{}' must be a number or a list of numbers, got {}",
            field, value
        ))
    })
}

/// One sample, encoded flat
///
/// Field names follow fixed conventions: declared feature and
/// additional-input names verbatim, `src_<adj>` / `dst_<adj>` /
/// `seq_<src>_<dst>` / `params_<adj>` per relation, `num_<entity>` per
/// entity, and `indices_<src>_to_<dst>` per interleave channel. In
/// training mode the extracted label rides along separately.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedRecord {
    fields: IndexMap<String, FieldValue>,
    output: Option<Vec<f64>>,
}

impl EncodedRecord {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Iterate `(name, value)` pairs in assembly order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Field names in assembly order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// The training label, when encoded in training mode
    pub fn output(&self) -> Option<&[f64]> {
        self.output.as_deref()
    }
}

/// Merge every encoded piece of one sample into a flat record
///
/// The produced field set is exactly: declared features and additional
/// inputs, the derived adjacency/count/interleave fields, nothing else.
pub fn assemble(
    sample: &Sample,
    schema: &GraphSchema,
    mode: Mode,
    index: &EntityIndex,
    adjacencies: &[EncodedAdjacency],
    schedules: &[InterleaveSchedule],
) -> Result<EncodedRecord> {
    let mut fields = IndexMap::new();

    for feature in schema.features.iter().chain(&schema.additional_inputs) {
        let value = sample.require(feature)?;
        fields.insert(feature.clone(), convert_feature(feature, value)?);
    }

    for adjacency in adjacencies {
        let name = &adjacency.spec.name;
        fields.insert(
            format!("src_{}", name),
            FieldValue::Indices(adjacency.src_idx.clone()),
        );
        fields.insert(
            format!("dst_{}", name),
            FieldValue::Indices(adjacency.dst_idx.clone()),
        );
        fields.insert(
            adjacency.spec.seq_field(),
            FieldValue::Indices(adjacency.seq.clone()),
        );
        if let Some(params) = &adjacency.params {
            let value = match params {
                ParamColumn::Scalars(values) => FieldValue::Floats(values.clone()),
                ParamColumn::Vectors(rows) => FieldValue::FloatRows(rows.clone()),
            };
            fields.insert(format!("params_{}", name), value);
        }
    }

    for (entity, count) in index.counts() {
        fields.insert(format!("num_{}", entity), FieldValue::Count(count));
    }

    for schedule in schedules {
        for (entity, slots) in &schedule.channels {
            fields.insert(
                format!("indices_{}_to_{}", entity, schedule.dest),
                FieldValue::Indices(slots.clone()),
            );
        }
    }

    let output = if mode.is_training() {
        let value = sample.require(&schema.output)?;
        Some(convert_output(&schema.output, value)?)
    } else {
        None
    };

    Ok(EncodedRecord { fields, output })
}
