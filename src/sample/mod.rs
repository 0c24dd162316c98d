//! Raw graph samples as parsed from disk
//!
//! A [`Sample`] wraps one parsed JSON object. Its keys are dictated by
//! the model schema: each declared entity maps to an ordered list of
//! string node ids, each declared adjacency to a flat list of edge
//! entries `[src, dst]` or `[src, dst, parameter]`, each declared
//! feature to a list of numbers (or of number lists), and the optional
//! output field to a number or list of numbers.

use serde_json::{Map, Value};

use crate::{GraphFeedError, Result};

/// One directed edge between two symbolically named nodes
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    /// Source node id
    pub src: String,
    /// Destination node id
    pub dst: String,
    /// Optional edge parameter (number or list of numbers)
    pub parameter: Option<Value>,
}

/// One raw input sample
///
/// Built by a sample source, consumed by one encoding call, then
/// discarded. Nothing in a sample survives across samples.
#[derive(Clone, Debug)]
pub struct Sample {
    fields: Map<String, Value>,
}

impl Sample {
    /// Wrap a parsed JSON value; the value must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Sample { fields }),
            other => Err(GraphFeedError::MalformedSample(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a sample from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Sample::from_value(serde_json::from_str(text)?)
    }

    /// Whether the sample defines a field
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Raw access to a field's JSON value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A field's value, or `ConfigMismatch` if the sample lacks it
    pub fn require(&self, field: &str) -> Result<&Value> {
        self.fields
            .get(field)
            .ok_or_else(|| GraphFeedError::ConfigMismatch(field.to_string()))
    }

    /// The ordered node-id list of one entity
    pub fn node_ids(&self, entity: &str) -> Result<Vec<&str>> {
        let value = self.require(entity)?;
        let items = value.as_array().ok_or_else(|| {
            GraphFeedError::MalformedSample(format!(
                "entity '{}' must map to a list of node ids, got {}",
                entity,
                type_name(value)
            ))
        })?;

        items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    GraphFeedError::MalformedSample(format!(
                        "entity '{}' holds a non-string node id: {}",
                        entity, item
                    ))
                })
            })
            .collect()
    }

    /// The edge list of one adjacency relation, in document order
    pub fn edges(&self, adjacency: &str) -> Result<Vec<Edge>> {
        let value = self.require(adjacency)?;
        let entries = value.as_array().ok_or_else(|| {
            GraphFeedError::MalformedSample(format!(
                "adjacency '{}' must map to a list of edges, got {}",
                adjacency,
                type_name(value)
            ))
        })?;

        entries
            .iter()
            .map(|entry| parse_edge(adjacency, entry))
            .collect()
    }

    /// The interleave pattern stored under `name`: source-entity tokens
    /// in desired arrival order
    pub fn interleave_pattern(&self, name: &str) -> Result<Vec<&str>> {
        let value = self.require(name)?;
        let tokens = value.as_array().ok_or_else(|| {
            GraphFeedError::MalformedSample(format!(
                "interleave '{}' must map to a list of entity names, got {}",
                name,
                type_name(value)
            ))
        })?;

        tokens
            .iter()
            .map(|token| {
                token.as_str().ok_or_else(|| {
                    GraphFeedError::MalformedSample(format!(
                        "interleave '{}' holds a non-string token: {}",
                        name, token
                    ))
                })
            })
            .collect()
    }
}

fn parse_edge(adjacency: &str, entry: &Value) -> Result<Edge> {
    let parts = entry.as_array().ok_or_else(|| {
        GraphFeedError::MalformedSample(format!(
            "adjacency '{}' holds a non-list edge entry: {}",
            adjacency, entry
        ))
    })?;

    if parts.len() < 2 || parts.len() > 3 {
        return Err(GraphFeedError::MalformedSample(format!(
            "adjacency '{}' edge entry must have 2 or 3 elements, got {}",
            adjacency,
            parts.len()
        )));
    }

    let endpoint = |index: usize| -> Result<String> {
        parts[index]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                GraphFeedError::MalformedSample(format!(
                    "adjacency '{}' edge endpoint must be a string node id, got {}",
                    adjacency, parts[index]
                ))
            })
    };

    Ok(Edge {
        src: endpoint(0)?,
        dst: endpoint(1)?,
        parameter: parts.get(2).cloned(),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_ids_in_order() {
        let sample =
            Sample::from_value(json!({"link": ["l2", "l0", "l1"]})).unwrap();
        assert_eq!(sample.node_ids("link").unwrap(), vec!["l2", "l0", "l1"]);
    }

    #[test]
    fn test_missing_field_is_config_mismatch() {
        let sample = Sample::from_value(json!({})).unwrap();
        assert!(matches!(
            sample.node_ids("link"),
            Err(GraphFeedError::ConfigMismatch(field)) if field == "link"
        ));
    }

    #[test]
    fn test_edges_with_and_without_parameters() {
        let sample = Sample::from_value(json!({
            "adj": [["a0", "b0"], ["a1", "b0", 0.5]]
        }))
        .unwrap();

        let edges = sample.edges("adj").unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].src, "a0");
        assert_eq!(edges[0].parameter, None);
        assert_eq!(edges[1].parameter, Some(json!(0.5)));
    }

    #[test]
    fn test_bad_edge_arity_rejected() {
        let sample = Sample::from_value(json!({"adj": [["a0"]]})).unwrap();
        assert!(matches!(
            sample.edges("adj"),
            Err(GraphFeedError::MalformedSample(_))
        ));
    }

    #[test]
    fn test_non_object_sample_rejected() {
        assert!(Sample::from_value(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_interleave_pattern() {
        let sample =
            Sample::from_value(json!({"ordering": ["link", "router", "link"]}))
                .unwrap();
        assert_eq!(
            sample.interleave_pattern("ordering").unwrap(),
            vec!["link", "router", "link"]
        );
    }
}
