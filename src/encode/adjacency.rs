//! Flattening symbolic edge lists into parallel index arrays

use std::collections::HashMap;

use super::indexer::EntityIndex;
use super::record::{number, number_list};
use crate::sample::Sample;
use crate::schema::AdjacencySpec;
use crate::{GraphFeedError, Result};

/// Edge parameters for one relation, one entry per edge
///
/// Uniform within a relation: either every edge carries a scalar or
/// every edge carries a vector.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamColumn {
    /// One number per edge
    Scalars(Vec<f64>),
    /// One number list per edge
    Vectors(Vec<Vec<f64>>),
}

impl ParamColumn {
    /// Number of per-edge entries
    pub fn len(&self) -> usize {
        match self {
            ParamColumn::Scalars(values) => values.len(),
            ParamColumn::Vectors(rows) => rows.len(),
        }
    }

    /// Whether the column holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One adjacency relation resolved to integer arrays
///
/// The three parallel sequences have one entry per edge, in the order
/// the edges appear in the sample. `seq[i]` is the zero-based rank of
/// edge `i` among all edges sharing its destination node, so for every
/// destination the recorded ranks are exactly `0..indegree`.
#[derive(Clone, Debug)]
pub struct EncodedAdjacency {
    /// The relation this encodes
    pub spec: AdjacencySpec,
    /// Source node index per edge
    pub src_idx: Vec<usize>,
    /// Destination node index per edge
    pub dst_idx: Vec<usize>,
    /// Per-destination arrival rank per edge
    pub seq: Vec<usize>,
    /// Edge parameters, when the relation carries them
    pub params: Option<ParamColumn>,
}

impl EncodedAdjacency {
    /// Number of edges in the relation
    pub fn num_edges(&self) -> usize {
        self.src_idx.len()
    }

    /// Worst-case in-degree over this relation's destinations:
    /// `max(seq) + 1`, or zero when the relation has no edges
    pub fn max_in_degree(&self) -> usize {
        self.seq.iter().max().map_or(0, |&s| s + 1)
    }
}

/// Encode one declared relation against an already-built entity index
pub fn encode_adjacency(
    sample: &Sample,
    spec: &AdjacencySpec,
    index: &EntityIndex,
) -> Result<EncodedAdjacency> {
    let edges = sample.edges(&spec.name)?;

    for entity in [&spec.source, &spec.dest] {
        if !index.has_entity(entity) {
            return Err(GraphFeedError::UnknownEntityMapping {
                context: spec.name.clone(),
                entity: entity.clone(),
            });
        }
    }

    let mut src_idx = Vec::with_capacity(edges.len());
    let mut dst_idx = Vec::with_capacity(edges.len());
    let mut seq = Vec::with_capacity(edges.len());
    let mut params: Option<ParamColumn> = None;

    // Arrival rank per destination node, keyed by its dense index
    let mut arrival: HashMap<usize, usize> = HashMap::new();

    for edge in &edges {
        let src = index.resolve(&spec.source, &edge.src).ok_or_else(|| {
            GraphFeedError::UnknownNodeId {
                adjacency: spec.name.clone(),
                entity: spec.source.clone(),
                node: edge.src.clone(),
            }
        })?;
        let dst = index.resolve(&spec.dest, &edge.dst).ok_or_else(|| {
            GraphFeedError::UnknownNodeId {
                adjacency: spec.name.clone(),
                entity: spec.dest.clone(),
                node: edge.dst.clone(),
            }
        })?;

        src_idx.push(src);
        dst_idx.push(dst);

        let rank = arrival.entry(dst).or_insert(0);
        seq.push(*rank);
        *rank += 1;

        if let Some(value) = &edge.parameter {
            push_parameter(&mut params, &spec.name, value)?;
        }
    }

    if let Some(column) = &params {
        if column.len() != edges.len() {
            return Err(GraphFeedError::RaggedParameters(spec.name.clone()));
        }
    } else if spec.has_parameters && !edges.is_empty() {
        return Err(GraphFeedError::ConfigMismatch(format!(
            "params_{}",
            spec.name
        )));
    }

    Ok(EncodedAdjacency {
        spec: spec.clone(),
        src_idx,
        dst_idx,
        seq,
        params,
    })
}

fn push_parameter(
    params: &mut Option<ParamColumn>,
    adjacency: &str,
    value: &serde_json::Value,
) -> Result<()> {
    let malformed = || {
        GraphFeedError::MalformedSample(format!(
            "adjacency '{}' edge parameter must be a number or a list of numbers, got {}",
            adjacency, value
        ))
    };

    match params {
        None => {
            // First parameter fixes the column shape
            if let Some(scalar) = number(value) {
                *params = Some(ParamColumn::Scalars(vec![scalar]));
            } else if let Some(row) = number_list(value) {
                *params = Some(ParamColumn::Vectors(vec![row]));
            } else {
                return Err(malformed());
            }
        }
        Some(ParamColumn::Scalars(values)) => {
            values.push(number(value).ok_or_else(malformed)?);
        }
        Some(ParamColumn::Vectors(rows)) => {
            rows.push(number_list(value).ok_or_else(malformed)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn index_for(sample: &Sample, entities: &[&str]) -> EntityIndex {
        let names: Vec<String> = entities.iter().map(|s| s.to_string()).collect();
        EntityIndex::build(sample, &names).unwrap()
    }

    #[test]
    fn test_indices_and_sequence_positions() {
        let sample = Sample::from_value(json!({
            "link": ["l0", "l1", "l2"],
            "path": ["p0", "p1"],
            "link_to_path": [
                ["l0", "p0"],
                ["l1", "p0"],
                ["l2", "p1"],
                ["l0", "p1"],
                ["l2", "p0"]
            ]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("link_to_path", "link", "path");

        let encoded = encode_adjacency(&sample, &spec, &index).unwrap();
        assert_eq!(encoded.src_idx, vec![0, 1, 2, 0, 2]);
        assert_eq!(encoded.dst_idx, vec![0, 0, 1, 1, 0]);
        assert_eq!(encoded.seq, vec![0, 1, 0, 1, 2]);
        assert_eq!(encoded.max_in_degree(), 3);
        assert!(encoded.params.is_none());
    }

    #[test]
    fn test_round_trip_edge_endpoints() {
        let sample = Sample::from_value(json!({
            "link": ["l0", "l1"],
            "path": ["p0", "p1"],
            "adj": [["l1", "p0"], ["l0", "p1"], ["l1", "p1"]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path");
        let encoded = encode_adjacency(&sample, &spec, &index).unwrap();

        let recovered: Vec<(String, String)> = encoded
            .src_idx
            .iter()
            .zip(&encoded.dst_idx)
            .map(|(&s, &d)| {
                (
                    index.node_at("link", s).unwrap().to_string(),
                    index.node_at("path", d).unwrap().to_string(),
                )
            })
            .collect();

        assert_eq!(
            recovered,
            vec![
                ("l1".to_string(), "p0".to_string()),
                ("l0".to_string(), "p1".to_string()),
                ("l1".to_string(), "p1".to_string()),
            ]
        );
    }

    #[test]
    fn test_scalar_parameters_collected() {
        let sample = Sample::from_value(json!({
            "link": ["l0", "l1"],
            "path": ["p0"],
            "adj": [["l0", "p0", 0.25], ["l1", "p0", 4.0]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path").with_parameters();

        let encoded = encode_adjacency(&sample, &spec, &index).unwrap();
        assert_eq!(
            encoded.params,
            Some(ParamColumn::Scalars(vec![0.25, 4.0]))
        );
    }

    #[test]
    fn test_vector_parameters_collected() {
        let sample = Sample::from_value(json!({
            "link": ["l0"],
            "path": ["p0"],
            "adj": [["l0", "p0", [1.0, 2.0]]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path").with_parameters();

        let encoded = encode_adjacency(&sample, &spec, &index).unwrap();
        assert_eq!(
            encoded.params,
            Some(ParamColumn::Vectors(vec![vec![1.0, 2.0]]))
        );
    }

    #[test]
    fn test_ragged_parameters_rejected() {
        let sample = Sample::from_value(json!({
            "link": ["l0", "l1"],
            "path": ["p0"],
            "adj": [["l0", "p0", 0.25], ["l1", "p0"]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path");

        assert!(matches!(
            encode_adjacency(&sample, &spec, &index),
            Err(GraphFeedError::RaggedParameters(name)) if name == "adj"
        ));
    }

    #[test]
    fn test_declared_parameters_must_be_present() {
        let sample = Sample::from_value(json!({
            "link": ["l0"],
            "path": ["p0"],
            "adj": [["l0", "p0"]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path").with_parameters();

        assert!(matches!(
            encode_adjacency(&sample, &spec, &index),
            Err(GraphFeedError::ConfigMismatch(field)) if field == "params_adj"
        ));
    }

    #[test]
    fn test_missing_adjacency_is_config_mismatch() {
        let sample = Sample::from_value(json!({
            "link": ["l0"],
            "path": ["p0"]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path");

        assert!(matches!(
            encode_adjacency(&sample, &spec, &index),
            Err(GraphFeedError::ConfigMismatch(field)) if field == "adj"
        ));
    }

    #[test]
    fn test_unknown_node_named_in_error() {
        let sample = Sample::from_value(json!({
            "link": ["l0"],
            "path": ["p0"],
            "adj": [["l7", "p0"]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link", "path"]);
        let spec = AdjacencySpec::new("adj", "link", "path");

        assert!(matches!(
            encode_adjacency(&sample, &spec, &index),
            Err(GraphFeedError::UnknownNodeId { node, .. }) if node == "l7"
        ));
    }

    #[test]
    fn test_unindexed_entity_rejected() {
        let sample = Sample::from_value(json!({
            "link": ["l0"],
            "adj": [["l0", "l0"]]
        }))
        .unwrap();
        let index = index_for(&sample, &["link"]);
        let spec = AdjacencySpec::new("adj", "link", "path");

        assert!(matches!(
            encode_adjacency(&sample, &spec, &index),
            Err(GraphFeedError::UnknownEntityMapping { entity, .. })
                if entity == "path"
        ));
    }

    proptest! {
        // For every destination, the recorded ranks are exactly 0..indegree.
        #[test]
        fn prop_seq_is_dense_per_destination(
            edges in proptest::collection::vec((0usize..6, 0usize..6), 0..40)
        ) {
            let src_names: Vec<String> = (0..6).map(|i| format!("s{}", i)).collect();
            let dst_names: Vec<String> = (0..6).map(|i| format!("d{}", i)).collect();
            let edge_json: Vec<_> = edges
                .iter()
                .map(|(s, d)| json!([format!("s{}", s), format!("d{}", d)]))
                .collect();

            let sample = Sample::from_value(json!({
                "src": src_names,
                "dst": dst_names,
                "adj": edge_json
            }))
            .unwrap();
            let index = index_for(&sample, &["src", "dst"]);
            let spec = AdjacencySpec::new("adj", "src", "dst");
            let encoded = encode_adjacency(&sample, &spec, &index).unwrap();

            let mut per_dest: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (&d, &s) in encoded.dst_idx.iter().zip(&encoded.seq) {
                per_dest.entry(d).or_default().push(s);
            }
            for ranks in per_dest.values_mut() {
                ranks.sort_unstable();
                let expected: Vec<usize> = (0..ranks.len()).collect();
                prop_assert_eq!(&*ranks, &expected);
            }
        }
    }
}
