//! Dense integer indices for symbolically named nodes

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::sample::Sample;
use crate::{GraphFeedError, Result};

/// Per-entity node counts and node-id-to-index maps for one sample
///
/// Indices within an entity are the contiguous range `[0, count)`,
/// assigned in node-list order. The index is rebuilt from scratch for
/// every sample; nothing carries over.
#[derive(Clone, Debug, Default)]
pub struct EntityIndex {
    counts: IndexMap<String, usize>,
    indices: HashMap<String, HashMap<String, usize>>,
}

impl EntityIndex {
    /// Index every declared entity's node list, in declaration order
    ///
    /// Fails with `ConfigMismatch` if a declared entity is absent from
    /// the sample and with `DuplicateNodeId` if a node id repeats within
    /// one entity's list.
    pub fn build(sample: &Sample, entity_names: &[String]) -> Result<Self> {
        let mut index = EntityIndex::default();

        for entity in entity_names {
            let nodes = sample.node_ids(entity)?;
            let mut mapping = HashMap::with_capacity(nodes.len());

            for (position, node) in nodes.iter().enumerate() {
                if mapping.insert(node.to_string(), position).is_some() {
                    return Err(GraphFeedError::DuplicateNodeId {
                        entity: entity.clone(),
                        node: node.to_string(),
                    });
                }
            }

            index.counts.insert(entity.clone(), nodes.len());
            index.indices.insert(entity.clone(), mapping);
        }

        Ok(index)
    }

    /// Whether an entity was indexed
    pub fn has_entity(&self, entity: &str) -> bool {
        self.indices.contains_key(entity)
    }

    /// Number of nodes indexed for one entity
    pub fn count(&self, entity: &str) -> Option<usize> {
        self.counts.get(entity).copied()
    }

    /// `(entity, count)` pairs in declaration order
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, &count)| (name.as_str(), count))
    }

    /// The dense index of one node within its entity
    pub fn resolve(&self, entity: &str, node: &str) -> Option<usize> {
        self.indices.get(entity)?.get(node).copied()
    }

    /// The node id assigned a given index, if any
    ///
    /// Linear in the entity size; intended for diagnostics and tests,
    /// not the encoding hot path.
    pub fn node_at(&self, entity: &str, index: usize) -> Option<&str> {
        self.indices.get(entity)?.iter().find_map(|(node, &i)| {
            if i == index {
                Some(node.as_str())
            } else {
                None
            }
        })
    }
}
