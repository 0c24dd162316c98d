//! Aggregation-slot schedules for destinations fed by several entities
//!
//! When one destination entity aggregates messages from more than one
//! source entity type, the per-relation `seq` ranks only order messages
//! within a single relation. The interleave schedule merges those
//! streams: the sample declares a relative arrival cadence (for example
//! `["link", "router", "link"]`), and the schedule assigns each source
//! entity the absolute slots it owns within one combined aggregation
//! sequence per destination node.

use indexmap::IndexMap;

use super::adjacency::EncodedAdjacency;
use crate::sample::Sample;
use crate::schema::InterleaveSpec;
use crate::{GraphFeedError, Result};

/// Slot assignments for one destination entity
///
/// `channels` maps each source entity, in pattern first-encounter order,
/// to the sorted absolute slot positions it owns. Across all channels
/// the positions partition `0..N`, where `N` is the sum of each
/// channel's worst-case in-degree.
#[derive(Clone, Debug, PartialEq)]
pub struct InterleaveSchedule {
    /// The interleave declaration this schedule realizes
    pub name: String,
    /// Destination entity the slots belong to
    pub dest: String,
    /// Source entity to owned slot positions
    pub channels: IndexMap<String, Vec<usize>>,
}

impl InterleaveSchedule {
    /// Total number of slots distributed across channels
    pub fn num_slots(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Build the schedule for one interleave declaration
    ///
    /// The pattern of length `L` is read from the sample. Each distinct
    /// source entity gets a channel in first-encounter order and
    /// reserves `max(seq) + 1` slots, the worst-case in-degree of its
    /// relation into the destination. The pattern is extended
    /// cyclically to the slot total `N` (repeated `ceil(N / L)` times,
    /// then truncated to exactly `N` — never padded) and each channel
    /// collects the positions holding its id.
    pub fn build(
        sample: &Sample,
        spec: &InterleaveSpec,
        adjacencies: &[EncodedAdjacency],
    ) -> Result<InterleaveSchedule> {
        let pattern = sample.interleave_pattern(&spec.name)?;
        if pattern.is_empty() {
            return Err(GraphFeedError::MalformedSample(format!(
                "interleave '{}' declares an empty pattern",
                spec.name
            )));
        }

        // Channel id and slot budget per distinct entity, in
        // first-encounter order
        let mut limits: IndexMap<&str, usize> = IndexMap::new();
        let mut channel_ids = Vec::with_capacity(pattern.len());

        for &token in &pattern {
            let id = match limits.get_index_of(token) {
                Some(id) => id,
                None => {
                    let relation = adjacencies
                        .iter()
                        .find(|adj| adj.spec.source == token && adj.spec.dest == spec.dest)
                        .ok_or_else(|| GraphFeedError::UnknownEntityMapping {
                            context: spec.name.clone(),
                            entity: token.to_string(),
                        })?;
                    limits.insert(token, relation.max_in_degree());
                    limits.len() - 1
                }
            };
            channel_ids.push(id);
        }

        let total_slots: usize = limits.values().sum();

        let mut channels: IndexMap<String, Vec<usize>> = limits
            .keys()
            .map(|entity| (entity.to_string(), Vec::new()))
            .collect();

        for (position, channel) in channel_ids.iter().cycle().take(total_slots).enumerate() {
            channels[*channel].push(position);
        }

        Ok(InterleaveSchedule {
            name: spec.name.clone(),
            dest: spec.dest.clone(),
            channels,
        })
    }
}
