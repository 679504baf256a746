//! Aggregate view of a target, the shape report collaborators consume

use crate::graph::{Entity, EntityType, RelationshipType};
use crate::storage::{CorrelationStore, StoreResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Entities of one type, with the most trusted ones listed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub count: usize,
    /// Highest confidence first, ties by value
    pub top: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSummary {
    pub target: String,
    pub total_entities: usize,
    pub total_relationships: usize,
    /// Largest type first
    pub types: Vec<TypeSummary>,
    /// Relationship counts, largest type first
    pub relationship_types: Vec<(RelationshipType, usize)>,
    /// Distinct tool labels that contributed entities, sorted
    pub sources: Vec<String>,
}

impl TargetSummary {
    /// Build from the store, keeping at most `limit` top entities per type
    pub fn build(store: &dyn CorrelationStore, target: &str, limit: usize) -> StoreResult<Self> {
        let counts = store.count_entities_by_type(target)?;

        let mut by_type: BTreeMap<EntityType, Vec<Entity>> = BTreeMap::new();
        for entity in store.query_entities_by_target(target)? {
            by_type.entry(entity.entity_type).or_default().push(entity);
        }

        let types = counts
            .into_iter()
            .map(|(entity_type, count)| {
                let mut top = by_type.remove(&entity_type).unwrap_or_default();
                top.sort_by(|a, b| {
                    b.confidence
                        .total_cmp(&a.confidence)
                        .then_with(|| a.value.cmp(&b.value))
                });
                top.truncate(limit);
                TypeSummary { entity_type, count, top }
            })
            .collect::<Vec<_>>();

        let relationship_types = store.count_relationships_by_type(target)?;
        let sources: BTreeSet<String> = store
            .query_containments(target)?
            .into_iter()
            .map(|c| c.source)
            .collect();

        Ok(Self {
            target: target.to_string(),
            total_entities: types.iter().map(|t| t.count).sum(),
            total_relationships: relationship_types.iter().map(|(_, n)| n).sum(),
            types,
            relationship_types,
            sources: sources.into_iter().collect(),
        })
    }
}
