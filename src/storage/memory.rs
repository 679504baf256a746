//! In-process store backed by concurrent maps

use super::traits::{sort_counts, CorrelationStore, StoreResult};
use crate::graph::{Containment, Entity, EntityId, EntityType, Relationship, RelationshipType, Target};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};

type RelationshipKey = (EntityId, EntityId, RelationshipType);

/// Volatile store for tests and dry runs
///
/// Holds the same shape as the SQLite schema: targets, entities keyed by id,
/// one containment per (target, entity) and one relationship per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    targets: DashMap<String, Target>,
    entities: DashMap<EntityId, Entity>,
    contains: DashMap<(String, EntityId), Containment>,
    relationships: DashMap<RelationshipKey, Relationship>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    fn member_ids(&self, target: &str) -> HashSet<EntityId> {
        self.contains
            .iter()
            .filter(|r| r.key().0 == target)
            .map(|r| r.key().1.clone())
            .collect()
    }
}

impl CorrelationStore for MemoryStore {
    fn upsert_target(&self, name: &str) -> StoreResult<Target> {
        let target = self
            .targets
            .entry(name.to_string())
            .or_insert_with(|| Target::new(name));
        Ok(target.clone())
    }

    fn upsert_entity(&self, entity: &Entity, target: &str) -> StoreResult<()> {
        self.targets
            .entry(target.to_string())
            .or_insert_with(|| Target::new(target));
        self.entities.insert(entity.id.clone(), entity.clone());
        self.contains.insert(
            (target.to_string(), entity.id.clone()),
            Containment {
                target: target.to_string(),
                entity_id: entity.id.clone(),
                source: entity.source.clone(),
                timestamp: entity.timestamp,
            },
        );
        Ok(())
    }

    fn find_entity_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.entities.get(id).map(|r| r.clone()))
    }

    fn query_entities_by_target(&self, target: &str) -> StoreResult<Vec<Entity>> {
        let mut entities: Vec<Entity> = self
            .member_ids(target)
            .iter()
            .filter_map(|id| self.entities.get(id).map(|r| r.clone()))
            .collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }

    fn count_entities_by_type(&self, target: &str) -> StoreResult<Vec<(EntityType, usize)>> {
        let mut counts: BTreeMap<EntityType, usize> = BTreeMap::new();
        for id in self.member_ids(target) {
            if let Some(entity) = self.entities.get(&id) {
                *counts.entry(entity.entity_type).or_default() += 1;
            }
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        sort_counts(&mut counts, EntityType::as_str);
        Ok(counts)
    }

    fn query_containments(&self, target: &str) -> StoreResult<Vec<Containment>> {
        let mut edges: Vec<Containment> = self
            .contains
            .iter()
            .filter(|r| r.key().0 == target)
            .map(|r| r.value().clone())
            .collect();
        edges.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(edges)
    }

    fn find_relationship(
        &self,
        source_id: &EntityId,
        target_id: &EntityId,
        rel_type: RelationshipType,
    ) -> StoreResult<Option<Relationship>> {
        let key = (source_id.clone(), target_id.clone(), rel_type);
        Ok(self.relationships.get(&key).map(|r| r.clone()))
    }

    fn upsert_relationship(&self, relationship: &Relationship) -> StoreResult<()> {
        self.relationships
            .insert(relationship.key(), relationship.clone());
        Ok(())
    }

    fn query_relationships_by_target(&self, target: &str) -> StoreResult<Vec<Relationship>> {
        let members = self.member_ids(target);
        let mut edges: Vec<Relationship> = self
            .relationships
            .iter()
            .filter(|r| members.contains(&r.key().0))
            .map(|r| r.value().clone())
            .collect();
        edges.sort_by(|a, b| {
            (&a.source_id, &a.target_id, a.rel_type.as_str()).cmp(&(&b.source_id, &b.target_id, b.rel_type.as_str()))
        });
        Ok(edges)
    }

    fn count_relationships_by_type(&self, target: &str) -> StoreResult<Vec<(RelationshipType, usize)>> {
        let members = self.member_ids(target);
        let mut counts: BTreeMap<RelationshipType, usize> = BTreeMap::new();
        for edge in self.relationships.iter().filter(|r| members.contains(&r.key().0)) {
            *counts.entry(edge.key().2).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        sort_counts(&mut counts, RelationshipType::as_str);
        Ok(counts)
    }
}
