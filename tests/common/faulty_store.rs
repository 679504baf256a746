//! Store double that loses its connection after a number of writes

use dossier::{
    Containment, CorrelationStore, Entity, EntityId, EntityType, MemoryStore, Relationship, RelationshipType,
    StoreError, StoreResult, Target,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to a `MemoryStore` until `healthy_writes` entity writes have
/// succeeded, then fails every merge-path call with a connectivity error
pub struct FaultyStore {
    inner: MemoryStore,
    healthy_writes: usize,
    writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new(healthy_writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            healthy_writes,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<()> {
        if self.writes.load(Ordering::SeqCst) >= self.healthy_writes {
            return Err(StoreError::Connectivity("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

impl CorrelationStore for FaultyStore {
    fn upsert_target(&self, name: &str) -> StoreResult<Target> {
        self.inner.upsert_target(name)
    }

    fn upsert_entity(&self, entity: &Entity, target: &str) -> StoreResult<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_entity(entity, target)
    }

    fn find_entity_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        self.check()?;
        self.inner.find_entity_by_id(id)
    }

    fn query_entities_by_target(&self, target: &str) -> StoreResult<Vec<Entity>> {
        self.inner.query_entities_by_target(target)
    }

    fn count_entities_by_type(&self, target: &str) -> StoreResult<Vec<(EntityType, usize)>> {
        self.inner.count_entities_by_type(target)
    }

    fn query_containments(&self, target: &str) -> StoreResult<Vec<Containment>> {
        self.inner.query_containments(target)
    }

    fn find_relationship(
        &self,
        source_id: &EntityId,
        target_id: &EntityId,
        rel_type: RelationshipType,
    ) -> StoreResult<Option<Relationship>> {
        self.check()?;
        self.inner.find_relationship(source_id, target_id, rel_type)
    }

    fn upsert_relationship(&self, relationship: &Relationship) -> StoreResult<()> {
        self.check()?;
        self.inner.upsert_relationship(relationship)
    }

    fn query_relationships_by_target(&self, target: &str) -> StoreResult<Vec<Relationship>> {
        self.inner.query_relationships_by_target(target)
    }

    fn count_relationships_by_type(&self, target: &str) -> StoreResult<Vec<(RelationshipType, usize)>> {
        self.inner.count_relationships_by_type(target)
    }
}
