//! Storage trait definitions

use crate::graph::{Containment, Entity, EntityId, EntityType, Relationship, RelationshipType, Target};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store connection lost: {0}")]
    Connectivity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

impl StoreError {
    /// Whether the store session itself is unusable, so no further merge
    /// in this run can be durable
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Database(_) | Self::Io(_))
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The narrow store contract the correlation core consumes
///
/// Implementations must be thread-safe (Send + Sync); the driver shares one
/// handle between its merge stage and summary queries. Stores persist what
/// they are given: merge policy lives in `MergeEngine`.
pub trait CorrelationStore: Send + Sync {
    // === Target Operations ===

    /// Create the target if absent; an existing target keeps its `created_at`
    fn upsert_target(&self, name: &str) -> StoreResult<Target>;

    // === Entity Operations ===

    /// Write the entity node and (re-)establish the `CONTAINS` edge from
    /// `target` carrying the entity's source and timestamp
    fn upsert_entity(&self, entity: &Entity, target: &str) -> StoreResult<()>;

    fn find_entity_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>>;

    /// All entities attached to the target, ordered by id
    fn query_entities_by_target(&self, target: &str) -> StoreResult<Vec<Entity>>;

    /// Entity counts per type for the target, largest first, ties by type name
    fn count_entities_by_type(&self, target: &str) -> StoreResult<Vec<(EntityType, usize)>>;

    /// `CONTAINS` edges of the target, ordered by entity id
    fn query_containments(&self, target: &str) -> StoreResult<Vec<Containment>>;

    // === Relationship Operations ===

    fn find_relationship(
        &self,
        source_id: &EntityId,
        target_id: &EntityId,
        rel_type: RelationshipType,
    ) -> StoreResult<Option<Relationship>>;

    /// Write the edge; one edge exists per (source_id, target_id, type)
    fn upsert_relationship(&self, relationship: &Relationship) -> StoreResult<()>;

    /// Edges whose source entity is attached to the target
    fn query_relationships_by_target(&self, target: &str) -> StoreResult<Vec<Relationship>>;

    /// Counts per type over `query_relationships_by_target`, largest first,
    /// ties by type name
    fn count_relationships_by_type(&self, target: &str) -> StoreResult<Vec<(RelationshipType, usize)>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: CorrelationStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StoreResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StoreResult<Self>;
}

/// Sort `(type, count)` pairs the way every backend reports them
pub(crate) fn sort_counts<T>(counts: &mut [(T, usize)], name: impl Fn(&T) -> &'static str) {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| name(&a.0).cmp(name(&b.0))));
}
