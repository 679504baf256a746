//! Merge Engine: idempotent upserts of resolved entities and relationships
//!
//! The engine owns the read-merge-write cycle against a `CorrelationStore`.
//! Stores persist whatever they are handed; reconciling a re-merged record
//! with what is already stored happens here, from a single merge stage.

use crate::graph::{Attributes, Entity, EntityId, Relationship};
use crate::storage::{CorrelationStore, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// How confidence is reconciled when an already stored id is merged again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// Keep the highest confidence seen and the most recent timestamp
    #[default]
    KeepMax,
    /// The latest merge overwrites confidence and timestamp
    LastWrite,
}

/// What a single upsert did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
    /// Stored state already matched; only the containment edge was refreshed
    Unchanged,
    /// Relationship endpoint is not a stored entity; nothing was written
    MissingEndpoint(EntityId),
}

impl MergeOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::MissingEndpoint(_))
    }
}

/// Upserts into the store under a confidence policy
#[derive(Clone)]
pub struct MergeEngine {
    store: Arc<dyn CorrelationStore>,
    policy: ConfidencePolicy,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn CorrelationStore>, policy: ConfidencePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        &self.store
    }

    /// Create the entity or fold it into the stored one, then (re-)establish
    /// the target's `CONTAINS` edge
    ///
    /// Scalar fields come from `entity`; attributes are merged key by key with
    /// the incoming value winning.
    pub fn upsert_entity(&self, entity: Entity, target: &str) -> StoreResult<MergeOutcome> {
        let Some(existing) = self.store.find_entity_by_id(&entity.id)? else {
            self.store.upsert_entity(&entity, target)?;
            debug!(entity_id = %entity.id, target_name = target, "entity created");
            return Ok(MergeOutcome::Created);
        };

        let (confidence, timestamp) = self.reconcile(
            (existing.confidence, existing.timestamp),
            (entity.confidence, entity.timestamp),
        );
        let merged = Entity {
            confidence,
            timestamp,
            attributes: merge_attributes(&existing.attributes, entity.attributes),
            ..entity
        };

        self.store.upsert_entity(&merged, target)?;
        if merged == existing {
            Ok(MergeOutcome::Unchanged)
        } else {
            debug!(entity_id = %merged.id, target_name = target, "entity updated");
            Ok(MergeOutcome::Updated)
        }
    }

    /// Create or update the typed edge between two stored entities
    ///
    /// Missing endpoints are reported as an outcome, never as an error, and
    /// leave the store untouched.
    pub fn upsert_relationship(&self, relationship: Relationship) -> StoreResult<MergeOutcome> {
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if self.store.find_entity_by_id(endpoint)?.is_none() {
                warn!(
                    source_id = %relationship.source_id,
                    target_id = %relationship.target_id,
                    missing = %endpoint,
                    "dropping relationship with missing endpoint"
                );
                return Ok(MergeOutcome::MissingEndpoint(endpoint.clone()));
            }
        }

        let existing = self.store.find_relationship(
            &relationship.source_id,
            &relationship.target_id,
            relationship.rel_type,
        )?;
        let Some(existing) = existing else {
            self.store.upsert_relationship(&relationship)?;
            return Ok(MergeOutcome::Created);
        };

        let (confidence, timestamp) = self.reconcile(
            (existing.confidence, existing.timestamp),
            (relationship.confidence, relationship.timestamp),
        );
        let merged = Relationship {
            confidence,
            timestamp,
            attributes: merge_attributes(&existing.attributes, relationship.attributes),
            ..relationship
        };

        if merged == existing {
            return Ok(MergeOutcome::Unchanged);
        }
        self.store.upsert_relationship(&merged)?;
        Ok(MergeOutcome::Updated)
    }

    fn reconcile(
        &self,
        (stored_confidence, stored_at): (f64, DateTime<Utc>),
        (incoming_confidence, incoming_at): (f64, DateTime<Utc>),
    ) -> (f64, DateTime<Utc>) {
        match self.policy {
            ConfidencePolicy::KeepMax => (stored_confidence.max(incoming_confidence), stored_at.max(incoming_at)),
            ConfidencePolicy::LastWrite => (incoming_confidence, incoming_at),
        }
    }
}

/// Stored attributes overlaid with incoming ones, incoming wins per key
fn merge_attributes(stored: &Attributes, incoming: Attributes) -> Attributes {
    let mut merged = stored.clone();
    merged.extend(incoming);
    merged
}
