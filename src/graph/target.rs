//! Target: the root aggregate of one investigation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The root node of an investigation
///
/// Exactly one target exists per name; every discovered entity is attached
/// to it through a `CONTAINS` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// The `CONTAINS` edge from a target to one of its entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Containment {
    pub target: String,
    pub entity_id: super::EntityId,
    /// Source label of the most recent merge
    pub source: String,
    pub timestamp: DateTime<Utc>,
}
