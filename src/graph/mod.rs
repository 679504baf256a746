//! Core graph data structures

mod entity;
mod relationship;
mod target;


pub use entity::{clamp_confidence, Attributes, Entity, EntityId, EntityType, UnknownTypeName};
pub use relationship::{Relationship, RelationshipType};
pub use target::{Containment, Target};
