//! Dossier: Entity Correlation Engine for OSINT reconnaissance output
//!
//! Ingests heterogeneous tool artifacts for a named investigation target
//! (JSON documents, CSV exports, free text, Nmap XML) and folds them into a
//! canonical, deduplicated entity/relationship graph.
//!
//! # Core Concepts
//!
//! - **Entities**: typed facts (domains, addresses, accounts) identified by
//!   `"{type}:{value}"` unless the record names its own id
//! - **Relationships**: typed, directed edges between stored entities
//! - **Targets**: investigation roots; every entity hangs off one via `CONTAINS`
//!
//! # Example
//!
//! ```
//! use dossier::{ConfidencePolicy, IdentityResolver, MemoryStore, MergeEngine, MergeOutcome, RawRecord};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let merge = MergeEngine::new(store.clone(), ConfidencePolicy::KeepMax);
//!
//! let raw = RawRecord::new().with("domain", "example.com");
//! let entity = IdentityResolver::new().resolve(&raw, "amass").unwrap();
//! assert_eq!(entity.id.as_str(), "domain:example.com");
//! assert_eq!(merge.upsert_entity(entity, "acme").unwrap(), MergeOutcome::Created);
//! ```

pub mod config;
pub mod driver;
mod graph;
pub mod merge;
pub mod parser;
pub mod patterns;
pub mod resolve;
pub mod storage;
pub mod summary;

pub use config::{ConfigError, CorrelatorConfig};
pub use driver::{CancellationToken, CorrelationDriver, CorrelationError, CorrelationResult, RunState, RunSummary};
pub use graph::{
    clamp_confidence, Attributes, Containment, Entity, EntityId, EntityType, Relationship, RelationshipType, Target,
    UnknownTypeName,
};
pub use merge::{ConfidencePolicy, MergeEngine, MergeOutcome};
pub use parser::{ParseError, ParseResult, ParsedFile, ParserKind, SourceFile};
pub use resolve::{IdentityResolver, RawRecord, ValidationError, ValidationResult};
pub use storage::{CorrelationStore, MemoryStore, OpenStore, SqliteStore, StoreError, StoreResult};
pub use summary::{TargetSummary, TypeSummary};
