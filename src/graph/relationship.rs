//! Typed, directed edges between entities

use super::entity::{clamp_confidence, Attributes, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Kind of relationship between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Contains,
    ResolvesTo,
    BelongsTo,
    CommunicatesWith,
    Hosts,
    RedirectsTo,
    RelatedTo,
    SameAs,
    PartOf,
    Uses,
    HasRecord,
    HasVuln,
    Owns,
    Registrant,
    AdminContact,
    TechContact,
    Nameserver,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 17] = [
        RelationshipType::Contains,
        RelationshipType::ResolvesTo,
        RelationshipType::BelongsTo,
        RelationshipType::CommunicatesWith,
        RelationshipType::Hosts,
        RelationshipType::RedirectsTo,
        RelationshipType::RelatedTo,
        RelationshipType::SameAs,
        RelationshipType::PartOf,
        RelationshipType::Uses,
        RelationshipType::HasRecord,
        RelationshipType::HasVuln,
        RelationshipType::Owns,
        RelationshipType::Registrant,
        RelationshipType::AdminContact,
        RelationshipType::TechContact,
        RelationshipType::Nameserver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::ResolvesTo => "resolves_to",
            Self::BelongsTo => "belongs_to",
            Self::CommunicatesWith => "communicates_with",
            Self::Hosts => "hosts",
            Self::RedirectsTo => "redirects_to",
            Self::RelatedTo => "related_to",
            Self::SameAs => "same_as",
            Self::PartOf => "part_of",
            Self::Uses => "uses",
            Self::HasRecord => "has_record",
            Self::HasVuln => "has_vuln",
            Self::Owns => "owns",
            Self::Registrant => "registrant",
            Self::AdminContact => "admin_contact",
            Self::TechContact => "tech_contact",
            Self::Nameserver => "nameserver",
        }
    }
}

impl Default for RelationshipType {
    fn default() -> Self {
        Self::RelatedTo
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = super::entity::UnknownTypeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| super::entity::UnknownTypeName(s.to_string()))
    }
}

/// A directed edge between two stored entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: EntityId,
    pub target_id: EntityId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    /// Tool label that produced this edge
    pub source: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<EntityId>,
        target_id: impl Into<EntityId>,
        rel_type: RelationshipType,
        source: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            rel_type,
            source: source.into(),
            confidence: clamp_confidence(confidence),
            timestamp: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Identity of the edge in the store: one edge per endpoint pair and type
    pub fn key(&self) -> (EntityId, EntityId, RelationshipType) {
        (self.source_id.clone(), self.target_id.clone(), self.rel_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_type_is_related_to() {
        assert_eq!(RelationshipType::default(), RelationshipType::RelatedTo);
    }

    #[test]
    fn parses_known_names() {
        assert_eq!("hosts".parse::<RelationshipType>().unwrap(), RelationshipType::Hosts);
        assert_eq!("RESOLVES_TO".parse::<RelationshipType>().unwrap(), RelationshipType::ResolvesTo);
        assert!("teleports_to".parse::<RelationshipType>().is_err());
    }

    #[test]
    fn key_ignores_attributes() {
        let a = Relationship::new("ip_address:10.0.0.5", "service:https", RelationshipType::Hosts, "nmap", 0.9)
            .with_attribute("port", 443);
        let b = Relationship::new("ip_address:10.0.0.5", "service:https", RelationshipType::Hosts, "nmap", 0.5);
        assert_eq!(a.key(), b.key());
    }
}
