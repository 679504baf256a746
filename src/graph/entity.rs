//! Entity representation in the correlation graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Free-form attributes attached to entities and relationships
pub type Attributes = BTreeMap<String, Value>;

/// Stable, source-independent identifier for an entity
///
/// Serializes as a plain string. Derived ids take the form `"{type}:{value}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an EntityId from an explicit string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the default identity for a typed value
    pub fn derive(entity_type: EntityType, value: &str) -> Self {
        Self(format!("{}:{}", entity_type.as_str(), value))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Closed set of entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Domain,
    Subdomain,
    IpAddress,
    Email,
    Username,
    Person,
    Organization,
    Phone,
    Url,
    Certificate,
    SocialMedia,
    File,
    Hash,
    Service,
    /// Unrecognized or un-inferable category
    Unknown,
}

impl EntityType {
    /// Every recognized type, `Unknown` last
    pub const ALL: [EntityType; 15] = [
        EntityType::Domain,
        EntityType::Subdomain,
        EntityType::IpAddress,
        EntityType::Email,
        EntityType::Username,
        EntityType::Person,
        EntityType::Organization,
        EntityType::Phone,
        EntityType::Url,
        EntityType::Certificate,
        EntityType::SocialMedia,
        EntityType::File,
        EntityType::Hash,
        EntityType::Service,
        EntityType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Subdomain => "subdomain",
            Self::IpAddress => "ip_address",
            Self::Email => "email",
            Self::Username => "username",
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Certificate => "certificate",
            Self::SocialMedia => "social_media",
            Self::File => "file",
            Self::Hash => "hash",
            Self::Service => "service",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a type name, mapping anything unrecognized to `Unknown`
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a type name is outside the closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type name: {0}")]
pub struct UnknownTypeName(pub String);

impl FromStr for EntityType {
    type Err = UnknownTypeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownTypeName(s.to_string()))
    }
}

/// Clamp a confidence score into `[0, 1]`, treating NaN as zero trust
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

/// A typed, identified fact about a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub value: String,
    /// Tool label that produced this fact
    pub source: String,
    /// Trust in `[0, 1]`
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Entity {
    /// Create an entity with a derived id, the current time and the given confidence
    pub fn new(
        entity_type: EntityType,
        value: impl Into<String>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let value = value.into();
        Self {
            id: EntityId::derive(entity_type, &value),
            entity_type,
            value,
            source: source.into(),
            confidence: clamp_confidence(confidence),
            timestamp: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
