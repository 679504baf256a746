//! Identity resolution: raw records into canonical entities and relationships

use super::infer::infer_type;
use super::raw::RawRecord;
use super::{ValidationError, ValidationResult};
use crate::graph::{
    clamp_confidence, Attributes, Entity, EntityId, EntityType, Relationship, RelationshipType,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Confidence assumed for heuristically extracted facts
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Fields consumed by resolution itself; never copied into attributes
const RESERVED_FIELDS: &[&str] = &["id", "type", "value", "source", "confidence", "timestamp", "attributes"];

/// Reserved names match case-insensitively, the same way `RawRecord::get` reads them
fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.iter().any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Type-specific fields checked for a value, in priority order
pub const VALUE_FIELDS: &[(EntityType, &[&str])] = &[
    (EntityType::Domain, &["domain", "hostname", "host", "name"]),
    (EntityType::IpAddress, &["ip", "ipv4", "ipv6", "address"]),
    (EntityType::Email, &["email"]),
    (EntityType::Username, &["username", "user", "account"]),
    (EntityType::Phone, &["phone", "number", "phoneNumber"]),
];

fn value_fields(entity_type: EntityType) -> &'static [&'static str] {
    VALUE_FIELDS
        .iter()
        .find(|(t, _)| *t == entity_type)
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

/// Derives stable identities and validated scores for raw records
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    default_confidence: f64,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self {
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Confidence applied when a record carries none
    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = clamp_confidence(confidence);
        self
    }

    /// Resolve a raw entity record
    ///
    /// `source_label` is the tool directory the record came from; a record's
    /// own non-empty `source` field takes precedence.
    pub fn resolve(&self, raw: &RawRecord, source_label: &str) -> ValidationResult<Entity> {
        let entity_type = self.resolve_type(raw);

        let value = self
            .resolve_value(raw, entity_type)
            .ok_or_else(|| ValidationError::NoValue {
                fields: raw.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>().join(","),
            })?;

        let id = raw
            .get_scalar("id")
            .map(EntityId::from)
            .unwrap_or_else(|| EntityId::derive(entity_type, &value));

        let attributes = match raw.get("attributes") {
            Some(Value::Object(explicit)) if !explicit.is_empty() => {
                explicit.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            _ => passthrough_attributes(raw),
        };

        Ok(Entity {
            id,
            entity_type,
            value,
            source: raw.get_scalar("source").unwrap_or_else(|| source_label.to_string()),
            confidence: self.resolve_confidence(raw),
            timestamp: resolve_timestamp(raw),
            attributes,
        })
    }

    /// Resolve a raw relationship record
    ///
    /// Endpoint existence is not checked here; that is the merge engine's job.
    pub fn resolve_relationship(
        &self,
        raw: &RawRecord,
        source_label: &str,
    ) -> ValidationResult<Relationship> {
        let source_id = raw
            .get_scalar("source_id")
            .ok_or(ValidationError::MissingEndpointId("source_id"))?;
        let target_id = raw
            .get_scalar("target_id")
            .ok_or(ValidationError::MissingEndpointId("target_id"))?;

        let mut attributes: Attributes = match raw.get("attributes") {
            Some(Value::Object(explicit)) => {
                explicit.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            _ => Attributes::new(),
        };

        let rel_type = match raw.get_scalar("type") {
            None => RelationshipType::default(),
            Some(declared) => match declared.parse::<RelationshipType>() {
                Ok(t) => t,
                Err(_) => {
                    warn!(declared = %declared, "unknown relationship type, using related_to");
                    attributes.insert("declared_type".to_string(), Value::String(declared));
                    RelationshipType::default()
                }
            },
        };

        Ok(Relationship {
            source_id: EntityId::from(source_id),
            target_id: EntityId::from(target_id),
            rel_type,
            source: raw.get_scalar("source").unwrap_or_else(|| source_label.to_string()),
            confidence: self.resolve_confidence(raw),
            timestamp: resolve_timestamp(raw),
            attributes,
        })
    }

    /// Explicit member of the enumeration wins; an explicit non-member is
    /// normalized to `Unknown`; an absent type is inferred.
    fn resolve_type(&self, raw: &RawRecord) -> EntityType {
        match raw.get_scalar("type") {
            Some(declared) => declared.parse().unwrap_or_else(|_| {
                warn!(declared = %declared, "unsupported entity type, normalizing to unknown");
                EntityType::Unknown
            }),
            None => infer_type(raw),
        }
    }

    fn resolve_value(&self, raw: &RawRecord, entity_type: EntityType) -> Option<String> {
        if let Some(value) = raw.get_scalar("value") {
            return Some(value);
        }

        if let Some(value) = value_fields(entity_type)
            .iter()
            .find_map(|field| raw.get_scalar(field))
        {
            return Some(value);
        }

        raw.iter()
            .filter(|(key, _)| !is_reserved(key))
            .find_map(|(_, value)| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
    }

    fn resolve_confidence(&self, raw: &RawRecord) -> f64 {
        let declared = match raw.get("confidence") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match declared {
            Some(c) if !c.is_nan() => {
                if !(0.0..=1.0).contains(&c) {
                    debug!(confidence = c, "clamping out-of-range confidence");
                }
                clamp_confidence(c)
            }
            _ => self.default_confidence,
        }
    }
}

fn passthrough_attributes(raw: &RawRecord) -> Attributes {
    raw.iter()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn resolve_timestamp(raw: &RawRecord) -> DateTime<Utc> {
    raw.get("timestamp").and_then(parse_timestamp).unwrap_or_else(Utc::now)
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) and integer Unix seconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
                .or_else(|| {
                    s.parse::<i64>()
                        .ok()
                        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                })
        }
        _ => None,
    }
}
