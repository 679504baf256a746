//! Type inference for records without an explicit `type`
//!
//! Two ordered rule tables, evaluated first match wins:
//! 1. field-name rules (which keys are present)
//! 2. value-pattern rules (shape of the `value` field)
//!
//! Anything left over is `Unknown`.

use super::raw::RawRecord;
use crate::graph::EntityType;
use crate::patterns;
use serde_json::Value;

/// Infer a type when any of `fields` is present in the record
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub fields: &'static [&'static str],
    pub entity_type: EntityType,
}

/// Infer a type when the record's `value` matches `predicate`
#[derive(Debug, Clone, Copy)]
pub struct ValueRule {
    pub name: &'static str,
    pub predicate: fn(&str) -> bool,
    pub entity_type: EntityType,
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule { fields: &["domain", "hostname"], entity_type: EntityType::Domain },
    FieldRule { fields: &["ip", "ipv4", "ipv6"], entity_type: EntityType::IpAddress },
    FieldRule { fields: &["email"], entity_type: EntityType::Email },
    FieldRule { fields: &["username", "user"], entity_type: EntityType::Username },
    FieldRule { fields: &["phone", "number"], entity_type: EntityType::Phone },
];

pub const VALUE_RULES: &[ValueRule] = &[
    ValueRule { name: "domain", predicate: patterns::is_domain, entity_type: EntityType::Domain },
    ValueRule { name: "ip", predicate: patterns::is_ip_address, entity_type: EntityType::IpAddress },
    ValueRule { name: "email", predicate: patterns::is_email, entity_type: EntityType::Email },
];

/// Decide an entity's category from field names, then value shape
pub fn infer_type(record: &RawRecord) -> EntityType {
    if let Some(rule) = FIELD_RULES
        .iter()
        .find(|rule| rule.fields.iter().any(|field| record.contains(field)))
    {
        return rule.entity_type;
    }

    if let Some(Value::String(value)) = record.get("value") {
        let value = value.trim();
        if let Some(rule) = VALUE_RULES.iter().find(|rule| (rule.predicate)(value)) {
            return rule.entity_type;
        }
    }

    EntityType::Unknown
}
