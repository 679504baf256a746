//! JSON documents: entity arrays, `{entities, relationships}` envelopes,
//! or a single entity object

use super::{ParseError, ParseResult, ParsedFile};
use crate::resolve::RawRecord;
use serde_json::Value;
use tracing::warn;

pub(super) fn parse(bytes: &[u8], source: &str) -> ParseResult<ParsedFile> {
    let document: Value = serde_json::from_slice(bytes)?;
    let mut parsed = ParsedFile::default();

    match document {
        Value::Array(items) => collect(items, &mut parsed.entities, &mut parsed.malformed, source),
        Value::Object(map) if matches!(map.get("entities"), Some(Value::Array(_))) => {
            let mut map = map;
            if let Some(Value::Array(entities)) = map.remove("entities") {
                collect(entities, &mut parsed.entities, &mut parsed.malformed, source);
            }
            if let Some(Value::Array(relationships)) = map.remove("relationships") {
                collect(relationships, &mut parsed.relationships, &mut parsed.malformed, source);
            }
        }
        // Not an envelope: the object itself is the entity
        Value::Object(map) => parsed.entities.push(RawRecord::from(map)),
        other => {
            return Err(ParseError::Malformed(format!(
                "expected an array or object at top level, found {}",
                json_kind(&other)
            )))
        }
    }

    Ok(parsed)
}

fn collect(items: Vec<Value>, into: &mut Vec<RawRecord>, malformed: &mut usize, source: &str) {
    for item in items {
        match RawRecord::from_value(item) {
            Some(record) => into.push(record),
            None => {
                *malformed += 1;
                warn!(source = source, "skipping non-object element in JSON document");
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_value(value: Value) -> ParseResult<ParsedFile> {
        parse(value.to_string().as_bytes(), "tool")
    }

    #[test]
    fn array_elements_are_entities() {
        let parsed = parse_value(json!([{"domain": "a.com"}, {"ip": "10.0.0.1"}])).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert!(parsed.relationships.is_empty());
    }

    #[test]
    fn envelope_supplies_entities_and_relationships() {
        let parsed = parse_value(json!({
            "entities": [{"type": "domain", "value": "a.com"}, {"type": "ip_address", "value": "10.0.0.1"}],
            "relationships": [{"source_id": "domain:a.com", "target_id": "ip_address:10.0.0.1", "type": "resolves_to"}]
        }))
        .unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.relationships.len(), 1);
    }

    #[test]
    fn envelope_without_relationships() {
        let parsed = parse_value(json!({"entities": [{"value": "a.com"}]})).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert!(parsed.relationships.is_empty());
    }

    #[test]
    fn plain_object_is_single_entity() {
        let parsed = parse_value(json!({"email": "ops@example.com", "breach": "x"})).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].get_scalar("email").as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn non_list_entities_field_keeps_object_whole() {
        let parsed = parse_value(json!({"value": "a.com", "entities": 3})).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert!(parsed.entities[0].contains("entities"));
    }

    #[test]
    fn non_object_elements_are_counted() {
        let parsed = parse_value(json!([{"value": "a.com"}, "stray", 7])).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.malformed, 2);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse(b"{\"entities\": [", "tool").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn scalar_document_is_malformed() {
        let err = parse(b"42", "tool").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }
}
