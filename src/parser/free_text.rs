//! Unstructured text: identifiers found by the pattern library

use super::{ParseResult, ParsedFile};
use crate::graph::EntityType;
use crate::patterns;
use crate::resolve::RawRecord;
use std::collections::BTreeSet;

/// Confidence for identifiers scraped from free text
pub const FREE_TEXT_CONFIDENCE: f64 = 0.7;

pub(super) fn parse(bytes: &[u8], source: &str) -> ParseResult<ParsedFile> {
    let text = std::str::from_utf8(bytes)?;

    let found: [(EntityType, BTreeSet<String>); 3] = [
        (EntityType::Domain, patterns::find_domains(text)),
        (EntityType::IpAddress, patterns::find_ips(text)),
        (EntityType::Email, patterns::find_emails(text)),
    ];

    let entities = found
        .into_iter()
        .flat_map(|(entity_type, values)| {
            values.into_iter().map(move |value| {
                RawRecord::new()
                    .with("type", entity_type.as_str())
                    .with("value", value)
                    .with("source", source)
                    .with("confidence", FREE_TEXT_CONFIDENCE)
            })
        })
        .collect();

    Ok(ParsedFile {
        entities,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseError;

    fn values_of(parsed: &ParsedFile, entity_type: EntityType) -> Vec<String> {
        parsed
            .entities
            .iter()
            .filter(|r| r.get_scalar("type").as_deref() == Some(entity_type.as_str()))
            .filter_map(|r| r.get_scalar("value"))
            .collect()
    }

    #[test]
    fn extracts_one_entity_per_identifier() {
        let text = "Visit example.com or mail admin@example.com from 192.168.1.1";
        let parsed = parse(text.as_bytes(), "notes").unwrap();

        assert_eq!(parsed.entities.len(), 3);
        assert_eq!(values_of(&parsed, EntityType::Domain), vec!["example.com"]);
        assert_eq!(values_of(&parsed, EntityType::Email), vec!["admin@example.com"]);
        assert_eq!(values_of(&parsed, EntityType::IpAddress), vec!["192.168.1.1"]);
        for record in &parsed.entities {
            assert_eq!(record.get("confidence").and_then(|v| v.as_f64()), Some(0.7));
            assert_eq!(record.get_scalar("source").as_deref(), Some("notes"));
        }
    }

    #[test]
    fn repeated_identifiers_collapse() {
        let parsed = parse(b"10.1.1.1 then 10.1.1.1 again", "notes").unwrap();
        assert_eq!(parsed.entities.len(), 1);
    }

    #[test]
    fn non_utf8_text_is_parse_error() {
        let err = parse(&[0x66, 0xff, 0x6f], "notes").unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }
}
