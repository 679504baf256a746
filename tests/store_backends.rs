//! Store contract tests, run against both backends
//!
//! Run with: `cargo test --test store_backends`

use chrono::{TimeZone, Utc};
use dossier::{
    CorrelationStore, Entity, EntityId, EntityType, MemoryStore, OpenStore, Relationship, RelationshipType,
    SqliteStore, TargetSummary,
};
use serde_json::json;

fn backends() -> Vec<(&'static str, Box<dyn CorrelationStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

fn domain(value: &str) -> Entity {
    Entity::new(EntityType::Domain, value, "amass", 0.8)
        .with_timestamp(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
}

#[test]
fn entity_round_trips_with_attributes() {
    for (name, store) in backends() {
        let entity = domain("acme.test")
            .with_attribute("registrar", "Example Registrar")
            .with_attribute("ports", json!([80, 443]));
        store.upsert_entity(&entity, "acme").unwrap();

        let found = store.find_entity_by_id(&entity.id).unwrap();
        assert_eq!(found.as_ref(), Some(&entity), "{name}");
    }
}

#[test]
fn missing_entity_is_none() {
    for (name, store) in backends() {
        let found = store.find_entity_by_id(&EntityId::from("domain:nowhere.test")).unwrap();
        assert!(found.is_none(), "{name}");
    }
}

#[test]
fn upsert_target_keeps_creation_time() {
    for (name, store) in backends() {
        let first = store.upsert_target("acme").unwrap();
        let second = store.upsert_target("acme").unwrap();
        assert_eq!(first, second, "{name}");
    }
}

#[test]
fn entities_are_ordered_by_id_and_scoped_to_target() {
    for (name, store) in backends() {
        store.upsert_entity(&domain("b.acme.test"), "acme").unwrap();
        store.upsert_entity(&domain("a.acme.test"), "acme").unwrap();
        store.upsert_entity(&domain("globex.test"), "globex").unwrap();

        let values: Vec<String> = store
            .query_entities_by_target("acme")
            .unwrap()
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec!["a.acme.test", "b.acme.test"], "{name}");
        assert!(store.query_entities_by_target("initech").unwrap().is_empty(), "{name}");
    }
}

#[test]
fn rewrite_refreshes_containment_without_duplicating() {
    for (name, store) in backends() {
        let entity = domain("acme.test");
        store.upsert_entity(&entity, "acme").unwrap();
        let rewritten = Entity {
            source: "subfinder".to_string(),
            ..entity.clone()
        };
        store.upsert_entity(&rewritten, "acme").unwrap();

        let containments = store.query_containments("acme").unwrap();
        assert_eq!(containments.len(), 1, "{name}");
        assert_eq!(containments[0].entity_id, entity.id, "{name}");
        assert_eq!(containments[0].source, "subfinder", "{name}");
    }
}

#[test]
fn type_counts_sort_by_count_then_name() {
    for (name, store) in backends() {
        store.upsert_entity(&domain("a.test"), "acme").unwrap();
        store
            .upsert_entity(&Entity::new(EntityType::Email, "ops@a.test", "hunter", 0.6), "acme")
            .unwrap();
        store
            .upsert_entity(&Entity::new(EntityType::IpAddress, "10.0.0.1", "nmap", 0.9), "acme")
            .unwrap();
        store
            .upsert_entity(&Entity::new(EntityType::IpAddress, "10.0.0.2", "nmap", 0.9), "acme")
            .unwrap();

        let counts = store.count_entities_by_type("acme").unwrap();
        assert_eq!(
            counts,
            vec![
                (EntityType::IpAddress, 2),
                (EntityType::Domain, 1),
                (EntityType::Email, 1),
            ],
            "{name}"
        );
    }
}

#[test]
fn one_relationship_per_endpoint_pair_and_type() {
    for (name, store) in backends() {
        let host = domain("acme.test");
        let ip = Entity::new(EntityType::IpAddress, "10.0.0.5", "dnsx", 0.9);
        store.upsert_entity(&host, "acme").unwrap();
        store.upsert_entity(&ip, "acme").unwrap();

        let edge = Relationship::new(host.id.clone(), ip.id.clone(), RelationshipType::ResolvesTo, "dnsx", 0.7);
        store.upsert_relationship(&edge).unwrap();
        let stronger = Relationship {
            confidence: 0.95,
            ..edge.clone()
        };
        store.upsert_relationship(&stronger).unwrap();
        let other_type = Relationship::new(host.id.clone(), ip.id.clone(), RelationshipType::RelatedTo, "dnsx", 0.5);
        store.upsert_relationship(&other_type).unwrap();

        let edges = store.query_relationships_by_target("acme").unwrap();
        assert_eq!(edges.len(), 2, "{name}");
        assert_eq!(
            store.count_relationships_by_type("acme").unwrap(),
            vec![(RelationshipType::RelatedTo, 1), (RelationshipType::ResolvesTo, 1)],
            "{name}"
        );

        let found = store
            .find_relationship(&host.id, &ip.id, RelationshipType::ResolvesTo)
            .unwrap()
            .unwrap();
        assert_eq!(found.confidence, 0.95, "{name}");
        assert!(store
            .find_relationship(&ip.id, &host.id, RelationshipType::ResolvesTo)
            .unwrap()
            .is_none());
    }
}

#[test]
fn relationship_counts_follow_source_membership() {
    for (name, store) in backends() {
        let acme = domain("acme.test");
        let globex = domain("globex.test");
        let ip = Entity::new(EntityType::IpAddress, "10.0.0.5", "dnsx", 0.9);
        store.upsert_entity(&acme, "acme").unwrap();
        store.upsert_entity(&ip, "acme").unwrap();
        store.upsert_entity(&globex, "globex").unwrap();

        for (from, rel_type) in [
            (&acme, RelationshipType::ResolvesTo),
            (&acme, RelationshipType::RelatedTo),
            (&globex, RelationshipType::ResolvesTo),
        ] {
            store
                .upsert_relationship(&Relationship::new(from.id.clone(), ip.id.clone(), rel_type, "dnsx", 0.7))
                .unwrap();
        }
        store
            .upsert_relationship(&Relationship::new(
                globex.id.clone(),
                acme.id.clone(),
                RelationshipType::ResolvesTo,
                "dnsx",
                0.7,
            ))
            .unwrap();

        assert_eq!(
            store.count_relationships_by_type("acme").unwrap(),
            vec![(RelationshipType::RelatedTo, 1), (RelationshipType::ResolvesTo, 1)],
            "{name}"
        );
        assert_eq!(
            store.count_relationships_by_type("globex").unwrap(),
            vec![(RelationshipType::ResolvesTo, 2)],
            "{name}"
        );
        assert!(store.count_relationships_by_type("initech").unwrap().is_empty(), "{name}");
    }
}

#[test]
fn target_summary_reports_edge_types_and_tools() {
    for (name, store) in backends() {
        let host = domain("acme.test");
        let ip = Entity::new(EntityType::IpAddress, "10.0.0.5", "nmap", 0.9);
        let mail = Entity::new(EntityType::Email, "ops@acme.test", "hunter", 0.6);
        for entity in [&host, &ip, &mail] {
            store.upsert_entity(entity, "acme").unwrap();
        }
        store
            .upsert_relationship(&Relationship::new(host.id.clone(), ip.id.clone(), RelationshipType::ResolvesTo, "dnsx", 0.9))
            .unwrap();
        store
            .upsert_relationship(&Relationship::new(mail.id.clone(), host.id.clone(), RelationshipType::BelongsTo, "hunter", 0.6))
            .unwrap();

        let summary = TargetSummary::build(store.as_ref(), "acme", 5).unwrap();
        assert_eq!(summary.total_entities, 3, "{name}");
        assert_eq!(summary.total_relationships, 2, "{name}");
        assert_eq!(
            summary.relationship_types,
            vec![(RelationshipType::BelongsTo, 1), (RelationshipType::ResolvesTo, 1)],
            "{name}"
        );
        assert_eq!(summary.sources, vec!["amass", "hunter", "nmap"], "{name}");
    }
}
