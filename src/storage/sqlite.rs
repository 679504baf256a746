//! SQLite storage backend

use super::traits::{CorrelationStore, OpenStore, StoreError, StoreResult};
use crate::graph::{Containment, Entity, EntityId, EntityType, Relationship, RelationshipType, Target};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Columns of an `entities` row, in SELECT order
type EntityRow = (String, String, String, String, f64, String, String);

/// Columns of a `relationships` row, in SELECT order
type RelationshipRow = (String, String, String, String, f64, String, String);

const ENTITY_COLUMNS: &str = "e.id, e.entity_type, e.value, e.source, e.confidence, e.timestamp, e.attributes_json";
const RELATIONSHIP_COLUMNS: &str =
    "r.source_id, r.target_id, r.rel_type, r.source, r.confidence, r.timestamp, r.attributes_json";

/// SQLite-backed correlation store
///
/// One database file holds targets, entities, the target containment edges
/// and typed relationships. Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS targets (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            -- Entities are global by id; targets reach them through `contains`
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                value TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence REAL NOT NULL,
                timestamp TEXT NOT NULL,
                attributes_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entities_type
                ON entities(entity_type);

            CREATE TABLE IF NOT EXISTS contains (
                target TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                source TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (target, entity_id),
                FOREIGN KEY (target) REFERENCES targets(name) ON DELETE CASCADE,
                FOREIGN KEY (entity_id) REFERENCES entities(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_contains_entity
                ON contains(entity_id);

            CREATE TABLE IF NOT EXISTS relationships (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                rel_type TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence REAL NOT NULL,
                timestamp TEXT NOT NULL,
                attributes_json TEXT NOT NULL,
                PRIMARY KEY (source_id, target_id, rel_type),
                FOREIGN KEY (source_id) REFERENCES entities(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES entities(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_target
                ON relationships(target_id);

            PRAGMA foreign_keys = ON;

            -- Readers (summary queries) do not block the merge stage
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Lock the connection; a poisoned lock means a writer panicked mid-call
    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Connectivity(format!("connection lock poisoned: {}", e)))
    }

    fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| StoreError::DateParse(e.to_string()))?
            .with_timezone(&Utc))
    }

    fn read_entity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn row_to_entity(row: EntityRow) -> StoreResult<Entity> {
        let (id, entity_type, value, source, confidence, timestamp, attributes_json) = row;
        Ok(Entity {
            id: EntityId::from_string(id),
            entity_type: EntityType::parse_lenient(&entity_type),
            value,
            source,
            confidence,
            timestamp: Self::parse_timestamp(&timestamp)?,
            attributes: serde_json::from_str(&attributes_json)?,
        })
    }

    fn read_relationship_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationshipRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn row_to_relationship(row: RelationshipRow) -> StoreResult<Relationship> {
        let (source_id, target_id, rel_type, source, confidence, timestamp, attributes_json) = row;
        Ok(Relationship {
            source_id: EntityId::from_string(source_id),
            target_id: EntityId::from_string(target_id),
            rel_type: rel_type.parse().unwrap_or_default(),
            source,
            confidence,
            timestamp: Self::parse_timestamp(&timestamp)?,
            attributes: serde_json::from_str(&attributes_json)?,
        })
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CorrelationStore for SqliteStore {
    // === Target Operations ===

    fn upsert_target(&self, name: &str) -> StoreResult<Target> {
        let conn = self.conn()?;
        let fresh = Target::new(name);

        // DO NOTHING keeps the original created_at on re-runs
        conn.execute(
            "INSERT INTO targets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
            params![fresh.name, fresh.created_at.to_rfc3339()],
        )?;

        let created_at: String = conn.query_row(
            "SELECT created_at FROM targets WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        Ok(Target {
            name: name.to_string(),
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    // === Entity Operations ===

    fn upsert_entity(&self, entity: &Entity, target: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let attributes_json = serde_json::to_string(&entity.attributes)?;
        let timestamp = entity.timestamp.to_rfc3339();

        // Node and containment edge land together or not at all
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO targets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
            params![target, Utc::now().to_rfc3339()],
        )?;
        tx.execute(
            r#"
            INSERT INTO entities (id, entity_type, value, source, confidence, timestamp, attributes_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                entity_type = excluded.entity_type,
                value = excluded.value,
                source = excluded.source,
                confidence = excluded.confidence,
                timestamp = excluded.timestamp,
                attributes_json = excluded.attributes_json
            "#,
            params![
                entity.id.as_str(),
                entity.entity_type.as_str(),
                entity.value,
                entity.source,
                entity.confidence,
                timestamp,
                attributes_json,
            ],
        )?;
        tx.execute(
            r#"
            INSERT INTO contains (target, entity_id, source, timestamp)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(target, entity_id) DO UPDATE SET
                source = excluded.source,
                timestamp = excluded.timestamp
            "#,
            params![target, entity.id.as_str(), entity.source, timestamp],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn find_entity_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM entities e WHERE e.id = ?1", ENTITY_COLUMNS),
                params![id.as_str()],
                Self::read_entity_row,
            )
            .optional()?;

        row.map(Self::row_to_entity).transpose()
    }

    fn query_entities_by_target(&self, target: &str) -> StoreResult<Vec<Entity>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entities e
             JOIN contains c ON c.entity_id = e.id
             WHERE c.target = ?1
             ORDER BY e.id",
            ENTITY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![target], Self::read_entity_row)?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(Self::row_to_entity(row?)?);
        }
        Ok(entities)
    }

    fn count_entities_by_type(&self, target: &str) -> StoreResult<Vec<(EntityType, usize)>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT e.entity_type, COUNT(*) AS n FROM entities e
             JOIN contains c ON c.entity_id = e.id
             WHERE c.target = ?1
             GROUP BY e.entity_type
             ORDER BY n DESC, e.entity_type ASC",
        )?;
        let counts = stmt
            .query_map(params![target], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .map(|r| r.map(|(t, n)| (EntityType::parse_lenient(&t), n as usize)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn query_containments(&self, target: &str) -> StoreResult<Vec<Containment>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT entity_id, source, timestamp FROM contains WHERE target = ?1 ORDER BY entity_id",
        )?;
        let rows = stmt.query_map(params![target], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (entity_id, source, timestamp) = row?;
            edges.push(Containment {
                target: target.to_string(),
                entity_id: EntityId::from_string(entity_id),
                source,
                timestamp: Self::parse_timestamp(&timestamp)?,
            });
        }
        Ok(edges)
    }

    // === Relationship Operations ===

    fn find_relationship(
        &self,
        source_id: &EntityId,
        target_id: &EntityId,
        rel_type: RelationshipType,
    ) -> StoreResult<Option<Relationship>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM relationships r
                     WHERE r.source_id = ?1 AND r.target_id = ?2 AND r.rel_type = ?3",
                    RELATIONSHIP_COLUMNS
                ),
                params![source_id.as_str(), target_id.as_str(), rel_type.as_str()],
                Self::read_relationship_row,
            )
            .optional()?;

        row.map(Self::row_to_relationship).transpose()
    }

    fn upsert_relationship(&self, relationship: &Relationship) -> StoreResult<()> {
        let conn = self.conn()?;
        let attributes_json = serde_json::to_string(&relationship.attributes)?;

        conn.execute(
            r#"
            INSERT INTO relationships (source_id, target_id, rel_type, source, confidence, timestamp, attributes_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(source_id, target_id, rel_type) DO UPDATE SET
                source = excluded.source,
                confidence = excluded.confidence,
                timestamp = excluded.timestamp,
                attributes_json = excluded.attributes_json
            "#,
            params![
                relationship.source_id.as_str(),
                relationship.target_id.as_str(),
                relationship.rel_type.as_str(),
                relationship.source,
                relationship.confidence,
                relationship.timestamp.to_rfc3339(),
                attributes_json,
            ],
        )?;

        Ok(())
    }

    fn query_relationships_by_target(&self, target: &str) -> StoreResult<Vec<Relationship>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM relationships r
             JOIN contains c ON c.entity_id = r.source_id
             WHERE c.target = ?1
             ORDER BY r.source_id, r.target_id, r.rel_type",
            RELATIONSHIP_COLUMNS
        ))?;
        let rows = stmt.query_map(params![target], Self::read_relationship_row)?;

        let mut relationships = Vec::new();
        for row in rows {
            relationships.push(Self::row_to_relationship(row?)?);
        }
        Ok(relationships)
    }

    fn count_relationships_by_type(&self, target: &str) -> StoreResult<Vec<(RelationshipType, usize)>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT r.rel_type, COUNT(*) AS n FROM relationships r
             JOIN contains c ON c.entity_id = r.source_id
             WHERE c.target = ?1
             GROUP BY r.rel_type
             ORDER BY n DESC, r.rel_type ASC",
        )?;
        let counts = stmt
            .query_map(params![target], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .map(|r| r.map(|(t, n)| (t.parse::<RelationshipType>().unwrap_or_default(), n as usize)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}
