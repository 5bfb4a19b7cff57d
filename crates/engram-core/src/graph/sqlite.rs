//! SQLite Graph Store
//!
//! Nodes and directed edge pairs in two tables. Undirected semantics are
//! recovered at query time by matching edges in both directions. Overlap
//! scoring is token Jaccard over the normalized concept lists.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use super::GraphStore;
use crate::error::GraphError;
use crate::model::{
    content_digest, EdgeKind, GraphEdge, GraphNode, GraphStats, MemoryRecord, Neighborhood,
    RelatedCandidate,
};
use crate::policy::Category;
use crate::store::format_timestamp;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER NOT NULL UNIQUE,
    category TEXT NOT NULL,
    topic TEXT NOT NULL,
    record_date TEXT NOT NULL,
    content_digest TEXT NOT NULL,
    concepts_json TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_node INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    to_node INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    strength REAL NOT NULL DEFAULT 0.0,
    properties_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    UNIQUE(from_node, to_node, kind)
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_node);
"#;

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed graph store
pub struct SqliteGraphStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| GraphError::Init(e.to_string()))?;
            }
        }

        let writer = Connection::open(path)?;
        writer.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        reader.execute_batch("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn map_node(row: &Row<'_>) -> rusqlite::Result<GraphNode> {
        let category_raw: String = row.get("category")?;
        let category = Category::parse_name(&category_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown category: {category_raw}").into(),
            )
        })?;
        let concepts_json: String = row.get("concepts_json")?;
        Ok(GraphNode {
            node_id: row.get("id")?,
            record_id: row.get("record_id")?,
            category,
            topic: row.get("topic")?,
            date: row.get("record_date")?,
            content_digest: row.get("content_digest")?,
            concepts: serde_json::from_str(&concepts_json).unwrap_or_default(),
        })
    }

    fn all_nodes(conn: &Connection) -> rusqlite::Result<Vec<GraphNode>> {
        let mut stmt = conn.prepare(
            "SELECT id, record_id, category, topic, record_date, content_digest, concepts_json FROM nodes",
        )?;
        let rows = stmt.query_map([], Self::map_node)?;
        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    fn node_by_id(conn: &Connection, node_id: i64) -> rusqlite::Result<Option<GraphNode>> {
        conn.query_row(
            "SELECT id, record_id, category, topic, record_date, content_digest, concepts_json
             FROM nodes WHERE id = ?1",
            [node_id],
            Self::map_node,
        )
        .optional()
    }

    /// Edges touching any of the given nodes, in either direction
    fn edges_touching(
        conn: &Connection,
        node_ids: &HashSet<i64>,
        kinds: Option<&[EdgeKind]>,
    ) -> rusqlite::Result<Vec<GraphEdge>> {
        let mut stmt =
            conn.prepare("SELECT from_node, to_node, kind, strength FROM edges")?;
        let rows = stmt.query_map([], |row| {
            let kind_raw: String = row.get("kind")?;
            Ok((
                row.get::<_, i64>("from_node")?,
                row.get::<_, i64>("to_node")?,
                kind_raw,
                row.get::<_, f64>("strength")?,
            ))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (from_node, to_node, kind_raw, strength) = row?;
            let Some(kind) = EdgeKind::parse_name(&kind_raw) else {
                continue;
            };
            if let Some(wanted) = kinds {
                if !wanted.contains(&kind) {
                    continue;
                }
            }
            if node_ids.contains(&from_node) || node_ids.contains(&to_node) {
                edges.push(GraphEdge {
                    from_node,
                    to_node,
                    kind,
                    strength,
                });
            }
        }
        Ok(edges)
    }
}

/// Jaccard overlap of two normalized concept lists
fn overlap_score(a: &[String], b: &[String]) -> f64 {
    let left: HashSet<&str> = a.iter().map(|s| s.as_str()).collect();
    let right: HashSet<&str> = b.iter().map(|s| s.as_str()).collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

fn normalize(seeds: &[String]) -> Vec<String> {
    let mut out: Vec<String> = seeds
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

// ============================================================================
// GRAPH STORE IMPL
// ============================================================================

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_node(
        &self,
        record: &MemoryRecord,
        concepts: &[String],
    ) -> Result<i64, GraphError> {
        let concepts = normalize(concepts);
        let concepts_json = serde_json::to_string(&concepts).unwrap_or_else(|_| "[]".into());
        let digest = content_digest(&record.content);

        let conn = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO nodes (record_id, category, topic, record_date, content_digest, concepts_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(record_id) DO UPDATE SET
                 category = excluded.category,
                 topic = excluded.topic,
                 record_date = excluded.record_date,
                 content_digest = excluded.content_digest,
                 concepts_json = excluded.concepts_json",
            params![
                record.id,
                record.category.as_str(),
                record.topic,
                record.date,
                digest,
                concepts_json,
                format_timestamp(Utc::now()),
            ],
        )?;

        let node_id: i64 = conn.query_row(
            "SELECT id FROM nodes WHERE record_id = ?1",
            [record.id],
            |row| row.get(0),
        )?;
        Ok(node_id)
    }

    async fn link(
        &self,
        from_node: i64,
        to_node: i64,
        kind: EdgeKind,
        strength: f64,
        properties: Option<serde_json::Value>,
    ) -> Result<bool, GraphError> {
        let properties_json = properties
            .map(|v| v.to_string())
            .unwrap_or_else(|| "{}".to_string());

        let conn = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        // OR IGNORE: the first writer of an edge keeps its properties
        let changed = conn.execute(
            "INSERT OR IGNORE INTO edges
             (from_node, to_node, kind, strength, properties_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                from_node,
                to_node,
                kind.as_str(),
                strength,
                properties_json,
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(changed > 0)
    }

    async fn find_related(
        &self,
        record: &MemoryRecord,
        seeds: &[String],
    ) -> Result<Vec<RelatedCandidate>, GraphError> {
        let seeds = normalize(seeds);
        let nodes = {
            let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());
            Self::all_nodes(&conn)?
        };

        let mut candidates: Vec<RelatedCandidate> = nodes
            .into_iter()
            .filter(|node| node.record_id != record.id)
            .filter_map(|node| {
                let overlap = overlap_score(&seeds, &node.concepts);
                (overlap > 0.0).then_some(RelatedCandidate { node, overlap })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.overlap
                .partial_cmp(&a.overlap)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates)
    }

    async fn search_by_concepts(
        &self,
        seeds: &[String],
        limit: usize,
    ) -> Result<Vec<GraphNode>, GraphError> {
        let seeds = normalize(seeds);
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let seed_set: HashSet<&str> = seeds.iter().map(|s| s.as_str()).collect();

        let nodes = {
            let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());
            Self::all_nodes(&conn)?
        };

        let mut scored: Vec<(usize, GraphNode)> = nodes
            .into_iter()
            .filter_map(|node| {
                let shared = node
                    .concepts
                    .iter()
                    .filter(|c| seed_set.contains(c.as_str()))
                    .count();
                (shared > 0).then_some((shared, node))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, n)| n).collect())
    }

    async fn neighborhood(
        &self,
        node_id: i64,
        depth: usize,
        kinds: Option<&[EdgeKind]>,
    ) -> Result<Neighborhood, GraphError> {
        let depth = depth.clamp(1, 3);
        let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());

        let center =
            Self::node_by_id(&conn, node_id)?.ok_or(GraphError::NodeNotFound(node_id))?;

        let mut visited: HashSet<i64> = HashSet::from([node_id]);
        let mut frontier: VecDeque<(i64, usize)> = VecDeque::from([(node_id, 0)]);
        let mut members = Vec::new();
        let mut relationships = Vec::new();
        let mut seen_edges: HashSet<(i64, i64, EdgeKind)> = HashSet::new();

        while let Some((current, hop)) = frontier.pop_front() {
            if hop == depth {
                continue;
            }
            let edges = Self::edges_touching(&conn, &HashSet::from([current]), kinds)?;
            for edge in edges {
                let neighbor = if edge.from_node == current {
                    edge.to_node
                } else {
                    edge.from_node
                };
                // Directed pairs, undirected semantics: canonical key dedupes
                let key = (
                    edge.from_node.min(edge.to_node),
                    edge.from_node.max(edge.to_node),
                    edge.kind,
                );
                if seen_edges.insert(key) {
                    relationships.push(edge);
                }
                if visited.insert(neighbor) {
                    if let Some(node) = Self::node_by_id(&conn, neighbor)? {
                        members.push(node);
                    }
                    frontier.push_back((neighbor, hop + 1));
                }
            }
        }

        Ok(Neighborhood {
            center,
            members,
            relationships,
            depth,
        })
    }

    async fn node_for_record(&self, record_id: i64) -> Result<Option<GraphNode>, GraphError> {
        let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        let node = conn
            .query_row(
                "SELECT id, record_id, category, topic, record_date, content_digest, concepts_json
                 FROM nodes WHERE record_id = ?1",
                [record_id],
                Self::map_node,
            )
            .optional()?;
        Ok(node)
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        let conn = self.reader.lock().unwrap_or_else(|e| e.into_inner());

        let node_count: u64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| {
            row.get::<_, i64>(0)
        })? as u64;
        let edge_count: u64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| {
            row.get::<_, i64>(0)
        })? as u64;

        let mut edges_by_type = HashMap::new();
        {
            let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?;
            for row in rows {
                let (kind, count) = row?;
                edges_by_type.insert(kind, count);
            }
        }

        let mut top_connected = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT n.topic FROM nodes n
                 JOIN (
                     SELECT node, COUNT(*) AS degree FROM (
                         SELECT from_node AS node FROM edges
                         UNION ALL
                         SELECT to_node AS node FROM edges
                     ) GROUP BY node
                 ) d ON d.node = n.id
                 ORDER BY d.degree DESC, n.id ASC
                 LIMIT 5",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                top_connected.push(row?);
            }
        }

        Ok(GraphStats {
            node_count,
            edge_count,
            edges_by_type,
            top_connected,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
