//! SQLite-backed store: the only module that touches a `Connection`.
//!
//! Uses separate reader/writer connections behind their own mutexes so
//! methods take `&self`, not `&mut self`, and `Store` is `Send + Sync` —
//! callers hold it behind a plain `Arc`, never an `Arc<Mutex<Store>>>`.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::memory::{FeedbackEvent, FeedbackKind, Memory, MemoryType, PrivacyScope, ReviewSchedule};
use crate::search::TextCandidate;

pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

fn configure_connection(conn: &Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -32000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}

impl Store {
    pub fn open(db_path: Option<PathBuf>, busy_timeout_ms: u64) -> CoreResult<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = directories::ProjectDirs::from("dev", "memoria", "core")
                    .ok_or_else(|| CoreError::internal("could not determine project directories"))?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                data_dir.join("memoria.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        configure_connection(&writer_conn, busy_timeout_ms)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        configure_connection(&reader_conn, busy_timeout_ms)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        let writer_conn = Connection::open_in_memory()?;
        writer_conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        super::migrations::apply_migrations(&writer_conn)?;
        // A single shared in-memory connection for both roles; a second
        // `:memory:` connection would see a distinct empty database.
        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn writer(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().expect("store writer mutex poisoned")
    }

    fn reader_for_in_memory(&self) -> bool {
        // When running on a shared in-memory connection the reader handle
        // is a distinct empty database, so all reads must also go through
        // the writer connection. Detected by checking whether the reader
        // can see the schema_version row the writer wrote.
        self.reader
            .lock()
            .expect("store reader mutex poisoned")
            .query_row("SELECT 1 FROM schema_version LIMIT 1", [], |_| Ok(()))
            .is_err()
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> CoreResult<T> {
        if self.reader_for_in_memory() {
            Ok(f(&self.writer())?)
        } else {
            let reader = self.reader.lock().expect("store reader mutex poisoned");
            Ok(f(&reader)?)
        }
    }

    pub fn insert_memory(
        &self,
        memory_type: MemoryType,
        content: &str,
        importance: f64,
        privacy_scope: PrivacyScope,
        tags: &[String],
        source: Option<&str>,
    ) -> CoreResult<Memory> {
        let id = format!("mem_{}", Uuid::new_v4());
        let now = Utc::now();
        let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());

        self.writer().execute(
            "INSERT INTO memory_item (
                id, memory_type, content, importance, privacy_scope, created_at,
                last_accessed, pinned, tags, source, view_count, cite_count, edit_count, soft_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, ?7, ?8, 0, 0, 0, 0)",
            params![
                id,
                memory_type.as_str(),
                content,
                importance,
                privacy_scope.as_str(),
                now.to_rfc3339(),
                tags_json,
                source,
            ],
        )?;

        self.get_memory(&id)?
            .ok_or_else(|| CoreError::internal("inserted memory not found on readback"))
    }

    pub fn get_memory(&self, id: &str) -> CoreResult<Option<Memory>> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT * FROM memory_item WHERE id = ?1",
                params![id],
                row_to_memory,
            )
            .optional()
        })
    }

    /// Live (non soft-deleted) memories, used to build ranking/forgetting
    /// snapshots and lexical search candidates.
    pub fn list_live_memories(&self) -> CoreResult<Vec<Memory>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM memory_item WHERE soft_deleted = 0")?;
            let rows = stmt.query_map([], row_to_memory)?;
            rows.collect()
        })
    }

    /// Lexical search candidates via FTS5 `bm25()`, one row per match.
    pub fn text_search_candidates(&self, fts_match: &str, limit: usize) -> CoreResult<Vec<TextCandidate>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, bm25(memory_item_fts) AS score, m.tags, m.content
                 FROM memory_item_fts
                 JOIN memory_item m ON m.id = memory_item_fts.id
                 WHERE memory_item_fts MATCH ?1 AND m.soft_deleted = 0
                 ORDER BY score
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![fts_match, limit as i64], |row| {
                let tags_json: String = row.get(2)?;
                let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
                Ok(TextCandidate {
                    memory_id: row.get(0)?,
                    bm25_raw: row.get(1)?,
                    tags,
                    content: row.get(3)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn upsert_embedding(&self, memory_id: &str, vector: &[f32], model_tag: &str) -> CoreResult<()> {
        let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        self.writer().execute(
            "INSERT INTO memory_embedding (memory_id, embedding, dimension, model_tag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(memory_id) DO UPDATE SET
                embedding = excluded.embedding,
                dimension = excluded.dimension,
                model_tag = excluded.model_tag,
                created_at = excluded.created_at",
            params![memory_id, bytes, vector.len() as i64, model_tag, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_embedding(&self, memory_id: &str) -> CoreResult<Option<Vec<f32>>> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT embedding FROM memory_embedding WHERE memory_id = ?1",
                params![memory_id],
                |row| {
                    let bytes: Vec<u8> = row.get(0)?;
                    Ok(bytes_to_vector(&bytes))
                },
            )
            .optional()
        })
    }

    pub fn all_embeddings(&self) -> CoreResult<Vec<(String, Vec<f32>)>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.memory_id, e.embedding FROM memory_embedding e
                 JOIN memory_item m ON m.id = e.memory_id
                 WHERE m.soft_deleted = 0",
            )?;
            let rows = stmt.query_map([], |row| {
                let bytes: Vec<u8> = row.get(1)?;
                Ok((row.get(0)?, bytes_to_vector(&bytes)))
            })?;
            rows.collect()
        })
    }

    pub fn set_pinned(&self, id: &str, pinned: bool) -> CoreResult<()> {
        let changed = self.writer().execute(
            "UPDATE memory_item SET pinned = ?1 WHERE id = ?2 AND soft_deleted = 0",
            params![pinned, id],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("memory {id} not found")));
        }
        Ok(())
    }

    pub fn soft_delete(&self, id: &str) -> CoreResult<()> {
        let changed = self.writer().execute(
            "UPDATE memory_item SET soft_deleted = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("memory {id} not found")));
        }
        Ok(())
    }

    pub fn hard_delete(&self, id: &str) -> CoreResult<()> {
        let changed = self.writer().execute("DELETE FROM memory_item WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("memory {id} not found")));
        }
        Ok(())
    }

    pub fn touch_last_accessed(&self, id: &str) -> CoreResult<()> {
        self.writer().execute(
            "UPDATE memory_item SET last_accessed = ?1, view_count = view_count + 1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    pub fn append_feedback(&self, memory_id: &str, kind: FeedbackKind, score: f64) -> CoreResult<()> {
        let exists: bool = self
            .with_reader(|conn| {
                conn.query_row(
                    "SELECT 1 FROM memory_item WHERE id = ?1 AND soft_deleted = 0",
                    params![memory_id],
                    |_| Ok(()),
                )
                .optional()
            })?
            .is_some();
        if !exists {
            return Err(CoreError::not_found(format!("memory {memory_id} not found")));
        }

        let now = Utc::now();
        let writer = self.writer();
        writer.execute(
            "INSERT INTO feedback_event (memory_id, kind, score, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![memory_id, kind.as_str(), score, now.to_rfc3339()],
        )?;

        let counter_column = match kind {
            FeedbackKind::Cited => Some("cite_count"),
            FeedbackKind::Edited => Some("edit_count"),
            _ => None,
        };
        if let Some(column) = counter_column {
            writer.execute(
                &format!("UPDATE memory_item SET {column} = {column} + 1 WHERE id = ?1"),
                params![memory_id],
            )?;
        }

        Ok(())
    }

    pub fn feedback_events_for(&self, memory_id: &str) -> CoreResult<Vec<FeedbackEvent>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT memory_id, kind, score, timestamp FROM feedback_event
                 WHERE memory_id = ?1 ORDER BY timestamp DESC",
            )?;
            let rows = stmt.query_map(params![memory_id], |row| {
                let kind_str: String = row.get(1)?;
                let timestamp_str: String = row.get(3)?;
                Ok(FeedbackEvent {
                    memory_id: row.get(0)?,
                    kind: FeedbackKind::parse_name(&kind_str).unwrap_or(FeedbackKind::Viewed),
                    score: row.get(2)?,
                    timestamp: parse_timestamp(&timestamp_str).unwrap_or(Utc::now()),
                })
            })?;
            rows.collect()
        })
    }

    pub fn upsert_review_schedule(&self, schedule: &ReviewSchedule) -> CoreResult<()> {
        self.writer().execute(
            "INSERT INTO review_schedule (memory_id, interval_days, last_review, next_review, last_recall_probability)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(memory_id) DO UPDATE SET
                interval_days = excluded.interval_days,
                last_review = excluded.last_review,
                next_review = excluded.next_review,
                last_recall_probability = excluded.last_recall_probability",
            params![
                schedule.memory_id,
                schedule.interval_days,
                schedule.last_review.to_rfc3339(),
                schedule.next_review.to_rfc3339(),
                schedule.last_recall_probability,
            ],
        )?;
        Ok(())
    }

    pub fn get_review_schedule(&self, memory_id: &str) -> CoreResult<Option<ReviewSchedule>> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT memory_id, interval_days, last_review, next_review, last_recall_probability
                 FROM review_schedule WHERE memory_id = ?1",
                params![memory_id],
                row_to_review_schedule,
            )
            .optional()
        })
    }

    pub fn due_for_review(&self, now: DateTime<Utc>) -> CoreResult<Vec<ReviewSchedule>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT memory_id, interval_days, last_review, next_review, last_recall_probability
                 FROM review_schedule WHERE next_review <= ?1",
            )?;
            let rows = stmt.query_map(params![now.to_rfc3339()], row_to_review_schedule)?;
            rows.collect()
        })
    }
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let memory_type_str: String = row.get("memory_type")?;
    let privacy_scope_str: String = row.get("privacy_scope")?;
    let tags_json: String = row.get("tags")?;
    let created_at_str: String = row.get("created_at")?;
    let last_accessed_str: Option<String> = row.get("last_accessed")?;

    Ok(Memory {
        id: row.get("id")?,
        memory_type: MemoryType::parse_name(&memory_type_str).unwrap_or(MemoryType::Semantic),
        content: row.get("content")?,
        importance: row.get("importance")?,
        privacy_scope: PrivacyScope::parse_name(&privacy_scope_str).unwrap_or_default(),
        created_at: parse_timestamp(&created_at_str).unwrap_or_else(Utc::now),
        last_accessed: last_accessed_str.and_then(|s| parse_timestamp(&s)),
        pinned: row.get::<_, i64>("pinned")? != 0,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        source: row.get("source")?,
        view_count: row.get("view_count")?,
        cite_count: row.get("cite_count")?,
        edit_count: row.get("edit_count")?,
        soft_deleted: row.get::<_, i64>("soft_deleted")? != 0,
    })
}

fn row_to_review_schedule(row: &rusqlite::Row) -> rusqlite::Result<ReviewSchedule> {
    let last_review_str: String = row.get(2)?;
    let next_review_str: String = row.get(3)?;
    Ok(ReviewSchedule {
        memory_id: row.get(0)?,
        interval_days: row.get(1)?,
        last_review: parse_timestamp(&last_review_str).unwrap_or_else(Utc::now),
        next_review: parse_timestamp(&next_review_str).unwrap_or_else(Utc::now),
        last_recall_probability: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Store {
        Store::open_in_memory().expect("open in-memory store")
    }

    #[test]
    fn insert_then_get_round_trips_a_memory() {
        let store = test_store();
        let tags = vec!["rust".to_string(), "async".to_string()];
        let inserted = store
            .insert_memory(
                MemoryType::Semantic,
                "tokio runtimes are multi-threaded by default",
                0.7,
                PrivacyScope::Private,
                &tags,
                Some("test"),
            )
            .unwrap();
        let fetched = store.get_memory(&inserted.id).unwrap().unwrap();
        assert_eq!(fetched.content, inserted.content);
        assert_eq!(fetched.tags, tags);
        assert!(!fetched.pinned);
    }

    #[test]
    fn soft_deleted_memory_is_excluded_from_live_list() {
        let store = test_store();
        let memory = store
            .insert_memory(MemoryType::Working, "scratch note", 0.2, PrivacyScope::Private, &[], None)
            .unwrap();
        store.soft_delete(&memory.id).unwrap();
        let live = store.list_live_memories().unwrap();
        assert!(live.iter().all(|m| m.id != memory.id));
    }

    #[test]
    fn hard_delete_of_missing_id_is_not_found() {
        let store = test_store();
        let err = store.hard_delete("does-not-exist").unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn text_search_finds_inserted_content() {
        let store = test_store();
        store
            .insert_memory(
                MemoryType::Episodic,
                "the deploy pipeline failed at the canary stage",
                0.5,
                PrivacyScope::Private,
                &[],
                None,
            )
            .unwrap();
        let candidates = store.text_search_candidates("\"canary\"*", 10).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn embedding_round_trips_through_blob_storage() {
        let store = test_store();
        let memory = store
            .insert_memory(MemoryType::Semantic, "vector storage test", 0.5, PrivacyScope::Private, &[], None)
            .unwrap();
        let vector = vec![0.1f32, 0.2, 0.3];
        store.upsert_embedding(&memory.id, &vector, "lexical-v1").unwrap();
        let fetched = store.get_embedding(&memory.id).unwrap().unwrap();
        assert_eq!(fetched, vector);
    }

    #[test]
    fn feedback_on_missing_memory_is_not_found() {
        let store = test_store();
        let err = store
            .append_feedback("does-not-exist", FeedbackKind::Helpful, 1.0)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn cited_feedback_increments_cite_count() {
        let store = test_store();
        let memory = store
            .insert_memory(MemoryType::Semantic, "citation test", 0.5, PrivacyScope::Private, &[], None)
            .unwrap();
        store.append_feedback(&memory.id, FeedbackKind::Cited, 1.0).unwrap();
        let fetched = store.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(fetched.cite_count, 1);
    }
}
