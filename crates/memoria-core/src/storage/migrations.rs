//! Schema migrations for the SQLite-backed store.
//!
//! Each migration is a plain `up` SQL batch applied in order inside a
//! transaction, tracked in `schema_version`. There is one migration today;
//! the array exists so a future schema change has somewhere to land
//! without touching `Store::open`.

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: memory_item, embeddings, feedback, review schedule",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memory_item (
    id TEXT PRIMARY KEY,
    memory_type TEXT NOT NULL,
    content TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5,
    privacy_scope TEXT NOT NULL DEFAULT 'private',
    created_at TEXT NOT NULL,
    last_accessed TEXT,
    pinned INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    source TEXT,
    view_count INTEGER NOT NULL DEFAULT 0,
    cite_count INTEGER NOT NULL DEFAULT 0,
    edit_count INTEGER NOT NULL DEFAULT 0,
    soft_deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_memory_item_type ON memory_item(memory_type);
CREATE INDEX IF NOT EXISTS idx_memory_item_created ON memory_item(created_at);
CREATE INDEX IF NOT EXISTS idx_memory_item_pinned ON memory_item(pinned);
CREATE INDEX IF NOT EXISTS idx_memory_item_soft_deleted ON memory_item(soft_deleted);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_item_fts USING fts5(
    id,
    content,
    tags,
    content='memory_item',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memory_item_ai AFTER INSERT ON memory_item BEGIN
    INSERT INTO memory_item_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;

CREATE TRIGGER IF NOT EXISTS memory_item_ad AFTER DELETE ON memory_item BEGIN
    INSERT INTO memory_item_fts(memory_item_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
END;

CREATE TRIGGER IF NOT EXISTS memory_item_au AFTER UPDATE ON memory_item BEGIN
    INSERT INTO memory_item_fts(memory_item_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
    INSERT INTO memory_item_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;

CREATE TABLE IF NOT EXISTS memory_embedding (
    memory_id TEXT PRIMARY KEY REFERENCES memory_item(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    model_tag TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feedback_event (
    memory_id TEXT NOT NULL REFERENCES memory_item(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    score REAL NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_event_memory ON feedback_event(memory_id);
CREATE INDEX IF NOT EXISTS idx_feedback_event_timestamp ON feedback_event(timestamp);

CREATE TABLE IF NOT EXISTS review_schedule (
    memory_id TEXT PRIMARY KEY REFERENCES memory_item(id) ON DELETE CASCADE,
    interval_days REAL NOT NULL,
    last_review TEXT NOT NULL,
    next_review TEXT NOT NULL,
    last_recall_probability REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_review_schedule_next_review ON review_schedule(next_review);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// Applies every migration whose version is greater than the one already
/// recorded in `schema_version`, in order, each inside its own transaction.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current {
            conn.execute_batch(migration.up)?;
        }
    }

    Ok(())
}
