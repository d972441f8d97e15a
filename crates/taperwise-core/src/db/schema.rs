//! SQLite schema definition.

/// Stored in `PRAGMA user_version` once the schema is applied.
pub const SCHEMA_VERSION: i32 = 1;

/// History store schema.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Saved Calculations
-- ============================================================================

CREATE TABLE IF NOT EXISTS calculations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    summary TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '{}',          -- JSON object of string -> string
    fingerprint TEXT NOT NULL,                   -- SHA-256 of canonical result JSON
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_calculations_slug ON calculations(slug, created_at);
CREATE INDEX IF NOT EXISTS idx_calculations_fingerprint ON calculations(fingerprint);

-- FTS5 virtual table for history search
CREATE VIRTUAL TABLE IF NOT EXISTS calculations_fts USING fts5(
    name,
    summary,
    content='calculations',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS calculations_ai AFTER INSERT ON calculations BEGIN
    INSERT INTO calculations_fts(rowid, name, summary)
    VALUES (new.rowid, new.name, new.summary);
END;

CREATE TRIGGER IF NOT EXISTS calculations_ad AFTER DELETE ON calculations BEGIN
    INSERT INTO calculations_fts(calculations_fts, rowid, name, summary)
    VALUES ('delete', old.rowid, old.name, old.summary);
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_fts_trigger() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO calculations (id, name, slug, summary, fingerprint, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            [
                "c1",
                "Corticosteroid Taper",
                "steroid-taper",
                "prednisone 20 mg for 3 weeks: high risk",
                "abc",
                "2024-03-01T00:00:00Z",
            ],
        )
        .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM calculations_fts WHERE calculations_fts MATCH 'prednisone'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        conn.execute("DELETE FROM calculations WHERE id = 'c1'", []).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM calculations_fts WHERE calculations_fts MATCH 'prednisone'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
