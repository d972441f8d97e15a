//! Saved calculation history operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::CalculationRecord;

const SELECT_COLUMNS: &str =
    "SELECT id, name, slug, summary, details, fingerprint, created_at FROM calculations";

impl Database {
    /// Save a calculation record. Saving the same ID twice is a constraint error.
    pub fn save_calculation(&self, record: &CalculationRecord) -> DbResult<()> {
        let details_json = serde_json::to_string(&record.details)?;

        let result = self.conn.execute(
            r#"
            INSERT INTO calculations (id, name, slug, summary, details, fingerprint, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.name,
                record.slug,
                record.summary,
                details_json,
                record.fingerprint,
                record.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::Constraint(format!("Calculation {} already saved", record.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a calculation record by ID.
    pub fn get_calculation(&self, id: &str) -> DbResult<Option<CalculationRecord>> {
        let row = self
            .conn
            .query_row(&format!("{} WHERE id = ?", SELECT_COLUMNS), [id], read_row)
            .optional()?;

        row.map(|r| r.try_into()).transpose()
    }

    /// List records, newest first. `None` lists every calculator.
    pub fn list_calculations(&self, slug: Option<&str>) -> DbResult<Vec<CalculationRecord>> {
        let mut records = Vec::new();

        match slug {
            Some(slug) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE slug = ? ORDER BY created_at DESC, rowid DESC",
                    SELECT_COLUMNS
                ))?;
                for row in stmt.query_map([slug], read_row)? {
                    records.push(row?.try_into()?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} ORDER BY created_at DESC, rowid DESC",
                    SELECT_COLUMNS
                ))?;
                for row in stmt.query_map([], read_row)? {
                    records.push(row?.try_into()?);
                }
            }
        }

        Ok(records)
    }

    /// Full-text search over record names and summaries (BM25 ranking).
    pub fn search_calculations(&self, query: &str, limit: usize) -> DbResult<Vec<CalculationRecord>> {
        let escaped = escape_fts_query(query);
        if escaped.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.name, c.slug, c.summary, c.details, c.fingerprint, c.created_at
            FROM calculations c
            JOIN calculations_fts fts ON c.rowid = fts.rowid
            WHERE calculations_fts MATCH ?
            ORDER BY bm25(calculations_fts)
            LIMIT ?
            "#,
        )?;

        let mut records = Vec::new();
        for row in stmt.query_map(params![escaped, limit as i64], read_row)? {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Delete a calculation record. Returns false if it did not exist.
    pub fn delete_calculation(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM calculations WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct CalculationRow {
    id: String,
    name: String,
    slug: String,
    summary: String,
    details: String,
    fingerprint: String,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CalculationRow> {
    Ok(CalculationRow {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        summary: row.get(3)?,
        details: row.get(4)?,
        fingerprint: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl TryFrom<CalculationRow> for CalculationRecord {
    type Error = DbError;

    fn try_from(row: CalculationRow) -> Result<Self, Self::Error> {
        Ok(CalculationRecord {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            summary: row.summary,
            details: serde_json::from_str(&row.details)?,
            fingerprint: row.fingerprint,
        })
    }
}

/// Strip FTS5 punctuation and quote each word as a prefix phrase, so words
/// like AND, OR, NOT and NEAR are matched as text rather than parsed as operators.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}
