// 🗂️ Stage Registry - ordered buckets a document can occupy
//
// Stages are the columns of the document board. Besides the stored stages
// there is always the implicit "Unassigned" bucket (documents with no stage).
//
// - order need not be contiguous; display order is a stable sort by order
// - new stages are appended after every existing stage
// - deleting a stage orphans its documents, history is left untouched

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, new_id, now, parse_timestamp};
use crate::error::{require_name, DocketError, Result};

// ============================================================================
// STAGE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,

    /// Display label (not unique)
    pub name: String,

    /// Column position
    pub order: i64,

    pub created_at: DateTime<Utc>,
}

impl Stage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(3)?;
        Ok(Stage {
            id: row.get(0)?,
            name: row.get(1)?,
            order: row.get(2)?,
            created_at: parse_timestamp(3, &created_at)?,
        })
    }
}

/// Result of removing a stage from the registry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRemoval {
    pub stage: Stage,
    /// Documents that pointed at the stage and are now unassigned
    pub orphaned: usize,
    /// Cases owning the orphaned documents
    pub affected_cases: Vec<String>,
}

// ============================================================================
// STAGE REGISTRY
// ============================================================================

/// Registry of document stages, backed by the `document_stages` table.
///
/// Borrowing the connection lets callers run registry operations inside an
/// open `rusqlite::Transaction` (it derefs to `Connection`).
pub struct StageRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> StageRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        StageRegistry { conn }
    }

    /// All stages in display order (ties keep creation order)
    pub fn list(&self) -> Result<Vec<Stage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, sort_order, created_at
             FROM document_stages
             ORDER BY sort_order, seq",
        )?;
        let stages = stmt
            .query_map([], Stage::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stages)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM document_stages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn find(&self, id: &str) -> Result<Option<Stage>> {
        let stage = self
            .conn
            .query_row(
                "SELECT id, name, sort_order, created_at FROM document_stages WHERE id = ?1",
                [id],
                Stage::from_row,
            )
            .optional()?;
        Ok(stage)
    }

    pub fn get(&self, id: &str) -> Result<Stage> {
        self.find(id)?
            .ok_or_else(|| DocketError::not_found("document stage", id))
    }

    /// Order value that places a new stage after every existing one.
    ///
    /// Equals the stage count while orders are contiguous from zero.
    pub fn next_order(&self) -> Result<i64> {
        let (count, last): (i64, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), MAX(sort_order) FROM document_stages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let after_last = match last {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| DocketError::validation("order", "no order left after the last stage"))?,
            None => 0,
        };
        Ok(count.max(after_last))
    }

    /// Append a stage at the end of the board
    pub fn add(&self, name: &str) -> Result<Stage> {
        let order = self.next_order()?;
        self.create(name, order)
    }

    /// Create a stage with a caller chosen order
    pub fn create(&self, name: &str, order: i64) -> Result<Stage> {
        if order == i64::MAX {
            return Err(DocketError::validation(
                "order",
                "order must leave room for stages appended later",
            ));
        }
        let stage = Stage {
            id: new_id(),
            name: require_name("name", name)?,
            order,
            created_at: now(),
        };

        self.conn.execute(
            "INSERT INTO document_stages (id, name, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                stage.id,
                stage.name,
                stage.order,
                format_timestamp(&stage.created_at),
            ],
        )?;

        Ok(stage)
    }

    /// Remove a stage; its documents fall back to "Unassigned"
    pub fn delete(&self, id: &str) -> Result<StageRemoval> {
        let stage = self.get(id)?;

        let affected_cases = {
            let mut stmt = self
                .conn
                .prepare("SELECT DISTINCT case_id FROM documents WHERE stage_id = ?1 ORDER BY case_id")?;
            let cases = stmt
                .query_map([id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            cases
        };

        let orphaned = self.conn.execute(
            "UPDATE documents SET stage_id = NULL, updated_at = ?1 WHERE stage_id = ?2",
            params![format_timestamp(&now()), id],
        )?;
        self.conn
            .execute("DELETE FROM document_stages WHERE id = ?1", [id])?;

        Ok(StageRemoval {
            stage,
            orphaned,
            affected_cases,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
