// Document Type - tag attached to documents ("Affidavit", "Power of Attorney", ...)

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, new_id, now, parse_timestamp};
use crate::error::{require_name, DocketError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentType {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(2)?;
        Ok(DocumentType {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: parse_timestamp(2, &created_at)?,
        })
    }
}

pub fn list_document_types(conn: &Connection) -> Result<Vec<DocumentType>> {
    let mut stmt =
        conn.prepare("SELECT id, name, created_at FROM document_types ORDER BY name COLLATE NOCASE")?;
    let types = stmt
        .query_map([], DocumentType::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(types)
}

pub fn get_document_type(conn: &Connection, id: &str) -> Result<DocumentType> {
    conn.query_row(
        "SELECT id, name, created_at FROM document_types WHERE id = ?1",
        [id],
        DocumentType::from_row,
    )
    .optional()?
    .ok_or_else(|| DocketError::not_found("document type", id))
}

pub fn insert_document_type(conn: &Connection, name: &str) -> Result<DocumentType> {
    let doc_type = DocumentType {
        id: new_id(),
        name: require_name("name", name)?,
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO document_types (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![
            doc_type.id,
            doc_type.name,
            format_timestamp(&doc_type.created_at),
        ],
    )?;

    Ok(doc_type)
}

pub fn rename_document_type(conn: &Connection, id: &str, name: &str) -> Result<DocumentType> {
    let name = require_name("name", name)?;
    let mut doc_type = get_document_type(conn, id)?;

    conn.execute(
        "UPDATE document_types SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;

    doc_type.name = name;
    Ok(doc_type)
}

/// Removes the type; documents tagged with it keep existing untyped
pub fn delete_document_type(conn: &Connection, id: &str) -> Result<DocumentType> {
    let doc_type = get_document_type(conn, id)?;
    conn.execute("DELETE FROM document_types WHERE id = ?1", [id])?;
    Ok(doc_type)
}
