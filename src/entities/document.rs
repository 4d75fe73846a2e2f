// 📄 Document Entity - tracked legal paper placed in at most one stage
//
// Placement state:
// - stage: current stage reference (None = "Unassigned")
// - history: append-only movement log, oldest first
//
// Invariant kept by creation and the move protocol: the current stage equals
// the stage of the most recent movement record. Stage deletion is the one
// exception (placement is cleared, history is not rewritten).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, new_id, parse_timestamp};
use crate::entities::case::{get_case, get_contact};
use crate::entities::document_type::get_document_type;
use crate::entities::stage::{Stage, StageRegistry};
use crate::error::{require_name, DocketError, Result};

// ============================================================================
// PLACEMENT TARGET
// ============================================================================

/// Where a document should be placed: a stage or the implicit unassigned bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageTarget {
    Unassigned,
    Stage(String),
}

impl StageTarget {
    /// Wire form: a missing, `null` or blank stage id is the unassigned sentinel
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => StageTarget::Unassigned,
            Some(id) => StageTarget::Stage(id.to_string()),
        }
    }

    pub fn stage_id(&self) -> Option<&str> {
        match self {
            StageTarget::Unassigned => None,
            StageTarget::Stage(id) => Some(id),
        }
    }

    /// Resolve the target against the stage registry (unknown stage => NotFound)
    pub fn resolve(&self, registry: &StageRegistry<'_>) -> Result<Option<Stage>> {
        match self {
            StageTarget::Unassigned => Ok(None),
            StageTarget::Stage(id) => registry.get(id).map(Some),
        }
    }
}

// ============================================================================
// REFERENCES & HISTORY
// ============================================================================

/// Stage reference embedded in documents and movement records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRef {
    pub id: String,
    pub name: String,
}

impl From<&Stage> for StageRef {
    fn from(stage: &Stage) -> Self {
        StageRef {
            id: stage.id.clone(),
            name: stage.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub id: String,
    pub name: String,
}

/// Immutable log entry: the document entered `stage` at `date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    /// None for the initial/unassigned placement
    pub stage: Option<StageRef>,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MovementRecord {
    pub fn stage_id(&self) -> Option<&str> {
        self.stage.as_ref().map(|s| s.id.as_str())
    }

    /// Label shown in the history dialog
    pub fn label(&self) -> &str {
        self.stage.as_ref().map(|s| s.name.as_str()).unwrap_or("Initial")
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let stage_id: Option<String> = row.get(offset)?;
        let stage_name: Option<String> = row.get(offset + 1)?;
        let moved_at: String = row.get(offset + 2)?;

        Ok(MovementRecord {
            stage: stage_id.map(|id| StageRef {
                id,
                name: stage_name.unwrap_or_default(),
            }),
            date: parse_timestamp(offset + 2, &moved_at)?,
            notes: row.get(offset + 3)?,
        })
    }
}

// ============================================================================
// DOCUMENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub case_id: String,
    pub contact_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: Option<TypeRef>,
    /// None => unassigned
    pub stage: Option<StageRef>,
    pub history: Vec<MovementRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn stage_id(&self) -> Option<&str> {
        self.stage.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_unassigned(&self) -> bool {
        self.stage.is_none()
    }

    pub fn last_movement(&self) -> Option<&MovementRecord> {
        self.history.last()
    }

    /// Current stage matches the most recent movement record
    pub fn placement_consistent(&self) -> bool {
        match self.last_movement() {
            Some(record) => record.stage_id() == self.stage_id(),
            None => self.stage.is_none(),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.doc_type.as_ref().map(|t| t.name.as_str())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let type_id: Option<String> = row.get(4)?;
        let type_name: Option<String> = row.get(5)?;
        let stage_id: Option<String> = row.get(6)?;
        let stage_name: Option<String> = row.get(7)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(Document {
            id: row.get(0)?,
            case_id: row.get(1)?,
            contact_id: row.get(2)?,
            name: row.get(3)?,
            doc_type: type_id.map(|id| TypeRef {
                id,
                name: type_name.unwrap_or_default(),
            }),
            stage: stage_id.map(|id| StageRef {
                id,
                name: stage_name.unwrap_or_default(),
            }),
            history: Vec::new(),
            created_at: parse_timestamp(8, &created_at)?,
            updated_at: parse_timestamp(9, &updated_at)?,
        })
    }
}

/// Form payload for `POST /documents`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub case_id: String,
    pub contact_id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_id: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload for `PUT /documents/{id}`: direct edits plus an optional move.
///
/// `stage` absent => placement untouched; `null` or `""` => unassigned.
/// `type` follows the same rule: absent keeps it, `null` or `""` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "present_field")]
    pub type_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_field")]
    pub stage: Option<Option<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DocumentPatch {
    pub fn stage_target(&self) -> Option<StageTarget> {
        self.stage
            .as_ref()
            .map(|raw| StageTarget::from_wire(raw.as_deref()))
    }

    /// None => keep the type; Some(None) => clear it
    pub fn type_change(&self) -> Option<Option<&str>> {
        self.type_id.as_ref().map(|raw| {
            raw.as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
        })
    }
}

pub(crate) fn present_field<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

const DOCUMENT_COLUMNS: &str = "d.id, d.case_id, d.contact_id, d.name, d.type_id, t.name,
        d.stage_id, s.name, d.created_at, d.updated_at
     FROM documents d
     LEFT JOIN document_types t ON t.id = d.type_id
     LEFT JOIN document_stages s ON s.id = d.stage_id";

// ============================================================================
// QUERIES
// ============================================================================

pub fn find_document(conn: &Connection, id: &str) -> Result<Option<Document>> {
    let sql = format!("SELECT {} WHERE d.id = ?1", DOCUMENT_COLUMNS);
    let document = conn.query_row(&sql, [id], Document::from_row).optional()?;

    match document {
        Some(mut doc) => {
            doc.history = load_history(conn, &doc.id)?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

pub fn get_document(conn: &Connection, id: &str) -> Result<Document> {
    find_document(conn, id)?.ok_or_else(|| DocketError::not_found("document", id))
}

/// Movement history of one document, oldest first
pub fn load_history(conn: &Connection, document_id: &str) -> Result<Vec<MovementRecord>> {
    let mut stmt = conn.prepare(
        "SELECT stage_id, stage_name, moved_at, notes
         FROM movement_records
         WHERE document_id = ?1
         ORDER BY seq",
    )?;
    let history = stmt
        .query_map([document_id], |row| MovementRecord::from_row(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(history)
}

/// All documents of a case in creation order, with their history
pub fn list_case_documents(conn: &Connection, case_id: &str) -> Result<Vec<Document>> {
    get_case(conn, case_id)?;

    let sql = format!("SELECT {} WHERE d.case_id = ?1 ORDER BY d.seq", DOCUMENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut documents = stmt
        .query_map([case_id], Document::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut histories: HashMap<String, Vec<MovementRecord>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT m.document_id, m.stage_id, m.stage_name, m.moved_at, m.notes
         FROM movement_records m
         JOIN documents d ON d.id = m.document_id
         WHERE d.case_id = ?1
         ORDER BY m.seq",
    )?;
    let rows = stmt.query_map([case_id], |row| {
        Ok((row.get::<_, String>(0)?, MovementRecord::from_row(row, 1)?))
    })?;
    for row in rows {
        let (document_id, record) = row?;
        histories.entry(document_id).or_default().push(record);
    }

    for doc in &mut documents {
        doc.history = histories.remove(&doc.id).unwrap_or_default();
    }

    Ok(documents)
}

// ============================================================================
// MUTATIONS
// ============================================================================

/// Create a document and its initial movement record
pub fn insert_document(conn: &Connection, input: &NewDocument) -> Result<Document> {
    let name = require_name("name", &input.name)?;
    get_case(conn, &input.case_id)?;

    let contact = get_contact(conn, &input.contact_id)?;
    if contact.case_id != input.case_id {
        return Err(DocketError::validation(
            "contactId",
            "contact belongs to another case",
        ));
    }

    let type_id = match input.type_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(id) => Some(get_document_type(conn, id)?.id),
    };

    let registry = StageRegistry::new(conn);
    let stage = StageTarget::from_wire(input.stage.as_deref()).resolve(&registry)?;

    let id = new_id();
    let now = crate::db::now();
    conn.execute(
        "INSERT INTO documents (id, case_id, contact_id, name, type_id, stage_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            id,
            input.case_id,
            input.contact_id,
            name,
            type_id,
            stage.as_ref().map(|s| s.id.as_str()),
            format_timestamp(&now),
        ],
    )?;

    append_movement(conn, &id, stage.as_ref(), now, input.notes.as_deref())?;

    get_document(conn, &id)
}

/// Direct edit of name and/or type (never touches placement).
///
/// `type_id` of `Some(None)` clears the type.
pub fn update_document_fields(
    conn: &Connection,
    id: &str,
    name: Option<&str>,
    type_id: Option<Option<&str>>,
) -> Result<()> {
    get_document(conn, id)?;
    let now = format_timestamp(&crate::db::now());

    if let Some(name) = name {
        let name = require_name("name", name)?;
        conn.execute(
            "UPDATE documents SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, id],
        )?;
    }

    if let Some(change) = type_id {
        let type_id = match change.map(str::trim).filter(|id| !id.is_empty()) {
            None => None,
            Some(id) => Some(get_document_type(conn, id)?.id),
        };
        conn.execute(
            "UPDATE documents SET type_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![type_id, now, id],
        )?;
    }

    Ok(())
}

/// Point the document at a stage (or none). Callers keep history in step.
pub fn set_document_stage(
    conn: &Connection,
    id: &str,
    stage: Option<&Stage>,
    at: DateTime<Utc>,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE documents SET stage_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![stage.map(|s| s.id.as_str()), format_timestamp(&at), id],
    )?;
    if updated == 0 {
        return Err(DocketError::not_found("document", id));
    }
    Ok(())
}

/// Append a movement record (the only write path into history)
pub fn append_movement(
    conn: &Connection,
    document_id: &str,
    stage: Option<&Stage>,
    at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<MovementRecord> {
    let notes = notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    conn.execute(
        "INSERT INTO movement_records (document_id, stage_id, stage_name, moved_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            document_id,
            stage.map(|s| s.id.as_str()),
            stage.map(|s| s.name.as_str()),
            format_timestamp(&at),
            notes,
        ],
    )?;

    Ok(MovementRecord {
        stage: stage.map(StageRef::from),
        date: at,
        notes,
    })
}

/// Delete a document; its history goes with it
pub fn delete_document(conn: &Connection, id: &str) -> Result<Document> {
    let document = get_document(conn, id)?;
    conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::case::{insert_case, insert_contact, Case, NewCase, NewContact};
    use crate::entities::document_type::insert_document_type;

    struct Fixture {
        conn: Connection,
        case_id: String,
        contact_id: String,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let case = Case::new(NewCase {
            title: "Lane v. Harbor Board".to_string(),
            ..Default::default()
        })
        .unwrap();
        insert_case(&conn, &case).unwrap();
        let contact = insert_contact(
            &conn,
            NewContact {
                case_id: case.id.clone(),
                name: "M. Lane".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        Fixture {
            conn,
            case_id: case.id,
            contact_id: contact.id,
        }
    }

    fn new_doc(f: &Fixture, name: &str) -> NewDocument {
        NewDocument {
            case_id: f.case_id.clone(),
            contact_id: f.contact_id.clone(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stage_target_from_wire() {
        assert_eq!(StageTarget::from_wire(None), StageTarget::Unassigned);
        assert_eq!(StageTarget::from_wire(Some("  ")), StageTarget::Unassigned);
        assert_eq!(
            StageTarget::from_wire(Some("abc")),
            StageTarget::Stage("abc".to_string())
        );
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null_stage() {
        let absent: DocumentPatch = serde_json::from_str(r#"{"name": "Deed"}"#).unwrap();
        assert_eq!(absent.stage_target(), None);

        let null: DocumentPatch = serde_json::from_str(r#"{"stage": null}"#).unwrap();
        assert_eq!(null.stage_target(), Some(StageTarget::Unassigned));

        let blank: DocumentPatch = serde_json::from_str(r#"{"stage": ""}"#).unwrap();
        assert_eq!(blank.stage_target(), Some(StageTarget::Unassigned));

        let moved: DocumentPatch = serde_json::from_str(r#"{"stage": "s1", "type": "t1"}"#).unwrap();
        assert_eq!(moved.stage_target(), Some(StageTarget::Stage("s1".to_string())));
        assert_eq!(moved.type_change(), Some(Some("t1")));
    }

    #[test]
    fn test_patch_null_type_clears_like_null_stage() {
        let absent: DocumentPatch = serde_json::from_str(r#"{"name": "Deed"}"#).unwrap();
        assert_eq!(absent.type_change(), None);

        let null: DocumentPatch = serde_json::from_str(r#"{"type": null}"#).unwrap();
        assert_eq!(null.type_change(), Some(None));

        let blank: DocumentPatch = serde_json::from_str(r#"{"type": " "}"#).unwrap();
        assert_eq!(blank.type_change(), Some(None));
    }

    #[test]
    fn test_new_document_starts_unassigned_with_initial_record() {
        let f = fixture();
        let doc = insert_document(&f.conn, &new_doc(&f, "Sale deed")).unwrap();

        assert!(doc.is_unassigned());
        assert_eq!(doc.history.len(), 1);
        assert_eq!(doc.history[0].label(), "Initial");
        assert!(doc.placement_consistent());
    }

    #[test]
    fn test_new_document_in_stage() {
        let f = fixture();
        let stage = StageRegistry::new(&f.conn).add("Filed").unwrap();
        let mut input = new_doc(&f, "Petition");
        input.stage = Some(stage.id.clone());
        input.notes = Some("received at front desk".to_string());

        let doc = insert_document(&f.conn, &input).unwrap();

        assert_eq!(doc.stage_id(), Some(stage.id.as_str()));
        assert_eq!(doc.history[0].label(), "Filed");
        assert_eq!(doc.history[0].notes.as_deref(), Some("received at front desk"));
        assert!(doc.placement_consistent());
    }

    #[test]
    fn test_new_document_unknown_stage_rejected() {
        let f = fixture();
        let mut input = new_doc(&f, "Petition");
        input.stage = Some("missing".to_string());

        let err = insert_document(&f.conn, &input).unwrap_err();
        assert!(err.is_not_found());
        assert!(list_case_documents(&f.conn, &f.case_id).unwrap().is_empty());
    }

    #[test]
    fn test_contact_of_other_case_rejected() {
        let f = fixture();
        let other = Case::new(NewCase {
            title: "Other".to_string(),
            ..Default::default()
        })
        .unwrap();
        insert_case(&f.conn, &other).unwrap();

        let mut input = new_doc(&f, "Petition");
        input.case_id = other.id;

        assert!(matches!(
            insert_document(&f.conn, &input),
            Err(DocketError::Validation { field: "contactId", .. })
        ));
    }

    #[test]
    fn test_update_fields_keeps_placement() {
        let f = fixture();
        let doc_type = insert_document_type(&f.conn, "Affidavit").unwrap();
        let doc = insert_document(&f.conn, &new_doc(&f, "Draft")).unwrap();

        update_document_fields(&f.conn, &doc.id, Some("Final affidavit"), Some(Some(doc_type.id.as_str())))
            .unwrap();

        let updated = get_document(&f.conn, &doc.id).unwrap();
        assert_eq!(updated.name, "Final affidavit");
        assert_eq!(updated.type_name(), Some("Affidavit"));
        assert_eq!(updated.history.len(), 1);

        update_document_fields(&f.conn, &doc.id, None, Some(None)).unwrap();
        assert!(get_document(&f.conn, &doc.id).unwrap().doc_type.is_none());

        update_document_fields(&f.conn, &doc.id, None, Some(Some(doc_type.id.as_str()))).unwrap();
        update_document_fields(&f.conn, &doc.id, None, Some(Some(""))).unwrap();
        assert!(get_document(&f.conn, &doc.id).unwrap().doc_type.is_none());
    }

    #[test]
    fn test_list_case_documents_groups_history() {
        let f = fixture();
        let stage = StageRegistry::new(&f.conn).add("Filed").unwrap();
        let first = insert_document(&f.conn, &new_doc(&f, "First")).unwrap();
        insert_document(&f.conn, &new_doc(&f, "Second")).unwrap();

        let now = crate::db::now();
        set_document_stage(&f.conn, &first.id, Some(&stage), now).unwrap();
        append_movement(&f.conn, &first.id, Some(&stage), now, None).unwrap();

        let docs = list_case_documents(&f.conn, &f.case_id).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "First");
        assert_eq!(docs[0].history.len(), 2);
        assert_eq!(docs[1].history.len(), 1);
        assert!(docs.iter().all(Document::placement_consistent));
    }

    #[test]
    fn test_delete_document_cascades_history() {
        let f = fixture();
        let doc = insert_document(&f.conn, &new_doc(&f, "Deed")).unwrap();

        delete_document(&f.conn, &doc.id).unwrap();

        let remaining: i64 = f
            .conn
            .query_row(
                "SELECT COUNT(*) FROM movement_records WHERE document_id = ?1",
                [&doc.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(get_document(&f.conn, &doc.id).unwrap_err().is_not_found());
    }
}
