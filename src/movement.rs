// 🚚 Move Protocol - relocate a document and record the transition
//
// move_document(doc, target):
//   1. document must exist        (NotFound otherwise)
//   2. target stage must exist    (NotFound otherwise, Unassigned always ok)
//   3. documents.stage_id := target, updated_at := now
//   4. append MovementRecord { stage: target, date: now, notes }
//
// Moving to the stage a document already sits in still appends a record.
// Callers run this inside a SQLite transaction so a failure writes nothing.

use rusqlite::Connection;
use serde::Serialize;

use crate::entities::document::{
    append_movement, get_document, set_document_stage, Document, MovementRecord, StageRef,
    StageTarget,
};
use crate::entities::stage::StageRegistry;
use crate::error::Result;

/// A request to place `document_id` into `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub document_id: String,
    pub target: StageTarget,
    pub notes: Option<String>,
}

impl MoveRequest {
    pub fn new(document_id: impl Into<String>, target: StageTarget) -> Self {
        MoveRequest {
            document_id: document_id.into(),
            target,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// What a successful move did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// Document after the move (history included)
    pub document: Document,
    /// Placement before the move
    pub from: Option<StageRef>,
    /// The record appended by this move
    pub record: MovementRecord,
}

pub fn move_document(conn: &Connection, request: &MoveRequest) -> Result<MoveOutcome> {
    let before = get_document(conn, &request.document_id)?;
    let registry = StageRegistry::new(conn);
    let stage = request.target.resolve(&registry)?;

    let now = crate::db::now();
    set_document_stage(conn, &before.id, stage.as_ref(), now)?;
    let record = append_movement(
        conn,
        &before.id,
        stage.as_ref(),
        now,
        request.notes.as_deref(),
    )?;

    let document = get_document(conn, &before.id)?;
    debug_assert!(document.placement_consistent());

    Ok(MoveOutcome {
        document,
        from: before.stage,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::case::{insert_case, insert_contact, Case, NewCase, NewContact};
    use crate::entities::document::{insert_document, NewDocument};
    use crate::entities::stage::Stage;

    struct Fixture {
        conn: Connection,
        filed: Stage,
        court: Stage,
        document: Document,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let case = Case::new(NewCase {
            title: "State v. Okafor".to_string(),
            ..Default::default()
        })
        .unwrap();
        insert_case(&conn, &case).unwrap();
        let contact = insert_contact(
            &conn,
            NewContact {
                case_id: case.id.clone(),
                name: "D. Okafor".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let registry = StageRegistry::new(&conn);
        let filed = registry.add("Filed").unwrap();
        let court = registry.add("Court").unwrap();

        let document = insert_document(
            &conn,
            &NewDocument {
                case_id: case.id.clone(),
                contact_id: contact.id.clone(),
                name: "Bail bond".to_string(),
                stage: Some(filed.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();

        Fixture {
            conn,
            filed,
            court,
            document,
        }
    }

    fn count_history(conn: &Connection, document_id: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM movement_records WHERE document_id = ?1",
            [document_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_move_sets_stage_and_appends_record() {
        let f = fixture();
        let request = MoveRequest::new(&f.document.id, StageTarget::Stage(f.court.id.clone()));

        let outcome = move_document(&f.conn, &request).unwrap();

        assert_eq!(outcome.document.stage_id(), Some(f.court.id.as_str()));
        assert_eq!(outcome.document.history.last().unwrap().stage_id(), Some(f.court.id.as_str()));
        assert_eq!(outcome.from.unwrap().id, f.filed.id);
        assert_eq!(outcome.record.label(), "Court");
        // initial + move
        assert_eq!(outcome.document.history.len(), 2);
    }

    #[test]
    fn test_move_to_unassigned() {
        let f = fixture();
        let request = MoveRequest::new(&f.document.id, StageTarget::Unassigned)
            .with_notes("returned to client");

        let outcome = move_document(&f.conn, &request).unwrap();

        assert!(outcome.document.is_unassigned());
        let last = outcome.document.last_movement().unwrap();
        assert!(last.stage.is_none());
        assert_eq!(last.notes.as_deref(), Some("returned to client"));
        assert!(outcome.document.placement_consistent());
    }

    #[test]
    fn test_move_to_same_stage_appends_again() {
        let f = fixture();
        let request = MoveRequest::new(&f.document.id, StageTarget::Stage(f.filed.id.clone()));

        move_document(&f.conn, &request).unwrap();
        let outcome = move_document(&f.conn, &request).unwrap();

        assert_eq!(outcome.document.stage_id(), Some(f.filed.id.as_str()));
        assert_eq!(outcome.document.history.len(), 3);
    }

    #[test]
    fn test_move_unknown_stage_rejected_without_writes() {
        let f = fixture();
        let request = MoveRequest::new(&f.document.id, StageTarget::Stage("ghost".to_string()));

        let err = move_document(&f.conn, &request).unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(count_history(&f.conn, &f.document.id), 1);
        let doc = get_document(&f.conn, &f.document.id).unwrap();
        assert_eq!(doc.stage_id(), Some(f.filed.id.as_str()));
    }

    #[test]
    fn test_move_unknown_document_rejected() {
        let f = fixture();
        let request = MoveRequest::new("ghost", StageTarget::Stage(f.court.id.clone()));

        let err = move_document(&f.conn, &request).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "document not found: ghost");
    }

    #[test]
    fn test_back_and_forth_grows_history_unbounded() {
        let f = fixture();
        for i in 0..10 {
            let stage = if i % 2 == 0 { &f.court } else { &f.filed };
            move_document(
                &f.conn,
                &MoveRequest::new(&f.document.id, StageTarget::Stage(stage.id.clone())),
            )
            .unwrap();
        }

        let doc = get_document(&f.conn, &f.document.id).unwrap();
        assert_eq!(doc.history.len(), 11);
        assert_eq!(doc.stage_id(), Some(f.filed.id.as_str()));
        assert!(doc.placement_consistent());
    }
}
