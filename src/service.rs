// Docket Service - the one entry point used by the API server and the terminal board
//
// Every mutation:
// 1. runs inside a single SQLite transaction (all-or-nothing)
// 2. appends an audit event naming the session actor
// 3. publishes the invalidated tags on the change feed after commit

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{info, warn};

use crate::board::Board;
use crate::changes::{ChangeFeed, Tag};
use crate::db::{get_events_for_entity, insert_event, open_database, setup_database, Event};
use crate::entities::case::{self, Case, Contact, NewCase, NewContact};
use crate::entities::document::{self, Document, DocumentPatch, MovementRecord, NewDocument};
use crate::entities::document_type::{self, DocumentType};
use crate::entities::stage::{Stage, StageRegistry, StageRemoval};
use crate::error::{DocketError, Result};
use crate::export::write_timeline;
use crate::movement::{move_document, MoveOutcome, MoveRequest};
use crate::session::Session;

/// Shared application state
#[derive(Clone)]
pub struct DocketService {
    db: Arc<Mutex<Connection>>,
    changes: ChangeFeed,
}

impl DocketService {
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(DocketService {
            db: Arc::new(Mutex::new(conn)),
            changes: ChangeFeed::new(),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_database(path)?;
        info!(path = %path.display(), "database opened");
        Self::new(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| DocketError::LockPoisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn()?;
        f(&conn)
    }

    /// Run `f` in a transaction and publish `tags(&value)` once committed
    fn write<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
        tags: impl FnOnce(&T) -> Vec<Tag>,
    ) -> Result<T> {
        let value = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            value
        };

        for tag in tags(&value) {
            self.changes.publish(tag);
        }
        Ok(value)
    }

    // ========================================================================
    // CASES & CONTACTS
    // ========================================================================

    pub fn list_cases(&self) -> Result<Vec<Case>> {
        self.read(case::list_cases)
    }

    pub fn get_case(&self, id: &str) -> Result<Case> {
        self.read(|conn| case::get_case(conn, id))
    }

    pub fn create_case(&self, session: &Session, input: NewCase) -> Result<Case> {
        let case = Case::new(input)?;
        let case = self.write(
            |tx| {
                case::insert_case(tx, &case)?;
                audit(tx, session, "case_created", "case", &case.id, serde_json::json!({
                    "title": case.title,
                }))?;
                Ok(case)
            },
            |_| vec![Tag::Cases],
        )?;
        info!(case_id = %case.id, actor = %session.actor, "case created");
        Ok(case)
    }

    pub fn delete_case(&self, session: &Session, id: &str) -> Result<Case> {
        let case = self.write(
            |tx| {
                let case = case::delete_case(tx, id)?;
                audit(tx, session, "case_deleted", "case", id, serde_json::json!({
                    "title": case.title,
                }))?;
                Ok(case)
            },
            |case| {
                vec![
                    Tag::Cases,
                    Tag::Contacts(case.id.clone()),
                    Tag::Documents(case.id.clone()),
                ]
            },
        )?;
        info!(case_id = %id, actor = %session.actor, "case deleted");
        Ok(case)
    }

    pub fn list_contacts(&self, case_id: &str) -> Result<Vec<Contact>> {
        self.read(|conn| case::list_contacts(conn, case_id))
    }

    pub fn create_contact(&self, session: &Session, input: NewContact) -> Result<Contact> {
        self.write(
            |tx| {
                let contact = case::insert_contact(tx, input)?;
                audit(tx, session, "contact_created", "contact", &contact.id, serde_json::json!({
                    "caseId": contact.case_id,
                    "name": contact.name,
                }))?;
                Ok(contact)
            },
            |contact| vec![Tag::Contacts(contact.case_id.clone())],
        )
    }

    pub fn delete_contact(&self, session: &Session, id: &str) -> Result<Contact> {
        self.write(
            |tx| {
                let contact = case::delete_contact(tx, id)?;
                audit(tx, session, "contact_deleted", "contact", id, serde_json::json!({
                    "caseId": contact.case_id,
                }))?;
                Ok(contact)
            },
            |contact| {
                vec![
                    Tag::Contacts(contact.case_id.clone()),
                    Tag::Documents(contact.case_id.clone()),
                ]
            },
        )
    }

    // ========================================================================
    // DOCUMENT TYPES
    // ========================================================================

    pub fn list_document_types(&self) -> Result<Vec<DocumentType>> {
        self.read(document_type::list_document_types)
    }

    pub fn create_document_type(&self, session: &Session, name: &str) -> Result<DocumentType> {
        self.write(
            |tx| {
                let doc_type = document_type::insert_document_type(tx, name)?;
                audit(tx, session, "document_type_created", "document_type", &doc_type.id, serde_json::json!({
                    "name": doc_type.name,
                }))?;
                Ok(doc_type)
            },
            |_| vec![Tag::DocumentTypes],
        )
    }

    pub fn rename_document_type(
        &self,
        session: &Session,
        id: &str,
        name: &str,
    ) -> Result<DocumentType> {
        session.require_super_admin("rename document type")?;
        self.write(
            |tx| {
                let doc_type = document_type::rename_document_type(tx, id, name)?;
                audit(tx, session, "document_type_renamed", "document_type", id, serde_json::json!({
                    "name": doc_type.name,
                }))?;
                Ok(doc_type)
            },
            |_| vec![Tag::DocumentTypes],
        )
    }

    pub fn delete_document_type(&self, session: &Session, id: &str) -> Result<DocumentType> {
        session.require_super_admin("delete document type")?;
        self.write(
            |tx| {
                let doc_type = document_type::delete_document_type(tx, id)?;
                audit(tx, session, "document_type_deleted", "document_type", id, serde_json::json!({
                    "name": doc_type.name,
                }))?;
                Ok(doc_type)
            },
            |_| vec![Tag::DocumentTypes],
        )
    }

    // ========================================================================
    // STAGE REGISTRY
    // ========================================================================

    pub fn list_stages(&self) -> Result<Vec<Stage>> {
        self.read(|conn| StageRegistry::new(conn).list())
    }

    /// Append a stage at the end of the board
    pub fn add_stage(&self, session: &Session, name: &str) -> Result<Stage> {
        self.create_stage(session, name, None)
    }

    /// Create a stage; without an explicit order it is appended
    pub fn create_stage(&self, session: &Session, name: &str, order: Option<i64>) -> Result<Stage> {
        let stage = self.write(
            |tx| {
                let registry = StageRegistry::new(tx);
                let stage = match order {
                    Some(order) => registry.create(name, order)?,
                    None => registry.add(name)?,
                };
                audit(tx, session, "stage_added", "document_stage", &stage.id, serde_json::json!({
                    "name": stage.name,
                    "order": stage.order,
                }))?;
                Ok(stage)
            },
            |_| vec![Tag::DocumentStages],
        )?;
        info!(stage_id = %stage.id, name = %stage.name, order = stage.order, "stage added");
        Ok(stage)
    }

    pub fn delete_stage(&self, session: &Session, id: &str) -> Result<StageRemoval> {
        let removal = self.write(
            |tx| {
                let removal = StageRegistry::new(tx).delete(id)?;
                audit(tx, session, "stage_deleted", "document_stage", id, serde_json::json!({
                    "name": removal.stage.name,
                    "orphaned": removal.orphaned,
                }))?;
                Ok(removal)
            },
            |removal| {
                let mut tags = vec![Tag::DocumentStages];
                tags.extend(removal.affected_cases.iter().cloned().map(Tag::Documents));
                tags
            },
        )?;
        info!(
            stage_id = %id,
            orphaned = removal.orphaned,
            actor = %session.actor,
            "stage deleted"
        );
        Ok(removal)
    }

    // ========================================================================
    // DOCUMENTS & MOVE PROTOCOL
    // ========================================================================

    pub fn list_case_documents(&self, case_id: &str) -> Result<Vec<Document>> {
        self.read(|conn| document::list_case_documents(conn, case_id))
    }

    pub fn get_document(&self, id: &str) -> Result<Document> {
        self.read(|conn| document::get_document(conn, id))
    }

    pub fn document_history(&self, id: &str) -> Result<Vec<MovementRecord>> {
        self.get_document(id).map(|doc| doc.history)
    }

    pub fn create_document(&self, session: &Session, input: NewDocument) -> Result<Document> {
        self.write(
            |tx| {
                let doc = document::insert_document(tx, &input)?;
                audit(tx, session, "document_created", "document", &doc.id, serde_json::json!({
                    "caseId": doc.case_id,
                    "name": doc.name,
                    "stage": doc.stage_id(),
                }))?;
                Ok(doc)
            },
            |doc| vec![Tag::Documents(doc.case_id.clone())],
        )
    }

    /// Direct edit of name/type; a `stage` in the patch runs the move protocol
    /// in the same transaction.
    pub fn update_document(
        &self,
        session: &Session,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Document> {
        self.write(
            |tx| {
                document::update_document_fields(
                    tx,
                    id,
                    patch.name.as_deref(),
                    patch.type_change(),
                )?;

                if let Some(target) = patch.stage_target() {
                    let request = MoveRequest {
                        document_id: id.to_string(),
                        target,
                        notes: patch.notes.clone(),
                    };
                    let outcome = move_document(tx, &request)?;
                    audit_move(tx, session, &outcome)?;
                }

                let doc = document::get_document(tx, id)?;
                audit(tx, session, "document_updated", "document", id, serde_json::json!({
                    "name": doc.name,
                    "type": doc.type_name(),
                }))?;
                Ok(doc)
            },
            |doc| vec![Tag::Documents(doc.case_id.clone())],
        )
    }

    /// Move Protocol entry point
    pub fn move_document(&self, session: &Session, request: &MoveRequest) -> Result<MoveOutcome> {
        let result = self.write(
            |tx| {
                let outcome = move_document(tx, request)?;
                audit_move(tx, session, &outcome)?;
                Ok(outcome)
            },
            |outcome| vec![Tag::Documents(outcome.document.case_id.clone())],
        );

        match &result {
            Ok(outcome) => info!(
                document_id = %request.document_id,
                to = outcome.record.label(),
                history = outcome.document.history.len(),
                actor = %session.actor,
                "document moved"
            ),
            Err(e) => warn!(document_id = %request.document_id, error = %e, "move rejected"),
        }
        result
    }

    pub fn delete_document(&self, session: &Session, id: &str) -> Result<Document> {
        self.write(
            |tx| {
                let doc = document::delete_document(tx, id)?;
                audit(tx, session, "document_deleted", "document", id, serde_json::json!({
                    "caseId": doc.case_id,
                    "name": doc.name,
                    "historyLength": doc.history.len(),
                }))?;
                Ok(doc)
            },
            |doc| vec![Tag::Documents(doc.case_id.clone())],
        )
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    /// Board projection of one case's documents
    pub fn board(&self, case_id: &str) -> Result<Board> {
        self.read(|conn| {
            let documents = document::list_case_documents(conn, case_id)?;
            let stages = StageRegistry::new(conn).list()?;
            Ok(Board::build(&stages, &documents))
        })
    }

    /// Write the case's document timeline as CSV
    pub fn export_timeline<W: Write>(&self, case_id: &str, writer: W) -> Result<usize> {
        let (documents, contacts, stages) = self.read(|conn| {
            Ok((
                document::list_case_documents(conn, case_id)?,
                case::list_contacts(conn, case_id)?,
                StageRegistry::new(conn).list()?,
            ))
        })?;
        write_timeline(writer, &documents, &contacts, &stages)
    }

    pub fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        self.read(|conn| get_events_for_entity(conn, entity_type, entity_id))
    }
}

fn audit(
    conn: &Connection,
    session: &Session,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    data: serde_json::Value,
) -> Result<()> {
    let event = Event::new(event_type, entity_type, entity_id, data, &session.actor);
    insert_event(conn, &event)
}

fn audit_move(conn: &Connection, session: &Session, outcome: &MoveOutcome) -> Result<()> {
    audit(
        conn,
        session,
        "document_moved",
        "document",
        &outcome.document.id,
        serde_json::json!({
            "from": outcome.from.as_ref().map(|s| s.id.as_str()),
            "to": outcome.record.stage_id(),
            "notes": outcome.record.notes,
        }),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::Invalidation;
    use crate::entities::document::StageTarget;
    use crate::session::Role;

    struct Fixture {
        service: DocketService,
        session: Session,
        case: Case,
        contact: Contact,
    }

    fn fixture() -> Fixture {
        let service = DocketService::in_memory().unwrap();
        let session = Session::new("paralegal", Role::User);
        let case = service
            .create_case(
                &session,
                NewCase {
                    title: "In re Marsh Holdings".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let contact = service
            .create_contact(
                &session,
                NewContact {
                    case_id: case.id.clone(),
                    name: "J. Marsh".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        Fixture {
            service,
            session,
            case,
            contact,
        }
    }

    fn add_document(f: &Fixture, name: &str, stage: Option<&Stage>) -> Document {
        f.service
            .create_document(
                &f.session,
                NewDocument {
                    case_id: f.case.id.clone(),
                    contact_id: f.contact.id.clone(),
                    name: name.to_string(),
                    stage: stage.map(|s| s.id.clone()),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    fn to_stage(document: &Document, stage: &Stage) -> MoveRequest {
        MoveRequest::new(&document.id, StageTarget::Stage(stage.id.clone()))
    }

    fn titles(board: &Board) -> Vec<(String, usize)> {
        board
            .columns
            .iter()
            .map(|c| (c.title.clone(), c.count))
            .collect()
    }

    #[test]
    fn test_scenario_empty_stages_one_unassigned_document() {
        let f = fixture();
        add_document(&f, "Vakalatnama", None);

        let board = f.service.board(&f.case.id).unwrap();
        assert_eq!(titles(&board), vec![("Unassigned".to_string(), 1)]);
    }

    #[test]
    fn test_scenario_move_filed_to_court() {
        let f = fixture();
        let filed = f.service.add_stage(&f.session, "Filed").unwrap();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        assert_eq!((filed.order, court.order), (0, 1));

        let doc = add_document(&f, "Plaint", Some(&filed));
        let outcome = f.service.move_document(&f.session, &to_stage(&doc, &court)).unwrap();

        assert_eq!(outcome.document.stage_id(), Some(court.id.as_str()));
        assert_eq!(outcome.document.history.last().unwrap().stage_id(), Some(court.id.as_str()));

        let board = f.service.board(&f.case.id).unwrap();
        assert_eq!(
            titles(&board),
            vec![("Filed".to_string(), 0), ("Court".to_string(), 1)]
        );
        assert_eq!(f.service.document_history(&doc.id).unwrap().len(), 2);
    }

    #[test]
    fn test_scenario_delete_stage_holding_document() {
        let f = fixture();
        let filed = f.service.add_stage(&f.session, "Filed").unwrap();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        let doc = add_document(&f, "Plaint", Some(&filed));
        f.service.move_document(&f.session, &to_stage(&doc, &court)).unwrap();
        let history_before = f.service.document_history(&doc.id).unwrap();

        let removal = f.service.delete_stage(&f.session, &court.id).unwrap();

        assert_eq!(removal.orphaned, 1);
        assert_eq!(removal.affected_cases, vec![f.case.id.clone()]);

        let moved = f.service.get_document(&doc.id).unwrap();
        assert!(moved.is_unassigned());
        assert_eq!(moved.history, history_before);
        assert_eq!(moved.history.last().unwrap().label(), "Court");

        let stages: Vec<String> = f
            .service
            .list_stages()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(stages, vec!["Filed"]);

        let board = f.service.board(&f.case.id).unwrap();
        assert_eq!(
            titles(&board),
            vec![("Unassigned".to_string(), 1), ("Filed".to_string(), 0)]
        );
    }

    #[test]
    fn test_delete_stage_orphans_every_document() {
        let f = fixture();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        let docs: Vec<Document> = (0..3)
            .map(|i| add_document(&f, &format!("Exhibit {}", i), Some(&court)))
            .collect();

        let removal = f.service.delete_stage(&f.session, &court.id).unwrap();
        assert_eq!(removal.orphaned, 3);

        for doc in docs {
            let after = f.service.get_document(&doc.id).unwrap();
            assert!(after.is_unassigned());
            assert_eq!(after.history, doc.history);
        }
    }

    #[test]
    fn test_scenario_rapid_moves_last_one_wins() {
        let f = fixture();
        let filed = f.service.add_stage(&f.session, "Filed").unwrap();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        let archive = f.service.add_stage(&f.session, "Archive").unwrap();
        let doc = add_document(&f, "Decree", Some(&filed));

        let first = {
            let service = f.service.clone();
            let session = f.session.clone();
            let request = to_stage(&doc, &court);
            std::thread::spawn(move || service.move_document(&session, &request))
        };
        let first_result = first.join().unwrap().unwrap();
        let second_result = f.service.move_document(&f.session, &to_stage(&doc, &archive)).unwrap();

        let after = f.service.get_document(&doc.id).unwrap();
        assert_eq!(after.stage_id(), second_result.record.stage_id());
        assert_eq!(after.history.len(), 3);
        assert_eq!(after.history[1].stage_id(), first_result.record.stage_id());
        assert_eq!(after.history[2].stage_id(), Some(archive.id.as_str()));
        assert_eq!(after.history[2].label(), "Archive");
    }

    #[test]
    fn test_concurrent_moves_keep_placement_consistent() {
        let f = fixture();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        let archive = f.service.add_stage(&f.session, "Archive").unwrap();
        let doc = add_document(&f, "Decree", None);

        let handles: Vec<_> = [court, archive]
            .into_iter()
            .map(|stage| {
                let service = f.service.clone();
                let session = f.session.clone();
                let request = to_stage(&doc, &stage);
                std::thread::spawn(move || service.move_document(&session, &request))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let after = f.service.get_document(&doc.id).unwrap();
        assert_eq!(after.history.len(), 3);
        assert!(after.placement_consistent());
    }

    #[test]
    fn test_failed_move_leaves_state_unchanged() {
        let f = fixture();
        let doc = add_document(&f, "Plaint", None);
        let request = MoveRequest::new(&doc.id, StageTarget::Stage("missing".to_string()));

        let err = f.service.move_document(&f.session, &request).unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(f.service.get_document(&doc.id).unwrap(), doc);
        let events = f.service.events_for("document", &doc.id).unwrap();
        assert!(events.iter().all(|e| e.event_type != "document_moved"));
    }

    #[test]
    fn test_update_with_stage_moves_in_same_transaction() {
        let f = fixture();
        let court = f.service.add_stage(&f.session, "Court").unwrap();
        let doc = add_document(&f, "Draft", None);

        let updated = f
            .service
            .update_document(
                &f.session,
                &doc.id,
                DocumentPatch {
                    name: Some("Final".to_string()),
                    stage: Some(Some(court.id.clone())),
                    notes: Some("filed today".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Final");
        assert_eq!(updated.stage_id(), Some(court.id.as_str()));
        assert_eq!(updated.history.len(), 2);
        assert_eq!(updated.history[1].notes.as_deref(), Some("filed today"));
    }

    #[test]
    fn test_update_with_unknown_stage_rolls_back_edit() {
        let f = fixture();
        let doc = add_document(&f, "Draft", None);

        let err = f
            .service
            .update_document(
                &f.session,
                &doc.id,
                DocumentPatch {
                    name: Some("Renamed".to_string()),
                    stage: Some(Some("missing".to_string())),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.service.get_document(&doc.id).unwrap().name, "Draft");
    }

    #[test]
    fn test_update_without_stage_keeps_history() {
        let f = fixture();
        let doc = add_document(&f, "Draft", None);

        let updated = f
            .service
            .update_document(
                &f.session,
                &doc.id,
                DocumentPatch {
                    name: Some("Final".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.history.len(), 1);
    }

    #[test]
    fn test_mutations_publish_invalidations() {
        let f = fixture();
        let mut sub = f.service.changes().subscribe();

        let stage = f.service.add_stage(&f.session, "Filed").unwrap();
        let doc = add_document(&f, "Plaint", None);
        f.service.move_document(&f.session, &to_stage(&doc, &stage)).unwrap();

        let invalidation = sub.drain();
        assert_eq!(
            invalidation,
            Invalidation::Tags(vec![Tag::DocumentStages, Tag::Documents(f.case.id.clone())])
        );
        assert!(invalidation.affects_board(&f.case.id));
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let f = fixture();
        let mut sub = f.service.changes().subscribe();

        assert!(f.service.delete_stage(&f.session, "missing").is_err());
        assert_eq!(sub.drain(), Invalidation::Tags(vec![]));
    }

    #[test]
    fn test_move_is_audited_with_actor() {
        let f = fixture();
        let stage = f.service.add_stage(&f.session, "Filed").unwrap();
        let doc = add_document(&f, "Plaint", None);
        f.service.move_document(&f.session, &to_stage(&doc, &stage)).unwrap();

        let events = f.service.events_for("document", &doc.id).unwrap();
        assert_eq!(events[0].event_type, "document_moved");
        assert_eq!(events[0].actor, "paralegal");
        assert_eq!(events[0].data["to"], stage.id.as_str());
        assert!(events[0].data["from"].is_null());
    }

    #[test]
    fn test_document_type_management_is_role_gated() {
        let f = fixture();
        let doc_type = f.service.create_document_type(&f.session, "Affidavit").unwrap();

        let err = f
            .service
            .delete_document_type(&f.session, &doc_type.id)
            .unwrap_err();
        assert!(matches!(err, DocketError::Forbidden(_)));

        let admin = Session::new("root", Role::SuperAdmin);
        f.service.rename_document_type(&admin, &doc_type.id, "Sworn affidavit").unwrap();
        f.service.delete_document_type(&admin, &doc_type.id).unwrap();
        assert!(f.service.list_document_types().unwrap().is_empty());
    }

    #[test]
    fn test_deleting_type_keeps_documents() {
        let f = fixture();
        let admin = Session::new("root", Role::SuperAdmin);
        let doc_type = f.service.create_document_type(&f.session, "Affidavit").unwrap();
        let doc = f
            .service
            .create_document(
                &f.session,
                NewDocument {
                    case_id: f.case.id.clone(),
                    contact_id: f.contact.id.clone(),
                    name: "Statement".to_string(),
                    type_id: Some(doc_type.id.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(doc.type_name(), Some("Affidavit"));

        f.service.delete_document_type(&admin, &doc_type.id).unwrap();

        assert!(f.service.get_document(&doc.id).unwrap().doc_type.is_none());
    }

    #[test]
    fn test_delete_contact_removes_its_documents() {
        let f = fixture();
        let doc = add_document(&f, "Plaint", None);

        f.service.delete_contact(&f.session, &f.contact.id).unwrap();

        assert!(f.service.get_document(&doc.id).unwrap_err().is_not_found());
        assert!(f.service.list_case_documents(&f.case.id).unwrap().is_empty());
    }

    #[test]
    fn test_export_timeline() {
        let f = fixture();
        let filed = f.service.add_stage(&f.session, "Filed").unwrap();
        add_document(&f, "Plaint", Some(&filed));
        add_document(&f, "Annexure", None);

        let mut out = Vec::new();
        let rows = f.service.export_timeline(&f.case.id, &mut out).unwrap();

        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Plaint,J. Marsh,Filed,"));
        assert!(text.contains("Annexure,J. Marsh,Unassigned,"));
    }

    #[test]
    fn test_board_of_unknown_case_is_not_found() {
        let f = fixture();
        assert!(f.service.board("missing").unwrap_err().is_not_found());
    }
}
