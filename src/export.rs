// Document timeline export (CSV)
//
// One row per document, creation order:
//   Document Name, Contact, Status / Stage, Added Date

use std::collections::HashMap;
use std::io::Write;

use crate::board::UNASSIGNED_TITLE;
use crate::entities::case::Contact;
use crate::entities::document::Document;
use crate::entities::stage::Stage;
use crate::error::Result;

pub const TIMELINE_HEADER: [&str; 4] = ["Document Name", "Contact", "Status / Stage", "Added Date"];

/// Write the timeline of `documents` as CSV. Returns the number of rows written.
pub fn write_timeline<W: Write>(
    writer: W,
    documents: &[Document],
    contacts: &[Contact],
    stages: &[Stage],
) -> Result<usize> {
    let contact_names: HashMap<&str, &str> = contacts
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();
    let stage_names: HashMap<&str, &str> = stages
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(TIMELINE_HEADER)?;

    for doc in documents {
        let stage = doc
            .stage_id()
            .and_then(|id| stage_names.get(id).copied())
            .unwrap_or(UNASSIGNED_TITLE);
        let contact = contact_names
            .get(doc.contact_id.as_str())
            .copied()
            .unwrap_or("");
        let added = doc.created_at.format("%Y-%m-%d").to_string();

        wtr.write_record([doc.name.as_str(), contact, stage, added.as_str()])?;
    }

    wtr.flush()?;
    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::document::StageRef;
    use chrono::{TimeZone, Utc};

    fn contact(id: &str, name: &str) -> Contact {
        Contact {
            id: id.to_string(),
            case_id: "case".to_string(),
            name: name.to_string(),
            role: None,
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn document(name: &str, contact_id: &str, stage: Option<&Stage>) -> Document {
        let added = Utc.with_ymd_and_hms(2024, 3, 9, 15, 30, 0).unwrap();
        Document {
            id: name.to_lowercase(),
            case_id: "case".to_string(),
            contact_id: contact_id.to_string(),
            name: name.to_string(),
            doc_type: None,
            stage: stage.map(StageRef::from),
            history: Vec::new(),
            created_at: added,
            updated_at: added,
        }
    }

    #[test]
    fn test_timeline_rows() {
        let court = Stage {
            id: "s1".to_string(),
            name: "Court".to_string(),
            order: 0,
            created_at: Utc::now(),
        };
        let docs = vec![
            document("Affidavit", "c1", Some(&court)),
            document("Deed, certified", "c2", None),
        ];
        let contacts = vec![contact("c1", "R. Mensah")];

        let mut out = Vec::new();
        let rows = write_timeline(&mut out, &docs, &contacts, &[court]).unwrap();

        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Document Name,Contact,Status / Stage,Added Date");
        assert_eq!(lines[1], "Affidavit,R. Mensah,Court,2024-03-09");
        assert_eq!(lines[2], "\"Deed, certified\",,Unassigned,2024-03-09");
    }

    #[test]
    fn test_empty_timeline_has_header_only() {
        let mut out = Vec::new();
        let rows = write_timeline(&mut out, &[], &[], &[]).unwrap();

        assert_eq!(rows, 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
