// Case & Contact - owners of tracked documents
//
// A Case aggregates contacts; each Contact owns the documents filed for it.
// Only the fields the document board needs are modelled here.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, new_id, now, parse_timestamp};
use crate::error::{require_name, DocketError, Result};

// ============================================================================
// CASE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub title: String,
    pub case_number: Option<String>,
    pub client_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Form payload for `POST /cases`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    pub title: String,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
}

impl Case {
    pub fn new(input: NewCase) -> Result<Self> {
        Ok(Case {
            id: new_id(),
            title: require_name("title", &input.title)?,
            case_number: non_blank(input.case_number),
            client_name: non_blank(input.client_name),
            created_at: now(),
        })
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(4)?;
        Ok(Case {
            id: row.get(0)?,
            title: row.get(1)?,
            case_number: row.get(2)?,
            client_name: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
        })
    }
}

pub fn insert_case(conn: &Connection, case: &Case) -> Result<()> {
    conn.execute(
        "INSERT INTO cases (id, title, case_number, client_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            case.id,
            case.title,
            case.case_number,
            case.client_name,
            format_timestamp(&case.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_case(conn: &Connection, id: &str) -> Result<Option<Case>> {
    let case = conn
        .query_row(
            "SELECT id, title, case_number, client_name, created_at FROM cases WHERE id = ?1",
            [id],
            Case::from_row,
        )
        .optional()?;
    Ok(case)
}

pub fn get_case(conn: &Connection, id: &str) -> Result<Case> {
    find_case(conn, id)?.ok_or_else(|| DocketError::not_found("case", id))
}

pub fn list_cases(conn: &Connection) -> Result<Vec<Case>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, case_number, client_name, created_at
         FROM cases
         ORDER BY created_at DESC",
    )?;
    let cases = stmt
        .query_map([], Case::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cases)
}

/// Deletes the case; contacts, documents and their history cascade
pub fn delete_case(conn: &Connection, id: &str) -> Result<Case> {
    let case = get_case(conn, id)?;
    conn.execute("DELETE FROM cases WHERE id = ?1", [id])?;
    Ok(case)
}

// ============================================================================
// CONTACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub case_id: String,
    pub name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Form payload for `POST /contacts`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub case_id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contact {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(5)?;
        Ok(Contact {
            id: row.get(0)?,
            case_id: row.get(1)?,
            name: row.get(2)?,
            role: row.get(3)?,
            phone: row.get(4)?,
            created_at: parse_timestamp(5, &created_at)?,
        })
    }
}

pub fn insert_contact(conn: &Connection, input: NewContact) -> Result<Contact> {
    let name = require_name("name", &input.name)?;
    get_case(conn, &input.case_id)?;

    let contact = Contact {
        id: new_id(),
        case_id: input.case_id,
        name,
        role: non_blank(input.role),
        phone: non_blank(input.phone),
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO contacts (id, case_id, name, role, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            contact.id,
            contact.case_id,
            contact.name,
            contact.role,
            contact.phone,
            format_timestamp(&contact.created_at),
        ],
    )?;

    Ok(contact)
}

pub fn get_contact(conn: &Connection, id: &str) -> Result<Contact> {
    conn.query_row(
        "SELECT id, case_id, name, role, phone, created_at FROM contacts WHERE id = ?1",
        [id],
        Contact::from_row,
    )
    .optional()?
    .ok_or_else(|| DocketError::not_found("contact", id))
}

pub fn list_contacts(conn: &Connection, case_id: &str) -> Result<Vec<Contact>> {
    get_case(conn, case_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, case_id, name, role, phone, created_at
         FROM contacts
         WHERE case_id = ?1
         ORDER BY created_at",
    )?;
    let contacts = stmt
        .query_map([case_id], Contact::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(contacts)
}

/// Deletes the contact together with the documents it owns
pub fn delete_contact(conn: &Connection, id: &str) -> Result<Contact> {
    let contact = get_contact(conn, id)?;
    conn.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
    Ok(contact)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
