// Case Docket - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod db;
pub mod entities;    // Cases, contacts, stages, document types, documents
pub mod movement;    // Move Protocol
pub mod board;       // Board projection + drag state machine
pub mod changes;     // Tag based invalidation feed
pub mod session;
pub mod export;
pub mod service;
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{DocketError, Result};
pub use db::{setup_database, open_database, insert_event, get_events_for_entity, Event};
pub use entities::{
    Case, Contact, NewCase, NewContact,
    Stage, StageRegistry, StageRemoval,
    DocumentType,
    Document, DocumentPatch, MovementRecord, NewDocument, StageTarget,
};
pub use movement::{MoveOutcome, MoveRequest};
pub use board::{Board, Column, Card, DragState, DropTarget};
pub use changes::{ChangeFeed, Invalidation, Tag};
pub use session::{Role, Session};
pub use service::DocketService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
