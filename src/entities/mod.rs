// Entity Models
//
// Each entity has:
// - Stable identity (UUID) that never changes
// - Row mapping + queries next to the type
// - Validation of user supplied names before anything is written

pub mod case;
pub mod stage;
pub mod document_type;
pub mod document;

pub use case::{Case, Contact, NewCase, NewContact};
pub use stage::{Stage, StageRegistry, StageRemoval};
pub use document_type::DocumentType;
pub use document::{Document, DocumentPatch, MovementRecord, NewDocument, StageTarget};
