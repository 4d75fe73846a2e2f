// Error taxonomy for the docket
//
// Validation  -> form-level problem with a submitted field
// NotFound    -> missing case/contact/document/stage/type
// Forbidden   -> session role not allowed to perform the action
// everything else is a request/storage failure

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocketError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export error: {0}")]
    Export(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DocketError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DocketError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DocketError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocketError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocketError>;

/// Trim a user supplied name and reject it when blank
pub fn require_name(field: &'static str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DocketError::validation(field, "Name is required"));
    }
    Ok(trimmed.to_string())
}
