use serde::Serialize;
use thiserror::Error;

use crate::schema::ReportType;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Inference service error: {0}")]
    Inference(String),

    #[error("No usable value could be recovered from the {report} response")]
    ExtractionNotFound {
        report: ReportType,
        raw_response: String,
    },

    #[error("No sheet found for day {day}; available sheets: [{}]", available.join(", "))]
    SheetNotFound { day: u8, available: Vec<String> },

    #[error("Invalid cell address '{0}'")]
    InvalidCellAddress(String),

    #[error("Workbook persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Coarse error categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    InputValidation,
    Inference,
    ExtractionNotFound,
    SheetNotFound,
    Persistence,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Configuration(_) => ErrorKind::Configuration,
            LedgerError::InputValidation(_) => ErrorKind::InputValidation,
            LedgerError::Inference(_) => ErrorKind::Inference,
            #[cfg(feature = "gemini")]
            LedgerError::HttpError(_) => ErrorKind::Inference,
            LedgerError::ExtractionNotFound { .. } => ErrorKind::ExtractionNotFound,
            LedgerError::SheetNotFound { .. } => ErrorKind::SheetNotFound,
            LedgerError::Persistence(_) | LedgerError::IoError(_) => ErrorKind::Persistence,
            LedgerError::InvalidCellAddress(_) | LedgerError::SerializationError(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
