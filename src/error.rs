use thiserror::Error;

use crate::scheduling::import::ImportPhase;

/// Failures that abort a whole import run. Row-level problems never become
/// one of these; they are counted in the summary instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("workbook could not be read: {0}")]
    WorkbookUnreadable(String),

    #[error("required sheets not found: missing {missing:?}, workbook has {found:?}")]
    MissingSheets {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("nothing to import: every roster and schedule sheet is empty")]
    NoRows,

    #[error("store failure during {phase}: {message}")]
    Store { phase: ImportPhase, message: String },
}

impl ImportError {
    pub fn store(phase: ImportPhase, err: anyhow::Error) -> Self {
        ImportError::Store {
            phase,
            message: format!("{err:#}"),
        }
    }

    /// Wire error code for the JSON transport.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::WorkbookUnreadable(_) => "workbook_unreadable",
            ImportError::MissingSheets { .. } | ImportError::NoRows => "missing_sheets",
            ImportError::Store { .. } => "import_failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("group {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
