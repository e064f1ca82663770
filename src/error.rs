use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportEngineError {
    #[error("Failed to read ledger sources at {path}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed ledger row '{row}': {details}")]
    MalformedRow { row: String, details: String },

    #[error("Failed to submit report flow: {0}")]
    Submission(String),

    #[error("Report flow not found: {0}")]
    FlowNotFound(String),

    #[error("Unknown report job name: {0}")]
    UnknownJob(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportEngineError>;
