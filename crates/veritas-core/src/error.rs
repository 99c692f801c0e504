//! Error types for veritas-core

use thiserror::Error;

use crate::state::WorkflowStage;

/// Errors raised by a pinning endpoint or its client.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The endpoint answered with a non-2xx status. The body is kept verbatim.
    #[error("{operation} failed: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Transport-level failure (connection refused, TLS, decoding)
    #[error("HTTP error: {0}")]
    Http(String),

    /// 2xx response whose body did not match the expected shape
    #[error("Malformed pinning response: {0}")]
    MalformedResponse(String),

    /// Client could not be built from its configuration
    #[error("Pinning client misconfigured: {0}")]
    Config(String),

    #[error("No files to pin")]
    NoFiles,

    #[error("Pin not found: {cid}")]
    NotFound { cid: String },
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err.to_string())
    }
}

/// Errors produced by the validation stage.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("file {name} is empty")]
    EmptyFile { name: String },
}

/// Errors produced by the proof stage.
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("cannot build a proof over zero files")]
    NoFiles,

    #[error("proof serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from wallet session persistence.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("session store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors from building a marketplace listing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ListingError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),
}

/// Top-level workflow errors, surfaced to the submitter as one message.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Input rejected before any stage started. No external call was made.
    #[error("{0}")]
    Precondition(String),

    /// A stage failed; the pipeline stopped there.
    #[error("{message}")]
    Stage {
        stage: WorkflowStage,
        message: String,
    },

    #[error("illegal workflow transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkflowStage,
        to: WorkflowStage,
    },
}

impl SubmissionError {
    /// Wrap a stage-specific error, keeping only its user-facing message.
    pub fn stage(stage: WorkflowStage, err: impl std::fmt::Display) -> Self {
        SubmissionError::Stage {
            stage,
            message: err.to_string(),
        }
    }

    /// Stage the error was raised in, if any.
    pub fn failed_stage(&self) -> Option<WorkflowStage> {
        match self {
            SubmissionError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
