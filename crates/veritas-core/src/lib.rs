//! Veritas Core - dataset submission workflow
//!
//! A contributor hands over one or more dataset files plus listing metadata.
//! The [`Workflow`] orchestrator then runs three stages in a fixed order:
//!
//! 1. **Addressing** - pin the files on a content-addressed store and obtain a CID
//! 2. **Validating** - score one representative file with a heuristic validator
//! 3. **Proving** - attach a fixed-shape proof whose public signals summarise the files
//!
//! The validation certificate and the proof are placeholders. Neither is tied
//! to file contents in any cryptographic sense, and [`verify_proof`] only checks
//! structure. Nothing in this crate should be treated as a security boundary.
//!
//! ## Key Components
//!
//! - `Workflow`: owns one `WorkflowState` and drives the stage machine
//! - `PinningService`: content-addressing backend (`PinataClient`, `fakes::MemoryPinningService`)
//! - `WalletSession`: explicit sign-in session with pluggable persistence

pub mod config;
pub mod digest;
mod error;
pub mod fakes;
pub mod listing;
pub mod obs;
pub mod progress;
pub mod proof;
pub mod session;
pub mod state;
pub mod storage;
pub mod submission;
pub mod telemetry;
pub mod validation;
pub mod workflow;

pub use config::{PinningConfig, SessionConfig};
pub use error::{ListingError, ProofError, SessionError, StorageError, SubmissionError, ValidationError};
pub use listing::{format_file_size, parse_near_amount, truncate_hash, ListingDraft};
pub use progress::ProgressSink;
pub use proof::{
    dataset_checksum, verify_proof, verify_proof_json, MockGroth16, ProofData, ProofGenerator,
    ProofProperties, ProofVerification, ZkProof,
};
pub use session::{FileSessionStore, SessionStore, WalletSession};
pub use state::{StageResult, WorkflowStage, WorkflowState};
pub use storage::{
    address_files, ContentAddressResult, PinReceipt, PinataClient, PinningService, StorageResult,
};
pub use submission::{DatasetFile, DatasetMetadata, SubmissionInput};
pub use telemetry::init_tracing;
pub use validation::{
    classify_extension, validate_dataset, verify_certificate, DatasetType, FixedJitter,
    QualityJitter, RandomJitter, ValidationChecks, ValidationResult, ValidationTier,
};
pub use workflow::{CompletedSubmission, Workflow};
