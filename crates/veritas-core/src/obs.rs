//! Structured observability hooks for the submission lifecycle.
//!
//! This module provides:
//! - A submission-scoped span, attached to the workflow future via `Instrument`
//! - Emission functions for key lifecycle events: start, stage entry/exit, finish, failure
//!
//! Events are emitted at `info!` level (`warn!` for failures). Filter with
//! `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

use crate::state::WorkflowStage;

/// Span tagged with the submission id. Enter it with `Instrument::instrument`,
/// not `Span::entered`, since the workflow awaits across stages.
pub fn submission_span(submission_id: &str) -> tracing::Span {
    tracing::info_span!("veritas.submission", submission_id = %submission_id)
}

/// Emit event: submission accepted, preconditions not yet checked.
///
/// # Example
///
/// ```ignore
/// emit_submission_started("3f0c...", 2, 4096);
/// // logs: event=submission.started submission_id=3f0c... file_count=2 total_size=4096
/// ```
pub fn emit_submission_started(submission_id: &str, file_count: usize, total_size: u64) {
    info!(
        event = "submission.started",
        submission_id = %submission_id,
        file_count = file_count,
        total_size = total_size,
    );
}

pub fn emit_stage_entered(submission_id: &str, stage: WorkflowStage) {
    info!(event = "stage.entered", submission_id = %submission_id, stage = %stage);
}

pub fn emit_stage_completed(submission_id: &str, stage: WorkflowStage, duration_ms: u64) {
    info!(
        event = "stage.completed",
        submission_id = %submission_id,
        stage = %stage,
        duration_ms = duration_ms,
    );
}

/// Emit event: submission completed with its CID, score and proof hash.
pub fn emit_submission_completed(submission_id: &str, cid: &str, score: u8, proof_hash: &str) {
    info!(
        event = "submission.completed",
        submission_id = %submission_id,
        cid = %cid,
        score = score,
        proof_hash = %proof_hash,
    );
}

/// Emit event: submission failed (warning level).
pub fn emit_submission_failed(
    submission_id: &str,
    stage: WorkflowStage,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "submission.failed",
        submission_id = %submission_id,
        stage = %stage,
        error = %error,
    );
}

/// Emit event: content stayed pinned although the submission failed later.
pub fn emit_orphaned_pin(submission_id: &str, cid: &str) {
    warn!(event = "submission.orphaned_pin", submission_id = %submission_id, cid = %cid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        let span = submission_span("sub-1");
        let _guard = span.enter();
        emit_submission_started("sub-1", 1, 10);
        emit_stage_entered("sub-1", WorkflowStage::Addressing);
        emit_stage_completed("sub-1", WorkflowStage::Addressing, 3);
        emit_submission_completed("sub-1", "bafy", 70, "0xabc");
        emit_submission_failed("sub-1", WorkflowStage::Proving, &"boom");
        emit_orphaned_pin("sub-1", "bafy");
    }
}
