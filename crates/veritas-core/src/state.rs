//! Workflow stage machine and the state the orchestrator owns.
//!
//! ```text
//! Idle --start--> Addressing --ok--> Validating --ok--> Proving --ok--> Complete
//! Addressing | Validating | Proving --fail--> Failed
//! ```
//!
//! `Idle -> Failed` is also legal: it is how a precondition rejection is recorded.
//! Nothing leaves `Complete` or `Failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::proof::ZkProof;
use crate::storage::ContentAddressResult;
use crate::validation::ValidationResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Idle,
    Addressing,
    Validating,
    Proving,
    Complete,
    Failed,
}

impl WorkflowStage {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStage::Idle => "idle",
            WorkflowStage::Addressing => "addressing",
            WorkflowStage::Validating => "validating",
            WorkflowStage::Proving => "proving",
            WorkflowStage::Complete => "complete",
            WorkflowStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Complete | WorkflowStage::Failed)
    }

    /// The stage that follows on success, if any.
    pub fn next(&self) -> Option<WorkflowStage> {
        match self {
            WorkflowStage::Idle => Some(WorkflowStage::Addressing),
            WorkflowStage::Addressing => Some(WorkflowStage::Validating),
            WorkflowStage::Validating => Some(WorkflowStage::Proving),
            WorkflowStage::Proving => Some(WorkflowStage::Complete),
            WorkflowStage::Complete | WorkflowStage::Failed => None,
        }
    }

    /// Slot of a working stage in the per-stage progress table.
    fn progress_slot(&self) -> Option<usize> {
        match self {
            WorkflowStage::Addressing => Some(0),
            WorkflowStage::Validating => Some(1),
            WorkflowStage::Proving => Some(2),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, to: WorkflowStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == WorkflowStage::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one completed stage. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageResult {
    ContentAddress(ContentAddressResult),
    Validation(ValidationResult),
    Proof(ZkProof),
}

impl StageResult {
    pub fn stage(&self) -> WorkflowStage {
        match self {
            StageResult::ContentAddress(_) => WorkflowStage::Addressing,
            StageResult::Validation(_) => WorkflowStage::Validating,
            StageResult::Proof(_) => WorkflowStage::Proving,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            StageResult::ContentAddress(r) => r.timestamp,
            StageResult::Validation(r) => r.timestamp,
            StageResult::Proof(r) => r.timestamp,
        }
    }
}

/// State of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    submission_id: Uuid,
    stage: WorkflowStage,
    /// Last working stage entered; terminal states report its progress.
    last_working: Option<WorkflowStage>,
    /// Progress of Addressing, Validating and Proving, in that order.
    stage_progress: [u8; 3],
    results: Vec<StageResult>,
    error: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            stage: WorkflowStage::Idle,
            last_working: None,
            stage_progress: [0; 3],
            results: Vec::new(),
            error: None,
        }
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Progress of the current stage, 0..=100. Once terminal, the last
    /// reading of the stage that was running is kept.
    pub fn progress(&self) -> u8 {
        self.last_working
            .map(|stage| self.stage_progress(stage))
            .unwrap_or(0)
    }

    /// Progress recorded for one working stage; 0 for stages never entered.
    pub fn stage_progress(&self, stage: WorkflowStage) -> u8 {
        stage
            .progress_slot()
            .map(|slot| self.stage_progress[slot])
            .unwrap_or(0)
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn content_address(&self) -> Option<&ContentAddressResult> {
        self.results.iter().find_map(|r| match r {
            StageResult::ContentAddress(c) => Some(c),
            _ => None,
        })
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.results.iter().find_map(|r| match r {
            StageResult::Validation(v) => Some(v),
            _ => None,
        })
    }

    pub fn proof(&self) -> Option<&ZkProof> {
        self.results.iter().find_map(|r| match r {
            StageResult::Proof(p) => Some(p),
            _ => None,
        })
    }

    pub(crate) fn advance(&mut self, to: WorkflowStage) -> Result<(), SubmissionError> {
        if !self.stage.can_transition_to(to) {
            return Err(SubmissionError::InvalidTransition {
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        if to.progress_slot().is_some() {
            self.last_working = Some(to);
        }
        Ok(())
    }

    /// Raise progress for the current stage. Values never go down and are capped at 100.
    pub(crate) fn set_progress(&mut self, percent: u8) -> u8 {
        let Some(slot) = self.stage.progress_slot() else {
            return self.progress();
        };
        let current = &mut self.stage_progress[slot];
        *current = (*current).max(percent.min(100));
        *current
    }

    pub(crate) fn record(&mut self, result: StageResult) {
        self.results.push(result);
    }

    pub(crate) fn fail(&mut self, message: String) {
        // A terminal state keeps its first error.
        if self.stage.is_terminal() {
            return;
        }
        self.stage = WorkflowStage::Failed;
        self.error = Some(message);
    }
}
