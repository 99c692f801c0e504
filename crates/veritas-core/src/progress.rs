//! Per-stage progress reporting.
//!
//! Progress is honest: the pinning endpoint gives no byte-level signal, so a
//! stage reports 0 when it starts and 100 only once its call has returned.
//! Nothing in between is fabricated. Within a stage, reported values never
//! decrease.

use crate::state::WorkflowStage;

/// Receives `(stage, percent)` updates, `percent` in `0..=100`.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, stage: WorkflowStage, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(WorkflowStage, u8) + Send,
{
    fn on_progress(&mut self, stage: WorkflowStage, percent: u8) {
        self(stage, percent)
    }
}

/// Collects every update; handy for asserting on the sequence afterwards.
#[derive(Debug, Default, Clone)]
pub struct ProgressLog {
    pub updates: Vec<(WorkflowStage, u8)>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates for one stage, in order.
    pub fn for_stage(&self, stage: WorkflowStage) -> Vec<u8> {
        self.updates
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl ProgressSink for ProgressLog {
    fn on_progress(&mut self, stage: WorkflowStage, percent: u8) {
        self.updates.push((stage, percent));
    }
}
