//! Submission workflow orchestration.
//!
//! `Workflow::run` drives one submission through Addressing, Validating and
//! Proving, stopping at the first failure. The orchestrator owns exactly one
//! `WorkflowState`; `run` takes `&mut self`, so a second submission cannot
//! start on the same orchestrator while one is in flight.
//!
//! Stages are not retried, not cancelled and not compensated. If validation or
//! proving fails after the files were pinned, the pin stays and its CID is left
//! readable through `state().content_address()` for the caller to deal with.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::obs;
use crate::progress::ProgressSink;
use crate::proof::{MockGroth16, ProofGenerator, ZkProof};
use crate::state::{StageResult, WorkflowStage, WorkflowState};
use crate::storage::{address_files, ContentAddressResult, PinningService};
use crate::submission::{DatasetMetadata, SubmissionInput};
use crate::validation::{validate_dataset, QualityJitter, RandomJitter, ValidationResult};

/// Everything a successful submission produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSubmission {
    pub submission_id: Uuid,
    pub content_address: ContentAddressResult,
    pub validation: ValidationResult,
    pub proof: ZkProof,
    pub metadata: DatasetMetadata,
}

type CompletionCallback = Box<dyn FnMut(&CompletedSubmission) + Send>;

/// Submission orchestrator.
pub struct Workflow {
    pinning: Arc<dyn PinningService>,
    jitter: Box<dyn QualityJitter>,
    prover: Box<dyn ProofGenerator>,
    state: WorkflowState,
    on_complete: Option<CompletionCallback>,
}

impl Workflow {
    pub fn new(pinning: Arc<dyn PinningService>) -> Self {
        Self {
            pinning,
            jitter: Box::new(RandomJitter::from_entropy()),
            prover: Box::new(MockGroth16::new()),
            state: WorkflowState::new(),
            on_complete: None,
        }
    }

    pub fn with_jitter(mut self, jitter: impl QualityJitter + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    pub fn with_prover(mut self, prover: impl ProofGenerator + 'static) -> Self {
        self.prover = Box::new(prover);
        self
    }

    /// Register a callback invoked once per successful submission.
    pub fn on_complete(
        mut self,
        callback: impl FnMut(&CompletedSubmission) + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Drop the previous submission's state and return to Idle.
    pub fn reset(&mut self) {
        self.state = WorkflowState::new();
    }

    /// Run one submission to a terminal state.
    ///
    /// Preconditions (at least one file, non-blank title) are checked before
    /// any stage runs. On success the completion callback fires and the
    /// combined result is returned; on failure the state is `Failed` with the
    /// error message recorded.
    pub async fn run(
        &mut self,
        input: SubmissionInput,
        progress: &mut dyn ProgressSink,
    ) -> Result<CompletedSubmission, SubmissionError> {
        self.reset();
        let submission_id = self.state.submission_id().to_string();
        let span = obs::submission_span(&submission_id);

        let outcome = self.drive(&input, progress).instrument(span).await;

        match outcome {
            Ok(done) => {
                obs::emit_submission_completed(
                    &submission_id,
                    &done.content_address.cid,
                    done.validation.score,
                    &done.proof.proof_hash,
                );
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(&done);
                }
                Ok(done)
            }
            Err(err) => {
                let stage = self.state.stage();
                obs::emit_submission_failed(&submission_id, stage, &err);
                if let Some(pinned) = self.state.content_address() {
                    obs::emit_orphaned_pin(&submission_id, &pinned.cid);
                }
                self.state.fail(err.to_string());
                Err(err)
            }
        }
    }

    async fn drive(
        &mut self,
        input: &SubmissionInput,
        progress: &mut dyn ProgressSink,
    ) -> Result<CompletedSubmission, SubmissionError> {
        input.check_preconditions()?;
        obs::emit_submission_started(
            &self.state.submission_id().to_string(),
            input.files.len(),
            input.total_size(),
        );

        // Addressing
        let started = self.enter(WorkflowStage::Addressing, progress)?;
        let content_address = address_files(
            self.pinning.as_ref(),
            &input.files,
            &input.metadata.title,
        )
        .await
        .map_err(|e| SubmissionError::stage(WorkflowStage::Addressing, e))?;
        self.finish(
            StageResult::ContentAddress(content_address.clone()),
            started,
            progress,
        );

        // Validating
        let started = self.enter(WorkflowStage::Validating, progress)?;
        let representative = input.representative().ok_or_else(|| {
            SubmissionError::Precondition("Please select at least one file".to_string())
        })?;
        let validation = validate_dataset(representative, self.jitter.as_mut())
            .map_err(|e| SubmissionError::stage(WorkflowStage::Validating, e))?;
        self.finish(
            StageResult::Validation(validation.clone()),
            started,
            progress,
        );

        // Proving
        let started = self.enter(WorkflowStage::Proving, progress)?;
        let proof = self
            .prover
            .generate(&input.files, validation.score)
            .map_err(|e| SubmissionError::stage(WorkflowStage::Proving, e))?;
        self.finish(StageResult::Proof(proof.clone()), started, progress);

        self.state.advance(WorkflowStage::Complete)?;

        Ok(CompletedSubmission {
            submission_id: self.state.submission_id(),
            content_address,
            validation,
            proof,
            metadata: input.metadata.clone(),
        })
    }

    fn enter(
        &mut self,
        stage: WorkflowStage,
        progress: &mut dyn ProgressSink,
    ) -> Result<Instant, SubmissionError> {
        self.state.advance(stage)?;
        obs::emit_stage_entered(&self.state.submission_id().to_string(), stage);
        self.report(0, progress);
        Ok(Instant::now())
    }

    fn finish(&mut self, result: StageResult, started: Instant, progress: &mut dyn ProgressSink) {
        let stage = result.stage();
        self.state.record(result);
        self.report(100, progress);
        obs::emit_stage_completed(
            &self.state.submission_id().to_string(),
            stage,
            started.elapsed().as_millis() as u64,
        );
    }

    fn report(&mut self, percent: u8, progress: &mut dyn ProgressSink) {
        let reported = self.state.set_progress(percent);
        progress.on_progress(self.state.stage(), reported);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryPinningService;
    use crate::progress::ProgressLog;
    use crate::submission::DatasetFile;
    use crate::validation::FixedJitter;
    use std::sync::Mutex;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the `event` field of every lifecycle event.
    #[derive(Clone, Default)]
    struct EventNames(Arc<Mutex<Vec<String>>>);

    impl EventNames {
        fn names(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for EventNames {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct EventField<'a>(&'a mut Option<String>);

            impl tracing::field::Visit for EventField<'_> {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "event" {
                        *self.0 = Some(value.to_string());
                    }
                }

                fn record_debug(&mut self, _: &tracing::field::Field, _: &dyn std::fmt::Debug) {}
            }

            let mut name = None;
            event.record(&mut EventField(&mut name));
            if let Some(name) = name {
                self.0.lock().unwrap().push(name);
            }
        }
    }

    fn input(files: Vec<DatasetFile>, title: &str) -> SubmissionInput {
        SubmissionInput::new(files, DatasetMetadata::titled(title))
    }

    fn workflow(service: Arc<MemoryPinningService>) -> Workflow {
        Workflow::new(service)
            .with_jitter(FixedJitter(10.0))
            .with_prover(MockGroth16::seeded(1))
    }

    #[tokio::test]
    async fn test_happy_path_reaches_complete() {
        let service = Arc::new(MemoryPinningService::new());
        let mut wf = workflow(service.clone());
        let mut log = ProgressLog::new();

        let done = wf
            .run(input(vec![DatasetFile::new("a.csv", vec![1; 100])], "t"), &mut log)
            .await
            .unwrap();

        assert_eq!(wf.state().stage(), WorkflowStage::Complete);
        assert_eq!(wf.state().progress(), 100);
        assert_eq!(wf.state().results().len(), 3);
        assert!(wf.state().error().is_none());
        assert_eq!(done.submission_id, wf.state().submission_id());
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_is_zero_then_hundred_per_stage() {
        let service = Arc::new(MemoryPinningService::new());
        let mut wf = workflow(service);
        let mut log = ProgressLog::new();

        wf.run(input(vec![DatasetFile::new("a.csv", vec![1; 100])], "t"), &mut log)
            .await
            .unwrap();

        for stage in [
            WorkflowStage::Addressing,
            WorkflowStage::Validating,
            WorkflowStage::Proving,
        ] {
            assert_eq!(log.for_stage(stage), vec![0, 100], "stage {stage}");
        }
    }

    #[tokio::test]
    async fn test_precondition_failure_skips_stages() {
        let service = Arc::new(MemoryPinningService::new());
        let mut wf = workflow(service.clone());
        let mut log = ProgressLog::new();

        let err = wf.run(input(vec![], "t"), &mut log).await.unwrap_err();

        assert!(matches!(err, SubmissionError::Precondition(_)));
        assert_eq!(wf.state().stage(), WorkflowStage::Failed);
        assert_eq!(wf.state().error(), Some("Please select at least one file"));
        assert!(log.updates.is_empty());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_pin() {
        let service = Arc::new(MemoryPinningService::new());
        let mut wf = workflow(service.clone());
        let mut log = ProgressLog::new();

        let err = wf
            .run(input(vec![DatasetFile::new("empty.csv", vec![])], "t"), &mut log)
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(WorkflowStage::Validating));
        assert_eq!(wf.state().stage(), WorkflowStage::Failed);
        let pinned = wf.state().content_address().expect("pin recorded");
        assert!(service.is_pinned(&pinned.cid));
        assert!(wf.state().validation().is_none());
    }

    #[tokio::test]
    async fn test_completion_callback_fires_once() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut wf = workflow(Arc::new(MemoryPinningService::new())).on_complete(move |done| {
            sink.lock().unwrap().push(done.metadata.title.clone());
        });
        let mut log = ProgressLog::new();

        wf.run(input(vec![DatasetFile::new("a.csv", vec![1])], "first"), &mut log)
            .await
            .unwrap();
        let _ = wf.run(input(vec![], "second"), &mut log).await;

        assert_eq!(*seen.lock().unwrap(), vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_new_run_starts_from_fresh_state() {
        let mut wf = workflow(Arc::new(MemoryPinningService::new()));
        let mut log = ProgressLog::new();

        let _ = wf.run(input(vec![], "t"), &mut log).await;
        let failed_id = wf.state().submission_id();

        wf.run(input(vec![DatasetFile::new("a.csv", vec![1])], "t"), &mut log)
            .await
            .unwrap();
        assert_ne!(wf.state().submission_id(), failed_id);
        assert_eq!(wf.state().stage(), WorkflowStage::Complete);
        assert!(wf.state().error().is_none());
    }

    #[tokio::test]
    async fn test_rejected_submission_is_never_reported_started() {
        let events = EventNames::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));
        let mut wf = workflow(Arc::new(MemoryPinningService::new()));
        let mut log = ProgressLog::new();

        let _ = wf.run(input(vec![], "t"), &mut log).await;

        let names = events.names();
        assert!(names.contains(&"submission.failed".to_string()));
        assert!(!names.contains(&"submission.started".to_string()));
    }

    #[tokio::test]
    async fn test_accepted_submission_reports_started_first() {
        let events = EventNames::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));
        let mut wf = workflow(Arc::new(MemoryPinningService::new()));
        let mut log = ProgressLog::new();

        wf.run(input(vec![DatasetFile::new("a.csv", vec![1])], "t"), &mut log)
            .await
            .unwrap();

        let names = events.names();
        assert_eq!(names.first().map(String::as_str), Some("submission.started"));
        assert_eq!(names.last().map(String::as_str), Some("submission.completed"));
    }
}
