//! Batch executor.
//!
//! Runs a validated [`BatchConfig`] over a list of records, one record at a
//! time:
//!
//! ```text
//! get_fields -> resolve source -> process text -> select voice
//!            -> synthesize -> store audio -> write target field
//! ```
//!
//! A record that fails is recorded in the outcome and the run moves on. A
//! provider error classified as fatal (see [`ProviderError::is_fatal`])
//! stops the run in the `Failed` state and leaves the remaining records
//! untouched. Cancellation is checked before each record; the record in
//! flight always finishes.

use crate::config::BatchConfig;
use crate::error::{BatchError, StoreError};
use crate::media::{audio_filename, sound_tag};
use crate::record::{MediaStore, RecordFields, RecordStore};
use crate::source::CompiledSource;
use crate::target::BatchTarget;
use crate::text::{RuleIssue, TextProcessor};
use chrono::{DateTime, Utc};
use hypertts_types::{RecordId, VoiceId};
use hypertts_voice::{
    ProviderError, ProviderRegistry, SelectionError, VoiceSelection, VoiceSelectionMode,
    VoiceWithOptions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// Default capacity of the event channel returned by
/// [`BatchExecutor::start_batch`].
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Executor tunables.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Capacity of the progress event channel.
    pub event_capacity: usize,
    /// In Priority mode, retry a record with the next available voice
    /// after a non-fatal provider error.
    pub priority_fallback: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            priority_fallback: true,
        }
    }
}

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Interrupted,
    Failed,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Success { audio_reference: String },
    SkippedNoText,
    Error { reason: String },
}

impl RecordOutcome {
    fn error(reason: impl ToString) -> Self {
        Self::Error {
            reason: reason.to_string(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub state: BatchState,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// Failed records with the reason each failed.
    pub failed: Vec<(RecordId, String)>,
    /// Every processed record, in processing order.
    pub records: Vec<(RecordId, RecordOutcome)>,
    /// Text processing rules skipped because they could not be compiled.
    pub rule_issues: Vec<RuleIssue>,
    /// The error that stopped a `Failed` run.
    pub fatal_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    fn new(run_id: Uuid, total: usize, rule_issues: Vec<RuleIssue>) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            state: BatchState::Running,
            total,
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
            records: Vec::new(),
            rule_issues,
            fatal_error: None,
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, id: RecordId, outcome: RecordOutcome) {
        match &outcome {
            RecordOutcome::Success { .. } => self.succeeded += 1,
            RecordOutcome::SkippedNoText => self.skipped += 1,
            RecordOutcome::Error { reason } => self.failed.push((id, reason.clone())),
        }
        self.records.push((id, outcome));
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Records that were never reached (cancelled or aborted runs).
    pub fn untouched(&self) -> usize {
        self.total - self.records.len()
    }
}

/// Progress notifications sent while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { run_id: Uuid, total: usize },
    RecordFinished {
        record_id: RecordId,
        outcome: RecordOutcome,
    },
    /// `current` records out of `total` have been processed.
    Progress { current: usize, total: usize },
    Finished(BatchOutcome),
}

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The run stops before its next record.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A batch running on a background task.
#[derive(Debug)]
pub struct BatchHandle {
    pub cancel: CancelToken,
    pub events: mpsc::Receiver<BatchEvent>,
    pub join: JoinHandle<BatchOutcome>,
}

/// Result of a preview: everything a run would do, without writing.
#[derive(Debug, Clone)]
pub struct Preview {
    pub source_text: String,
    pub processed_text: String,
    pub voice: VoiceWithOptions,
    pub audio: Vec<u8>,
    pub audio_extension: String,
}

/// Audio produced for one record.
struct Synthesized {
    voice: VoiceWithOptions,
    audio: Vec<u8>,
    extension: String,
}

enum SynthesisFailure {
    Selection(SelectionError),
    Provider(ProviderError),
}

/// Result of processing one record inside a run.
enum Step {
    Done(RecordOutcome),
    Fatal(ProviderError),
}

/// Executes a batch configuration against a record store.
pub struct BatchExecutor {
    name: String,
    source: CompiledSource,
    processor: TextProcessor,
    rule_issues: Vec<RuleIssue>,
    target: BatchTarget,
    selection: VoiceSelection,
    available: HashSet<VoiceId>,
    registry: ProviderRegistry,
    records: Arc<dyn RecordStore>,
    media: Arc<dyn MediaStore>,
    settings: ExecutorSettings,
    rng: StdRng,
    state: BatchState,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("selection", &self.selection.to_string())
            .finish()
    }
}

impl BatchExecutor {
    /// Validates and compiles `config`.
    ///
    /// `available` is the set of voices the caller considers usable for
    /// this run, typically the ids of the loaded catalog.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Config` if the configuration does not validate.
    pub fn new(
        config: &BatchConfig,
        available: HashSet<VoiceId>,
        registry: ProviderRegistry,
        records: Arc<dyn RecordStore>,
        media: Arc<dyn MediaStore>,
        settings: ExecutorSettings,
    ) -> Result<Self, BatchError> {
        config.validate()?;
        let source = config.source()?.compile()?;
        let (processor, rule_issues) = config.text_processing.compile();
        for issue in &rule_issues {
            tracing::warn!(config = %config.name, "skipping text rule: {}", issue);
        }

        Ok(Self {
            name: config.name.clone(),
            source,
            processor,
            rule_issues,
            target: config.target()?.clone(),
            selection: config.voice_selection.clone(),
            available,
            registry,
            records,
            media,
            settings,
            rng: StdRng::from_entropy(),
            state: BatchState::Idle,
        })
    }

    /// Replaces the random source used for voice selection.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Rules that were skipped when the text processing chain compiled.
    pub fn rule_issues(&self) -> &[RuleIssue] {
        &self.rule_issues
    }

    /// Spawns the run on a background task.
    pub fn start_batch(self, record_ids: Vec<RecordId>) -> BatchHandle {
        self.start_batch_with(record_ids, CancelToken::new())
    }

    /// Like [`start_batch`](Self::start_batch), using a caller-supplied
    /// cancellation token.
    pub fn start_batch_with(mut self, record_ids: Vec<RecordId>, cancel: CancelToken) -> BatchHandle {
        let (tx, events) = mpsc::channel(self.settings.event_capacity.max(1));
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(&record_ids, &token, Some(&tx)).await });
        BatchHandle {
            cancel,
            events,
            join,
        }
    }

    /// Runs the batch to completion on the current task.
    ///
    /// Always returns an outcome, including for interrupted and failed runs.
    pub async fn run(
        &mut self,
        record_ids: &[RecordId],
        cancel: &CancelToken,
        events: Option<&mpsc::Sender<BatchEvent>>,
    ) -> BatchOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch_run", %run_id, preset = %self.name);
        self.run_inner(run_id, record_ids, cancel, events)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &mut self,
        run_id: Uuid,
        record_ids: &[RecordId],
        cancel: &CancelToken,
        events: Option<&mpsc::Sender<BatchEvent>>,
    ) -> BatchOutcome {
        let total = record_ids.len();
        let mut outcome = BatchOutcome::new(run_id, total, self.rule_issues.clone());
        self.state = BatchState::Running;

        tracing::info!(total, selection = %self.selection, "batch run started");
        emit(events, BatchEvent::Started { run_id, total }).await;

        for (index, &record_id) in record_ids.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(processed = index, total, "batch run cancelled");
                self.state = BatchState::Interrupted;
                break;
            }

            let record_outcome = match self.process_one(record_id).await {
                Step::Done(record_outcome) => record_outcome,
                Step::Fatal(e) => {
                    tracing::error!(record = %record_id, "aborting batch run: {}", e);
                    let record_outcome = RecordOutcome::error(&e);
                    outcome.record(record_id, record_outcome.clone());
                    outcome.fatal_error = Some(e.to_string());
                    emit(
                        events,
                        BatchEvent::RecordFinished {
                            record_id,
                            outcome: record_outcome,
                        },
                    )
                    .await;
                    emit(
                        events,
                        BatchEvent::Progress {
                            current: index + 1,
                            total,
                        },
                    )
                    .await;
                    self.state = BatchState::Failed;
                    break;
                }
            };

            outcome.record(record_id, record_outcome.clone());
            emit(
                events,
                BatchEvent::RecordFinished {
                    record_id,
                    outcome: record_outcome,
                },
            )
            .await;
            emit(
                events,
                BatchEvent::Progress {
                    current: index + 1,
                    total,
                },
            )
            .await;
        }

        if self.state == BatchState::Running {
            self.state = BatchState::Completed;
        }
        outcome.state = self.state;
        outcome.finished_at = Utc::now();

        tracing::info!(
            state = ?outcome.state,
            succeeded = outcome.succeeded,
            skipped = outcome.skipped,
            failed = outcome.failed_count(),
            untouched = outcome.untouched(),
            "batch run finished"
        );
        emit(events, BatchEvent::Finished(outcome.clone())).await;
        outcome
    }

    /// Processes a single record outside a run, e.g. to retry a record that
    /// failed.
    ///
    /// # Errors
    ///
    /// A fatal provider error is returned as `BatchError::Provider`; every
    /// other failure is reported as `RecordOutcome::Error`.
    pub async fn process_record(&mut self, record_id: RecordId) -> Result<RecordOutcome, BatchError> {
        match self.process_one(record_id).await {
            Step::Done(outcome) => Ok(outcome),
            Step::Fatal(e) => Err(e.into()),
        }
    }

    /// Resolves, processes and synthesizes one record without writing
    /// anything to the record or media store.
    pub async fn preview(&mut self, record_id: RecordId) -> Result<Preview, BatchError> {
        let fields = self.load_fields(record_id).await?;
        let source_text = self.source.resolve(&fields)?;
        let processed_text = self.processor.apply(&source_text);
        if processed_text.trim().is_empty() {
            return Err(BatchError::NoText(record_id));
        }

        let synthesized = self
            .synthesize(&processed_text)
            .await
            .map_err(|failure| match failure {
                SynthesisFailure::Selection(e) => BatchError::Selection(e),
                SynthesisFailure::Provider(e) => BatchError::Provider(e),
            })?;

        Ok(Preview {
            source_text,
            processed_text,
            voice: synthesized.voice,
            audio: synthesized.audio,
            audio_extension: synthesized.extension,
        })
    }

    async fn process_one(&mut self, record_id: RecordId) -> Step {
        let mut fields = match self.load_fields(record_id).await {
            Ok(fields) => fields,
            Err(e) => return self.record_error(record_id, e),
        };
        if !fields.contains_key(&self.target.target_field) {
            return self.record_error(record_id, self.missing_target(record_id));
        }
        let source_text = match self.source.resolve(&fields) {
            Ok(text) => text,
            Err(e) => return self.record_error(record_id, e),
        };

        let processed = self.processor.apply(&source_text);
        if processed.trim().is_empty() {
            tracing::debug!(record = %record_id, "no text after processing, skipping");
            return Step::Done(RecordOutcome::SkippedNoText);
        }

        let synthesized = match self.synthesize(&processed).await {
            Ok(synthesized) => synthesized,
            Err(SynthesisFailure::Provider(e)) if e.is_fatal() => return Step::Fatal(e),
            Err(SynthesisFailure::Provider(e)) => return self.record_error(record_id, e),
            Err(SynthesisFailure::Selection(e)) => return self.record_error(record_id, e),
        };

        let filename = audio_filename(&synthesized.voice, &processed, &synthesized.extension);
        let media = Arc::clone(&self.media);
        let name = filename.clone();
        let audio = synthesized.audio;
        if let Err(e) = blocking(move || media.store_audio(&name, &audio)).await {
            return self.record_error(record_id, e);
        }

        let audio_reference = sound_tag(&filename);
        let Some(value) = self
            .target
            .apply_to_record(&mut fields, &source_text, &audio_reference)
        else {
            return self.record_error(record_id, self.missing_target(record_id));
        };
        let records = Arc::clone(&self.records);
        let field = self.target.target_field.clone();
        if let Err(e) = blocking(move || records.write_field(record_id, &field, &value)).await {
            return self.record_error(record_id, e);
        }

        tracing::debug!(
            record = %record_id,
            voice = %synthesized.voice,
            file = %filename,
            "record updated"
        );
        Step::Done(RecordOutcome::Success { audio_reference })
    }

    fn missing_target(&self, record_id: RecordId) -> StoreError {
        StoreError::FieldNotFound {
            record: record_id,
            field: self.target.target_field.clone(),
        }
    }

    fn record_error(&self, record_id: RecordId, reason: impl std::fmt::Display) -> Step {
        tracing::warn!(record = %record_id, "record failed: {}", reason);
        Step::Done(RecordOutcome::error(reason))
    }

    async fn load_fields(&self, record_id: RecordId) -> Result<RecordFields, StoreError> {
        let records = Arc::clone(&self.records);
        blocking(move || records.get_fields(record_id)).await
    }

    /// Selects a voice and synthesizes `text`.
    ///
    /// In Priority mode with fallback enabled, a non-fatal provider error
    /// moves on to the next available voice in the list; the last provider
    /// error is returned once the list is exhausted.
    async fn synthesize(&mut self, text: &str) -> Result<Synthesized, SynthesisFailure> {
        let fallback = self.settings.priority_fallback
            && self.selection.mode() == VoiceSelectionMode::Priority;
        let mut excluded: HashSet<VoiceId> = HashSet::new();
        let mut last_error: Option<ProviderError> = None;

        loop {
            let voice = match self
                .selection
                .resolve_excluding(&self.available, &excluded, &mut self.rng)
            {
                Ok(voice) => voice.clone(),
                Err(e) => {
                    return Err(match last_error {
                        Some(provider_error) => SynthesisFailure::Provider(provider_error),
                        None => SynthesisFailure::Selection(e),
                    })
                }
            };

            let provider = Arc::clone(
                self.registry
                    .provider_for(&voice)
                    .map_err(SynthesisFailure::Provider)?,
            );
            match provider.synthesize(text, &voice).await {
                Ok(audio) => {
                    return Ok(Synthesized {
                        voice,
                        audio,
                        extension: provider.audio_extension().to_string(),
                    })
                }
                Err(e) if fallback && !e.is_fatal() => {
                    tracing::warn!(voice = %voice, "synthesis failed, trying next voice: {}", e);
                    excluded.insert(voice.voice_id().clone());
                    last_error = Some(e);
                }
                Err(e) => return Err(SynthesisFailure::Provider(e)),
            }
        }
    }
}

/// Runs a store call on the blocking thread pool.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
}

async fn emit(events: Option<&mpsc::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}
