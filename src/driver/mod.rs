//! Correlation Driver: walks a target's file tree and feeds it through
//! parse → resolve → merge, one batch at a time
//!
//! ```text
//! Idle → Walking → (ParsingBatch → Merging)* → Done
//!            └──────────────┴──────────┴──→ Failed
//! ```
//!
//! Within a batch, files are parsed on blocking worker threads bounded by a
//! semaphore; their records are then merged on one blocking task that owns
//! the store session, all entities of the batch before any relationship.
//! `Failed` is reached only when the target directory is missing or the
//! store session breaks.

mod cancel;
mod discovery;

pub use cancel::CancellationToken;
pub use discovery::discover_files;

use crate::config::CorrelatorConfig;
use crate::merge::{MergeEngine, MergeOutcome};
use crate::parser::{ParseResult, ParsedFile, SourceFile};
use crate::resolve::{IdentityResolver, RawRecord};
use crate::storage::{CorrelationStore, StoreError, StoreResult};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Run-level failures; everything below this is caught and counted
#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("target directory not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The store session broke; `summary` holds the counts reached so far
    #[error("store failure: {source}")]
    Store {
        source: StoreError,
        summary: Box<RunSummary>,
    },
}

impl CorrelationError {
    /// Counters of the aborted run, when it got far enough to have any
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::InputNotFound(_) => None,
            Self::Store { summary, .. } => Some(&**summary),
        }
    }
}

pub type CorrelationResult<T> = Result<T, CorrelationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Walking,
    ParsingBatch,
    Merging,
    Done,
    Failed,
}

/// Counters for one correlation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub target: String,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub entities_merged: usize,
    pub entities_unchanged: usize,
    pub entities_rejected: usize,
    pub relationships_merged: usize,
    pub relationships_rejected: usize,
    pub batches: usize,
    pub state: RunState,
    /// Stopped at a batch boundary by the cancellation token
    pub cancelled: bool,
}

impl RunSummary {
    /// At least one file made it through parsing
    pub fn success(&self) -> bool {
        self.files_processed > 0
    }

    fn log(&self) {
        let rejected = self.entities_rejected + self.relationships_rejected;
        if self.state == RunState::Failed {
            error!(
                target_name = %self.target,
                processed = self.files_processed,
                skipped = self.files_skipped,
                entities = self.entities_merged,
                rejected,
                "correlation run failed"
            );
        } else {
            info!(
                target_name = %self.target,
                processed = self.files_processed,
                skipped = self.files_skipped,
                entities = self.entities_merged,
                rejected,
                "correlation run finished"
            );
        }
    }
}

/// One file's parsed records, tagged with the file's tool label
struct FileRecords {
    source: String,
    parsed: ParsedFile,
}

/// Run-scoped state threaded through every stage
struct RunContext {
    summary: RunSummary,
}

impl RunContext {
    fn new(target: &str) -> Self {
        Self {
            summary: RunSummary {
                target: target.to_string(),
                ..Default::default()
            },
        }
    }

    fn target(&self) -> &str {
        &self.summary.target
    }

    fn transition(&mut self, next: RunState) {
        debug!(target_name = %self.summary.target, from = ?self.summary.state, to = ?next, "run state");
        self.summary.state = next;
    }

    /// Record a store fault; connectivity faults end the run
    fn store_fault(&mut self, err: StoreError) -> StoreResult<()> {
        if err.is_connectivity() {
            error!(target_name = %self.summary.target, error = %err, "store unavailable, aborting run");
            return Err(err);
        }
        error!(target_name = %self.summary.target, error = %err, "store rejected record");
        Ok(())
    }

    /// End the run in `Failed`, keeping the counters in the error
    fn abort(mut self, source: StoreError) -> CorrelationError {
        self.transition(RunState::Failed);
        self.summary.log();
        CorrelationError::Store {
            source,
            summary: Box::new(self.summary),
        }
    }
}

/// The single merge stage: resolves raw records and upserts them
#[derive(Clone)]
struct BatchMerger {
    merge: MergeEngine,
    resolver: IdentityResolver,
}

impl BatchMerger {
    /// Merge every entity of the batch, then every relationship
    fn merge_batch(&self, ctx: &mut RunContext, records: &[FileRecords]) -> StoreResult<()> {
        for file in records {
            for raw in &file.parsed.entities {
                self.merge_entity(ctx, raw, &file.source)?;
            }
        }
        for file in records {
            for raw in &file.parsed.relationships {
                self.merge_relationship(ctx, raw, &file.source)?;
            }
        }
        Ok(())
    }

    fn merge_entity(&self, ctx: &mut RunContext, raw: &RawRecord, source: &str) -> StoreResult<()> {
        let entity = match self.resolver.resolve(raw, source) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(target_name = ctx.target(), source = source, error = %e, "dropping entity record");
                ctx.summary.entities_rejected += 1;
                return Ok(());
            }
        };

        let entity_id = entity.id.clone();
        match self.merge.upsert_entity(entity, ctx.target()) {
            Ok(MergeOutcome::Unchanged) => ctx.summary.entities_unchanged += 1,
            Ok(MergeOutcome::MissingEndpoint(_)) => ctx.summary.entities_rejected += 1,
            Ok(_) => ctx.summary.entities_merged += 1,
            Err(e) => {
                debug!(entity_id = %entity_id, "entity merge failed");
                ctx.summary.entities_rejected += 1;
                ctx.store_fault(e)?;
            }
        }
        Ok(())
    }

    fn merge_relationship(&self, ctx: &mut RunContext, raw: &RawRecord, source: &str) -> StoreResult<()> {
        let relationship = match self.resolver.resolve_relationship(raw, source) {
            Ok(relationship) => relationship,
            Err(e) => {
                warn!(target_name = ctx.target(), source = source, error = %e, "dropping relationship record");
                ctx.summary.relationships_rejected += 1;
                return Ok(());
            }
        };

        match self.merge.upsert_relationship(relationship) {
            Ok(MergeOutcome::MissingEndpoint(_)) => ctx.summary.relationships_rejected += 1,
            Ok(_) => ctx.summary.relationships_merged += 1,
            Err(e) => {
                ctx.summary.relationships_rejected += 1;
                ctx.store_fault(e)?;
            }
        }
        Ok(())
    }
}

/// Drives correlation runs against one store
pub struct CorrelationDriver {
    merger: BatchMerger,
    config: CorrelatorConfig,
    cancel: CancellationToken,
}

impl CorrelationDriver {
    pub fn new(store: Arc<dyn CorrelationStore>, config: &CorrelatorConfig) -> Self {
        Self {
            merger: BatchMerger {
                merge: MergeEngine::new(store, config.confidence_policy),
                resolver: IdentityResolver::new().with_default_confidence(config.default_confidence),
            },
            config: CorrelatorConfig {
                batch_size: config.batch_size.max(1),
                parse_workers: config.parse_workers.max(1),
                ..config.clone()
            },
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this driver's runs at the next batch boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        self.merger.merge.store()
    }

    /// Correlate everything under `<data_dir>/targets/<target>`
    ///
    /// Returns the run summary when the run reached `Done`, even if no file
    /// could be processed; check `RunSummary::success`. A store fault returns
    /// the counters reached so far inside `CorrelationError::Store`.
    pub async fn run(&self, target: &str) -> CorrelationResult<RunSummary> {
        let root = self.config.target_dir(target);
        let mut ctx = RunContext::new(target);
        info!(target_name = target, root = %root.display(), "starting correlation run");

        ctx.transition(RunState::Walking);
        if !root.is_dir() {
            error!(target_name = target, root = %root.display(), "target directory not found");
            ctx.transition(RunState::Failed);
            return Err(CorrelationError::InputNotFound(root));
        }

        if let Err(e) = self.store().upsert_target(target) {
            error!(target_name = target, error = %e, "cannot register target");
            return Err(ctx.abort(e));
        }

        let files = discover_files(&root);
        ctx.summary.files_discovered = files.len();

        for batch in files.chunks(self.config.batch_size) {
            if self.cancel.is_cancelled() {
                info!(target_name = target, batches = ctx.summary.batches, "run cancelled between batches");
                ctx.summary.cancelled = true;
                break;
            }

            ctx.transition(RunState::ParsingBatch);
            let records = self.parse_batch(&mut ctx, batch).await;

            ctx.transition(RunState::Merging);
            let (returned, merged) = self.merge_batch(ctx, records).await;
            ctx = returned;
            if let Err(e) = merged {
                return Err(ctx.abort(e));
            }
            ctx.summary.batches += 1;
        }

        ctx.transition(RunState::Done);
        ctx.summary.log();
        Ok(ctx.summary)
    }

    /// Parse one batch concurrently; failed or panicked files are skipped
    async fn parse_batch(&self, ctx: &mut RunContext, batch: &[SourceFile]) -> Vec<FileRecords> {
        let semaphore = Arc::new(Semaphore::new(self.config.parse_workers));
        let mut tasks = JoinSet::new();

        for (index, file) in batch.iter().cloned().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let parsed = file.parse();
                (index, parsed)
            });
        }

        let mut slots: Vec<Option<ParseResult<ParsedFile>>> = batch.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, parsed)) => slots[index] = Some(parsed),
                Err(e) => error!(target_name = ctx.target(), error = %e, "parse task panicked"),
            }
        }

        let mut records = Vec::new();
        for (file, slot) in batch.iter().zip(slots) {
            match slot {
                Some(Ok(parsed)) => {
                    debug!(
                        file = %file.path.display(),
                        source = %file.source,
                        entities = parsed.entities.len(),
                        relationships = parsed.relationships.len(),
                        "parsed file"
                    );
                    ctx.summary.files_processed += 1;
                    ctx.summary.entities_rejected += parsed.malformed;
                    records.push(FileRecords {
                        source: file.source.clone(),
                        parsed,
                    });
                }
                Some(Err(e)) => {
                    error!(file = %file.path.display(), error = %e, "skipping unparseable file");
                    ctx.summary.files_skipped += 1;
                }
                None => {
                    error!(file = %file.path.display(), "skipping file whose parser did not finish");
                    ctx.summary.files_skipped += 1;
                }
            }
        }
        records
    }

    /// Run the merge stage off the async workers; store calls block
    async fn merge_batch(&self, mut ctx: RunContext, records: Vec<FileRecords>) -> (RunContext, StoreResult<()>) {
        let merger = self.merger.clone();
        let before = ctx.summary.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let merged = merger.merge_batch(&mut ctx, &records);
            (ctx, merged)
        })
        .await;

        match joined {
            Ok(done) => done,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => (
                RunContext { summary: before },
                Err(StoreError::Connectivity(format!("merge stage did not finish: {e}"))),
            ),
        }
    }
}
