//! The patch pipeline: catalog × stages → patched documents + run report.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use pagepatch_shared::{
    ContentKey, DateStagger, PagePatchError, PatchConfig, RenderedDate, Result, SettingsConfig,
};
use pagepatch_stages::{PatchStage, StageContext, StageKind, StageOutcome, build_stages};

use crate::catalog::{Catalog, CatalogEntry};
use crate::ledger::{PatchLedger, content_hash};
use crate::registry::ContentRegistry;
use crate::store::DocumentStore;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// At least one stage changed the text and it was written back
    /// (or would have been, in a dry run).
    Patched,
    /// Every stage was already applied or had nothing to do.
    Unchanged,
    /// The document does not exist or could not be read.
    SkippedMissing { reason: String },
    /// Nothing changed and a content stage found no content for the document.
    SkippedNoContent,
    /// Writing the patched text failed.
    Failed { reason: String },
}

impl DocumentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Patched => "patched",
            Self::Unchanged => "unchanged",
            Self::SkippedMissing { .. } => "skipped-missing",
            Self::SkippedNoContent => "skipped-no-content",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedMissing { .. } | Self::SkippedNoContent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One stage's outcome on one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub id: String,
    pub kind: StageKind,
    pub outcome: StageOutcome,
}

/// Per-document result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub index: usize,
    pub key: String,
    pub path: PathBuf,
    pub outcome: DocumentOutcome,
    /// Stage outcomes in execution order; empty when the document was not read.
    pub stages: Vec<StageReport>,
    /// The text no longer matches the hash recorded by the last tracked run.
    pub drifted: bool,
}

impl DocumentReport {
    /// Stage ids whose outcome is a change.
    pub fn applied_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.outcome.is_change())
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Stage outcomes an operator should hear about.
    pub fn warnings(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| s.outcome.is_warning())
    }
}

/// Result of a full sweep.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-document reports, in catalog order.
    pub documents: Vec<DocumentReport>,
    pub patched: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub elapsed: Duration,
    /// Set when the ledger could not be saved after the sweep.
    pub state_error: Option<String>,
}

impl RunReport {
    fn new(
        documents: Vec<DocumentReport>,
        dry_run: bool,
        elapsed: Duration,
        state_error: Option<String>,
    ) -> Self {
        let count = |f: fn(&DocumentOutcome) -> bool| {
            documents.iter().filter(|d| f(&d.outcome)).count()
        };
        Self {
            patched: count(|o| matches!(o, DocumentOutcome::Patched)),
            unchanged: count(|o| matches!(o, DocumentOutcome::Unchanged)),
            skipped: count(DocumentOutcome::is_skipped),
            failed: count(DocumentOutcome::is_failed),
            documents,
            dry_run,
            elapsed,
            state_error,
        }
    }

    /// Whether a document write or the ledger save failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.state_error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per document, in catalog order.
    fn document_done(&self, report: &DocumentReport, current: usize, total: usize);
    /// Called when the sweep completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_done(&self, _report: &DocumentReport, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute outcomes without writing documents or the ledger.
    pub dry_run: bool,
    /// Consult and update the ledger.
    pub track_state: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            track_state: true,
        }
    }
}

impl RunOptions {
    pub fn from_settings(settings: &SettingsConfig) -> Self {
        Self {
            dry_run: false,
            track_state: settings.track_state,
        }
    }
}

/// Result of processing one document, before the ledger is touched.
struct Processed {
    report: DocumentReport,
    /// Stage ids and final text to record, when the document is settled.
    record: Option<(Vec<String>, String)>,
}

/// Applies the configured stages to every catalog document.
pub struct PatchPipeline {
    catalog: Catalog,
    registry: ContentRegistry,
    stages: Vec<Box<dyn PatchStage>>,
    dates: Vec<RenderedDate>,
    store: Arc<dyn DocumentStore>,
    state_path: PathBuf,
    ledger: RwLock<PatchLedger>,
    warnings: Vec<String>,
}

impl PatchPipeline {
    /// Validate `config` and build catalog, registry, stages and the date
    /// schedule. Fails before any document is touched.
    #[instrument(skip_all, fields(documents = config.documents.len(), stages = config.stages.len()))]
    pub fn from_config(config: &PatchConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let mut warnings = config.validate()?;
        let catalog = Catalog::from_config(config)?;
        let registry = ContentRegistry::from_config(config)?;
        let stages = build_stages(config)?;

        warnings.extend(
            registry
                .missing_keys(&catalog)
                .into_iter()
                .map(|key| format!("content key '{key}' is used by the catalog but not registered")),
        );
        for warning in &warnings {
            warn!("{warning}");
        }

        let stagger = DateStagger::from_config(&config.dates)?;
        let dates = catalog
            .list()
            .iter()
            .map(|entry| stagger.assign(entry.index).map(|a| stagger.render(&a)))
            .collect::<Result<Vec<_>>>()?;

        let state_path = config.state_path();
        let ledger = PatchLedger::load(&state_path);

        debug!(
            documents = catalog.len(),
            content_keys = registry.len(),
            stages = stages.len(),
            state = %state_path.display(),
            "pipeline ready"
        );

        Ok(Self {
            catalog,
            registry,
            stages,
            dates,
            store,
            state_path,
            ledger: RwLock::new(ledger),
            warnings,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    pub fn stages(&self) -> &[Box<dyn PatchStage>] {
        &self.stages
    }

    /// Date assigned to each catalog position.
    pub fn schedule(&self) -> &[RenderedDate] {
        &self.dates
    }

    /// Non-fatal configuration findings.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Content keys used by the catalog with no registered blocks.
    pub fn missing_content_keys(&self) -> Vec<ContentKey> {
        self.registry.missing_keys(&self.catalog)
    }

    /// Snapshot of the ledger.
    pub fn ledger(&self) -> PatchLedger {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run every stage over `text` in order.
    ///
    /// A stage is skipped as already applied when the ledger records it for
    /// this document (if `use_ledger`) or when its marker is present, unless
    /// it always runs.
    pub fn patch_text(
        &self,
        entry: &CatalogEntry,
        text: &str,
        use_ledger: bool,
    ) -> (String, Vec<StageReport>) {
        let content_key = entry.content_key.as_ref();
        let content = match content_key.map(|key| self.registry.blocks_for(key)) {
            Some(Ok(blocks)) => Some(blocks),
            Some(Err(e)) => {
                debug!(document = %entry.key, error = %e, "content lookup failed");
                None
            }
            None => None,
        };
        let ctx = StageContext {
            document: &entry.key,
            content_key,
            content,
            date: self.dates.get(entry.index),
        };

        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        let mut current = text.to_string();
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let outcome = if !stage.selects(&entry.key) {
                StageOutcome::NotSelected
            } else if !stage.always_runs()
                && use_ledger
                && ledger.is_applied(&entry.key, stage.id())
            {
                StageOutcome::AlreadyApplied
            } else {
                let result = stage.apply(&current, &ctx);
                if let Some(next) = result.text {
                    current = next;
                }
                result.outcome
            };

            match &outcome {
                StageOutcome::AnchorMissing { anchor } => warn!(
                    document = %entry.key,
                    stage = stage.id(),
                    anchor = %anchor,
                    "anchor not found, stage not applied"
                ),
                StageOutcome::NoContent => debug!(
                    document = %entry.key,
                    stage = stage.id(),
                    "no content for document"
                ),
                other => debug!(document = %entry.key, stage = stage.id(), outcome = %other, "stage done"),
            }

            reports.push(StageReport {
                id: stage.id().to_string(),
                kind: stage.kind(),
                outcome,
            });
        }

        (current, reports)
    }

    /// Read, patch and (unless dry-running) write back one document.
    fn process(&self, entry: &CatalogEntry, opts: RunOptions) -> Processed {
        let report = |outcome, stages, drifted| DocumentReport {
            index: entry.index,
            key: entry.key.clone(),
            path: entry.path.clone(),
            outcome,
            stages,
            drifted,
        };

        let original = match self.store.read(&entry.path) {
            Ok(text) => text,
            Err(e) => {
                warn!(document = %entry.key, path = %entry.path.display(), error = %e, "document missing, skipped");
                let err = PagePatchError::MissingDocument {
                    path: entry.path.clone(),
                };
                return Processed {
                    report: report(
                        DocumentOutcome::SkippedMissing {
                            reason: format!("{err}: {e}"),
                        },
                        Vec::new(),
                        false,
                    ),
                    record: None,
                };
            }
        };

        let drifted = opts.track_state
            && self
                .ledger
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&entry.key)
                .is_some_and(|state| state.content_hash != content_hash(&original));
        if drifted {
            warn!(
                document = %entry.key,
                "document edited since the last recorded run, recorded stages are not re-checked"
            );
        }

        let (patched, stages) = self.patch_text(entry, &original, opts.track_state);
        let settled: Vec<String> = self
            .stages
            .iter()
            .zip(&stages)
            .filter(|(stage, r)| {
                !stage.always_runs()
                    && matches!(r.outcome, StageOutcome::Applied | StageOutcome::AlreadyApplied)
            })
            .map(|(_, r)| r.id.clone())
            .collect();

        if patched == original {
            let lacked_content = stages.iter().any(|s| s.outcome == StageOutcome::NoContent);
            let outcome = if lacked_content {
                DocumentOutcome::SkippedNoContent
            } else {
                DocumentOutcome::Unchanged
            };
            return Processed {
                report: report(outcome, stages, drifted),
                record: Some((settled, original)),
            };
        }

        if opts.dry_run {
            info!(document = %entry.key, "would patch (dry run)");
            return Processed {
                report: report(DocumentOutcome::Patched, stages, drifted),
                record: None,
            };
        }

        match self.store.write(&entry.path, &patched) {
            Ok(()) => {
                info!(document = %entry.key, stages = ?settled, "patched");
                Processed {
                    report: report(DocumentOutcome::Patched, stages, drifted),
                    record: Some((settled, patched)),
                }
            }
            Err(e) => {
                error!(document = %entry.key, error = %e, "write failed, document left untouched");
                Processed {
                    report: report(
                        DocumentOutcome::Failed {
                            reason: e.to_string(),
                        },
                        stages,
                        drifted,
                    ),
                    record: None,
                }
            }
        }
    }

    /// Process every catalog document, one after another.
    #[instrument(skip_all, fields(documents = self.catalog.len(), dry_run = opts.dry_run))]
    pub fn run(&self, opts: RunOptions, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        let total = self.catalog.len();
        info!(documents = total, stages = self.stages.len(), "starting patch run");
        progress.phase("Patching documents");

        let mut processed = Vec::with_capacity(total);
        for (i, entry) in self.catalog.list().iter().enumerate() {
            let p = self.process(entry, opts);
            progress.document_done(&p.report, i + 1, total);
            processed.push(p);
        }

        Ok(self.finish(processed, opts, start, progress))
    }

    /// Process documents on up to `concurrency` blocking tasks.
    ///
    /// Stage order within a document stays serial, and the report lists
    /// documents in catalog order, so the result matches [`run`](Self::run).
    #[instrument(skip_all, fields(documents = self.catalog.len(), concurrency, dry_run = opts.dry_run))]
    pub async fn run_concurrent(
        self: Arc<Self>,
        concurrency: usize,
        opts: RunOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let total = self.catalog.len();
        info!(documents = total, concurrency, "starting concurrent patch run");
        progress.phase("Patching documents");

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(total);

        for i in 0..total {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PagePatchError::State(format!("semaphore closed: {e}")))?;
            let pipeline = Arc::clone(&self);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let entry = &pipeline.catalog.list()[i];
                pipeline.process(entry, opts)
            }));
        }

        let mut processed = Vec::with_capacity(total);
        for (i, handle) in handles.into_iter().enumerate() {
            let p = match handle.await {
                Ok(p) => p,
                Err(e) => {
                    let entry = &self.catalog.list()[i];
                    error!(document = %entry.key, error = %e, "patch task failed");
                    Processed {
                        report: DocumentReport {
                            index: entry.index,
                            key: entry.key.clone(),
                            path: entry.path.clone(),
                            outcome: DocumentOutcome::Failed {
                                reason: format!("task failed: {e}"),
                            },
                            stages: Vec::new(),
                            drifted: false,
                        },
                        record: None,
                    }
                }
            };
            progress.document_done(&p.report, i + 1, total);
            processed.push(p);
        }

        Ok(self.finish(processed, opts, start, progress))
    }

    /// Update and save the ledger, then assemble the report.
    ///
    /// Documents are already written at this point, so a failed ledger save
    /// is reported on the [`RunReport`] rather than discarding it.
    fn finish(
        &self,
        processed: Vec<Processed>,
        opts: RunOptions,
        start: Instant,
        progress: &dyn ProgressReporter,
    ) -> RunReport {
        let mut documents = Vec::with_capacity(processed.len());
        let mut state_error = None;

        if opts.track_state && !opts.dry_run {
            let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
            for p in &processed {
                if let Some((stages, text)) = &p.record {
                    ledger.record(&p.report.key, stages.iter().cloned(), text);
                }
            }
            if !processed.is_empty() {
                if let Err(e) = ledger.save(&self.state_path) {
                    error!(
                        path = %self.state_path.display(),
                        error = %e,
                        "ledger not saved, the next run falls back to markers"
                    );
                    state_error = Some(e.to_string());
                }
            }
        }

        documents.extend(processed.into_iter().map(|p| p.report));
        let report = RunReport::new(documents, opts.dry_run, start.elapsed(), state_error);

        progress.done(&report);
        info!(
            patched = report.patched,
            unchanged = report.unchanged,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis(),
            "patch run complete"
        );

        report
    }
}
