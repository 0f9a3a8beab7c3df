//! Patch pipeline orchestration for pagepatch.
//!
//! This crate ties the catalog, the content registry and the configured
//! stages together into an idempotent sweep over the catalog documents
//! ([`PatchPipeline`]), backed by an applied-stage ledger ([`PatchLedger`]).

pub mod catalog;
pub mod ledger;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use catalog::{Catalog, CatalogEntry};
pub use ledger::{DocumentState, LEDGER_SCHEMA_VERSION, PatchLedger, content_hash};
pub use pipeline::{
    DocumentOutcome, DocumentReport, PatchPipeline, ProgressReporter, RunOptions, RunReport,
    SilentProgress, StageReport,
};
pub use registry::ContentRegistry;
pub use store::{DocumentStore, FsStore, write_atomic};
