//! Applied-stage ledger.
//!
//! A JSON record, kept next to the documents, of which stage ids have been
//! applied to which document. The ledger is the primary "already applied"
//! record; literal markers remain the fallback for documents it does not
//! know about.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use pagepatch_shared::{PagePatchError, Result};

use crate::store::write_atomic;

/// Current ledger schema version.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Recorded state of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// Ids of stages applied (or found applied) to the document.
    #[serde(default)]
    pub stages: BTreeSet<String>,
    /// SHA-256 of the text as last written or observed.
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// Ledger of applied stages per document key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchLedger {
    pub schema_version: u32,
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentState>,
}

impl Default for PatchLedger {
    fn default() -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            documents: BTreeMap::new(),
        }
    }
}

impl PatchLedger {
    /// Load the ledger at `path`.
    ///
    /// A missing file gives an empty ledger. An unreadable or corrupt one is
    /// logged and also gives an empty ledger; the next save rewrites it.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger yet");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unreadable, falling back to markers");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(ledger) if ledger.schema_version == LEDGER_SCHEMA_VERSION => {
                debug!(
                    path = %path.display(),
                    documents = ledger.documents.len(),
                    "loaded ledger"
                );
                ledger
            }
            Ok(ledger) => {
                warn!(
                    path = %path.display(),
                    found = ledger.schema_version,
                    expected = LEDGER_SCHEMA_VERSION,
                    "ledger schema mismatch, falling back to markers"
                );
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger corrupt, falling back to markers");
                Self::default()
            }
        }
    }

    /// Write the ledger atomically as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PagePatchError::State(format!("ledger serialization failed: {e}")))?;
        write_atomic(path, json.as_bytes())?;
        debug!(path = %path.display(), documents = self.documents.len(), "saved ledger");
        Ok(())
    }

    /// Whether `stage_id` is recorded as applied to `document`.
    pub fn is_applied(&self, document: &str, stage_id: &str) -> bool {
        self.documents
            .get(document)
            .is_some_and(|state| state.stages.contains(stage_id))
    }

    pub fn get(&self, document: &str) -> Option<&DocumentState> {
        self.documents.get(document)
    }

    /// Add `stages` to the record of `document` and refresh its hash.
    pub fn record<I, S>(&mut self, document: &str, stages: I, text: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = self
            .documents
            .entry(document.to_string())
            .or_insert_with(|| DocumentState {
                stages: BTreeSet::new(),
                content_hash: String::new(),
                updated_at: Utc::now(),
            });
        state.stages.extend(stages.into_iter().map(Into::into));
        state.content_hash = content_hash(text);
        state.updated_at = Utc::now();
    }
}

/// Hex SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
