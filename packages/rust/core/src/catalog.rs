//! Target catalog: the fixed, ordered list of documents to patch.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use pagepatch_shared::{ContentKey, PagePatchError, PatchConfig, Result};

/// One document the pipeline may patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Position in the catalog; drives the staggered date.
    pub index: usize,
    /// Stable key, unique within the catalog.
    pub key: String,
    /// Location on disk.
    pub path: PathBuf,
    pub content_key: Option<ContentKey>,
}

/// Documents in configured order. Built once per run, never discovered.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build the catalog from `[[documents]]`, resolving paths against the
    /// configured base directory.
    ///
    /// Keys and resolved paths must both be unique: a document is never
    /// processed twice in one run.
    pub fn from_config(config: &PatchConfig) -> Result<Self> {
        let base_dir = config.base_dir();
        let mut keys = HashSet::new();
        let mut paths: HashMap<PathBuf, String> = HashMap::new();
        let mut entries = Vec::with_capacity(config.documents.len());

        for (index, doc) in config.documents.iter().enumerate() {
            if doc.file.trim().is_empty() {
                return Err(PagePatchError::config("document entry with empty file name"));
            }
            let key = doc.key();
            if !keys.insert(key.clone()) {
                return Err(PagePatchError::config(format!(
                    "duplicate document key '{key}'"
                )));
            }
            let path = normalize(&base_dir.join(&doc.file));
            if let Some(first) = paths.insert(path.clone(), key.clone()) {
                return Err(PagePatchError::config(format!(
                    "{} listed twice, as '{first}' and '{key}'",
                    path.display()
                )));
            }
            entries.push(CatalogEntry {
                index,
                key,
                path,
                content_key: doc.content_key.clone(),
            });
        }

        Ok(Self { entries })
    }

    pub fn list(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lexically drop `.` and resolve `..` so two spellings of one file compare
/// equal. The file does not have to exist.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
