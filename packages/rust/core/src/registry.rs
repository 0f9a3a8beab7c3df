//! Content block registry: content key → ordered content blocks.

use std::collections::HashMap;

use pagepatch_shared::{ContentBlock, ContentKey, PagePatchError, PatchConfig, Result};

use crate::catalog::Catalog;

/// Read-only lookup of the blocks registered for each content key.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    blocks: HashMap<ContentKey, Vec<ContentBlock>>,
}

impl ContentRegistry {
    pub fn from_config(config: &PatchConfig) -> Result<Self> {
        let mut blocks = HashMap::with_capacity(config.content.len());
        for entry in &config.content {
            if blocks
                .insert(entry.key.clone(), entry.blocks.clone())
                .is_some()
            {
                return Err(PagePatchError::config(format!(
                    "content key '{}' registered twice",
                    entry.key
                )));
            }
        }
        Ok(Self { blocks })
    }

    /// Blocks for `key`, in registration order.
    pub fn blocks_for(&self, key: &ContentKey) -> Result<&[ContentBlock]> {
        self.blocks
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| PagePatchError::MissingContent {
                key: key.to_string(),
            })
    }

    /// Content keys the catalog uses that have no registered blocks, in
    /// catalog order, without duplicates.
    pub fn missing_keys(&self, catalog: &Catalog) -> Vec<ContentKey> {
        let mut missing: Vec<ContentKey> = Vec::new();
        for key in catalog.list().iter().filter_map(|e| e.content_key.as_ref()) {
            if !self.blocks.contains_key(key) && !missing.contains(key) {
                missing.push(key.clone());
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
