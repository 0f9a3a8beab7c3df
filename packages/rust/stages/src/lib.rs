//! Patch stages for static page sources.
//!
//! Each stage is a self-contained, idempotent text transformation selected
//! by the `[[stages]]` table of `pagepatch.toml`. [`build_stages`] turns that
//! table into an ordered list of boxed [`PatchStage`]s.

pub(crate) mod anchor;
pub mod class_label;
pub mod date;
pub mod element;
pub mod import;
pub mod section;
pub mod stage;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod testing;

pub use class_label::ClassLabelStage;
pub use date::DateStage;
pub use element::ElementStage;
pub use import::ImportStage;
pub use section::{SECTION_ATTRIBUTE, SectionStage, render_blocks};
pub use stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

use pagepatch_shared::{PatchConfig, Result, StageConfig};
use tracing::debug;

/// Build one stage from its configuration.
pub fn build_stage(config: &StageConfig, patch: &PatchConfig) -> Result<Box<dyn PatchStage>> {
    let stage: Box<dyn PatchStage> = match config {
        StageConfig::Import(c) => Box::new(ImportStage::new(c)?),
        StageConfig::Element(c) => Box::new(ElementStage::new(c)?),
        StageConfig::ClassLabel(c) => Box::new(ClassLabelStage::new(c)?),
        StageConfig::Section(c) => Box::new(SectionStage::new(c)?),
        StageConfig::Date(c) => Box::new(DateStage::new(c, &patch.dates)?),
    };
    Ok(stage)
}

/// Build every configured stage, preserving declaration order.
pub fn build_stages(config: &PatchConfig) -> Result<Vec<Box<dyn PatchStage>>> {
    let stages = config
        .stages
        .iter()
        .map(|stage| build_stage(stage, config))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        count = stages.len(),
        ids = ?stages.iter().map(|s| s.id()).collect::<Vec<_>>(),
        "built patch stages"
    );
    Ok(stages)
}
