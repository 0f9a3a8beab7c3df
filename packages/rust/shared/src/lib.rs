//! Shared types, error model, and configuration for pagepatch.
//!
//! This crate is the foundation depended on by all other pagepatch crates.
//! It provides:
//! - [`PagePatchError`]: the unified error type
//! - Content types ([`ContentKey`], [`ContentBlock`], [`Fragment`])
//! - Configuration ([`PatchConfig`], stage configs, config loading)
//! - The date stagger generator ([`DateStagger`])

pub mod config;
pub mod dates;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnchorConfig, CONFIG_FILE_NAME, ClassLabelStageConfig, DateStageConfig, DatesConfig,
    DocumentEntry, ElementStageConfig, ImportStageConfig, PatchConfig, Placement,
    SectionStageConfig, SectionStyle, SettingsConfig, StageConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_config_path,
};
pub use dates::{DateAssignment, DateStagger, RenderedDate, display_pattern};
pub use error::{PagePatchError, Result};
pub use types::{BlockKind, ContentBlock, ContentEntry, ContentKey, Fragment};
