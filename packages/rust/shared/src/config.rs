//! Patch configuration for pagepatch.
//!
//! The configuration lives in a `pagepatch.toml` file. Lookup order is an
//! explicit `--config` path, then `./pagepatch.toml`, then
//! `~/.pagepatch/pagepatch.toml`, then built-in defaults (an empty catalog).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::DateStagger;
use crate::error::{PagePatchError, Result};
use crate::types::{ContentBlock, ContentEntry, ContentKey};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "pagepatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagepatch";

// ---------------------------------------------------------------------------
// Config structs (matching pagepatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level patch configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Run settings.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Date stagger parameters.
    #[serde(default)]
    pub dates: DatesConfig,

    /// The catalog: documents to patch, in order.
    #[serde(default)]
    pub documents: Vec<DocumentEntry>,

    /// The content registry: blocks per content key.
    #[serde(default)]
    pub content: Vec<ContentEntry>,

    /// Ordered stage list.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// File this config was loaded from (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Directory holding the documents. Relative paths resolve against the
    /// config file's directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Number of documents processed at once (1 = sequential sweep).
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Whether to keep the applied-stage ledger.
    #[serde(default = "default_true")]
    pub track_state: bool,

    /// Ledger file name, relative to `base_dir`.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            concurrency: default_concurrency(),
            track_state: true,
            state_file: default_state_file(),
        }
    }
}

fn default_base_dir() -> String {
    "src/pages".into()
}
fn default_concurrency() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_state_file() -> String {
    ".pagepatch-state.json".into()
}

/// `[dates]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatesConfig {
    /// Date assigned to catalog position 0.
    #[serde(default = "default_start")]
    pub start: NaiveDate,

    /// Days between consecutive catalog positions.
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,

    /// strftime format of the human-readable date.
    #[serde(default = "default_display_format")]
    pub display_format: String,

    /// Text preceding a plain published date, e.g. `Publié le 20/01/2026`.
    #[serde(default = "default_published_prefix")]
    pub published_prefix: String,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            interval_days: default_interval_days(),
            display_format: default_display_format(),
            published_prefix: default_published_prefix(),
        }
    }
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 20).unwrap_or_default()
}
fn default_interval_days() -> u32 {
    3
}
fn default_display_format() -> String {
    "%d/%m/%Y".into()
}
fn default_published_prefix() -> String {
    "Publié le".into()
}

/// `[[documents]]` entry: one catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// File name relative to `base_dir`.
    pub file: String,

    /// Stable key; defaults to the file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Content key selecting registry blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_key: Option<ContentKey>,
}

impl DocumentEntry {
    /// The document key: explicit `key`, else the file stem.
    pub fn key(&self) -> String {
        if let Some(key) = &self.key {
            return key.clone();
        }
        Path::new(&self.file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.clone())
    }
}

// ---------------------------------------------------------------------------
// Stage configs
// ---------------------------------------------------------------------------

/// `[[stages]]` entry, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    Import(ImportStageConfig),
    Element(ElementStageConfig),
    ClassLabel(ClassLabelStageConfig),
    Section(SectionStageConfig),
    Date(DateStageConfig),
}

impl StageConfig {
    pub fn id(&self) -> &str {
        match self {
            Self::Import(c) => &c.id,
            Self::Element(c) => &c.id,
            Self::ClassLabel(c) => &c.id,
            Self::Section(c) => &c.id,
            Self::Date(c) => &c.id,
        }
    }

    /// Document keys this stage is restricted to (`None` = all).
    pub fn documents(&self) -> Option<&[String]> {
        match self {
            Self::Import(c) => c.documents.as_deref(),
            Self::Element(c) => c.documents.as_deref(),
            Self::ClassLabel(c) => c.documents.as_deref(),
            Self::Section(c) => c.documents.as_deref(),
            Self::Date(c) => c.documents.as_deref(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Import(_) => "import",
            Self::Element(_) => "element",
            Self::ClassLabel(_) => "class_label",
            Self::Section(_) => "section",
            Self::Date(_) => "date",
        }
    }
}

/// Inserts `import <binding> from "<from>";` once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStageConfig {
    pub id: String,
    /// Imported binding, e.g. `PublicFooter`.
    pub binding: String,
    /// Module specifier, e.g. `../components/PublicFooter.jsx`.
    pub from: String,
    /// Binding of a sibling import to insert after (e.g. `PublicHeader`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
}

/// Inserts an element next to a closing anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementStageConfig {
    pub id: String,
    /// Element markup, e.g. `<PublicFooter />`.
    pub element: String,
    /// Marker override; defaults to the element's opening tag (`<PublicFooter`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Candidate anchors, tried in order.
    pub anchors: Vec<AnchorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
}

/// Where to insert relative to an anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Before,
    After,
}

/// One candidate insertion anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Literal text; the last occurrence in the document is used.
    pub pattern: String,
    #[serde(default)]
    pub placement: Placement,
}

/// Replaces historical class labels with one canonical label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassLabelStageConfig {
    pub id: String,
    #[serde(default = "default_attribute")]
    pub attribute: String,
    /// Historical labels, highest priority first.
    pub legacy: Vec<String>,
    pub canonical: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
}

fn default_attribute() -> String {
    "className".into()
}

/// Inserts the content section for the document's content key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStageConfig {
    pub id: String,
    /// Content block slot rendered by this stage.
    pub slot: String,
    /// Legacy marker text from documents patched before the section attribute existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Primary content-closing anchor.
    #[serde(default = "default_section_anchor")]
    pub anchor: String,
    /// Blocks appended after the keyed blocks for every document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing: Vec<ContentBlock>,
    #[serde(default)]
    pub style: SectionStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
}

fn default_section_anchor() -> String {
    "</main>".into()
}

/// Class names used when rendering content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStyle {
    #[serde(default = "default_section_class")]
    pub section: String,
    #[serde(default = "default_heading_class")]
    pub heading: String,
    #[serde(default = "default_list_class")]
    pub list: String,
    #[serde(default = "default_item_class")]
    pub item: String,
    #[serde(default = "default_paragraph_class")]
    pub paragraph: String,
    #[serde(default = "default_faq_class")]
    pub faq: String,
    #[serde(default = "default_outro_class")]
    pub outro: String,
}

impl Default for SectionStyle {
    fn default() -> Self {
        Self {
            section: default_section_class(),
            heading: default_heading_class(),
            list: default_list_class(),
            item: default_item_class(),
            paragraph: default_paragraph_class(),
            faq: default_faq_class(),
            outro: default_outro_class(),
        }
    }
}

fn default_section_class() -> String {
    "mt-8".into()
}
fn default_heading_class() -> String {
    "text-xl font-semibold".into()
}
fn default_list_class() -> String {
    "mt-4 list-disc pl-6 space-y-2".into()
}
fn default_item_class() -> String {
    "text-slate-600".into()
}
fn default_paragraph_class() -> String {
    "mt-3 text-slate-600".into()
}
fn default_faq_class() -> String {
    "mt-3 space-y-3 text-slate-600".into()
}
fn default_outro_class() -> String {
    "mt-4 text-slate-600".into()
}

/// Rewrites publication dates to the staggered date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateStageConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Resolution & validation
// ---------------------------------------------------------------------------

impl PatchConfig {
    /// Directory holding the documents, resolved against the config file.
    pub fn base_dir(&self) -> PathBuf {
        let base = PathBuf::from(&self.settings.base_dir);
        if base.is_absolute() {
            return base;
        }
        match self.source.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(base),
            None => base,
        }
    }

    /// Path of the applied-stage ledger.
    pub fn state_path(&self) -> PathBuf {
        self.base_dir().join(&self.settings.state_file)
    }

    /// Check configuration invariants before any document is touched.
    ///
    /// Returns the non-fatal findings as warnings; hard violations are errors.
    /// Document and content uniqueness is enforced where the catalog and the
    /// registry are built.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        DateStagger::from_config(&self.dates)?;

        if self.settings.concurrency == 0 {
            return Err(PagePatchError::config("settings.concurrency must be at least 1"));
        }

        let keys: HashSet<String> = self.documents.iter().map(DocumentEntry::key).collect();

        let mut stage_ids = HashSet::new();
        for stage in &self.stages {
            let id = stage.id();
            if id.trim().is_empty() {
                return Err(PagePatchError::config(format!(
                    "{} stage with empty id",
                    stage.kind_name()
                )));
            }
            if !stage_ids.insert(id) {
                return Err(PagePatchError::config(format!("duplicate stage id '{id}'")));
            }

            if let Some(selected) = stage.documents() {
                for key in selected {
                    if !keys.contains(key) {
                        warnings.push(format!(
                            "stage '{id}' selects unknown document '{key}'"
                        ));
                    }
                }
            }

            self.validate_stage(stage, &mut warnings)?;
        }

        Ok(warnings)
    }

    fn validate_stage(&self, stage: &StageConfig, warnings: &mut Vec<String>) -> Result<()> {
        match stage {
            StageConfig::Import(c) => {
                if c.binding.trim().is_empty() || c.from.trim().is_empty() {
                    return Err(PagePatchError::config(format!(
                        "import stage '{}' needs a binding and a module path",
                        c.id
                    )));
                }
            }
            StageConfig::Element(c) => {
                if c.anchors.is_empty() || c.anchors.iter().any(|a| a.pattern.is_empty()) {
                    return Err(PagePatchError::config(format!(
                        "element stage '{}' needs at least one non-empty anchor",
                        c.id
                    )));
                }
                if c.element.trim().is_empty() {
                    return Err(PagePatchError::config(format!(
                        "element stage '{}' has empty element markup",
                        c.id
                    )));
                }
            }
            StageConfig::ClassLabel(c) => {
                if c.legacy.is_empty() || c.legacy.iter().any(String::is_empty) {
                    return Err(PagePatchError::config(format!(
                        "class_label stage '{}' needs non-empty legacy labels",
                        c.id
                    )));
                }
                if c.legacy.contains(&c.canonical) {
                    return Err(PagePatchError::config(format!(
                        "class_label stage '{}' lists its canonical label as legacy",
                        c.id
                    )));
                }
            }
            StageConfig::Section(c) => {
                if c.anchor.is_empty() {
                    return Err(PagePatchError::config(format!(
                        "section stage '{}' has an empty anchor",
                        c.id
                    )));
                }
                let used = self
                    .content
                    .iter()
                    .flat_map(|entry| entry.blocks.iter())
                    .any(|block| block.slot == c.slot);
                if !used {
                    warnings.push(format!(
                        "section stage '{}' renders slot '{}' but no content uses it",
                        c.id, c.slot
                    ));
                }
            }
            StageConfig::Date(_) => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagepatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PagePatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.pagepatch/pagepatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Find the config file to use: explicit path, then `./pagepatch.toml`,
/// then the user config file. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(PagePatchError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    let user = config_file_path()?;
    if user.exists() {
        return Ok(Some(user));
    }

    Ok(None)
}

/// Load the configuration. Returns defaults if no config file is found.
pub fn load_config(explicit: Option<&Path>) -> Result<PatchConfig> {
    match resolve_config_path(explicit)? {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("config file not found, using defaults");
            Ok(PatchConfig::default())
        }
    }
}

/// Load the configuration from a specific file path.
pub fn load_config_from(path: &Path) -> Result<PatchConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PagePatchError::io(path, e))?;

    let mut config: PatchConfig = toml::from_str(&content).map_err(|e| {
        PagePatchError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.source = Some(path.to_path_buf());

    tracing::debug!(
        path = %path.display(),
        documents = config.documents.len(),
        stages = config.stages.len(),
        "loaded config"
    );
    Ok(config)
}

/// Write a default config file at `path` (or the user config path).
/// Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let dir = config_dir()?;
            std::fs::create_dir_all(&dir).map_err(|e| PagePatchError::io(&dir, e))?;
            dir.join(CONFIG_FILE_NAME)
        }
    };

    if path.exists() {
        return Err(PagePatchError::config(format!(
            "refusing to overwrite existing config at {}",
            path.display()
        )));
    }

    let config = PatchConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PagePatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PagePatchError::write(&path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[settings]
base_dir = "pages"

[dates]
start = "2026-01-20"
interval_days = 3

[[documents]]
file = "CoursierB2BParis.jsx"
content_key = "B2B Paris"

[[documents]]
file = "About.jsx"

[[content]]
key = "B2B Paris"

[[content.blocks]]
slot = "why"
kind = "bullets"
heading = "Pourquoi choisir One Connexion ?"
fragments = ["Délais courts.", "POD numérique."]

[[stages]]
kind = "import"
id = "footer-import"
binding = "PublicFooter"
from = "../components/PublicFooter.jsx"
after = "PublicHeader"

[[stages]]
kind = "element"
id = "footer-element"
element = "<PublicFooter />"
anchors = [
  { pattern = "</main>", placement = "after" },
  { pattern = "</div>\n  );" },
]

[[stages]]
kind = "class_label"
id = "blog-style"
legacy = ["mx-auto max-w-4xl px-6 py-16", "mx-auto max-w-3xl px-6 py-16"]
canonical = "blog-page"
documents = ["CoursierB2BParis"]

[[stages]]
kind = "section"
id = "seo-why"
slot = "why"
marker = "Pourquoi choisir One Connexion"

[[stages]]
kind = "date"
id = "stagger-dates"
"#;

    #[test]
    fn default_config_serializes() {
        let config = PatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_dir"));
        assert!(toml_str.contains("interval_days"));
    }

    #[test]
    fn config_roundtrip() {
        let config = PatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: PatchConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.dates.interval_days, 3);
        assert_eq!(parsed.settings.concurrency, 1);
        assert_eq!(parsed.dates.start, NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
    }

    #[test]
    fn sample_config_parses() {
        let config: PatchConfig = toml::from_str(SAMPLE).expect("parse");
        assert_eq!(config.documents.len(), 2);
        assert_eq!(config.documents[0].key(), "CoursierB2BParis");
        assert_eq!(config.stages.len(), 5);
        assert_eq!(config.stages[2].id(), "blog-style");
        assert_eq!(config.stages[2].documents(), Some(&["CoursierB2BParis".to_string()][..]));

        match &config.stages[1] {
            StageConfig::Element(c) => {
                assert_eq!(c.anchors[0].placement, Placement::After);
                assert_eq!(c.anchors[1].placement, Placement::Before);
                assert_eq!(c.anchors[1].pattern, "</div>\n  );");
            }
            other => panic!("expected element stage, got {}", other.kind_name()),
        }

        match &config.stages[3] {
            StageConfig::Section(c) => {
                assert_eq!(c.anchor, "</main>");
                assert_eq!(c.style.item, "text-slate-600");
            }
            other => panic!("expected section stage, got {}", other.kind_name()),
        }
    }

    #[test]
    fn sample_config_validates_with_warnings() {
        let config: PatchConfig = toml::from_str(SAMPLE).expect("parse");
        let warnings = config.validate().expect("valid");
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn duplicate_stage_id_rejected() {
        let mut config: PatchConfig = toml::from_str(SAMPLE).expect("parse");
        config.stages.push(StageConfig::Date(DateStageConfig {
            id: "stagger-dates".into(),
            documents: None,
        }));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate stage id"));
    }

    #[test]
    fn base_dir_resolves_against_config_file() {
        let mut config: PatchConfig = toml::from_str(SAMPLE).expect("parse");
        config.source = Some(PathBuf::from("/site/pagepatch.toml"));
        assert_eq!(config.base_dir(), PathBuf::from("/site/pages"));
        assert_eq!(
            config.state_path(),
            PathBuf::from("/site/pages/.pagepatch-state.json")
        );
    }

    #[test]
    fn fixture_config_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/pagepatch.toml");
        let config = load_config_from(&path).expect("load fixture");
        assert_eq!(config.documents.len(), 15);
        assert_eq!(config.content.len(), 11);
        assert_eq!(config.stages.len(), 6);
        let warnings = config.validate().expect("fixture is valid");
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }
}
