//! Import stage: adds one `import X from "...";` declaration.

use regex::Regex;

use pagepatch_shared::{ImportStageConfig, PagePatchError, Result};

use crate::stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

/// Inserts an import line once, after a sibling import when there is one,
/// otherwise at the top of the document.
#[derive(Debug)]
pub struct ImportStage {
    id: String,
    line: String,
    marker: Regex,
    sibling: Option<Regex>,
    selection: Selection,
}

impl ImportStage {
    pub fn new(config: &ImportStageConfig) -> Result<Self> {
        let marker = import_regex(&config.binding)?;
        let sibling = config.after.as_deref().map(import_regex).transpose()?;

        Ok(Self {
            id: config.id.clone(),
            line: format!("import {} from \"{}\";", config.binding, config.from),
            marker,
            sibling,
            selection: Selection::from_config(config.documents.as_deref()),
        })
    }

    /// The declaration this stage inserts.
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Matches a whole `import <binding> ...` line.
fn import_regex(binding: &str) -> Result<Regex> {
    Regex::new(&format!(
        r"(?m)^[ \t]*import[ \t]+{}\b[^\n]*",
        regex::escape(binding)
    ))
    .map_err(|e| PagePatchError::config(format!("invalid import binding '{binding}': {e}")))
}

impl PatchStage for ImportStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        StageKind::Import
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn already_applied(&self, text: &str) -> bool {
        self.marker.is_match(text)
    }

    fn apply(&self, text: &str, _ctx: &StageContext<'_>) -> StageResult {
        if self.already_applied(text) {
            return StageResult::unchanged(StageOutcome::AlreadyApplied);
        }

        let sibling_end = self
            .sibling
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.end());

        let patched = match sibling_end {
            Some(end) => {
                let mut out = String::with_capacity(text.len() + self.line.len() + 1);
                out.push_str(&text[..end]);
                out.push('\n');
                out.push_str(&self.line);
                out.push_str(&text[end..]);
                out
            }
            None => format!("{}\n{text}", self.line),
        };

        StageResult::changed(patched)
    }
}
