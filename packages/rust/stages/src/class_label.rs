//! Class label stage: collapses historical class labels into one canonical label.

use regex::{NoExpand, Regex};

use pagepatch_shared::{ClassLabelStageConfig, PagePatchError, Result};

use crate::stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

/// Replaces `className="<legacy>"` with `className="<canonical>"`.
///
/// Labels are tried in declared order at each occurrence.
#[derive(Debug)]
pub struct ClassLabelStage {
    id: String,
    legacy: Regex,
    replacement: String,
    selection: Selection,
}

impl ClassLabelStage {
    pub fn new(config: &ClassLabelStageConfig) -> Result<Self> {
        let alternatives = config
            .legacy
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>()
            .join("|");
        let attribute = regex::escape(&config.attribute);

        let legacy = Regex::new(&format!(r#"\b{attribute}="(?:{alternatives})""#)).map_err(|e| {
            PagePatchError::config(format!("invalid class_label stage '{}': {e}", config.id))
        })?;

        Ok(Self {
            id: config.id.clone(),
            legacy,
            replacement: format!("{}=\"{}\"", config.attribute, config.canonical),
            selection: Selection::from_config(config.documents.as_deref()),
        })
    }
}

impl PatchStage for ClassLabelStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        StageKind::ClassLabel
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn already_applied(&self, text: &str) -> bool {
        !self.legacy.is_match(text)
    }

    fn apply(&self, text: &str, _ctx: &StageContext<'_>) -> StageResult {
        if self.already_applied(text) {
            return StageResult::unchanged(StageOutcome::AlreadyApplied);
        }

        let patched = self
            .legacy
            .replace_all(text, NoExpand(&self.replacement))
            .into_owned();
        StageResult::changed(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_stage_contract;

    const LEGACY: [&str; 3] = [
        "mx-auto max-w-4xl px-6 py-16",
        "mx-auto max-w-3xl px-6 py-16",
        "mx-auto w-full max-w-7xl px-8 py-16",
    ];

    fn blog_style() -> ClassLabelStage {
        ClassLabelStage::new(&ClassLabelStageConfig {
            id: "blog-style".into(),
            attribute: "className".into(),
            legacy: LEGACY.iter().map(|s| s.to_string()).collect(),
            canonical: "blog-page".into(),
            documents: None,
        })
        .unwrap()
    }

    #[test]
    fn every_legacy_label_ends_canonical() {
        let stage = blog_style();
        for label in LEGACY {
            let text = format!("<main className=\"{label}\">\n  <h1>Titre</h1>\n</main>\n");
            let out = stage.apply(&text, &StageContext::default()).text.unwrap();
            assert_eq!(out, "<main className=\"blog-page\">\n  <h1>Titre</h1>\n</main>\n");
        }
    }

    #[test]
    fn replaces_every_occurrence() {
        let text = format!(
            "<div className=\"{}\"></div><div className=\"{}\"></div>",
            LEGACY[0], LEGACY[2]
        );
        let out = blog_style().apply(&text, &StageContext::default()).text.unwrap();
        assert_eq!(out.matches("className=\"blog-page\"").count(), 2);
    }

    #[test]
    fn partial_class_lists_are_untouched() {
        let text = "<div className=\"mx-auto max-w-4xl px-6 py-16 bg-white\"></div>";
        let stage = blog_style();
        assert!(stage.already_applied(text));
        assert!(stage.apply(text, &StageContext::default()).text.is_none());
    }

    #[test]
    fn replacement_is_literal() {
        let stage = ClassLabelStage::new(&ClassLabelStageConfig {
            id: "dollar".into(),
            attribute: "className".into(),
            legacy: vec!["old".into()],
            canonical: "$1-page".into(),
            documents: None,
        })
        .unwrap();
        let out = stage
            .apply("<p className=\"old\" />", &StageContext::default())
            .text
            .unwrap();
        assert_eq!(out, "<p className=\"$1-page\" />");
    }

    #[test]
    fn satisfies_stage_contract() {
        let samples: Vec<String> = LEGACY
            .iter()
            .map(|l| format!("<main className=\"{l}\"></main>"))
            .chain(["<main className=\"blog-page\"></main>".to_string(), String::new()])
            .collect();
        let refs: Vec<&str> = samples.iter().map(String::as_str).collect();
        assert_stage_contract(&blog_style(), &refs);
    }
}
