//! Element stage: places a component reference next to a closing anchor.

use regex::Regex;

use pagepatch_shared::{AnchorConfig, ElementStageConfig, PagePatchError, Placement, Result};

use crate::anchor::{self, INDENT};
use crate::stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

/// Inserts an element (e.g. `<PublicFooter />`) relative to the last
/// occurrence of the first anchor that exists in the document.
#[derive(Debug)]
pub struct ElementStage {
    id: String,
    element: String,
    marker: String,
    marker_re: Regex,
    anchors: Vec<AnchorConfig>,
    selection: Selection,
}

impl ElementStage {
    pub fn new(config: &ElementStageConfig) -> Result<Self> {
        let marker = config
            .marker
            .clone()
            .unwrap_or_else(|| opening_tag(&config.element));
        let marker_re = marker_regex(&marker).map_err(|e| {
            PagePatchError::config(format!("element stage '{}': invalid marker: {e}", config.id))
        })?;

        Ok(Self {
            id: config.id.clone(),
            element: config.element.trim().to_string(),
            marker,
            marker_re,
            anchors: config.anchors.clone(),
            selection: Selection::from_config(config.documents.as_deref()),
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn describe_anchors(&self) -> String {
        self.anchors
            .iter()
            .map(|a| a.pattern.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// `<PublicFooter />` → `<PublicFooter`.
fn opening_tag(element: &str) -> String {
    let element = element.trim();
    let end = element
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c.is_whitespace() || c == '/' || c == '>')
        .map_or(element.len(), |(i, _)| i);
    element[..end].to_string()
}

/// `<PublicFooter` must not match `<PublicFooterLegacy`.
fn marker_regex(marker: &str) -> std::result::Result<Regex, regex::Error> {
    let boundary = if marker.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
        r"\b"
    } else {
        ""
    };
    Regex::new(&format!("{}{boundary}", regex::escape(marker)))
}

impl PatchStage for ElementStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        StageKind::Element
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn already_applied(&self, text: &str) -> bool {
        self.marker_re.is_match(text)
    }

    fn apply(&self, text: &str, _ctx: &StageContext<'_>) -> StageResult {
        if self.already_applied(text) {
            return StageResult::unchanged(StageOutcome::AlreadyApplied);
        }

        for candidate in &self.anchors {
            let Some(pos) = anchor::find_last(text, &candidate.pattern) else {
                continue;
            };

            let indent = anchor::indent_at(text, pos);
            let patched = match candidate.placement {
                Placement::After => {
                    let line = format!("{indent}{}", self.element);
                    anchor::insert_after(text, pos + candidate.pattern.len(), &line)
                }
                Placement::Before => {
                    let line = format!("{indent}{INDENT}{}", self.element);
                    anchor::insert_before(text, pos, &line)
                }
            };
            return StageResult::changed(patched);
        }

        StageResult::unchanged(StageOutcome::AnchorMissing {
            anchor: self.describe_anchors(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_stage_contract;

    fn footer_element() -> ElementStage {
        ElementStage::new(&ElementStageConfig {
            id: "footer-element".into(),
            element: "<PublicFooter />".into(),
            marker: None,
            anchors: vec![
                AnchorConfig {
                    pattern: "</main>".into(),
                    placement: Placement::After,
                },
                AnchorConfig {
                    pattern: "</div>\n  );".into(),
                    placement: Placement::Before,
                },
            ],
            documents: None,
        })
        .unwrap()
    }

    #[test]
    fn derives_marker_from_element() {
        assert_eq!(footer_element().marker(), "<PublicFooter");
        assert_eq!(opening_tag("<Foo bar=\"1\" />"), "<Foo");
        assert_eq!(opening_tag("<Foo>"), "<Foo");
    }

    #[test]
    fn longer_tag_is_not_a_marker() {
        let stage = footer_element();
        assert!(!stage.already_applied("<main></main>\n<PublicFooterLegacy />\n"));
        assert!(stage.already_applied("<PublicFooter />"));
        assert!(stage.already_applied("<PublicFooter\n  compact\n/>"));

        let text = "    <div>\n      <main>\n      </main>\n      <PublicFooterLegacy />\n    </div>\n  );\n";
        let out = stage.apply(text, &StageContext::default()).text.unwrap();
        assert!(out.contains("      </main>\n      <PublicFooter />\n      <PublicFooterLegacy />"));
    }

    #[test]
    fn custom_marker_ending_in_punctuation() {
        let stage = ElementStage::new(&ElementStageConfig {
            id: "footer-element".into(),
            element: "<PublicFooter />".into(),
            marker: Some("{/* footer */}".into()),
            anchors: vec![AnchorConfig {
                pattern: "</main>".into(),
                placement: Placement::After,
            }],
            documents: None,
        })
        .unwrap();
        assert!(stage.already_applied("<main></main>{/* footer */}x"));
        assert!(!stage.already_applied("<main></main>"));
    }

    #[test]
    fn inserts_after_main() {
        let text = "  return (\n    <div>\n      <main>\n      </main>\n    </div>\n  );\n";
        let result = footer_element().apply(text, &StageContext::default());
        assert_eq!(result.outcome, StageOutcome::Applied);
        assert_eq!(
            result.text.unwrap(),
            "  return (\n    <div>\n      <main>\n      </main>\n      <PublicFooter />\n    </div>\n  );\n"
        );
    }

    #[test]
    fn falls_back_to_closing_div() {
        let text = "  return (\n    <div>\n      <p>Hi</p>\n    </div>\n  );\n";
        let result = footer_element().apply(text, &StageContext::default());
        assert_eq!(
            result.text.unwrap(),
            "  return (\n    <div>\n      <p>Hi</p>\n      <PublicFooter />\n    </div>\n  );\n"
        );
    }

    #[test]
    fn uses_last_main_when_nested() {
        let text = "<main>\n  <main>\n  </main>\n</main>\n";
        let out = footer_element()
            .apply(text, &StageContext::default())
            .text
            .unwrap();
        assert_eq!(out, "<main>\n  <main>\n  </main>\n</main>\n<PublicFooter />\n");
        assert_eq!(out.matches("<PublicFooter").count(), 1);
    }

    #[test]
    fn missing_anchor_is_reported_not_guessed() {
        let text = "export const x = 1;\n";
        let result = footer_element().apply(text, &StageContext::default());
        assert!(result.text.is_none());
        assert!(matches!(result.outcome, StageOutcome::AnchorMissing { .. }));
    }

    #[test]
    fn satisfies_stage_contract() {
        assert_stage_contract(
            &footer_element(),
            &[
                "",
                "<main></main>",
                "    <div>\n    </div>\n  );",
                "<main>\n</main>\n<PublicFooter />",
            ],
        );
    }
}
