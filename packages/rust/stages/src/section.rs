//! Section stage: renders content blocks and inserts them before the
//! primary content-closing anchor.

use pagepatch_shared::{BlockKind, ContentBlock, Fragment, Result, SectionStageConfig, SectionStyle};

use crate::anchor::{self, INDENT};
use crate::stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

/// Attribute stamped on the first rendered section.
pub const SECTION_ATTRIBUTE: &str = "data-pagepatch";

/// Inserts the blocks registered for the document's content key under this
/// stage's slot, followed by the stage's trailing blocks.
#[derive(Debug)]
pub struct SectionStage {
    id: String,
    slot: String,
    marker: String,
    legacy_marker: Option<String>,
    anchor: String,
    trailing: Vec<ContentBlock>,
    style: SectionStyle,
    selection: Selection,
}

impl SectionStage {
    pub fn new(config: &SectionStageConfig) -> Result<Self> {
        Ok(Self {
            id: config.id.clone(),
            slot: config.slot.clone(),
            marker: format!("{SECTION_ATTRIBUTE}=\"{}\"", config.id),
            legacy_marker: config.marker.clone().filter(|m| !m.is_empty()),
            anchor: config.anchor.clone(),
            trailing: config.trailing.clone(),
            style: config.style.clone(),
            selection: Selection::from_config(config.documents.as_deref()),
        })
    }
}

impl PatchStage for SectionStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        StageKind::Section
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn already_applied(&self, text: &str) -> bool {
        text.contains(&self.marker)
            || self
                .legacy_marker
                .as_deref()
                .is_some_and(|legacy| text.contains(legacy))
    }

    fn apply(&self, text: &str, ctx: &StageContext<'_>) -> StageResult {
        if self.already_applied(text) {
            return StageResult::unchanged(StageOutcome::AlreadyApplied);
        }

        if ctx.content_key.is_none() {
            return StageResult::unchanged(StageOutcome::NotSelected);
        }
        let Some(content) = ctx.content else {
            return StageResult::unchanged(StageOutcome::NoContent);
        };

        let keyed: Vec<&ContentBlock> = content.iter().filter(|b| b.slot == self.slot).collect();
        if keyed.is_empty() {
            return StageResult::unchanged(StageOutcome::NoContent);
        }

        let Some(pos) = anchor::find_last(text, &self.anchor) else {
            return StageResult::unchanged(StageOutcome::AnchorMissing {
                anchor: self.anchor.clone(),
            });
        };

        let blocks: Vec<&ContentBlock> = keyed.into_iter().chain(self.trailing.iter()).collect();
        let rendered = render_blocks(&blocks, &self.style, &self.id);
        let indent = format!("{}{INDENT}", anchor::indent_at(text, pos));

        StageResult::changed(anchor::insert_before(
            text,
            pos,
            &anchor::indent_lines(&rendered, &indent),
        ))
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render blocks as consecutive `<section>` elements, in order.
///
/// The first section carries the `data-pagepatch` attribute naming `stage_id`.
pub fn render_blocks(blocks: &[&ContentBlock], style: &SectionStyle, stage_id: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if i == 0 {
            lines.push(format!(
                "<section className=\"{}\" {SECTION_ATTRIBUTE}=\"{stage_id}\">",
                style.section
            ));
        } else {
            lines.push(format!("<section className=\"{}\">", style.section));
        }

        if let Some(heading) = &block.heading {
            lines.push(format!(
                "{INDENT}<h2 className=\"{}\">{heading}</h2>",
                style.heading
            ));
        }

        match block.kind {
            BlockKind::Bullets => {
                lines.push(format!("{INDENT}<ul className=\"{}\">", style.list));
                for fragment in &block.fragments {
                    lines.push(format!(
                        "{INDENT}{INDENT}<li className=\"{}\">{}</li>",
                        style.item,
                        inline(fragment)
                    ));
                }
                lines.push(format!("{INDENT}</ul>"));
            }
            BlockKind::Paragraphs => {
                for fragment in &block.fragments {
                    lines.push(format!(
                        "{INDENT}<p className=\"{}\">{}</p>",
                        style.paragraph,
                        inline(fragment)
                    ));
                }
            }
            BlockKind::Faq => {
                lines.push(format!("{INDENT}<div className=\"{}\">", style.faq));
                for fragment in &block.fragments {
                    lines.push(format!("{INDENT}{INDENT}<p>{}</p>", inline(fragment)));
                }
                lines.push(format!("{INDENT}</div>"));
            }
        }

        if let Some(outro) = &block.outro {
            lines.push(format!(
                "{INDENT}<p className=\"{}\">{outro}</p>",
                style.outro
            ));
        }

        lines.push("</section>".to_string());
    }

    lines.join("\n")
}

fn inline(fragment: &Fragment) -> String {
    match fragment {
        Fragment::Text(text) => text.clone(),
        Fragment::Entry { label, body } => format!("<strong>{label}</strong> {body}"),
    }
}
