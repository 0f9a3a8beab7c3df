//! Date stage: rewrites publication dates to the document's staggered date.

use regex::{Captures, Regex};

use pagepatch_shared::{DateStageConfig, DatesConfig, PagePatchError, Result, display_pattern};

use crate::stage::{PatchStage, Selection, StageContext, StageKind, StageOutcome, StageResult};

/// Date forms found in pages written before the display format was configurable.
const LEGACY_DATE: &str = r"\d{2}/\d{2}/\d{4}|\d{4}-\d{2}-\d{2}";

/// Rewrites every `<time dateTime="…">…</time>` element and every
/// `<prefix> <date>` phrase.
///
/// Dates are values, not insertions: the stage runs on every pass and
/// reports [`StageOutcome::UpToDate`] when the text already carries the
/// assigned date. Both patterns accept the configured display format as
/// well as the legacy forms, so a stale date is corrected on the next run.
#[derive(Debug)]
pub struct DateStage {
    id: String,
    time_element: Regex,
    published: Regex,
    prefix: String,
    selection: Selection,
}

impl DateStage {
    pub fn new(config: &DateStageConfig, dates: &DatesConfig) -> Result<Self> {
        let display = display_pattern(&dates.display_format)?;
        let compile = |source: String| {
            Regex::new(&source).map_err(|e| {
                PagePatchError::config(format!("date stage '{}': invalid pattern: {e}", config.id))
            })
        };

        let time_element = compile(format!(
            r#"<time dateTime="\d{{4}}-\d{{2}}-\d{{2}}">(?:{display}|[0-9/.-]+)</time>"#
        ))?;
        let published = compile(format!(
            "{} (?:{display}|{LEGACY_DATE})",
            regex::escape(&dates.published_prefix)
        ))?;

        Ok(Self {
            id: config.id.clone(),
            time_element,
            published,
            prefix: dates.published_prefix.clone(),
            selection: Selection::from_config(config.documents.as_deref()),
        })
    }
}

impl PatchStage for DateStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StageKind {
        StageKind::Date
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn already_applied(&self, _text: &str) -> bool {
        false
    }

    fn always_runs(&self) -> bool {
        true
    }

    fn apply(&self, text: &str, ctx: &StageContext<'_>) -> StageResult {
        let Some(date) = ctx.date else {
            return StageResult::unchanged(StageOutcome::NotSelected);
        };

        let time_tag = format!(
            "<time dateTime=\"{}\">{}</time>",
            date.iso, date.display
        );
        let phrase = format!("{} {}", self.prefix, date.display);

        let patched = self.time_element.replace_all(text, |_: &Captures<'_>| time_tag.clone());
        let patched = self
            .published
            .replace_all(&patched, |_: &Captures<'_>| phrase.clone())
            .into_owned();

        if patched == text {
            StageResult::unchanged(StageOutcome::UpToDate)
        } else {
            StageResult::changed(patched)
        }
    }
}
