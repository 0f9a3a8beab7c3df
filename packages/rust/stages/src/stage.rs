//! The patch stage abstraction.
//!
//! A stage is a detection predicate plus an insertion rule. Stages compose
//! through text only: each one sees the output of the previous one.

use std::collections::HashSet;
use std::fmt;

use pagepatch_shared::{ContentBlock, ContentKey, RenderedDate};

/// What a stage did to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The text was modified.
    Applied,
    /// The stage's marker (or the ledger) shows it already ran.
    AlreadyApplied,
    /// The stage ran but had nothing to change.
    UpToDate,
    /// None of the stage's anchors exist in the document.
    AnchorMissing { anchor: String },
    /// The document's content key has no blocks for this stage.
    NoContent,
    /// The stage is not configured for this document.
    NotSelected,
}

impl StageOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Outcomes an operator should hear about.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::AnchorMissing { .. } | Self::NoContent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "already-applied",
            Self::UpToDate => "up-to-date",
            Self::AnchorMissing { .. } => "anchor-missing",
            Self::NoContent => "no-content",
            Self::NotSelected => "not-selected",
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorMissing { anchor } => write!(f, "anchor-missing ({anchor:?})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of [`PatchStage::apply`]: new text when changed, plus the outcome.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub text: Option<String>,
    pub outcome: StageOutcome,
}

impl StageResult {
    pub fn changed(text: String) -> Self {
        Self {
            text: Some(text),
            outcome: StageOutcome::Applied,
        }
    }

    pub fn unchanged(outcome: StageOutcome) -> Self {
        Self { text: None, outcome }
    }
}

/// Stage family, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Import,
    Element,
    ClassLabel,
    Section,
    Date,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Element => "element",
            Self::ClassLabel => "class_label",
            Self::Section => "section",
            Self::Date => "date",
        }
    }
}

/// Per-document inputs a stage may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageContext<'a> {
    /// Document key.
    pub document: &'a str,
    /// The document's content key, if it has one.
    pub content_key: Option<&'a ContentKey>,
    /// Registered blocks for that key; `None` when the key is unregistered.
    pub content: Option<&'a [ContentBlock]>,
    /// The date assigned to the document's catalog position.
    pub date: Option<&'a RenderedDate>,
}

/// Which documents a stage applies to.
#[derive(Debug, Clone, Default)]
pub struct Selection(Option<HashSet<String>>);

impl Selection {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Some(keys.into_iter().map(Into::into).collect()))
    }

    pub fn from_config(documents: Option<&[String]>) -> Self {
        match documents {
            Some(keys) => Self::only(keys.iter().cloned()),
            None => Self::all(),
        }
    }

    pub fn contains(&self, document: &str) -> bool {
        match &self.0 {
            Some(keys) => keys.contains(document),
            None => true,
        }
    }
}

/// A single idempotent text transformation.
///
/// `apply` must leave text untouched when `already_applied` is true, so
/// applying a stage twice gives the same text as applying it once. The one
/// exception is a stage whose [`always_runs`](PatchStage::always_runs) is true:
/// it rewrites values and is never skipped by a marker.
pub trait PatchStage: Send + Sync {
    /// Stable identifier, recorded in the ledger.
    fn id(&self) -> &str;

    fn kind(&self) -> StageKind;

    /// Documents this stage is configured for.
    fn selection(&self) -> &Selection;

    /// Structural check: is this stage's marker present in `text`?
    fn already_applied(&self, text: &str) -> bool;

    /// Transform `text`.
    fn apply(&self, text: &str, ctx: &StageContext<'_>) -> StageResult;

    /// Whether the stage must run even when it ran before.
    fn always_runs(&self) -> bool {
        false
    }

    fn selects(&self, document: &str) -> bool {
        self.selection().contains(document)
    }
}
