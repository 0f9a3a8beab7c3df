//! Shared contract checks every marker-guarded stage must pass.

use crate::stage::{PatchStage, StageContext, StageOutcome};

/// Apply `stage` to every sample and check:
/// 1. applying twice yields the same text as applying once;
/// 2. after a successful apply the marker is detected;
/// 3. when the marker is already present, apply changes nothing.
pub(crate) fn assert_stage_contract(stage: &dyn PatchStage, samples: &[&str]) {
    assert_stage_contract_with(stage, samples, &StageContext::default());
}

pub(crate) fn assert_stage_contract_with(
    stage: &dyn PatchStage,
    samples: &[&str],
    ctx: &StageContext<'_>,
) {
    for &sample in samples {
        let once = stage.apply(sample, ctx);
        let once_text = once.text.clone().unwrap_or_else(|| sample.to_string());

        let twice = stage.apply(&once_text, ctx);
        let twice_text = twice.text.clone().unwrap_or_else(|| once_text.clone());
        assert_eq!(
            once_text,
            twice_text,
            "stage `{}` is not idempotent on {sample:?}",
            stage.id()
        );

        if once.outcome == StageOutcome::Applied {
            assert!(
                stage.already_applied(&once_text),
                "stage `{}` applied but its marker is missing on {sample:?}",
                stage.id()
            );
            assert_ne!(twice.outcome, StageOutcome::Applied);
        }

        if stage.already_applied(sample) {
            assert!(
                once.text.is_none(),
                "stage `{}` mutated text whose marker was present: {sample:?}",
                stage.id()
            );
        }
    }
}
