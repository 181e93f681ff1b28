//! Stage-outcome gate for downstream file updates

use crate::engine::{StageOutcome, Verb};

/// Decide whether a stage's outcome should suppress downstream file sync
///
/// Only a completed `up` carries a meaningful signal: an apply whose change
/// summary is empty after removing the unchanged bucket has nothing to
/// propagate. Every other verb and every other outcome skips. The default
/// is always skip, never update.
pub fn should_skip_file_update(outcome: &StageOutcome, verb: Verb) -> bool {
    if verb != Verb::Up {
        return true;
    }

    match outcome {
        StageOutcome::Applied(summary) => summary.without_unchanged().is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChangeSummary, PreviewReport};
    use std::collections::BTreeMap;

    fn applied(buckets: &[(&str, u64)]) -> StageOutcome {
        StageOutcome::Applied(ChangeSummary::new(
            buckets
                .iter()
                .map(|(op, count)| (op.to_string(), *count))
                .collect::<BTreeMap<_, _>>(),
        ))
    }

    #[test]
    fn test_up_with_changes_updates_files() {
        let outcome = applied(&[("create", 2), ("same", 1)]);
        assert!(!should_skip_file_update(&outcome, Verb::Up));
    }

    #[test]
    fn test_up_with_only_unchanged_skips() {
        let outcome = applied(&[("same", 5)]);
        assert!(should_skip_file_update(&outcome, Verb::Up));
    }

    #[test]
    fn test_up_with_empty_summary_skips() {
        let outcome = applied(&[]);
        assert!(should_skip_file_update(&outcome, Verb::Up));
    }

    #[test]
    fn test_non_up_verbs_always_skip() {
        let outcome = applied(&[("create", 2)]);
        assert!(should_skip_file_update(&outcome, Verb::Rm));
        assert!(should_skip_file_update(&outcome, Verb::RmStack));
        assert!(should_skip_file_update(&outcome, Verb::Preview));
    }

    #[test]
    fn test_non_apply_outcomes_skip_even_for_up() {
        assert!(should_skip_file_update(&StageOutcome::Destroyed, Verb::Up));
        assert!(should_skip_file_update(
            &StageOutcome::Previewed(PreviewReport::default()),
            Verb::Up
        ));
    }
}
