// tests/keyword_properties.rs
use proptest::prelude::*;

use procguard::guard::{KeywordSet, LineVerdict, StateCell};
use procguard::types::GuardState;

fn keyword() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

proptest! {
    /// A line holding both kinds of keyword is always classified as started.
    #[test]
    fn started_keywords_win(
        started in proptest::collection::vec(keyword(), 1..4),
        failed in proptest::collection::vec(keyword(), 1..4),
        pick_s in any::<prop::sample::Index>(),
        pick_f in any::<prop::sample::Index>(),
        filler in "[A-Z ]{0,10}",
    ) {
        let set = KeywordSet { started: started.clone(), failed: failed.clone() };
        let s = pick_s.get(&started);
        let f = pick_f.get(&failed);
        let line = format!("{filler}{f} {s}{filler}");

        prop_assert!(matches!(set.classify(&line), Some(LineVerdict::Started(_))));
    }

    /// Lines without any keyword never change the verdict.
    #[test]
    fn unrelated_lines_are_ignored(
        started in proptest::collection::vec(keyword(), 0..4),
        failed in proptest::collection::vec(keyword(), 0..4),
        line in "[A-Z0-9 ]{0,40}",
    ) {
        let set = KeywordSet { started, failed };
        prop_assert!(set.classify(&line).is_none());
    }

    /// Once the state leaves Starting, no later transition out of Starting
    /// can succeed.
    #[test]
    fn leaving_starting_happens_once(targets in proptest::collection::vec(any::<bool>(), 1..8)) {
        let cell = StateCell::new();
        cell.force(GuardState::Starting);

        let mut first: Option<GuardState> = None;
        for started in targets {
            let to = if started { GuardState::Started } else { GuardState::Stopped };
            let moved = cell.leave_starting(to);
            prop_assert_eq!(moved, first.is_none());
            if moved {
                first = Some(to);
            }
        }
        prop_assert_eq!(Some(cell.current()), first);
    }
}
