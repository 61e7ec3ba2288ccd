use proptest::prelude::*;

use movemint::progress::{OperationOptions, ProgressTracker};

#[derive(Debug, Clone)]
enum Step {
    Update(f64),
    Start(usize),
    Advance(usize, f64),
    Complete(usize),
    Fail(usize),
}

const STAGES: [&str; 4] = ["queued", "pose", "score", "render"];

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (-50.0..150.0_f64).prop_map(Step::Update),
        (0..STAGES.len()).prop_map(Step::Start),
        (0..STAGES.len(), -10.0..110.0_f64).prop_map(|(i, p)| Step::Advance(i, p)),
        (0..STAGES.len()).prop_map(Step::Complete),
        (0..STAGES.len()).prop_map(Step::Fail),
    ]
}

proptest! {
    #[test]
    fn percentage_never_decreases(steps in prop::collection::vec(arb_step(), 1..40)) {
        let mut tracker = ProgressTracker::default();
        tracker
            .start("op", OperationOptions::new("Op").with_sub_stages(STAGES))
            .unwrap();
        let mut last = 0.0;

        for step in steps {
            // invalid transitions are rejected; the state must stay sane either way
            let _ = match step {
                Step::Update(p) => tracker.update("op", p, None, None),
                Step::Start(i) => tracker.start_sub_stage("op", STAGES[i]),
                Step::Advance(i, p) => tracker.update_sub_stage("op", STAGES[i], p),
                Step::Complete(i) => tracker.complete_sub_stage("op", STAGES[i]),
                Step::Fail(i) => tracker.fail_sub_stage("op", STAGES[i], "boom"),
            };
            let op = tracker.get("op").unwrap();
            prop_assert!(op.percentage >= last, "{} dropped below {}", op.percentage, last);
            prop_assert!((0.0..=100.0).contains(&op.percentage));
            prop_assert!(op.sub_stages_well_ordered(), "bad order: {:?}", op.sub_stages);
            prop_assert!(op.sub_stages.iter().filter(|s| s.status == movemint::progress::SubStageStatus::Active).count() <= 1);
            last = op.percentage;
        }
    }

    #[test]
    fn terminal_operations_reject_updates(p in 0.0..100.0_f64, cancel in any::<bool>()) {
        let mut tracker = ProgressTracker::default();
        tracker
            .start("op", OperationOptions::new("Op").cancellable())
            .unwrap();
        if cancel {
            tracker.cancel("op").unwrap();
        } else {
            tracker.complete("op", None).unwrap();
        }
        let before = tracker.get("op").unwrap().percentage;
        prop_assert!(tracker.update("op", p, None, None).is_err());
        prop_assert_eq!(tracker.get("op").unwrap().percentage, before);
    }
}
