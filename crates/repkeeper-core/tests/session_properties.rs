//! Property tests for the session aggregate and the reorder coalescer.

use proptest::prelude::*;
use repkeeper_core::{
    ExerciseEntry, MoveDirection, Mutation, ReorderCoalescer, WorkoutSession,
};

const NAMES: &[&str] = &["Bench Press", "Pull-up", "Treadmill", "Squat", "Plank", "Row"];

fn session_with(len: usize) -> WorkoutSession {
    let mut session = WorkoutSession::with_id("prop", 0);
    for i in 0..len {
        session.apply(&Mutation::AddExercise {
            entry: ExerciseEntry::new(NAMES[i % NAMES.len()], None, None),
        });
    }
    session
}

fn structural_op() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0usize..8, 0usize..8).prop_map(|(a, b)| Mutation::PairSuperset { a, b }),
        (0usize..8).prop_map(|exercise| Mutation::UnpairSuperset { exercise }),
        (0usize..8).prop_map(|exercise| Mutation::DeleteExercise { exercise }),
        (0usize..8, 0usize..8).prop_map(|(from, to)| Mutation::MoveExercise { from, to }),
        (0usize..8).prop_map(|exercise| Mutation::AddSet { exercise }),
        (0usize..8, 0usize..4).prop_map(|(exercise, set)| Mutation::DeleteSet { exercise, set }),
        (0usize..6).prop_map(|i| Mutation::AddExercise {
            entry: ExerciseEntry::new(NAMES[i], None, None),
        }),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_any_edit_sequence(
        len in 0usize..7,
        ops in prop::collection::vec(structural_op(), 0..40),
    ) {
        let mut session = session_with(len);
        for op in &ops {
            session.apply(op);
            prop_assert!(session.is_consistent(), "broken after {:?}", op);
            for (a, b) in session.pairings() {
                prop_assert_eq!(session.partner(*b), Some(*a));
            }
            let set_count: usize = session.sets_by_exercise().values().map(Vec::len).sum();
            prop_assert_eq!(session.totals().total_set_count, set_count);
        }
    }

    #[test]
    fn elapsed_is_never_negative_or_decreasing(
        start in 0u64..1_000_000,
        steps in prop::collection::vec((any::<bool>(), 0u64..120_000), 1..30),
    ) {
        let mut session = WorkoutSession::with_id("clock", start);
        let mut now = start;
        let mut last = session.elapsed_secs(now);
        for (pause, delta) in steps {
            now += delta;
            if pause {
                session.pause_clock(now);
            } else {
                session.resume_clock(now);
            }
            let elapsed = session.elapsed_secs(now);
            prop_assert!(elapsed >= last, "elapsed went from {} to {}", last, elapsed);
            last = elapsed;
        }
        // Before the start time the clock reads zero.
        prop_assert_eq!(WorkoutSession::with_id("early", start + 10_000).elapsed_secs(start), 0);
    }

    #[test]
    fn coalesced_move_lands_at_clamped_target(
        len in 1usize..10,
        index in 0usize..10,
        taps in 1usize..15,
        up in any::<bool>(),
    ) {
        prop_assume!(index < len);
        let direction = if up { MoveDirection::Up } else { MoveDirection::Down };
        let mut coalescer = ReorderCoalescer::new(300);
        for t in 0..taps {
            coalescer.request_move(index, direction, t as u64 * 10);
        }
        let expected = if up {
            index.saturating_sub(taps)
        } else {
            (index + taps).min(len - 1)
        };
        let resolved = coalescer.poll(10_000, len);
        if expected == index {
            prop_assert_eq!(resolved, None);
        } else {
            prop_assert_eq!(resolved, Some((index, expected)));
        }
    }

    #[test]
    fn deleting_before_current_shifts_pointer_by_one(
        len in 2usize..8,
        current in 0usize..8,
        deleted in 0usize..8,
    ) {
        prop_assume!(current < len && deleted < len);
        let mut session = session_with(len);
        session.apply(&Mutation::SetCurrentExercise { exercise: current });
        session.apply(&Mutation::DeleteExercise { exercise: deleted });
        let expected = if deleted < current {
            current - 1
        } else if deleted == current {
            deleted.min(len - 2)
        } else {
            current
        };
        prop_assert_eq!(session.current_exercise_index(), expected);
    }
}

#[test]
fn repairing_superset_moves_old_partner_out() {
    let mut session = session_with(3);
    session.apply(&Mutation::PairSuperset { a: 0, b: 1 });
    session.apply(&Mutation::PairSuperset { a: 0, b: 2 });
    assert_eq!(session.partner(0), Some(2));
    assert_eq!(session.partner(2), Some(0));
    assert_eq!(session.partner(1), None);
}
