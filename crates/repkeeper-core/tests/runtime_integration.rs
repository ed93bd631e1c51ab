//! End-to-end scenarios driven through `SessionRuntime` with a manual clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use repkeeper_core::notify::{CountingAlert, RecordingScheduler};
use repkeeper_core::{
    Clock, Collaborators, Command, Config, Event, ExerciseEntry, KeyValueStore, ManualClock,
    MemoryStore, MoveDirection, Mutation, ProgramSeed, RestStatus, SessionRuntime,
    SessionSnapshot, SetField, SetRecord, WorkoutSession,
};

struct World {
    clock: ManualClock,
    durable: MemoryStore,
    mirror: MemoryStore,
    scheduler: Arc<RecordingScheduler>,
    alert: Arc<CountingAlert>,
    config: Config,
}

impl World {
    fn new() -> Self {
        Self {
            clock: ManualClock::new(1_700_000_000_000),
            durable: MemoryStore::new(),
            mirror: MemoryStore::new(),
            scheduler: Arc::new(RecordingScheduler::new()),
            alert: Arc::new(CountingAlert::new()),
            config: Config::default(),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            durable: Arc::new(self.durable.clone()),
            mirror: Arc::new(self.mirror.clone()),
            scheduler: self.scheduler.clone(),
            alert: self.alert.clone(),
        }
    }

    fn start(&self, names: &[&str]) -> SessionRuntime {
        let mut session = WorkoutSession::new(self.now());
        for name in names {
            session.apply(&Mutation::AddExercise {
                entry: ExerciseEntry::new(*name, None, None),
            });
        }
        SessionRuntime::start(session, self.collaborators(), &self.config, self.now()).0
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn run(&self, runtime: &mut SessionRuntime, command: Command) -> Vec<Event> {
        runtime.apply(command, self.now()).unwrap()
    }

    /// Advance in 100 ms steps, ticking like the foreground poll loop.
    fn advance(&self, runtime: &mut SessionRuntime, ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ms / 100 {
            self.clock.advance_ms(100);
            events.extend(runtime.tick(self.now()));
        }
        events
    }
}

fn names(runtime: &SessionRuntime) -> Vec<String> {
    runtime
        .session()
        .exercises()
        .iter()
        .map(|e| e.name.clone())
        .collect()
}

#[test]
fn five_rapid_up_taps_make_one_move() {
    let world = World::new();
    let mut runtime = world.start(&["A", "B", "C", "D", "E", "F", "G"]);
    world.advance(&mut runtime, 500);
    let writes_before = world.durable.write_count();

    for _ in 0..5 {
        world.run(
            &mut runtime,
            Command::RequestMove {
                index: 6,
                direction: MoveDirection::Up,
            },
        );
        world.clock.advance_ms(40);
    }
    let events = world.advance(&mut runtime, 1_000);

    let moves: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::ExerciseMoved { .. }))
        .collect();
    assert_eq!(moves.len(), 1);
    assert_eq!(names(&runtime), ["A", "G", "B", "C", "D", "E", "F"]);
    assert_eq!(world.durable.write_count(), writes_before + 1);
}

#[test]
fn taps_past_the_top_are_absorbed() {
    let world = World::new();
    let mut runtime = world.start(&["A", "B", "C"]);
    for _ in 0..6 {
        world.run(
            &mut runtime,
            Command::RequestMove {
                index: 1,
                direction: MoveDirection::Up,
            },
        );
    }
    world.advance(&mut runtime, 400);
    assert_eq!(names(&runtime), ["B", "A", "C"]);
}

#[test]
fn cardio_timer_accumulates_across_pause() {
    let world = World::new();
    let mut runtime = world.start(&["Elliptical"]);

    world.run(&mut runtime, Command::StartCardio { exercise: 0, set: 0 });
    world.advance(&mut runtime, 3_000);
    world.run(&mut runtime, Command::PauseCardio { exercise: 0, set: 0 });
    world.advance(&mut runtime, 10_000);
    world.run(&mut runtime, Command::StartCardio { exercise: 0, set: 0 });
    world.advance(&mut runtime, 2_000);

    assert_eq!(runtime.session().set(0, 0).unwrap().duration_seconds, Some(5));
}

#[test]
fn rest_timer_survives_background_gap() {
    let world = World::new();
    let mut runtime = world.start(&["Squat"]);

    world.run(&mut runtime, Command::StartRest { seconds: Some(120) });
    assert_eq!(world.scheduler.pending()[0].delay_secs, 120);
    world.run(&mut runtime, Command::Background);

    world.clock.advance_secs(150);
    assert!(runtime.tick(world.now()).iter().all(|e| !matches!(e, Event::RestExpired { .. })));
    let events = world.run(&mut runtime, Command::Foreground);

    assert!(events.iter().any(|e| matches!(e, Event::RestExpired { alerted: false, .. })));
    assert_eq!(runtime.rest().status(), RestStatus::Expired);
    assert_eq!(runtime.rest().remaining_secs(world.now()), 0);
    assert_eq!(world.alert.count(), 0, "notification was the only signal");
}

#[test]
fn rest_timer_alerts_in_foreground() {
    let world = World::new();
    let mut runtime = world.start(&["Squat"]);
    world.run(&mut runtime, Command::StartRest { seconds: Some(2) });
    let events = world.advance(&mut runtime, 2_500);
    assert!(events.iter().any(|e| matches!(e, Event::RestExpired { alerted: true, .. })));
    assert_eq!(world.alert.count(), 1);

    // Repeat with the remembered duration.
    world.run(&mut runtime, Command::StartRest { seconds: None });
    assert_eq!(runtime.rest().remaining_secs(world.now()), 2);
}

#[test]
fn two_quick_mutations_make_one_write() {
    let world = World::new();
    let mut runtime = world.start(&["Bench Press"]);
    world.advance(&mut runtime, 300);
    let before = world.durable.write_count();

    world.run(&mut runtime, Command::Mutate(Mutation::AddSet { exercise: 0 }));
    world.clock.advance_ms(80);
    world.run(
        &mut runtime,
        Command::Mutate(Mutation::UpdateSetField {
            exercise: 0,
            set: 1,
            field: SetField::Weight,
            value: "80".into(),
        }),
    );
    world.advance(&mut runtime, 500);

    assert_eq!(world.durable.write_count() - before, 1);
    let stored = world
        .durable
        .get(&world.config.storage.session_key)
        .unwrap()
        .unwrap();
    let snapshot = SessionSnapshot::decode(&stored).unwrap();
    assert_eq!(snapshot.exercise_sets[&0][1].weight, "80", "last state wins");
}

#[test]
fn typed_reps_become_a_range() {
    let world = World::new();
    let mut runtime = world.start(&["Bench Press"]);
    for typed in ["1", "12", "123"] {
        world.run(
            &mut runtime,
            Command::Mutate(Mutation::UpdateSetField {
                exercise: 0,
                set: 0,
                field: SetField::Reps,
                value: typed.into(),
            }),
        );
    }
    assert_eq!(runtime.session().set(0, 0).unwrap().reps, "12-3");
}

#[test]
fn focus_loss_flushes_immediately() {
    let world = World::new();
    let mut runtime = world.start(&["Deadlift"]);
    world.run(&mut runtime, Command::Mutate(Mutation::AddSet { exercise: 0 }));
    world.run(&mut runtime, Command::FocusLost);
    assert_eq!(world.durable.write_count(), 1);
    world.advance(&mut runtime, 1_000);
    assert_eq!(world.durable.write_count(), 1, "pending write was replaced");
}

#[test]
fn agent_edit_is_reconciled_before_local_edits() {
    let world = World::new();
    let mut runtime = world.start(&["Squat", "Lunge"]);
    world.run(&mut runtime, Command::ExternalEditBegan);

    // The agent swaps the exercises and writes the mirror.
    let key = world.config.storage.mirror_key.clone();
    let mut snapshot = SessionSnapshot::decode(&world.mirror.get(&key).unwrap().unwrap()).unwrap();
    snapshot.exercises.reverse();
    world.mirror.set(&key, &snapshot.encode().unwrap()).unwrap();

    world.advance(&mut runtime, 1_000);
    assert_eq!(names(&runtime), ["Squat", "Lunge"], "held until the window closes");

    let events = world.run(&mut runtime, Command::ExternalEditEnded);
    assert!(matches!(events[0], Event::MirrorReconciled { adopted: true, .. }));
    assert_eq!(names(&runtime), ["Lunge", "Squat"]);

    world.advance(&mut runtime, 300);
    let durable = SessionSnapshot::decode(
        &world
            .durable
            .get(&world.config.storage.session_key)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(durable.exercises[0].name, "Lunge");
}

#[test]
fn restart_restores_session_and_rest_timer() {
    let world = World::new();
    let mut runtime = world.start(&["Overhead Press"]);
    world.run(
        &mut runtime,
        Command::Mutate(Mutation::UpdateSetField {
            exercise: 0,
            set: 0,
            field: SetField::Weight,
            value: "50".into(),
        }),
    );
    world.run(&mut runtime, Command::StartRest { seconds: Some(90) });
    world.run(&mut runtime, Command::FocusLost);
    drop(runtime);

    world.clock.advance_secs(30);
    let (restored, events) =
        SessionRuntime::restore(world.collaborators(), &world.config, world.now()).unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::RestResumed { remaining_secs: 60, .. })));
    assert!(!events.iter().any(|e| matches!(e, Event::MirrorReconciled { .. })));
    assert_eq!(restored.session().set(0, 0).unwrap().weight, "50");
    assert_eq!(restored.rest().status(), RestStatus::Running);
}

#[test]
fn paused_rest_survives_two_restarts() {
    let world = World::new();
    let mut runtime = world.start(&["Row"]);
    world.run(&mut runtime, Command::StartRest { seconds: Some(60) });
    world.run(&mut runtime, Command::FocusLost);
    drop(runtime);

    let (mut runtime, _) =
        SessionRuntime::restore(world.collaborators(), &world.config, world.now()).unwrap();
    world.clock.advance_secs(40);
    let events = world.run(&mut runtime, Command::PauseRest);
    assert!(events.iter().any(|e| matches!(e, Event::RestPaused { remaining_secs: 20, .. })));
    drop(runtime);

    world.clock.advance_secs(5);
    let (mut restored, _) =
        SessionRuntime::restore(world.collaborators(), &world.config, world.now()).unwrap();
    assert_eq!(restored.rest().status(), RestStatus::Paused);
    assert_eq!(restored.rest().target_secs(), 20);

    world.clock.advance_secs(5);
    world.run(&mut restored, Command::StartRest { seconds: None });
    assert_eq!(restored.rest().end_ms(), Some(world.now() + 20_000));
}

#[test]
fn agent_edit_between_restarts_is_adopted() {
    let world = World::new();
    let mut runtime = world.start(&["Squat"]);
    world.run(&mut runtime, Command::FocusLost);
    drop(runtime);

    // No process holds the session; the agent appends an exercise.
    let key = world.config.storage.mirror_key.clone();
    let mut snapshot = SessionSnapshot::decode(&world.mirror.get(&key).unwrap().unwrap()).unwrap();
    snapshot
        .exercises
        .push(ExerciseEntry::new("Pull-up", None, None));
    snapshot.exercise_sets.insert(1, vec![SetRecord::default()]);
    world.mirror.set(&key, &snapshot.encode().unwrap()).unwrap();

    world.clock.advance_secs(5);
    let (mut restored, events) =
        SessionRuntime::restore(world.collaborators(), &world.config, world.now()).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::MirrorReconciled { adopted: true, .. })));
    assert_eq!(names(&restored), ["Squat", "Pull-up"]);

    world.run(&mut restored, Command::Mutate(Mutation::AddSet { exercise: 0 }));
    restored.shutdown(world.now());

    let mirror = SessionSnapshot::decode(&world.mirror.get(&key).unwrap().unwrap()).unwrap();
    assert_eq!(mirror.exercises.len(), 2, "agent's exercise was kept");
    assert_eq!(mirror.exercise_sets[&0].len(), 2);
    let durable = SessionSnapshot::decode(
        &world
            .durable
            .get(&world.config.storage.session_key)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(durable.exercises[1].name, "Pull-up");
}

#[test]
fn malformed_snapshot_means_no_session() {
    let world = World::new();
    world
        .durable
        .set(&world.config.storage.session_key, "{\"id\": 42")
        .unwrap();
    assert!(SessionRuntime::restore(world.collaborators(), &world.config, world.now()).is_none());
}

#[test]
fn program_targets_survive_session_start() {
    let world = World::new();
    let mut exercise_sets = BTreeMap::new();
    exercise_sets.insert(
        0,
        vec![
            SetRecord {
                reps: "8-12".into(),
                ..SetRecord::default()
            };
            3
        ],
    );
    let seed = ProgramSeed {
        program_name: Some("Upper/Lower".into()),
        day_name: Some("Upper A".into()),
        exercises: vec![
            ExerciseEntry::new("Incline Bench Press", None, None),
            ExerciseEntry::new("Chin-up", None, None),
        ],
        exercise_sets,
    };
    let session = WorkoutSession::from_program(seed, world.now());
    let (mut runtime, events) =
        SessionRuntime::start(session, world.collaborators(), &world.config, world.now());
    assert!(matches!(events[0], Event::SessionStarted { from_program: true, .. }));
    world.advance(&mut runtime, 300);

    let session = runtime.session();
    assert!(session.sets(0).iter().all(|s| s.reps == "8-12"));
    assert_eq!(session.sets(1).len(), 1);
    assert_eq!(session.totals().total_set_count, 4);
}

#[test]
fn deleting_every_exercise_leaves_an_empty_session() {
    let world = World::new();
    let mut runtime = world.start(&["Curl"]);
    world.run(&mut runtime, Command::Mutate(Mutation::DeleteExercise { exercise: 0 }));
    assert!(runtime.session().exercises().is_empty());
    assert!(!runtime.is_ended());

    world.run(
        &mut runtime,
        Command::Mutate(Mutation::AddExercise {
            entry: ExerciseEntry::new("Hammer Curl", None, None),
        }),
    );
    assert_eq!(runtime.session().current_exercise_index(), 0);
}
