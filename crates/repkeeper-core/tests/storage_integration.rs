//! SQLite-backed persistence across process restarts.

use std::sync::Arc;

use repkeeper_core::notify::{CountingAlert, RecordingScheduler};
use repkeeper_core::{
    Collaborators, Command, Config, Database, ExerciseEntry, KeyValueStore, MemoryStore, Mutation,
    SessionRuntime, SetField, WorkoutSession,
};

fn collaborators(db: Arc<Database>) -> Collaborators {
    Collaborators {
        durable: db,
        mirror: Arc::new(MemoryStore::new()),
        scheduler: Arc::new(RecordingScheduler::new()),
        alert: Arc::new(CountingAlert::new()),
    }
}

#[test]
fn session_survives_database_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repkeeper.db");
    let config = Config::default();

    {
        let db = Arc::new(Database::open_at(&path).unwrap());
        let mut session = WorkoutSession::with_id("w-1", 0);
        session.apply(&Mutation::AddExercise {
            entry: ExerciseEntry::new("Barbell Row", Some("Barbell".into()), None),
        });
        let (mut runtime, _) = SessionRuntime::start(session, collaborators(db), &config, 0);
        runtime
            .apply(
                Command::Mutate(Mutation::UpdateSetField {
                    exercise: 0,
                    set: 0,
                    field: SetField::Weight,
                    value: "70".into(),
                }),
                1_000,
            )
            .unwrap();
        runtime.apply(Command::StartRest { seconds: Some(60) }, 1_000).unwrap();
        runtime.tick(1_500);
    }

    let db = Arc::new(Database::open_at(&path).unwrap());
    let (runtime, _) = SessionRuntime::restore(collaborators(db.clone()), &config, 11_000).unwrap();
    assert_eq!(runtime.session().id(), "w-1");
    assert_eq!(runtime.session().set(0, 0).unwrap().weight, "70");
    assert_eq!(runtime.rest().remaining_secs(11_000), 50);
    assert_eq!(
        db.get(&config.storage.rest_end_key).unwrap().as_deref(),
        Some("61000")
    );
}

#[test]
fn finished_workout_lands_in_history() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open_at(&dir.path().join("repkeeper.db")).unwrap());
    let config = Config::default();

    let mut session = WorkoutSession::with_id("w-2", 0);
    session.apply(&Mutation::AddExercise {
        entry: ExerciseEntry::new("Squat", None, None),
    });
    let (mut runtime, _) = SessionRuntime::start(session, collaborators(db.clone()), &config, 0);
    for (field, value) in [(SetField::Weight, "100"), (SetField::Reps, "5")] {
        runtime
            .apply(
                Command::Mutate(Mutation::UpdateSetField {
                    exercise: 0,
                    set: 0,
                    field,
                    value: value.into(),
                }),
                10_000,
            )
            .unwrap();
    }
    runtime.tick(10_500);

    let (record, _) = runtime.end_session(1_800_000).unwrap();
    db.record_workout(&record).unwrap();

    let history = db.workout_history(5).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "w-2");
    assert_eq!(history[0].elapsed_secs, 1_800);
    assert!((history[0].total_volume - 500.0).abs() < f64::EPSILON);
    assert!(db.get(&config.storage.session_key).unwrap().is_none());
    assert!(SessionRuntime::restore(collaborators(db), &config, 1_900_000).is_none());
}
