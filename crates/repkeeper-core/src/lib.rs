//! # Repkeeper Core Library
//!
//! This library provides the workout session engine behind Repkeeper: the
//! timing, state and persistence contract of one in-progress workout. All
//! operations are available through the standalone `repkeeper` CLI; any UI
//! is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Session**: the [`WorkoutSession`] aggregate, its pause/resume clock and
//!   the structural [`Mutation`]s applied to it
//! - **Timers**: the rest countdown ([`RestTimer`]) and per-set cardio
//!   stopwatches ([`TimerPool`]), both wall-clock state machines with no
//!   internal threads
//! - **Reorder**: [`ReorderCoalescer`] folds rapid move taps into one move
//! - **Persistence**: debounced snapshot writes to a durable store and an
//!   externally editable mirror ([`AutoPersistence`])
//! - **Runtime**: [`SessionRuntime`] owns all of the above and serializes
//!   commands and ticks; [`spawn_runtime`] drives it from a tokio task
//! - **Storage**: SQLite key-value storage and workout history, TOML config
//!
//! Every component takes the current time as an explicit `now_ms`
//! argument; see [`clock`].

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod persistence;
pub mod reorder;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, RestTimerError, StorageError, ValidationError};
pub use events::Event;
pub use notify::{ExpiryAlert, LogAlert, LogScheduler, NotificationPayload, NotificationScheduler};
pub use persistence::{AutoPersistence, SessionSnapshot};
pub use reorder::{MoveDirection, PendingMove, ReorderCoalescer};
pub use runtime::{spawn_runtime, Collaborators, Command, RuntimeHandle, SessionRuntime};
pub use session::{
    ExerciseEntry, ExerciseKind, Mutation, ProgramSeed, SetField, SetRecord, SetType, Totals,
    WorkoutSession,
};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, WorkoutRecord};
pub use timer::{RestStatus, RestTimer, SetKey, TimerPool};
