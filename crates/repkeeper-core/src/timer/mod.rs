//! Session timers.
//!
//! Neither timer owns a thread. Both are wall-clock state machines driven by
//! the runtime, which passes the current time into every call.

mod pool;
mod rest;

pub use pool::{SetKey, TimerHandle, TimerPool};
pub use rest::{RestStatus, RestTimer};
