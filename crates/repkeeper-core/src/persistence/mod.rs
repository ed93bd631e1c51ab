//! Session snapshot persistence.

mod autosave;
mod snapshot;

pub use autosave::{load_session, AutoPersistence};
pub use snapshot::SessionSnapshot;
