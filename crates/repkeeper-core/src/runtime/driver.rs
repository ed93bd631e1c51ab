//! Async driver: a tokio task that owns a [`SessionRuntime`].
//!
//! Commands arrive over an mpsc channel and ticks come from an interval;
//! both are serialized through one `select!` loop, so the session is only
//! ever touched by this task. Events are forwarded to the caller's channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::{Command, SessionRuntime};
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::events::Event;

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<Vec<Event>>>,
    },
    Shutdown,
}

/// Handle to a running driver task.
pub struct RuntimeHandle {
    requests: mpsc::Sender<Request>,
    task: JoinHandle<SessionRuntime>,
}

impl RuntimeHandle {
    /// Send one command and wait for its events.
    ///
    /// # Errors
    ///
    /// Returns the runtime's own error, or [`CoreError::RuntimeStopped`] if
    /// the driver is gone.
    pub async fn send(&self, command: Command) -> Result<Vec<Event>> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| CoreError::RuntimeStopped)?;
        response.await.map_err(|_| CoreError::RuntimeStopped)?
    }

    /// Stop the loop, flush, and hand the runtime back.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RuntimeStopped`] if the task panicked.
    pub async fn shutdown(self) -> Result<SessionRuntime> {
        // A closed channel means the loop already exited; join it either way.
        let _ = self.requests.send(Request::Shutdown).await;
        self.task.await.map_err(|e| {
            warn!(error = %e, "session driver task failed");
            CoreError::RuntimeStopped
        })
    }
}

/// Spawn the driver loop on the current tokio runtime.
pub fn spawn_runtime(
    mut runtime: SessionRuntime,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<Event>,
) -> RuntimeHandle {
    let (requests, mut inbox) = mpsc::channel::<Request>(32);

    let task = tokio::spawn(async move {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                request = inbox.recv() => match request {
                    Some(Request::Command { command, reply }) => {
                        let result = runtime.apply(command, clock.now_ms());
                        if let Ok(emitted) = &result {
                            forward(&events, emitted);
                        }
                        let _ = reply.send(result);
                        if runtime.is_ended() {
                            debug!("session ended, driver stopping");
                            break;
                        }
                    }
                    Some(Request::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    let emitted = runtime.tick(clock.now_ms());
                    forward(&events, &emitted);
                }
            }
        }

        let emitted = runtime.shutdown(clock.now_ms());
        forward(&events, &emitted);
        runtime
    });

    RuntimeHandle { requests, task }
}

fn forward(sink: &mpsc::UnboundedSender<Event>, events: &[Event]) {
    for event in events {
        // Nobody listening is fine; events are informational.
        let _ = sink.send(event.clone());
    }
}
