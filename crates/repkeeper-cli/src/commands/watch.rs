//! Long-running mode: the session runtime is driven by a tokio task and
//! commands are read line by line from stdin.
//!
//! ```text
//! rest start 90      rest pause        rest cancel
//! cardio start 0 0   cardio pause 0 0
//! move 3 up          set 1 0 reps 8-10
//! pause | resume | fg | bg | blur | agent begin | agent end
//! finish | quit
//! ```

use std::sync::Arc;
use std::time::Duration;

use repkeeper_core::{
    spawn_runtime, Clock, Command, CoreError, Event, MoveDirection, Mutation, SetField,
    SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{print_events, CliResult, Context};

#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    /// Stop watching; the session stays active.
    Quit,
    /// End the session and record it.
    Finish,
}

pub fn run() -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch())
}

async fn watch() -> CliResult {
    let ctx = Context::open()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (runtime, restored) = ctx.restore(clock.now_ms())?;
    print_events(&restored)?;

    let (events_tx, mut events) = mpsc::unbounded_channel::<Event>();
    let poll = Duration::from_millis(ctx.config.rest.poll_interval_ms.max(1));
    let handle = spawn_runtime(runtime, clock.clone(), poll, events_tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut finish = false;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(Input::Finish)) => {
                        finish = true;
                        break;
                    }
                    Ok(Some(Input::Command(command))) => match handle.send(command).await {
                        Ok(_) => {}
                        Err(CoreError::RuntimeStopped) => break,
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Err(message) => eprintln!("error: {message}"),
                }
            }
            Some(event) = events.recv() => print_events(std::slice::from_ref(&event))?,
        }
    }

    let mut runtime = handle.shutdown().await?;
    while let Ok(event) = events.try_recv() {
        print_events(std::slice::from_ref(&event))?;
    }

    if finish {
        let (summary, ended) = runtime.end_session(clock.now_ms())?;
        ctx.db.record_workout(&summary)?;
        print_events(&ended)?;
    }
    Ok(())
}

fn parse_index(word: Option<&str>, what: &str) -> Result<usize, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    word.parse().map_err(|_| format!("invalid {what} '{word}'"))
}

fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["quit" | "exit"] => return Ok(Some(Input::Quit)),
        ["finish"] => return Ok(Some(Input::Finish)),
        ["pause"] => Command::PauseSession,
        ["resume"] => Command::ResumeSession,
        ["fg"] => Command::Foreground,
        ["bg"] => Command::Background,
        ["blur"] => Command::FocusLost,
        ["agent", "begin"] => Command::ExternalEditBegan,
        ["agent", "end"] => Command::ExternalEditEnded,
        ["rest", "start"] => Command::StartRest { seconds: None },
        ["rest", "start", secs] => Command::StartRest {
            seconds: Some(secs.parse().map_err(|_| format!("invalid seconds '{secs}'"))?),
        },
        ["rest", "pause"] => Command::PauseRest,
        ["rest", "cancel"] => Command::CancelRest,
        ["cardio", action @ ("start" | "pause"), rest @ ..] => {
            let exercise = parse_index(rest.first().copied(), "exercise index")?;
            let set = parse_index(rest.get(1).copied(), "set index")?;
            if *action == "start" {
                Command::StartCardio { exercise, set }
            } else {
                Command::PauseCardio { exercise, set }
            }
        }
        ["move", index, direction] => Command::RequestMove {
            index: parse_index(Some(*index), "exercise index")?,
            direction: direction.parse::<MoveDirection>()?,
        },
        ["set", exercise, set, field, value @ ..] if !value.is_empty() => {
            Command::Mutate(Mutation::UpdateSetField {
                exercise: parse_index(Some(*exercise), "exercise index")?,
                set: parse_index(Some(*set), "set index")?,
                field: field.parse::<SetField>()?,
                value: value.join(" "),
            })
        }
        _ => return Err(format!("unrecognized command '{}'", line.trim())),
    };
    Ok(Some(Input::Command(command)))
}
