use clap::Subcommand;
use repkeeper_core::clock::now_ms;
use repkeeper_core::Command;
use serde_json::json;

use super::{apply_once, CliResult, Context};

#[derive(Subcommand)]
pub enum RestAction {
    /// Start the rest countdown (defaults to the last duration used)
    Start { seconds: Option<u64> },
    /// Pause the countdown, keeping the remaining time
    Pause,
    /// Stop the countdown
    Cancel,
    /// Show the countdown state
    Status,
}

pub fn run(action: RestAction) -> CliResult {
    match action {
        RestAction::Start { seconds } => apply_once(Command::StartRest { seconds }),
        RestAction::Pause => apply_once(Command::PauseRest),
        RestAction::Cancel => apply_once(Command::CancelRest),
        RestAction::Status => {
            let ctx = Context::open()?;
            let now = now_ms();
            let (mut runtime, _) = ctx.restore(now)?;
            runtime.tick(now);
            let rest = runtime.rest();
            let view = json!({
                "status": rest.status(),
                "remainingSecs": rest.remaining_secs(now),
                "targetSecs": rest.target_secs(),
                "endMs": rest.end_ms(),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
            runtime.shutdown(now);
            Ok(())
        }
    }
}
