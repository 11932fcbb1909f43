//! Scripted runs: feed command lines to one engine, in order, and collect the
//! output lines they produce.
//!
//! A run ends after `Quit` (remaining lines are ignored) or when the lines run
//! out. An unrecognized command aborts the run with `InvalidCommand`.

use tracing::debug;

use crate::command::Command;
use crate::engine::DispatchEngine;
use crate::error::Result;

/// Output of a scripted run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub lines: Vec<String>,
    /// Commands applied, `Quit` included.
    pub commands_applied: usize,
    pub quit: bool,
}

pub fn run_script<'a, I>(engine: &mut DispatchEngine, lines: I) -> Result<ScriptOutput>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut output = ScriptOutput::default();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let command: Command = line.parse()?;
        output.lines.extend(command.apply(engine)?);
        output.commands_applied += 1;

        if command == Command::Quit {
            output.quit = true;
            break;
        }
    }

    debug!(
        commands = output.commands_applied,
        lines = output.lines.len(),
        quit = output.quit,
        "script finished"
    );
    Ok(output)
}
