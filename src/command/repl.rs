use std::io::{BufRead, Write};

use log::error;

use super::parser::Command;
use super::registry::Registry;
use crate::error::Result;

/// Read commands from `input` one line at a time, dispatch them against
/// `registry`, and write results to `output`. Returns when `exit` is read,
/// the input is exhausted, or a command fails with an I/O error (which is
/// logged and then propagated, per the command layer's failure policy).
pub fn run(input: impl BufRead, mut output: impl Write, registry: &mut Registry) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{e}").ok();
                continue;
            }
        };

        if command == Command::Exit {
            return Ok(());
        }

        if let Err(e) = dispatch(command, &mut output, registry) {
            error!("command failed: {e}");
            return Err(e);
        }
    }
    Ok(())
}

fn dispatch(command: Command, output: &mut impl Write, registry: &mut Registry) -> Result<()> {
    match command {
        Command::Exit => unreachable!("handled by the caller before dispatch"),
        Command::Create { table } => {
            registry.get_or_open(&table)?;
            Ok(())
        }
        Command::Insert { table, key } => {
            registry.get_or_open(&table)?.insert(key)?;
            Ok(())
        }
        Command::Erase { table, key } => {
            registry.get_or_open(&table)?.erase(key)?;
            Ok(())
        }
        Command::Query { table, key } => {
            let found = registry.get_or_open(&table)?.search(key)?;
            writeln!(output, "{}", found as u8).ok();
            Ok(())
        }
        Command::Destroy { table } => registry.destroy(&table),
    }
}
