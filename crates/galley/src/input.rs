//! Interactive commands read from stdin
//!
//! One command per line:
//! - `r`, `rebuild` or an empty line: rebuild everything
//! - `c`, `reload`: reload the configuration
//! - `q`, `quit`: stop galley
//!
//! End of input counts as `quit`.

use crate::worker::WorkerCommand;
use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread;

/// Map one input line to a worker command
pub fn parse_command(line: &str) -> Option<WorkerCommand> {
    match line.trim().to_lowercase().as_str() {
        "" | "r" | "rebuild" => Some(WorkerCommand::BuildAll),
        "c" | "reload" => Some(WorkerCommand::ReloadConfig),
        "q" | "quit" | "exit" => Some(WorkerCommand::Quit),
        _ => None,
    }
}

/// Forward commands read from `input` until quit or end of input
pub fn forward_commands<R: BufRead>(input: R, command_tx: &Sender<WorkerCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Failed to read input: {}", e);
                break;
            }
        };

        let Some(command) = parse_command(&line) else {
            log::warn!("Unknown command: {}", line.trim());
            continue;
        };
        let quit = command == WorkerCommand::Quit;
        if command_tx.send(command).is_err() || quit {
            return;
        }
    }

    if command_tx.send(WorkerCommand::Quit).is_err() {
        log::debug!("Build worker already stopped");
    }
}

/// Spawn a thread that reads commands from stdin
pub fn spawn_input_reader(command_tx: Sender<WorkerCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        forward_commands(stdin.lock(), &command_tx);
        log::debug!("Input reader stopped");
    })
}
