//! Operator input: stdin lines and Ctrl-C become station commands.

use std::io::BufRead;

use crossbeam_channel as xch;
use scalepos_core::Command;

/// `d` delete last, `c` clear, `x` checkout, `r` rescan, `q` quit.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "d" | "delete" => Some(Command::DeleteLast),
        "c" | "clear" => Some(Command::Clear),
        "x" | "checkout" => Some(Command::Checkout),
        "r" | "rescan" => Some(Command::Rescan),
        "q" | "quit" => Some(Command::Shutdown),
        _ => None,
    }
}

/// Forward stdin lines until EOF. The thread is detached: a blocked read
/// cannot be interrupted, and it dies with the process.
pub fn spawn_stdin_reader(tx: xch::Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(input = %line.trim(), "unknown command (d|c|x|r|q)"),
            }
        }
        tracing::debug!("stdin closed");
    });
}

/// Ctrl-C requests a clean shutdown through the same channel.
pub fn install_ctrlc(tx: xch::Sender<Command>) {
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(Command::Shutdown);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
}
