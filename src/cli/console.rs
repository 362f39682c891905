// src/cli/console.rs — Line-oriented operator console on stdin

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::commands::{CommandError, CommandFlow, CommandRegistry};
use crate::infra::errors::RelayError;

/// Run one console line. Errors are reported here and never end the loop.
pub async fn run_line(registry: &Arc<CommandRegistry>, line: &str) -> CommandFlow {
    let line = line.trim();
    if line.is_empty() {
        return CommandFlow::Continue;
    }

    // Command callbacks may block (script plugins), so keep them off the
    // async workers.
    let registry = registry.clone();
    let owned = line.to_string();
    let result = tokio::task::spawn_blocking(move || registry.execute(&owned)).await;

    match result {
        Ok(Ok(flow)) => flow,
        Ok(Err(e)) => {
            if let Some(err) = unreported(e) {
                tracing::error!("{}", err);
            }
            CommandFlow::Continue
        }
        Err(e) => {
            tracing::error!("Command '{}' panicked: {}", line, e);
            CommandFlow::Continue
        }
    }
}

/// Errors the bound logger has not already shown to the operator.
fn unreported(e: CommandError) -> Option<RelayError> {
    (!e.is_reported()).then(|| RelayError::Command(e))
}

/// Read lines from `input` on a dedicated thread.
///
/// A blocked read on a plain thread does not hold the runtime open at
/// shutdown, unlike `tokio::io::stdin`. The channel closes at end of input.
pub fn spawn_line_reader<R>(input: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("Console read failed: {}", e);
                    return;
                }
            }
        }
        tracing::debug!("Console input closed");
    });
    rx
}

/// Run commands from `lines` until `exit` or the channel closes.
///
/// Returns the flow of the last command: `Exit` means the operator asked
/// the process to stop.
pub async fn run_console(
    registry: Arc<CommandRegistry>,
    mut lines: mpsc::Receiver<String>,
) -> CommandFlow {
    while let Some(line) = lines.recv().await {
        if run_line(&registry, &line).await == CommandFlow::Exit {
            return CommandFlow::Exit;
        }
    }
    CommandFlow::Continue
}
