//! Post-update commands
//!
//! Each command is one `sh -c` invocation with no stdin. Output is forwarded
//! to the log line by line while the command runs. A command is finished
//! when the shell exits, even if a background process it started still
//! holds the output pipes.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::{SyncError, SyncResult};

const SHELL: &str = "sh";

/// How long to keep reading output after the shell has exited
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Run commands in order, stopping at the first failure
///
/// Commands that already ran are not undone.
pub async fn run_commands(commands: &[String]) -> SyncResult<()> {
    for command in commands {
        run_command(command).await?;
    }

    Ok(())
}

async fn run_command(command: &str) -> SyncResult<()> {
    info!(command = %command, "Running command");

    let mut child = Command::new(SHELL)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            error!(command = %command, error = %source, "Failed to start command");
            SyncError::CommandSpawn {
                command: command.to_string(),
                source,
            }
        })?;

    let mut stdout = child.stdout.take().map(|out| BufReader::new(out).lines());
    let mut stderr = child.stderr.take().map(|err| BufReader::new(err).lines());

    let status = loop {
        tokio::select! {
            biased;

            line = next_line(&mut stdout), if stdout.is_some() => match line {
                Some(line) => info!(command = %command, "{}", line),
                None => stdout = None,
            },

            line = next_line(&mut stderr), if stderr.is_some() => match line {
                Some(line) => warn!(command = %command, "{}", line),
                None => stderr = None,
            },

            status = child.wait() => break status,
        }
    };

    let status = status.map_err(|source| {
        error!(command = %command, error = %source, "Failed to wait for command");
        SyncError::CommandSpawn {
            command: command.to_string(),
            source,
        }
    })?;

    // Pick up output written just before exit without waiting on pipes a
    // background process may keep open
    let drain = async {
        while let Some(line) = next_line(&mut stdout).await {
            info!(command = %command, "{}", line);
        }
        while let Some(line) = next_line(&mut stderr).await {
            warn!(command = %command, "{}", line);
        }
    };
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, drain).await;

    if !status.success() {
        error!(command = %command, status = ?status.code(), "Command failed");
        return Err(SyncError::CommandFailed {
            command: command.to_string(),
            status: status.code(),
        });
    }

    Ok(())
}

/// Next line from an output pipe; `None` at EOF, on a read error, or once
/// the pipe has been closed
async fn next_line<R>(lines: &mut Option<Lines<BufReader<R>>>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}
