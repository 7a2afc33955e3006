//! External OS command execution with a hard timeout

use crate::error::CommandError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run `cmd args...` and return stdout, failing on spawn error, timeout or non-zero exit.
///
/// The child is killed if the timeout elapses.
pub async fn run_command(cmd: &str, args: &[&str], timeout: Duration) -> Result<String, CommandError> {
    debug!(cmd, ?args, ?timeout, "Running command");

    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            cmd: cmd.to_string(),
            source,
        })?,
        Err(_) => {
            warn!(cmd, ?timeout, "Command timed out");
            return Err(CommandError::Timeout {
                cmd: cmd.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            cmd: cmd.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
