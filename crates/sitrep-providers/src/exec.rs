//! External command execution shared by CLI-backed providers.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ProviderError, Result};

/// Run `program` with `args` and return its stdout.
///
/// The child is killed if the returned future is dropped, so a scheduler
/// timeout never leaves a stray process behind.
pub async fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        // a missing cwd also spawns as NotFound; keep it apart from a missing tool
        if !dir.is_dir() {
            return Err(ProviderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory {} does not exist", dir.display()),
            )));
        }
        command.current_dir(dir);
    }

    debug!(program, ?args, "spawning provider command");
    let child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProviderError::ToolMissing(program.to_string()),
        _ => ProviderError::Io(e),
    })?;

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ProviderError::CommandFailed {
            tool: program.to_string(),
            code: output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
