use base64::{engine::general_purpose, Engine as _};

use crate::error::{TaskError, TaskResult};
use crate::executor::{Executor, RemoteCommand};
use crate::ssh::CommandResult;

/// Script used to append a line: `$1` is the base64 payload, `$2` the file.
const APPEND_SCRIPT: &str = r#"printf '%s' "$1" | base64 -d >> "$2""#;

/// Run a privileged command that must succeed.
pub async fn sudo_checked(exec: &dyn Executor, command: RemoteCommand) -> TaskResult<CommandResult> {
    let result = exec.sudo(&command).await?;
    ensure_success(&command, result)
}

/// Turn a non-zero exit status into [`TaskError::Remote`].
pub fn ensure_success(command: &RemoteCommand, result: CommandResult) -> TaskResult<CommandResult> {
    if result.success() {
        return Ok(result);
    }

    Err(TaskError::Remote {
        command: command.to_shell(),
        status: result.exit_status,
        output: truncate_error_message(result.output.trim(), 3),
    })
}

pub async fn dir_exists(exec: &dyn Executor, path: &str) -> TaskResult<bool> {
    let result = exec.sudo(&RemoteCommand::new("test").args(["-d", path])).await?;
    Ok(result.success())
}

pub async fn file_exists(exec: &dyn Executor, path: &str) -> TaskResult<bool> {
    let result = exec.sudo(&RemoteCommand::new("test").args(["-f", path])).await?;
    Ok(result.success())
}

/// Command appending `line` plus a newline to `path`.
///
/// The text travels base64 encoded as a positional parameter of the script,
/// so neither the line nor the path is ever parsed as shell syntax.
pub fn append_line_command(path: &str, line: &str) -> RemoteCommand {
    let encoded = general_purpose::STANDARD.encode(format!("{}\n", line).as_bytes());
    RemoteCommand::new("sh").args(["-c", APPEND_SCRIPT, "append", encoded.as_str(), path])
}

/// Append `line` to `path` as root. Existing identical lines are left alone,
/// so repeated calls add repeated lines.
pub async fn append_line(exec: &dyn Executor, path: &str, line: &str) -> TaskResult<()> {
    sudo_checked(exec, append_line_command(path, line)).await?;
    Ok(())
}

/// Truncate error message to a reasonable number of lines for display
pub fn truncate_error_message(message: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = message.lines().collect();
    if lines.len() <= max_lines {
        message.to_string()
    } else {
        let truncated_lines = &lines[..max_lines];
        format!(
            "{}\n... (truncated {} more lines)",
            truncated_lines.join("\n"),
            lines.len() - max_lines
        )
    }
}
