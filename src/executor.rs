/// Remote command construction and execution.
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::ssh::{CommandResult, Session};

/// A program and its arguments, kept apart until rendered for the remote
/// shell. Every argument is quoted on rendering, so user-supplied values
/// never become shell syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    argv: Vec<String>,
}

impl RemoteCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            argv: vec![program.into()],
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Render as a single command line for `sh`.
    pub fn to_shell(&self) -> String {
        shell_words::join(&self.argv)
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

/// Runs commands against the current remote target.
///
/// Implemented by [`Session`] for real connections; tests provide an
/// in-memory host instead.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute `command`, elevated through sudo when `privileged` is set.
    async fn execute(&self, command: &RemoteCommand, privileged: bool) -> Result<CommandResult>;

    async fn run(&self, command: &RemoteCommand) -> Result<CommandResult> {
        self.execute(command, false).await
    }

    async fn sudo(&self, command: &RemoteCommand) -> Result<CommandResult> {
        self.execute(command, true).await
    }
}

#[async_trait]
impl Executor for Session {
    async fn execute(&self, command: &RemoteCommand, privileged: bool) -> Result<CommandResult> {
        let line = command.to_shell();
        log::debug!(
            "[{}] {}: {}",
            self.current_user(),
            if privileged { "sudo" } else { "run" },
            line
        );

        if privileged {
            self.execute_with_sudo(&line).await
        } else {
            self.execute_command(&line).await
        }
    }
}
