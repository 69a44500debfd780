use thiserror::Error;

/// Reasons a task stops. The first one raised aborts the whole run.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A precondition checked locally does not hold.
    #[error("{0}")]
    Abort(String),

    /// The task invocation does not fit the task's parameters.
    #[error("{0}")]
    Usage(String),

    /// A remote command that must succeed returned a non-zero status.
    #[error("'{command}' failed (exit code: {status}) - {output}")]
    Remote {
        command: String,
        status: u32,
        output: String,
    },

    /// The interactive prompt could not be answered.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// The connection or channel broke underneath the task.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl TaskError {
    pub fn abort<S: Into<String>>(message: S) -> Self {
        TaskError::Abort(message.into())
    }

    pub fn usage<S: Into<String>>(message: S) -> Self {
        TaskError::Usage(message.into())
    }
}

pub type TaskResult<T = ()> = std::result::Result<T, TaskError>;
