/// Built-in tasks.

/// SSH key access for an existing account.
pub mod access;

/// Service reload and restart.
pub mod service;

/// Sudo privileges.
pub mod sudo;

/// Account provisioning.
pub mod user;

use crate::error::{TaskError, TaskResult};
use crate::task::Task;

/// The five tasks every run offers.
pub fn builtin() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(access::GrantAccess),
        Box::new(user::AddUser),
        Box::new(sudo::SetSudo),
        Box::new(sudo::AddWithSudo),
        Box::new(service::SvcReload),
    ]
}

/// Reject names that would escape `/home/<name>` or read as an option.
pub fn validate_username(username: &str) -> TaskResult<()> {
    let reason = if username.is_empty() {
        Some("must not be empty")
    } else if username == "." || username == ".." || username.contains('/') {
        Some("must not be a path")
    } else if username.starts_with('-') {
        Some("must not start with '-'")
    } else if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TaskError::abort(format!(
            "Invalid username '{}': {}",
            username, reason
        ))),
        None => Ok(()),
    }
}
