use async_trait::async_trait;

use crate::error::{TaskError, TaskResult};
use crate::executor::RemoteCommand;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::tasks::{access::grant_access, validate_username};
use crate::utils::{ensure_success, sudo_checked};

pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Create `username` unless the account exists, then authorize the key
/// configured for it.
pub async fn add_user(ctx: &TaskContext<'_>, username: &str) -> TaskResult {
    let ssh_pubkey = ctx
        .config
        .user_key(username)
        .ok_or_else(|| TaskError::abort(format!("I don't have {}'s ssh key", username)))?;
    validate_username(username)?;

    let exec = ctx.executor;
    let getent = RemoteCommand::new("getent").args(["passwd", username]);
    let lookup = exec.sudo(&getent).await?;

    // getent exits 2 when the key is not in the database
    if lookup.exit_status != 2 {
        ensure_success(&getent, lookup)?;
        log::info!("User '{}' already exists", username);
    } else {
        sudo_checked(
            exec,
            RemoteCommand::new("useradd").args(["-m", "-s", DEFAULT_SHELL, username]),
        )
        .await?;
        log::info!("Created user '{}'", username);
    }

    grant_access(ctx, username, Some(ssh_pubkey)).await
}

pub struct AddUser;

#[async_trait]
impl Task for AddUser {
    fn name(&self) -> &'static str {
        "add_user"
    }

    fn doc(&self) -> &'static str {
        "Add a user with ssh access (key should be present in the config file)

    username: the user to add"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required("username")];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        add_user(ctx, args.require("username")?).await
    }
}
