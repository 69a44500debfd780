use async_trait::async_trait;

use crate::error::TaskResult;
use crate::executor::RemoteCommand;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::tasks::{user::add_user, validate_username};
use crate::utils::{self, sudo_checked};

pub const SUDOERS: &str = "/etc/sudoers";
pub const SUDOERS_BACKUP: &str = "/etc/sudoers~";

pub fn sudoers_rule(username: &str) -> String {
    format!("{}\tALL=(ALL)\tNOPASSWD: ALL", username)
}

/// Back up the sudoers file over the previous backup, then append a
/// password-less rule for `username`. The resulting file is not checked.
pub async fn set_sudo(ctx: &TaskContext<'_>, username: &str) -> TaskResult {
    validate_username(username)?;

    let exec = ctx.executor;
    sudo_checked(exec, RemoteCommand::new("cp").args([SUDOERS, SUDOERS_BACKUP])).await?;
    utils::append_line(exec, SUDOERS, &sudoers_rule(username)).await?;

    log::info!("Granted password-less sudo to '{}'", username);
    Ok(())
}

/// [`add_user`] then [`set_sudo`]. Nothing is undone if the second step fails.
pub async fn add_with_sudo(ctx: &TaskContext<'_>, username: &str) -> TaskResult {
    add_user(ctx, username).await?;
    set_sudo(ctx, username).await
}

pub struct SetSudo;

#[async_trait]
impl Task for SetSudo {
    fn name(&self) -> &'static str {
        "set_sudo"
    }

    fn doc(&self) -> &'static str {
        "Setup sudo access for an existing user

    username: the existing user name"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required("username")];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        set_sudo(ctx, args.require("username")?).await
    }
}

pub struct AddWithSudo;

#[async_trait]
impl Task for AddWithSudo {
    fn name(&self) -> &'static str {
        "add_with_sudo"
    }

    fn doc(&self) -> &'static str {
        "Add a user with ssh access and sudo privileges (key should be present in the config file)

    username: the user to add"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required("username")];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        add_with_sudo(ctx, args.require("username")?).await
    }
}
