use async_trait::async_trait;

use crate::error::{TaskError, TaskResult};
use crate::executor::RemoteCommand;
use crate::prompt::pubkey_pattern;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::tasks::validate_username;
use crate::utils::{self, sudo_checked};

pub fn ssh_dir(user: &str) -> String {
    format!("/home/{}/.ssh", user)
}

pub fn authorized_keys(user: &str) -> String {
    format!("{}/authorized_keys", ssh_dir(user))
}

/// Let `remote_user` log in with `ssh_pubkey`, asking for the key when none
/// is given.
///
/// The key is appended without checking whether it is already present.
pub async fn grant_access(
    ctx: &TaskContext<'_>,
    remote_user: &str,
    ssh_pubkey: Option<&str>,
) -> TaskResult {
    validate_username(remote_user)?;

    let ssh_pubkey = match ssh_pubkey.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => key.to_string(),
        None => {
            let pattern = pubkey_pattern()?;
            ctx.prompter
                .prompt("Please paste the ssh pubkey here", &pattern)
                .map_err(|e| TaskError::Prompt(e.to_string()))?
                .trim()
                .to_string()
        }
    };

    let exec = ctx.executor;
    let ssh_dir = ssh_dir(remote_user);
    let auth_file = authorized_keys(remote_user);

    if !utils::dir_exists(exec, &ssh_dir).await? {
        sudo_checked(exec, RemoteCommand::new("mkdir").arg(&ssh_dir)).await?;
    }

    if !utils::file_exists(exec, &auth_file).await? {
        sudo_checked(exec, RemoteCommand::new("touch").arg(&auth_file)).await?;
    }

    utils::append_line(exec, &auth_file, &ssh_pubkey).await?;

    sudo_checked(exec, RemoteCommand::new("chmod").args(["600", auth_file.as_str()])).await?;
    sudo_checked(exec, RemoteCommand::new("chmod").args(["700", ssh_dir.as_str()])).await?;
    sudo_checked(
        exec,
        RemoteCommand::new("chown").args([
            "-R".to_string(),
            format!("{}:", remote_user),
            format!("{}/", ssh_dir),
        ]),
    )
    .await?;

    log::info!("Granted ssh access to '{}'", remote_user);
    Ok(())
}

pub struct GrantAccess;

#[async_trait]
impl Task for GrantAccess {
    fn name(&self) -> &'static str {
        "grant_access"
    }

    fn doc(&self) -> &'static str {
        "Grant ssh access as remote_user for key ssh_pubkey

    remote_user: the remote account to set up ssh access for
    ssh_pubkey:  the public key to authorize; prompted for when omitted"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[
            Param::required("remote_user"),
            Param::optional("ssh_pubkey", ""),
        ];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        grant_access(ctx, args.require("remote_user")?, args.get("ssh_pubkey")).await
    }
}
