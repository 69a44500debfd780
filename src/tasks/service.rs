use std::fmt;

use async_trait::async_trait;

use crate::error::{TaskError, TaskResult};
use crate::executor::RemoteCommand;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::utils::sudo_checked;

pub const DEFAULT_SERVICE: &str = "apache2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Reload,
    Restart,
    Start,
    Stop,
    Status,
}

impl ServiceAction {
    /// `0` selects reload; any other value, numeric or not, selects restart.
    pub fn from_restart_flag(restart: &str) -> Self {
        match restart.trim().parse::<i64>() {
            Ok(0) => ServiceAction::Reload,
            _ => ServiceAction::Restart,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Reload => "reload",
            ServiceAction::Restart => "restart",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Status => "status",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_service_name(service: &str) -> TaskResult<()> {
    if service.is_empty()
        || service.starts_with('-')
        || service.contains('/')
        || service.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(TaskError::abort(format!(
            "Invalid service name '{}'",
            service
        )));
    }
    Ok(())
}

pub fn service_command(service: &str, action: ServiceAction) -> RemoteCommand {
    RemoteCommand::new("service").args([service, action.as_str()])
}

/// Issue one privileged `service <service> <action>` call.
pub async fn control_service(
    ctx: &TaskContext<'_>,
    service: &str,
    action: ServiceAction,
) -> TaskResult<String> {
    validate_service_name(service)?;

    let result = sudo_checked(ctx.executor, service_command(service, action)).await?;
    log::info!("Service '{}': {} done", service, action);
    Ok(result.output)
}

pub async fn svc_reload(ctx: &TaskContext<'_>, service: &str, restart: &str) -> TaskResult {
    control_service(ctx, service, ServiceAction::from_restart_flag(restart)).await?;
    Ok(())
}

pub struct SvcReload;

#[async_trait]
impl Task for SvcReload {
    fn name(&self) -> &'static str {
        "svc_reload"
    }

    fn doc(&self) -> &'static str {
        "Restart or reload a service

    service: service name to restart or reload (default apache2)
    restart: 0 (default) reloads, any other value restarts"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[
            Param::optional("service", DEFAULT_SERVICE),
            Param::optional("restart", "0"),
        ];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        svc_reload(ctx, args.require("service")?, args.require("restart")?).await
    }
}
