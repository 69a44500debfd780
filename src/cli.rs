/// CLI interface and commands.

/// Common functions for CLI.
pub mod common;

/// Sequential per-host task execution.
pub mod executor;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::config::{self, Config, SessionConfig};
use crate::plugin::PluginRegistry;
use crate::prompt::TerminalPrompter;
use crate::task::{TaskCatalog, TaskInvocation};
use crate::tasks;

#[derive(Parser, Debug)]
#[command(name = "srvadm")]
#[command(
    about = "🔑 Remote account administration - users, SSH keys, sudo and services over SSH",
    after_help = "Tasks are given as NAME[:ARG,ARG,KEY=VALUE], e.g. add_user:alice or svc_reload:nginx,1"
)]
pub struct Cli {
    /// Config file
    #[arg(short, long, default_value = "config.ini")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Target hosts, comma separated
    #[arg(short = 'H', long, value_delimiter = ',', env = "SRVADM_HOSTS")]
    pub hosts: Vec<String>,

    /// Remote user, defaults to the local user name
    #[arg(short, long, env = "SRVADM_USER")]
    pub user: Option<String>,

    /// SSH port
    #[arg(short, long, env = "SRVADM_PORT")]
    pub port: Option<u16>,

    /// Private key used for authentication
    #[arg(short = 'i', long, env = "SRVADM_IDENTITY")]
    pub identity: Option<String>,

    /// Prompt for a password instead of using a key
    #[arg(long)]
    pub password: bool,

    /// Prompt for the sudo password, if it differs from the login password
    #[arg(long)]
    pub sudo_password: bool,

    /// List available tasks
    #[arg(short, long)]
    pub list: bool,

    /// Show the documentation of a task
    #[arg(short, long, value_name = "TASK")]
    pub display: Option<String>,

    /// Tasks to run, in order
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,
}

impl Cli {
    /// Connection settings given on the command line or in the environment.
    pub fn session_overrides(&self) -> SessionConfig {
        SessionConfig {
            host: None,
            port: self.port,
            user: self.user.clone(),
            keypath: self.identity.clone(),
            password: None,
            use_password: self.password.then_some(true),
            sudo_password: None,
            use_sudo_password: self.sudo_password.then_some(true),
        }
    }

    pub async fn execute(&self, config: &Config) -> Result<()> {
        let catalog = build_catalog(config)?;

        if self.list {
            common::list_tasks(&catalog);
            return Ok(());
        }

        if let Some(ref name) = self.display {
            return common::display_task(&catalog, name);
        }

        if self.tasks.is_empty() {
            return Err(anyhow!(
                "No tasks specified. Use --list to see the available tasks."
            ));
        }

        // resolve everything before touching any host
        let invocations = self
            .tasks
            .iter()
            .map(|task| TaskInvocation::parse(task))
            .collect::<Result<Vec<_>, _>>()?;
        let prepared = catalog.prepare(&invocations)?;

        let session = self.session_overrides().or(config.session());
        let hosts = if !self.hosts.is_empty() {
            self.hosts.clone()
        } else if let Some(ref host) = session.host {
            vec![host.clone()]
        } else {
            return Err(anyhow!(
                "No hosts specified. Use --hosts or set 'host' in the [session] config section."
            ));
        };

        // one prompt per run, however many hosts follow
        let session = session.resolve_passwords(config::read_password)?;
        let targets = executor::build_targets(&hosts, &session)?;
        executor::list_targets(&targets);

        executor::execute_targets(targets, &prepared, config, &TerminalPrompter).await
    }
}

/// Built-in tasks plus those of every configured plugin.
pub fn build_catalog(config: &Config) -> Result<TaskCatalog> {
    let mut catalog = TaskCatalog::new();
    for task in tasks::builtin() {
        catalog.register(task)?;
    }

    PluginRegistry::builtin().activate(config.plugins(), &mut catalog)?;

    Ok(catalog)
}
