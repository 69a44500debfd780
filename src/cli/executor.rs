use anyhow::Result;

use crate::config::{Config, HostSpec, SessionConfig};
use crate::error::TaskResult;
use crate::prompt::Prompter;
use crate::ssh::Client;
use crate::task::{PreparedTask, TaskContext};

/// A host together with the client used to reach it.
#[derive(Debug)]
pub struct Target {
    pub host: String,
    pub ssh_client: Client,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.host, self.ssh_client)
    }
}

/// Build one target per `[user@]host[:port]` from the resolved session
/// settings.
pub fn build_targets(hosts: &[String], session: &SessionConfig) -> Result<Vec<Target>> {
    let mut targets = vec![];

    for host in hosts.iter().map(|host| host.trim()).filter(|host| !host.is_empty()) {
        let spec = HostSpec::parse(host)?;
        targets.push(Target {
            ssh_client: spec.session(session).build_client(&spec.host)?,
            host: spec.host,
        });
    }

    Ok(targets)
}

/// List all targets.
pub fn list_targets(targets: &[Target]) {
    if targets.is_empty() {
        println!("📝 No servers to process");
        return;
    }

    println!("\n🎯 Target Servers ({})", targets.len());
    println!("{}", "─".repeat(40));

    for (i, target) in targets.iter().enumerate() {
        println!("{:2} - {}", i + 1, target);
    }

    println!("{}", "─".repeat(40));
}

/// Run `tasks` in order against one host, stopping at the first failure.
pub async fn run_tasks(label: &str, ctx: &TaskContext<'_>, tasks: &[PreparedTask<'_>]) -> TaskResult {
    for prepared in tasks {
        log::info!("[{}] Executing task '{}'", label, prepared);

        if let Err(e) = prepared.task.run(ctx, &prepared.args).await {
            log::error!("[{}] Task '{}' aborted: {}", label, prepared, e);
            return Err(e);
        }
    }

    Ok(())
}


/// Connect to each target in turn and run the whole task sequence there.
/// The first failing host ends the run.
pub async fn execute_targets(
    targets: Vec<Target>,
    tasks: &[PreparedTask<'_>],
    config: &Config,
    prompter: &dyn Prompter,
) -> Result<()> {
    for target in targets {
        let session = match target.ssh_client.connect().await {
            Ok(session) => session,
            Err(e) => {
                log::error!("Failed to connect to {}({})", target.host, target.ssh_client);
                return Err(e);
            }
        };

        let ctx = TaskContext {
            config,
            executor: &session,
            prompter,
        };

        let result = run_tasks(&target.host, &ctx, tasks).await;
        if let Err(e) = session.close().await {
            log::warn!("Failed to close session to {}: {}", target.host, e);
        }

        match result {
            Ok(()) => println!("✅ {} ({}) - Success", target.host, target.ssh_client),
            Err(e) => {
                println!("❌ {} ({}) - Failed: {}", target.host, target.ssh_client, e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
