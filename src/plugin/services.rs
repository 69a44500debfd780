use async_trait::async_trait;

use crate::error::TaskResult;
use crate::plugin::Plugin;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::tasks::service::{control_service, ServiceAction, DEFAULT_SERVICE};

pub fn factory() -> Box<dyn Plugin> {
    Box::new(Services)
}

pub struct Services;

impl Plugin for Services {
    fn name(&self) -> &'static str {
        "services"
    }

    fn tasks(&self) -> Vec<Box<dyn Task>> {
        vec![
            Box::new(ServiceTask {
                name: "svc_status",
                doc: "Show the status of a service\n\n    service: service name (default apache2)",
                action: ServiceAction::Status,
            }),
            Box::new(ServiceTask {
                name: "svc_start",
                doc: "Start a service\n\n    service: service name (default apache2)",
                action: ServiceAction::Start,
            }),
            Box::new(ServiceTask {
                name: "svc_stop",
                doc: "Stop a service\n\n    service: service name (default apache2)",
                action: ServiceAction::Stop,
            }),
        ]
    }
}

/// Runs a fixed action against one service.
struct ServiceTask {
    name: &'static str,
    doc: &'static str,
    action: ServiceAction,
}

#[async_trait]
impl Task for ServiceTask {
    fn name(&self) -> &'static str {
        self.name
    }

    fn doc(&self) -> &'static str {
        self.doc
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::optional("service", DEFAULT_SERVICE)];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        let service = args.require("service")?;
        let output = control_service(ctx, service, self.action).await?;

        if self.action == ServiceAction::Status {
            for line in output.lines().filter(|line| !line.trim().is_empty()) {
                println!("   {}", line);
            }
        }

        Ok(())
    }
}
