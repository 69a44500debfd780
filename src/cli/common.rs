/// Common functions for CLI.
use anyhow::{anyhow, Result};

use crate::task::TaskCatalog;

/// List all tasks.
pub fn list_tasks(catalog: &TaskCatalog) {
    if catalog.is_empty() {
        println!("📝 No tasks available");
        return;
    }

    let width = catalog.iter().map(|task| task.name().len()).max().unwrap_or(0);

    println!("\n📋 Available Tasks ({})", catalog.len());
    println!("{}", "─".repeat(60));

    for task in catalog.iter() {
        println!("  {:width$}  {}", task.name(), task.summary(), width = width);
    }

    println!("{}", "─".repeat(60));
}

/// Show the documentation of one task.
pub fn display_task(catalog: &TaskCatalog, name: &str) -> Result<()> {
    let task = catalog
        .get(name)
        .ok_or_else(|| anyhow!("Task '{}' not found", name))?;

    println!("\n📖 {}", task.name());
    println!("{}", "─".repeat(60));
    println!("{}", task.doc());
    println!("\nUsage: srvadm {}", task.usage());

    Ok(())
}
