/// Configuration loading.
pub mod config;

/// SSH related functionality.
pub mod ssh;

/// Remote command construction and the executor seam.
pub mod executor;

/// Remote filesystem helpers.
pub mod utils;

/// Interactive prompts.
pub mod prompt;

/// Task errors.
pub mod error;

/// Task trait, argument binding and catalog.
pub mod task;

/// Built-in tasks.
pub mod tasks;

/// Plugin registry.
pub mod plugin;

/// CLI interface and commands.
pub mod cli;
