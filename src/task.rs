/// Task definitions, argument binding and the task catalog.
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{TaskError, TaskResult};
use crate::executor::Executor;
use crate::prompt::Prompter;

/// A named task parameter. Parameters with a default may be omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// Arguments bound to a task's parameters, defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskArgs {
    values: BTreeMap<&'static str, String>,
}

impl TaskArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> TaskResult<&str> {
        self.get(name)
            .ok_or_else(|| TaskError::usage(format!("missing required argument '{}'", name)))
    }
}

/// Everything a task may touch: the static configuration, the remote
/// target and the operator.
pub struct TaskContext<'a> {
    pub config: &'a Config,
    pub executor: &'a dyn Executor,
    pub prompter: &'a dyn Prompter,
}

#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    /// Documentation shown by `--display`. The first line is the summary.
    fn doc(&self) -> &'static str;

    fn params(&self) -> &'static [Param];

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult;

    fn summary(&self) -> &'static str {
        self.doc().lines().next().unwrap_or("").trim()
    }

    /// Invocation form, e.g. `svc_reload[:service[,restart]]`.
    fn usage(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            return self.name().to_string();
        }

        let mut usage = self.name().to_string();
        let mut open = 0;
        for (idx, param) in params.iter().enumerate() {
            let sep = if idx == 0 { ':' } else { ',' };
            if param.default.is_some() {
                usage.push('[');
                open += 1;
            }
            usage.push(sep);
            usage.push_str(param.name);
        }
        usage.push_str(&"]".repeat(open));
        usage
    }
}

/// One argument as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskArg {
    Positional(String),
    Keyword(String, String),
}

/// A task name with its raw arguments, parsed from `name:arg,key=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInvocation {
    pub name: String,
    pub args: Vec<TaskArg>,
}

impl TaskInvocation {
    /// Parse `name[:arg[,arg...]]`.
    ///
    /// `\,` and `\=` stand for a literal comma and equals sign. A piece is a
    /// keyword argument only when the text before its first `=` is an
    /// identifier, so key material like `ssh-rsa AAAA==` stays positional.
    pub fn parse(invocation: &str) -> TaskResult<Self> {
        let (name, rest) = match invocation.split_once(':') {
            Some((name, rest)) => (name.trim(), rest),
            None => (invocation.trim(), ""),
        };

        if name.is_empty() {
            return Err(TaskError::usage(format!("missing task name in '{}'", invocation)));
        }

        let args = if rest.is_empty() {
            Vec::new()
        } else {
            split_args(rest).into_iter().map(classify).collect()
        };

        Ok(Self {
            name: name.to_string(),
            args,
        })
    }

    /// Bind the arguments to `params`, filling defaults.
    pub fn bind(&self, params: &[Param]) -> TaskResult<TaskArgs> {
        let mut values = BTreeMap::new();
        let positional = self
            .args
            .iter()
            .filter(|arg| matches!(arg, TaskArg::Positional(_)))
            .count();

        if positional > params.len() {
            return Err(TaskError::usage(format!(
                "task '{}' takes at most {} argument(s), got {}",
                self.name,
                params.len(),
                positional
            )));
        }

        let mut next = 0;
        for arg in &self.args {
            let (param, value) = match arg {
                TaskArg::Positional(value) => {
                    let param = &params[next];
                    next += 1;
                    (param, value)
                }
                TaskArg::Keyword(key, value) => {
                    let param = params.iter().find(|p| p.name == key.as_str()).ok_or_else(|| {
                        TaskError::usage(format!(
                            "task '{}' has no argument named '{}'",
                            self.name, key
                        ))
                    })?;
                    (param, value)
                }
            };

            if values.insert(param.name, value.clone()).is_some() {
                return Err(TaskError::usage(format!(
                    "task '{}' got multiple values for argument '{}'",
                    self.name, param.name
                )));
            }
        }

        for param in params {
            if values.contains_key(param.name) {
                continue;
            }
            match param.default {
                Some(default) => {
                    values.insert(param.name, default.to_string());
                }
                None => {
                    return Err(TaskError::usage(format!(
                        "task '{}' is missing required argument '{}'",
                        self.name, param.name
                    )))
                }
            }
        }

        Ok(TaskArgs { values })
    }
}

/// Characters of one argument piece; `true` marks an escaped character.
type Piece = Vec<(char, bool)>;

fn split_args(raw: &str) -> Vec<Piece> {
    let mut pieces: Vec<Piece> = vec![Vec::new()];
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        let current = pieces.len() - 1;
        match c {
            '\\' if matches!(chars.peek(), Some(',') | Some('=')) => {
                if let Some(escaped) = chars.next() {
                    pieces[current].push((escaped, true));
                }
            }
            ',' => pieces.push(Vec::new()),
            _ => pieces[current].push((c, false)),
        }
    }

    pieces
}

fn classify(piece: Piece) -> TaskArg {
    let text = |chars: &[(char, bool)]| chars.iter().map(|(c, _)| *c).collect::<String>();

    if let Some(pos) = piece.iter().position(|&(c, escaped)| c == '=' && !escaped) {
        let key = text(&piece[..pos]);
        if is_identifier(&key) {
            return TaskArg::Keyword(key, text(&piece[pos + 1..]));
        }
    }

    TaskArg::Positional(text(&piece))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// A task resolved from the catalog with its arguments bound.
pub struct PreparedTask<'c> {
    pub task: &'c dyn Task,
    pub args: TaskArgs,
}

impl fmt::Display for PreparedTask<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task.name())?;
        for (idx, (name, value)) in self.args.values.iter().enumerate() {
            let sep = if idx == 0 { ':' } else { ',' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// All tasks available to this run, built-in and plugin-provided.
#[derive(Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<&'static str, Box<dyn Task>>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Box<dyn Task>) -> anyhow::Result<()> {
        let name = task.name();
        if self.tasks.contains_key(name) {
            return Err(anyhow::anyhow!("Task '{}' is already registered", name));
        }
        self.tasks.insert(name, task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Task> {
        self.tasks.get(name).map(|task| task.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Task> {
        self.tasks.values().map(|task| task.as_ref())
    }

    /// Resolve and bind every invocation, so that typos surface before any
    /// connection is made.
    pub fn prepare(&self, invocations: &[TaskInvocation]) -> TaskResult<Vec<PreparedTask<'_>>> {
        invocations
            .iter()
            .map(|invocation| {
                let task = self.get(&invocation.name).ok_or_else(|| {
                    TaskError::usage(format!("Task '{}' not found", invocation.name))
                })?;
                let args = invocation.bind(task.params())?;
                Ok::<_, TaskError>(PreparedTask { task, args })
            })
            .collect()
    }
}
