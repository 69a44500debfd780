//! In-memory remote host used by the integration tests.
//!
//! Commands are re-split from their rendered shell line, so anything the
//! quoting gets wrong shows up as a wrong argument here.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use regex::Regex;

use srvadm::config::{Config, SessionConfig};
use srvadm::executor::{Executor, RemoteCommand};
use srvadm::prompt::Prompter;
use srvadm::ssh::CommandResult;
use srvadm::task::TaskContext;

pub const SUDOERS_SEED: &str = "root\tALL=(ALL:ALL) ALL\n";

pub const ALICE_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ== alice@laptop";
pub const BOB_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIG bob@work";

/// One command as the host received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub privileged: bool,
    pub argv: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HostState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, String>,
    pub modes: BTreeMap<String, String>,
    pub owners: BTreeMap<String, String>,
    pub users: BTreeMap<String, String>,
    pub services: Vec<(String, String)>,
}

fn status(code: u32, output: &str) -> CommandResult {
    CommandResult {
        output: output.to_string(),
        exit_status: code,
    }
}

fn parent(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

impl HostState {
    fn fresh() -> Self {
        let mut state = HostState::default();
        for dir in ["/", "/etc", "/home", "/root"] {
            state.dirs.insert(dir.to_string());
        }
        state
            .files
            .insert("/etc/sudoers".to_string(), SUDOERS_SEED.to_string());
        state.users.insert("root".to_string(), "/bin/bash".to_string());
        state
    }

    fn apply(&mut self, argv: &[String]) -> CommandResult {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["test", "-d", path] => status(!self.dirs.contains(*path) as u32, ""),
            ["test", "-f", path] => status(!self.files.contains_key(*path) as u32, ""),
            ["mkdir", path] => {
                if self.dirs.contains(*path) {
                    status(1, "mkdir: cannot create directory: File exists")
                } else if !self.dirs.contains(parent(path)) {
                    status(1, "mkdir: cannot create directory: No such file or directory")
                } else {
                    self.dirs.insert(path.to_string());
                    status(0, "")
                }
            }
            ["touch", path] => {
                if !self.dirs.contains(parent(path)) {
                    return status(1, "touch: No such file or directory");
                }
                self.files.entry(path.to_string()).or_default();
                status(0, "")
            }
            ["sh", "-c", _script, "append", payload, path] => {
                if !self.dirs.contains(parent(path)) {
                    return status(2, "sh: cannot create: Directory nonexistent");
                }
                let text = general_purpose::STANDARD.decode(payload).unwrap();
                self.files
                    .entry(path.to_string())
                    .or_default()
                    .push_str(&String::from_utf8(text).unwrap());
                status(0, "")
            }
            ["chmod", mode, path] => {
                self.modes.insert(path.to_string(), mode.to_string());
                status(0, "")
            }
            ["chown", "-R", owner, path] => {
                let path = path.trim_end_matches('/');
                if !self.dirs.contains(path) {
                    return status(1, "chown: No such file or directory");
                }
                self.owners.insert(path.to_string(), owner.to_string());
                status(0, "")
            }
            ["getent", "passwd", user] => match self.users.get(*user) {
                Some(shell) => status(0, &format!("{user}:x:1000:1000::/home/{user}:{shell}")),
                None => status(2, ""),
            },
            ["useradd", "-m", "-s", shell, user] => {
                if self.users.contains_key(*user) {
                    return status(9, &format!("useradd: user '{user}' already exists"));
                }
                self.users.insert(user.to_string(), shell.to_string());
                self.dirs.insert(format!("/home/{user}"));
                status(0, "")
            }
            ["cp", src, dst] => match self.files.get(*src).cloned() {
                Some(content) => {
                    self.files.insert(dst.to_string(), content);
                    status(0, "")
                }
                None => status(1, "cp: cannot stat: No such file or directory"),
            },
            ["service", name, action] => {
                self.services.push((name.to_string(), action.to_string()));
                status(0, "")
            }
            _ => status(127, "command not found"),
        }
    }
}

pub struct FakeHost {
    state: Mutex<HostState>,
    issued: Mutex<Vec<Issued>>,
    failing: Mutex<Option<String>>,
    sudo_refusal: Mutex<Option<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState::fresh()),
            issued: Mutex::new(Vec::new()),
            failing: Mutex::new(None),
            sudo_refusal: Mutex::new(None),
        }
    }

    /// A host where `user` already exists with a home directory.
    pub fn with_user(user: &str) -> Self {
        let host = Self::new();
        {
            let mut state = host.state.lock().unwrap();
            state.users.insert(user.to_string(), "/bin/sh".to_string());
            state.dirs.insert(format!("/home/{user}"));
        }
        host
    }

    /// Make every command running `program` exit with status 1.
    pub fn fail_program(&self, program: &str) {
        *self.failing.lock().unwrap() = Some(program.to_string());
    }

    /// Make sudo itself refuse every privileged command with `message`,
    /// as a session whose sudo wants a password nobody supplied.
    pub fn refuse_sudo(&self, message: &str) {
        *self.sudo_refusal.lock().unwrap() = Some(message.to_string());
    }

    pub fn issued(&self) -> Vec<Issued> {
        self.issued.lock().unwrap().clone()
    }

    pub fn issued_programs(&self) -> Vec<String> {
        self.issued().into_iter().map(|cmd| cmd.argv[0].clone()).collect()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn mode(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().modes.get(path).cloned()
    }

    pub fn owner(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().owners.get(path).cloned()
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.state.lock().unwrap().users.contains_key(user)
    }

    pub fn shell_of(&self, user: &str) -> Option<String> {
        self.state.lock().unwrap().users.get(user).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn services(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().services.clone()
    }
}

#[async_trait]
impl Executor for FakeHost {
    async fn execute(&self, command: &RemoteCommand, privileged: bool) -> Result<CommandResult> {
        let argv = shell_words::split(&command.to_shell())
            .map_err(|e| anyhow!("unparsable command line: {e}"))?;
        self.issued.lock().unwrap().push(Issued {
            privileged,
            argv: argv.clone(),
        });

        if privileged {
            if let Some(message) = self.sudo_refusal.lock().unwrap().as_deref() {
                return Err(anyhow!("sudo refused (exit code: 1): {message}"));
            }
        }

        if self.failing.lock().unwrap().as_deref() == Some(argv[0].as_str()) {
            return Ok(status(1, "simulated failure"));
        }

        Ok(self.state.lock().unwrap().apply(&argv))
    }
}

/// Answers prompts from a script, skipping answers the pattern rejects
/// the way a re-issued prompt would.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I: IntoIterator<Item = &'static str>>(answers: I) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(str::to_string).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self::new([])
    }

    pub fn times_asked(&self) -> usize {
        self.asked.lock().unwrap().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, message: &str, pattern: &Regex) -> Result<String> {
        let mut answers = self.answers.lock().unwrap();
        loop {
            self.asked.lock().unwrap().push(message.to_string());
            let answer = answers
                .pop_front()
                .ok_or_else(|| anyhow!("no answer left for '{message}'"))?;
            if pattern.is_match(&answer) {
                return Ok(answer);
            }
        }
    }
}

pub fn config_with_users(users: &[(&str, &str)]) -> Config {
    Config::new(
        Vec::new(),
        users
            .iter()
            .map(|(name, key)| (name.to_string(), key.to_string()))
            .collect(),
        SessionConfig::default(),
    )
}

pub fn default_config() -> Config {
    config_with_users(&[("alice", ALICE_KEY), ("bob", BOB_KEY)])
}

pub fn context<'a>(
    config: &'a Config,
    host: &'a FakeHost,
    prompter: &'a ScriptedPrompter,
) -> TaskContext<'a> {
    TaskContext {
        config,
        executor: host,
        prompter,
    }
}

pub fn count_lines(content: &str, line: &str) -> usize {
    content.lines().filter(|l| *l == line).count()
}
