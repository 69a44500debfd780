/// SSH related functionality.
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use russh::{
    client::{self, Config, Handle, Msg},
    keys::{load_secret_key, ssh_key, PrivateKeyWithHashAlg},
    Channel,
};

#[derive(Debug, Clone)]
pub struct Client {
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    sudo_password: Option<String>,
    keypath: Option<String>,
}

impl Client {
    pub fn new(host: String, username: String) -> Self {
        Self {
            host,
            port: 22,
            username,
            password: None,
            sudo_password: None,
            keypath: None,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn with_password(&mut self, password: String) {
        self.password = Some(password);
    }

    /// Password fed to `sudo -S`. Falls back to the login password.
    pub fn with_sudo_password(&mut self, password: String) {
        self.sudo_password = Some(password);
    }

    pub fn has_sudo_password(&self) -> bool {
        self.sudo_password.is_some() || self.password.is_some()
    }

    pub fn with_private_key(&mut self, keypath: String) {
        self.keypath = Some(keypath);
    }

    pub fn with_port(&mut self, port: u16) {
        self.port = port;
    }

    pub async fn connect(&self) -> Result<Session> {
        let config = Arc::new(Config::default());

        let handler = Handler {};
        let mut session = client::connect(config, (&self.host[..], self.port), handler)
            .await
            .with_context(|| format!("Failed to connect to {}", self))?;

        let auth_result = if let Some(password) = &self.password {
            session
                .authenticate_password(&self.username, password)
                .await?
        } else if let Some(ref keypath) = self.keypath {
            let key_pair = load_secret_key(keypath, None)
                .with_context(|| format!("Failed to load private key from: {}", keypath))?;
            session
                .authenticate_publickey(
                    &self.username,
                    PrivateKeyWithHashAlg::new(
                        Arc::new(key_pair),
                        session.best_supported_rsa_hash().await?.flatten(),
                    ),
                )
                .await?
        } else {
            return Err(anyhow!(
                "No authentication method provided (need password or private key)"
            ));
        };

        if !auth_result.success() {
            return Err(anyhow!(
                "SSH authentication failed for user: {}",
                self.username
            ));
        }

        Ok(Session {
            user: self.username.clone(),
            sudo_password: self.sudo_password.clone().or_else(|| self.password.clone()),
            handler: session,
        })
    }
}

impl std::fmt::Display for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub exit_status: u32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Printed by the elevated shell before the command runs. Its absence
/// means sudo itself refused.
const SUDO_MARKER: &str = "__srvadm_sudo_ok__";

pub struct Session {
    user: String,
    sudo_password: Option<String>,
    handler: Handle<Handler>,
}

impl Session {
    pub fn current_user(&self) -> &str {
        &self.user
    }

    pub async fn execute_command<S: AsRef<str>>(&self, command: S) -> Result<CommandResult> {
        let mut channel = self.handler.channel_open_session().await?;
        channel.exec(true, command.as_ref()).await?;

        let result = wait_result_from_channel(&mut channel).await?;
        Ok(result)
    }

    pub async fn execute_with_sudo(&self, command: &str) -> Result<CommandResult> {
        // root needs no elevation
        if self.current_user() == "root" {
            return self.execute_command(command).await;
        }

        let sudo_command = sudo_command_line(command, self.sudo_password.is_some());
        let mut channel = self.handler.channel_open_session().await?;
        channel.exec(true, sudo_command.as_str()).await?;

        if let Some(ref password) = self.sudo_password {
            let line = format!("{}\n", password);
            channel.data(line.as_bytes()).await?;
        }
        channel.eof().await?;

        let result = wait_result_from_channel(&mut channel).await?;
        strip_sudo_marker(result)
    }

    pub async fn close(self) -> Result<()> {
        self.handler
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

pub async fn wait_result_from_channel(channel: &mut Channel<Msg>) -> Result<CommandResult> {
    let mut result = CommandResult {
        output: String::new(),
        exit_status: 0,
    };

    while let Some(data) = channel.wait().await {
        match data {
            russh::ChannelMsg::Data { data } => {
                result.output.push_str(&String::from_utf8_lossy(&data));
            }
            russh::ChannelMsg::ExtendedData { data, ext } => {
                if ext == 1 {
                    result.output.push_str(&String::from_utf8_lossy(&data));
                }
            }
            russh::ChannelMsg::ExitStatus { exit_status } => {
                result.exit_status = exit_status;
                break;
            }
            russh::ChannelMsg::Close => break,
            _ => {}
        }
    }

    if result.output.ends_with('\n') {
        result.output.pop();
    }

    Ok(result)
}

/// Wrap `command` for sudo. With a password it is read from stdin (`-S`),
/// otherwise sudo must not ask at all (`-n`).
pub fn sudo_command_line(command: &str, with_password: bool) -> String {
    let script = format!("echo {}; {}", SUDO_MARKER, command);
    let flags = if with_password { "-S -p ''" } else { "-n" };
    format!("sudo {} sh -c {}", flags, shell_words::quote(&script))
}

/// Remove the marker line, or fail with sudo's own message when the
/// elevated shell never started.
pub fn strip_sudo_marker(result: CommandResult) -> Result<CommandResult> {
    let marker_line = format!("{}\n", SUDO_MARKER);
    let output = if let Some(pos) = result.output.find(&marker_line) {
        let mut output = result.output.clone();
        output.replace_range(pos..pos + marker_line.len(), "");
        output
    } else if let Some(before) = result.output.strip_suffix(SUDO_MARKER) {
        // marker was the last line and lost its newline
        before.trim_end_matches('\n').to_string()
    } else {
        return Err(anyhow!(
            "sudo refused (exit code: {}): {}",
            result.exit_status,
            result.output.trim()
        ));
    };

    Ok(CommandResult {
        output,
        exit_status: result.exit_status,
    })
}

#[derive(Debug)]
struct Handler {}

impl client::Handler for Handler {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        async { Ok(true) }
    }
}
