/// Configuration loading.
use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use ini::{Ini, ParseOption};
use serde::{Deserialize, Serialize};

use crate::ssh::Client;

/// Connection parameters for the remote target. Every field may also be
/// given on the command line, which takes precedence.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub keypath: Option<String>,
    pub password: Option<String>,
    pub use_password: Option<bool>,
    pub sudo_password: Option<String>,
    pub use_sudo_password: Option<bool>,
}

impl SessionConfig {
    /// Fill every unset field of `self` from `fallback`.
    pub fn or(self, fallback: &SessionConfig) -> SessionConfig {
        SessionConfig {
            host: self.host.or_else(|| fallback.host.clone()),
            port: self.port.or(fallback.port),
            user: self.user.or_else(|| fallback.user.clone()),
            keypath: self.keypath.or_else(|| fallback.keypath.clone()),
            password: self.password.or_else(|| fallback.password.clone()),
            use_password: self.use_password.or(fallback.use_password),
            sudo_password: self.sudo_password.or_else(|| fallback.sudo_password.clone()),
            use_sudo_password: self.use_sudo_password.or(fallback.use_sudo_password),
        }
    }

    /// Ask for every requested but unset password, once per run. `read`
    /// gets the prompt label.
    pub fn resolve_passwords<F>(mut self, mut read: F) -> Result<SessionConfig>
    where
        F: FnMut(&str) -> Result<String>,
    {
        if self.password.is_none() && self.use_password.unwrap_or(false) {
            self.password = Some(read("SSH password")?);
        }
        if self.sudo_password.is_none() && self.use_sudo_password.unwrap_or(false) {
            self.sudo_password = Some(read("sudo password")?);
        }
        Ok(self)
    }

    pub fn build_client(&self, host: &str) -> Result<Client> {
        let user = match self.user {
            Some(ref user) => user.clone(),
            None => local_username()?,
        };
        let mut client = Client::new(host.to_string(), user);

        client.with_port(self.port.unwrap_or(22));

        if let Some(ref password) = self.password {
            client.with_password(password.clone());
        } else if self.use_password.unwrap_or(false) {
            return Err(anyhow!("Password for {} was requested but never read", client));
        } else if let Some(ref keypath) = self.keypath {
            client.with_private_key(expand_home(keypath));
        } else if let Some(keypath) = default_identity() {
            client.with_private_key(keypath);
        }

        if let Some(ref password) = self.sudo_password {
            client.with_sudo_password(password.clone());
        }

        Ok(client)
    }
}

/// Read a password from the terminal without echo.
pub fn read_password(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    rpassword::read_password().with_context(|| format!("Failed to read {}", label))
}

/// A host as given with `-H`: `[user@]host[:port]`, IPv6 in brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl HostSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (user, rest) = match spec.rsplit_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user.to_string()), rest),
            Some(_) => return Err(anyhow!("Empty user in host '{}'", spec)),
            None => (None, spec),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| anyhow!("Unclosed '[' in host '{}'", spec))?;
            match tail {
                "" => (host, None),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(anyhow!("Unexpected '{}' after ']' in host '{}'", tail, spec)),
                },
            }
        } else if rest.matches(':').count() == 1 {
            let (host, port) = rest.split_once(':').unwrap_or((rest, ""));
            (host, Some(port))
        } else {
            (rest, None)
        };

        if host.is_empty() {
            return Err(anyhow!("Missing host name in '{}'", spec));
        }

        let port = port
            .map(|port| {
                port.parse::<u16>()
                    .map_err(|_| anyhow!("Invalid port '{}' in host '{}'", port, spec))
            })
            .transpose()?;

        Ok(Self {
            user,
            host: host.to_string(),
            port,
        })
    }

    /// Settings for this host: its own user and port win over `session`.
    pub fn session(&self, session: &SessionConfig) -> SessionConfig {
        SessionConfig {
            user: self.user.clone(),
            port: self.port,
            ..Default::default()
        }
        .or(session)
    }
}

fn local_username() -> Result<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .map_err(|_| anyhow!("No remote user given and $USER is not set"))
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

fn default_identity() -> Option<String> {
    let ssh_dir = dirs::home_dir()?.join(".ssh");
    ["id_ed25519", "id_rsa"]
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.exists())
        .map(|path| path.to_string_lossy().into_owned())
}

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone, Default)]
pub struct Config {
    plugins: Vec<String>,
    users: BTreeMap<String, String>,
    session: SessionConfig,
}

// config.ini like:
// [DEFAULT]
// plugins = services, packages
//
// [users]
// alice = ssh-rsa AAAA...
// bob = ssh-ed25519 AAAA...
//
// [session]
// host = 10.0.0.5
// user = admin
// keypath = ~/.ssh/id_ed25519
impl Config {
    pub fn new(
        plugins: Vec<String>,
        users: BTreeMap<String, String>,
        session: SessionConfig,
    ) -> Self {
        Self {
            plugins,
            users,
            session,
        }
    }

    /// Load configuration, choosing the format by file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;

        let ext = path.extension().and_then(|ext| ext.to_str());
        let config = match ext {
            Some("toml") => Self::from_raw(
                toml::from_str(&contents)
                    .with_context(|| format!("Invalid TOML in '{}'", path.display()))?,
            ),
            Some("yaml") | Some("yml") => Self::from_raw(
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid YAML in '{}'", path.display()))?,
            ),
            _ => Self::from_ini(&contents)
                .with_context(|| format!("Invalid config file '{}'", path.display()))?,
        };

        log::debug!(
            "Loaded config '{}': {} user(s), plugins [{}]",
            path.display(),
            config.users.len(),
            config.plugins.join(", ")
        );

        Ok(config)
    }

    pub fn from_ini(contents: &str) -> Result<Self> {
        check_ini_layout(contents)?;

        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(contents, opt)?;

        let plugins = ini
            .section(Some("DEFAULT"))
            .and_then(|section| section.get("plugins"))
            .map(split_plugins)
            .unwrap_or_default();

        // user names are case-insensitive, as option names always were
        let mut users = BTreeMap::new();
        if let Some(section) = ini.section(Some("users")) {
            for (name, key) in section.iter() {
                let name = name.trim().to_lowercase();
                if users.insert(name.clone(), key.trim().to_string()).is_some() {
                    return Err(anyhow!("User '{}' is listed twice in [users]", name));
                }
            }
        }

        let session = match ini.section(Some("session")) {
            Some(section) => SessionConfig {
                host: section.get("host").map(str::to_string),
                port: section
                    .get("port")
                    .map(|port| {
                        port.trim()
                            .parse::<u16>()
                            .map_err(|_| anyhow!("Invalid port in [session]: '{}'", port))
                    })
                    .transpose()?,
                user: section.get("user").map(str::to_string),
                keypath: section.get("keypath").map(str::to_string),
                password: section.get("password").map(str::to_string),
                use_password: section.get("use_password").map(parse_bool).transpose()?,
                sudo_password: section.get("sudo_password").map(str::to_string),
                use_sudo_password: section
                    .get("use_sudo_password")
                    .map(parse_bool)
                    .transpose()?,
            },
            None => SessionConfig::default(),
        };

        Ok(Self::new(plugins, users, session))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let plugins = match raw.plugins {
            Some(PluginList::Csv(list)) => split_plugins(&list),
            Some(PluginList::List(list)) => list
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            None => Vec::new(),
        };

        let users = raw
            .users
            .into_iter()
            .map(|(name, key)| (name.trim().to_lowercase(), key.trim().to_string()))
            .collect();

        Self::new(plugins, users, raw.session)
    }

    /// Plugin names to activate, in configured order.
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Configured SSH public key for `username`, ignoring case.
    pub fn user_key(&self, username: &str) -> Option<&str> {
        self.users.get(&username.to_lowercase()).map(String::as_str)
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    plugins: Option<PluginList>,
    #[serde(default)]
    users: BTreeMap<String, String>,
    #[serde(default)]
    session: SessionConfig,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PluginList {
    List(Vec<String>),
    Csv(String),
}

/// Split a comma separated plugin list, dropping empty entries.
pub fn split_plugins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reject what a stricter INI reader would: keys outside any section and
/// indented continuation lines.
fn check_ini_layout(contents: &str) -> Result<()> {
    let mut in_section = false;

    for (idx, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            return Err(anyhow!(
                "line {}: indented continuation lines are not supported",
                idx + 1
            ));
        }

        if trimmed.starts_with('[') {
            in_section = true;
        } else if !in_section {
            return Err(anyhow!("line {}: key outside of any section", idx + 1));
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        other => Err(anyhow!("Not a boolean: '{}'", other)),
    }
}
