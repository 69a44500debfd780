use async_trait::async_trait;

use crate::error::{TaskError, TaskResult};
use crate::executor::{Executor, RemoteCommand};
use crate::plugin::Plugin;
use crate::task::{Param, Task, TaskArgs, TaskContext};
use crate::utils::sudo_checked;

const OS_DETECT_SCRIPT: &str = r#"
case "$(uname -s)" in
    Linux)
        if [ -f /etc/os-release ]; then
            os_id=$(grep '^ID=' /etc/os-release | cut -d'=' -f2 | tr -d '"')
            os_id_like=$(grep '^ID_LIKE=' /etc/os-release | cut -d'=' -f2 | tr -d '"')
            echo "$os_id_like:$os_id"
        elif [ -f /etc/redhat-release ]; then
            echo "rhel:rhel"
        elif [ -f /etc/debian_version ]; then
            echo "debian:debian"
        else
            exit 1
        fi
        ;;
    *)
        exit 1
        ;;
esac"#;

const DPKG_OPTIONS: [&str; 4] = [
    "-o",
    "Dpkg::Options::=--force-confdef",
    "-o",
    "Dpkg::Options::=--force-confold",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Debian,
    RedHat,
    Arch,
}

/// Classify the `ID_LIKE:ID` line printed by the detection script.
pub fn parse_os_release(line: &str) -> Option<OsType> {
    let (os_id_like, os_id) = line.trim().split_once(':')?;

    if os_id_like.contains("debian")
        || matches!(
            os_id,
            "debian" | "ubuntu" | "kali" | "linuxmint" | "pop" | "raspbian"
        )
    {
        Some(OsType::Debian)
    } else if os_id_like.contains("rhel")
        || os_id_like.contains("fedora")
        || matches!(
            os_id,
            "rhel" | "centos" | "fedora" | "rocky" | "alma" | "ol" | "amzn"
        )
    {
        Some(OsType::RedHat)
    } else if os_id_like.contains("arch") || matches!(os_id, "arch" | "manjaro") {
        Some(OsType::Arch)
    } else {
        None
    }
}

pub async fn detect_os_type(exec: &dyn Executor) -> TaskResult<OsType> {
    let result = exec
        .run(&RemoteCommand::new("sh").args(["-c", OS_DETECT_SCRIPT]))
        .await?;
    if !result.success() {
        return Err(TaskError::abort("Failed to detect OS type from /etc/os-release"));
    }

    parse_os_release(&result.output)
        .ok_or_else(|| TaskError::abort(format!("Unsupported OS type: {}", result.output.trim())))
}

pub fn install_command(os_type: OsType, package: &str) -> RemoteCommand {
    match os_type {
        OsType::Debian => RemoteCommand::new("env")
            .args(["DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y"])
            .args(DPKG_OPTIONS)
            .arg(package),
        OsType::RedHat => RemoteCommand::new("yum").args(["install", "-y", package]),
        OsType::Arch => RemoteCommand::new("pacman").args(["-S", "--noconfirm", package]),
    }
}

pub fn update_commands(os_type: OsType) -> Vec<RemoteCommand> {
    match os_type {
        OsType::Debian => vec![
            RemoteCommand::new("apt-get").arg("update"),
            RemoteCommand::new("env")
                .args(["DEBIAN_FRONTEND=noninteractive", "apt-get", "upgrade", "-y"])
                .args(DPKG_OPTIONS),
        ],
        OsType::RedHat => vec![RemoteCommand::new("yum").args(["update", "-y"])],
        OsType::Arch => vec![RemoteCommand::new("pacman").args(["-Syu", "--noconfirm"])],
    }
}

fn validate_package_name(package: &str) -> TaskResult<()> {
    if package.is_empty()
        || package.starts_with('-')
        || package.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(TaskError::abort(format!("Invalid package name '{}'", package)));
    }
    Ok(())
}

pub fn factory() -> Box<dyn Plugin> {
    Box::new(Packages)
}

pub struct Packages;

impl Plugin for Packages {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn tasks(&self) -> Vec<Box<dyn Task>> {
        vec![Box::new(PkgInstall), Box::new(SysUpdate)]
    }
}

struct PkgInstall;

#[async_trait]
impl Task for PkgInstall {
    fn name(&self) -> &'static str {
        "pkg_install"
    }

    fn doc(&self) -> &'static str {
        "Install a package with the remote system's package manager

    package: the package to install"
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required("package")];
        PARAMS
    }

    async fn run(&self, ctx: &TaskContext<'_>, args: &TaskArgs) -> TaskResult {
        let package = args.require("package")?;
        validate_package_name(package)?;

        let os_type = detect_os_type(ctx.executor).await?;
        sudo_checked(ctx.executor, install_command(os_type, package)).await?;

        log::info!("Installed package '{}'", package);
        Ok(())
    }
}

struct SysUpdate;

#[async_trait]
impl Task for SysUpdate {
    fn name(&self) -> &'static str {
        "sys_update"
    }

    fn doc(&self) -> &'static str {
        "Upgrade all installed packages"
    }

    fn params(&self) -> &'static [Param] {
        &[]
    }

    async fn run(&self, ctx: &TaskContext<'_>, _args: &TaskArgs) -> TaskResult {
        let os_type = detect_os_type(ctx.executor).await?;
        for command in update_commands(os_type) {
            sudo_checked(ctx.executor, command).await?;
        }

        log::info!("System packages upgraded");
        Ok(())
    }
}
