//! # Kernel Launcher
//!
//! Starts a kernel daemon as a child process.
//!
//! Any port left at 0 is replaced by a free port before the child starts,
//! so the caller knows every port up front. A dependent kernel is told to
//! watch the launching process and exits when it goes away; an independent
//! kernel runs in its own process group and survives its launcher.

use crate::error::LaunchError;
use kernel_api::KernelPorts;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command};

/// Executable launched when none is configured
pub const DEFAULT_EXECUTABLE: &str = "kerneld";

/// How to launch a kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Kernel daemon executable
    pub executable: PathBuf,
    /// Address the kernel binds; the daemon default when `None`
    pub ip: Option<String>,
    /// Requested ports; 0 picks a free one
    pub ports: KernelPorts,
    /// Whether the kernel survives the launching process
    pub independent: bool,
    /// Arguments appended after the generated ones
    pub extra_arguments: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            ip: None,
            ports: KernelPorts::default(),
            independent: false,
            extra_arguments: Vec::new(),
        }
    }
}

impl LaunchConfig {
    /// Creates a config for `executable`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_ports(mut self, ports: KernelPorts) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_independent(mut self, independent: bool) -> Self {
        self.independent = independent;
        self
    }

    pub fn with_extra_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_arguments.extend(arguments.into_iter().map(Into::into));
        self
    }
}

/// A running kernel process
#[derive(Debug)]
pub struct LaunchedKernel {
    pub child: Child,
    /// Ports the kernel was told to bind
    pub ports: KernelPorts,
}

/// Launches a kernel process
pub fn launch_kernel(config: &LaunchConfig) -> Result<LaunchedKernel, LaunchError> {
    let bind_ip = config.ip.as_deref().unwrap_or("127.0.0.1");
    let ports = assign_free_ports(bind_ip, config.ports)?;
    let parent = (!config.independent).then(std::process::id);
    let arguments = kernel_arguments(config, &ports, parent);

    let mut command = Command::new(&config.executable);
    command.args(&arguments);
    if config.independent {
        detach(&mut command);
    }

    let child = command.spawn().map_err(|source| LaunchError::Spawn {
        executable: config.executable.clone(),
        source,
    })?;
    tracing::info!(
        pid = child.id(),
        executable = %config.executable.display(),
        ?ports,
        independent = config.independent,
        "launched kernel"
    );
    Ok(LaunchedKernel { child, ports })
}

/// Command-line arguments for a kernel bound to `ports`
pub fn kernel_arguments(config: &LaunchConfig, ports: &KernelPorts, parent: Option<u32>) -> Vec<String> {
    let mut arguments = vec![
        "--xrep".to_string(),
        ports.xrep_port.to_string(),
        "--pub".to_string(),
        ports.pub_port.to_string(),
        "--req".to_string(),
        ports.req_port.to_string(),
        "--hb".to_string(),
        ports.hb_port.to_string(),
    ];
    if let Some(ip) = &config.ip {
        arguments.push("--ip".to_string());
        arguments.push(ip.clone());
    }
    if let Some(pid) = parent {
        arguments.push("--parent".to_string());
        arguments.push(pid.to_string());
    }
    arguments.extend(config.extra_arguments.iter().cloned());
    arguments
}

/// Replaces every 0 port with a free one
///
/// All probe listeners stay open until every port is chosen, so the picked
/// ports are distinct.
pub fn assign_free_ports(ip: &str, requested: KernelPorts) -> Result<KernelPorts, LaunchError> {
    let mut held = Vec::new();
    let mut pick = |port: u16| -> Result<u16, LaunchError> {
        if port != 0 {
            return Ok(port);
        }
        let listener = TcpListener::bind((ip, 0)).map_err(LaunchError::NoFreePort)?;
        let port = listener.local_addr().map_err(LaunchError::NoFreePort)?.port();
        held.push(listener);
        Ok(port)
    };

    Ok(KernelPorts::new(
        pick(requested.xrep_port)?,
        pick(requested.pub_port)?,
        pick(requested.req_port)?,
        pick(requested.hb_port)?,
    ))
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_for_dependent_kernel() {
        let config = LaunchConfig::new("kerneld")
            .with_ip("10.0.0.2")
            .with_extra_arguments(["--log", "debug"]);
        let ports = KernelPorts::new(1, 2, 3, 4);

        assert_eq!(
            kernel_arguments(&config, &ports, Some(99)),
            vec![
                "--xrep", "1", "--pub", "2", "--req", "3", "--hb", "4", "--ip", "10.0.0.2",
                "--parent", "99", "--log", "debug",
            ]
        );
    }

    #[test]
    fn test_arguments_for_independent_kernel() {
        let config = LaunchConfig::new("kerneld").with_independent(true);
        let arguments = kernel_arguments(&config, &KernelPorts::new(1, 2, 3, 4), None);
        assert!(!arguments.contains(&"--parent".to_string()));
        assert!(!arguments.contains(&"--ip".to_string()));
    }

    #[test]
    fn test_free_ports_are_distinct() {
        let ports = assign_free_ports("127.0.0.1", KernelPorts::default()).unwrap();
        assert!(ports.is_complete());
        let mut all = vec![ports.xrep_port, ports.pub_port, ports.req_port, ports.hb_port];
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_requested_ports_are_kept() {
        let ports = assign_free_ports("127.0.0.1", KernelPorts::new(5550, 0, 5552, 0)).unwrap();
        assert_eq!(ports.xrep_port, 5550);
        assert_eq!(ports.req_port, 5552);
        assert_ne!(ports.pub_port, 0);
        assert_ne!(ports.hb_port, 0);
    }

    #[test]
    fn test_missing_executable() {
        let config = LaunchConfig::new("/nonexistent/kerneld").with_independent(true);
        let err = launch_kernel(&config).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
