//! # Daemon Runtime
//!
//! Binds the sockets, wires them to a kernel and serves until shutdown.

use crate::config::KerneldConfig;
use crate::connection_file::ConnectionInfo;
use crate::error::KerneldError;
use crate::poller::ParentPoller;
use interactive_kernel::Kernel;
use ipc::Session;
use kernel_api::{Channel, KernelPorts};
use tcp_transport::{Heartbeat, TcpKernelTransport};

/// User name on every message the kernel sends
pub const KERNEL_USERNAME: &str = "kernel";

/// A bound kernel that has not started serving yet
pub struct KernelDaemon {
    config: KerneldConfig,
    kernel: Kernel<TcpKernelTransport>,
    heartbeat: Heartbeat,
    ports: KernelPorts,
}

impl KernelDaemon {
    /// Binds every channel and records the resulting ports on the kernel
    pub fn bind(config: KerneldConfig) -> Result<Self, KerneldError> {
        let transport =
            TcpKernelTransport::bind(&config.ip, config.xrep_port, config.pub_port, config.req_port)?;
        let heartbeat = Heartbeat::bind(&config.ip, config.hb_port).map_err(KerneldError::Heartbeat)?;

        let ports = KernelPorts::new(
            bound_port(&transport, Channel::Shell)?,
            bound_port(&transport, Channel::IoPub)?,
            bound_port(&transport, Channel::Stdin)?,
            heartbeat.port(),
        );

        let mut session = Session::new(KERNEL_USERNAME);
        if let Some(key) = &config.key {
            session = session.with_key(key.as_bytes());
        }
        let mut kernel = Kernel::new(transport, session);
        kernel.record_ports(ports);
        tracing::info!(ip = %config.ip, ?ports, signed = config.key.is_some(), "kernel bound");

        Ok(Self {
            config,
            kernel,
            heartbeat,
            ports,
        })
    }

    pub fn ports(&self) -> KernelPorts {
        self.ports
    }

    pub fn config(&self) -> &KerneldConfig {
        &self.config
    }

    /// Command-line form of the bound ports
    pub fn port_summary(&self) -> String {
        format!(
            "--xrep={} --pub={} --req={} --hb={}",
            self.ports.xrep_port, self.ports.pub_port, self.ports.req_port, self.ports.hb_port
        )
    }

    /// Publishes the ports, starts the helpers and serves until shutdown
    pub fn run(self) -> Result<(), KerneldError> {
        let Self {
            config,
            mut kernel,
            heartbeat,
            ports,
        } = self;

        if let Some(path) = &config.connection_file {
            ConnectionInfo::new(config.ip.as_str(), ports, config.key.as_deref()).write(path)?;
        }

        heartbeat.start().map_err(KerneldError::Heartbeat)?;

        if let Some(parent) = config.parent {
            tracing::debug!(parent, "watching parent process");
            ParentPoller::new(parent)
                .start(|| std::process::exit(0))
                .map_err(KerneldError::Poller)?;
        }

        kernel.start()?;
        tracing::info!(executed = kernel.execution_count(), "kernel shut down");
        Ok(())
    }
}

impl std::fmt::Debug for KernelDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelDaemon")
            .field("config", &self.config)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

fn bound_port(transport: &TcpKernelTransport, channel: Channel) -> Result<u16, KerneldError> {
    transport
        .port(channel)
        .ok_or_else(|| KerneldError::Usage(format!("{} channel is not bound", channel)))
}

/// Installs the stderr log subscriber
///
/// `RUST_LOG` wins over `filter`; with neither, only warnings are shown.
pub fn init_logging(filter: Option<&str>) -> Result<(), KerneldError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter.unwrap_or("warn")));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| KerneldError::Logging(err.to_string()))
}
