//! # Kernel Console
//!
//! Terminal frontend: connects to a running kernel, or launches one, and
//! reads lines until `exit`.

use cli_console::{ClientConfig, InteractiveConsole, KernelClient};
use core_types::Identity;
use kernel_api::KernelPorts;
use kerneld::{init_logging, launch_kernel, ConnectionInfo, LaunchConfig};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{self, Child};
use std::thread;
use std::time::{Duration, Instant};
use tcp_transport::TcpClientTransport;

/// How long a freshly launched kernel gets to bind its ports
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct ConsoleArgs {
    connection_file: Option<PathBuf>,
    ip: Option<String>,
    ports: KernelPorts,
    key: Option<String>,
    kernel: Option<PathBuf>,
    log: Option<String>,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("kernel-console");

    let parsed = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });
    let Some(parsed) = parsed else {
        print_usage(program);
        process::exit(0);
    };

    if let Err(e) = init_logging(parsed.log.as_deref()) {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(parsed) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: ConsoleArgs) -> Result<(), String> {
    let (info, mut child) = resolve_kernel(&args)?;
    let transport = connect_with_retry(&info)?;

    let mut config = ClientConfig::default();
    if !info.key.is_empty() {
        config = config.with_key(info.key.as_bytes());
    }
    let client = KernelClient::new(transport, config).with_input_handler(read_input);
    let mut console = InteractiveConsole::new(client);

    loop {
        print!("{}", console.prompt());
        io::stdout().flush().map_err(|e| e.to_string())?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line).map_err(|e| e.to_string())? == 0 {
            line = "exit".to_string();
        }
        match console.handle_line(&line) {
            Ok(response) => {
                print!("{}", response.text);
                if response.exit {
                    break;
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    if let Some(child) = child.as_mut() {
        child.wait().map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Finds the kernel to talk to, launching one when none was named
fn resolve_kernel(args: &ConsoleArgs) -> Result<(ConnectionInfo, Option<Child>), String> {
    let ip = args.ip.clone().unwrap_or_else(|| "127.0.0.1".to_string());

    if let Some(path) = &args.connection_file {
        return ConnectionInfo::read(path)
            .map(|info| (info, None))
            .map_err(|e| e.to_string());
    }

    let ports = args.ports;
    if ports.xrep_port != 0 && ports.pub_port != 0 && ports.req_port != 0 {
        return Ok((ConnectionInfo::new(ip, ports, args.key.as_deref()), None));
    }

    let mut launch = LaunchConfig::new(args.kernel.clone().unwrap_or_else(default_kernel))
        .with_ports(ports);
    if let Some(requested) = &args.ip {
        launch = launch.with_ip(requested.clone());
    }
    if let Some(key) = &args.key {
        launch = launch.with_extra_arguments(["--key".to_string(), key.clone()]);
    }
    let launched = launch_kernel(&launch).map_err(|e| e.to_string())?;
    Ok((
        ConnectionInfo::new(ip, launched.ports, args.key.as_deref()),
        Some(launched.child),
    ))
}

/// `kerneld` next to this executable, or on the search path
fn default_kernel() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("kerneld")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("kerneld"))
}

fn connect_with_retry(info: &ConnectionInfo) -> Result<TcpClientTransport, String> {
    let started = Instant::now();
    loop {
        match TcpClientTransport::connect(&info.ip, info.ports, Identity::random()) {
            Ok(transport) => return Ok(transport),
            Err(e) if started.elapsed() < CONNECT_TIMEOUT => {
                tracing::debug!(error = %e, "kernel not reachable yet");
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(format!("Could not connect to kernel: {}", e)),
        }
    }
}

fn read_input(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
        Err(_) => String::new(),
    }
}

/// Parses console flags; `Ok(None)` means help was requested
fn parse_args(args: &[String]) -> Result<Option<ConsoleArgs>, String> {
    let mut parsed = ConsoleArgs::default();
    let mut i = 1;

    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || -> Result<String, String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("Missing value for {}", flag))
        };
        match flag {
            "--connection-file" | "-f" => parsed.connection_file = Some(PathBuf::from(value()?)),
            "--ip" => parsed.ip = Some(value()?),
            "--xrep" => parsed.ports.xrep_port = port(&value()?, flag)?,
            "--pub" => parsed.ports.pub_port = port(&value()?, flag)?,
            "--req" => parsed.ports.req_port = port(&value()?, flag)?,
            "--hb" => parsed.ports.hb_port = port(&value()?, flag)?,
            "--key" => parsed.key = Some(value()?),
            "--kernel" => parsed.kernel = Some(PathBuf::from(value()?)),
            "--log" => parsed.log = Some(value()?),
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(Some(parsed))
}

fn port(raw: &str, flag: &str) -> Result<u16, String> {
    raw.parse()
        .map_err(|_| format!("Invalid port for {}: {}", flag, raw))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Connects to a kernel, or launches one when no kernel is named.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --connection-file <PATH>  Read ip, ports and key from a kernel's file");
    eprintln!("  --ip <ADDR>                   Kernel address (default 127.0.0.1)");
    eprintln!("  --xrep/--pub/--req/--hb <P>   Kernel ports");
    eprintln!("  --key <SECRET>                Signing key");
    eprintln!("  --kernel <PATH>               Kernel executable to launch");
    eprintln!("  --log <FILTER>                Log filter (default: RUST_LOG or warn)");
    eprintln!("  -h, --help                    Show this help message");
    eprintln!();
    eprintln!("Commands at the prompt:");
    eprintln!("  name?              Show the docstring of name");
    eprintln!("  %complete <text>   List completions");
    eprintln!("  exit, quit         Shut the kernel down and leave");
}
