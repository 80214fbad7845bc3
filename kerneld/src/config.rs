//! # Daemon Configuration
//!
//! Command-line flags of the kernel daemon, parsed by hand into
//! [`KerneldConfig`].

use crate::error::KerneldError;
use std::path::PathBuf;

/// Address the daemon binds when `--ip` is not given
pub const DEFAULT_IP: &str = "127.0.0.1";

/// Kernel daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KerneldConfig {
    /// Address every channel binds to
    pub ip: String,
    /// Shell port (0 = pick a free port)
    pub xrep_port: u16,
    /// IOPub port
    pub pub_port: u16,
    /// Stdin port
    pub req_port: u16,
    /// Heartbeat port
    pub hb_port: u16,
    /// Process to watch; the daemon exits once it is gone
    pub parent: Option<u32>,
    /// Signing key shared with frontends
    pub key: Option<String>,
    /// Where to write the bound ports as JSON
    pub connection_file: Option<PathBuf>,
    /// Log filter directive, e.g. `info` or `interactive_kernel=debug`
    pub log: Option<String>,
}

impl Default for KerneldConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            xrep_port: 0,
            pub_port: 0,
            req_port: 0,
            hb_port: 0,
            parent: None,
            key: None,
            connection_file: None,
            log: None,
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve a kernel
    Run(KerneldConfig),
    /// Print usage and exit
    Help,
}

/// Parses daemon flags; `args[0]` is the program name
pub fn parse_args(args: &[String]) -> Result<Command, KerneldError> {
    let mut config = KerneldConfig::default();
    let mut i = 1;

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--ip" => config.ip = value(args, &mut i, flag)?.to_string(),
            "--xrep" => config.xrep_port = port(value(args, &mut i, flag)?, flag)?,
            "--pub" => config.pub_port = port(value(args, &mut i, flag)?, flag)?,
            "--req" => config.req_port = port(value(args, &mut i, flag)?, flag)?,
            "--hb" => config.hb_port = port(value(args, &mut i, flag)?, flag)?,
            "--parent" => {
                let raw = value(args, &mut i, flag)?;
                let pid = raw
                    .parse()
                    .map_err(|_| KerneldError::Usage(format!("Invalid pid for --parent: {}", raw)))?;
                // 0 means no parent to watch
                config.parent = (pid != 0).then_some(pid);
            }
            "--key" => config.key = Some(value(args, &mut i, flag)?.to_string()),
            "--connection-file" => {
                config.connection_file = Some(PathBuf::from(value(args, &mut i, flag)?))
            }
            "--log" => config.log = Some(value(args, &mut i, flag)?.to_string()),
            other => return Err(KerneldError::Usage(format!("Unknown option: {}", other))),
        }
        i += 1;
    }

    Ok(Command::Run(config))
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, KerneldError> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| KerneldError::Usage(format!("Missing value for {}", flag)))
}

fn port(raw: &str, flag: &str) -> Result<u16, KerneldError> {
    raw.parse()
        .map_err(|_| KerneldError::Usage(format!("Invalid port for {}: {}", flag, raw)))
}

/// Prints usage to stderr
pub fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --ip <ADDR>               Address to bind (default {})", DEFAULT_IP);
    eprintln!("  --xrep <PORT>             Shell port (0 = pick a free port)");
    eprintln!("  --pub <PORT>              IOPub port");
    eprintln!("  --req <PORT>              Stdin port");
    eprintln!("  --hb <PORT>               Heartbeat port");
    eprintln!("  --parent <PID>            Exit when this process goes away");
    eprintln!("  --key <SECRET>            Sign messages with this key");
    eprintln!("  --connection-file <PATH>  Write the bound ports as JSON");
    eprintln!("  --log <FILTER>            Log filter (default: RUST_LOG or warn)");
    eprintln!("  -h, --help                Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --xrep 5550 --pub 5551 --req 5552 --hb 5553", program);
    eprintln!("  {} --connection-file kernel.json --log debug", program);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("kerneld")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            parse_args(&args(&[])).unwrap(),
            Command::Run(KerneldConfig::default())
        );
    }

    #[test]
    fn test_all_flags() {
        let parsed = parse_args(&args(&[
            "--ip",
            "0.0.0.0",
            "--xrep",
            "5550",
            "--pub",
            "5551",
            "--req",
            "5552",
            "--hb",
            "5553",
            "--parent",
            "42",
            "--key",
            "secret",
            "--connection-file",
            "/tmp/kernel.json",
            "--log",
            "debug",
        ]))
        .unwrap();

        let Command::Run(config) = parsed else {
            panic!("expected a run command");
        };
        assert_eq!(config.ip, "0.0.0.0");
        assert_eq!(
            (config.xrep_port, config.pub_port, config.req_port, config.hb_port),
            (5550, 5551, 5552, 5553)
        );
        assert_eq!(config.parent, Some(42));
        assert_eq!(config.key.as_deref(), Some("secret"));
        assert_eq!(config.connection_file, Some(PathBuf::from("/tmp/kernel.json")));
        assert_eq!(config.log.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parent_zero_means_unwatched() {
        let Command::Run(config) = parse_args(&args(&["--parent", "0"])).unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(config.parent, None);
    }

    #[test]
    fn test_help() {
        assert_eq!(parse_args(&args(&["--xrep", "1", "-h"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_usage_errors() {
        let cases = [
            (vec!["--xrep"], "Missing value for --xrep"),
            (vec!["--pub", "70000"], "Invalid port for --pub: 70000"),
            (vec!["--parent", "me"], "Invalid pid for --parent: me"),
            (vec!["--verbose"], "Unknown option: --verbose"),
        ];
        for (list, expected) in cases {
            match parse_args(&args(&list)) {
                Err(KerneldError::Usage(message)) => assert_eq!(message, expected),
                other => panic!("expected usage error for {:?}, got {:?}", list, other),
            }
        }
    }
}
