//! # Kernel Daemon
//!
//! Main entry point: serves one interactive kernel over TCP.

use kerneld::{init_logging, parse_args, print_usage, Command, KernelDaemon};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("kerneld");

    let config = match parse_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print_usage(program);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(config.log.as_deref()) {
        eprintln!("Warning: {}", e);
    }

    let daemon = KernelDaemon::bind(config).unwrap_or_else(|e| {
        eprintln!("Failed to start kernel: {}", e);
        process::exit(1);
    });
    println!("{}", daemon.port_summary());

    if let Err(e) = daemon.run() {
        eprintln!("Kernel error: {}", e);
        process::exit(1);
    }
}
