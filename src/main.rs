//! Loralog - serial telemetry capture
//!
//! Reads lines from a serial-connected receiver, stamps them with the
//! capture time and writes them to stdout and a `lora_log_*.txt` file.
//! Operator messages and diagnostics go to stderr.

use clap::Parser;
use loralog_core::cli::{exit_code_description, CaptureArgs, CliResult, ExitCodes};
use loralog_core::config::AppConfig;
use loralog_core::core::connection::list_ports;
use loralog_core::{CancelToken, SerialConnection, Session};
use std::process::ExitCode;

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("LORALOG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_ports(quiet: bool) -> CliResult {
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            if !quiet {
                eprintln!("No serial ports found.");
            }
            CliResult::success()
        }
        Ok(ports) => {
            for port in &ports {
                println!("{}", port.port_name);
            }
            CliResult::success()
        }
        Err(e) => CliResult::error(ExitCodes::IO_ERROR, format!("Failed to list ports: {e}")),
    }
}

fn capture(args: &CaptureArgs) -> anyhow::Result<CliResult> {
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config.with_overrides(args.overrides()),
        Err(e) => return Ok(CliResult::from(&e)),
    };
    let session_config = match config.session_config() {
        Ok(session_config) => session_config,
        Err(e) => return Ok(CliResult::from(&e)),
    };

    let cancel = CancelToken::install_ctrlc_handler()?;

    let session = match Session::start(&session_config, SerialConnection::open, std::io::stdout()) {
        Ok(session) => session,
        Err(e) => return Ok(CliResult::from(&e)),
    };

    if !args.quiet {
        eprintln!("Connected to {}", session_config.connection);
        eprintln!("Writing to: {}", session.log_path().display());
        eprintln!("Press Ctrl+C to stop.");
    }

    let report = session.run(&cancel);

    for problem in &report.cleanup_errors {
        eprintln!("Warning: {problem}");
    }
    if !args.quiet {
        eprintln!("{} record(s) written to {}", report.records, report.log_path.display());
    }

    Ok(CliResult::from(&report))
}

fn main() -> ExitCode {
    let args = CaptureArgs::parse();
    init_tracing(args.log_level());

    tracing::debug!("Starting Loralog v{}", loralog_core::VERSION);

    let result = if args.list_ports {
        print_ports(args.quiet)
    } else {
        capture(&args).unwrap_or_else(|e| CliResult::error(ExitCodes::INTERNAL_ERROR, format!("{e:#}")))
    };

    tracing::debug!(code = result.code(), "exit: {}", exit_code_description(result.code()));

    match (&result, result.message()) {
        (CliResult::Success(_), Some(msg)) if !args.quiet => eprintln!("{msg}"),
        (CliResult::Error(..), Some(msg)) => eprintln!("Error: {msg}"),
        _ => {}
    }

    result.to_exit_code()
}
