//! Loralog concat - join a project's source files into one text file

use clap::Parser;
use loralog_core::cli::ConcatArgs;
use loralog_core::utils::concat::concatenate;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LORALOG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = ConcatArgs::parse();

    match concatenate(&args.options()) {
        Ok(report) => {
            println!("Concatenated files saved to: {}", report.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
