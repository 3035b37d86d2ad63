//! Command-line arguments

use crate::config::ConfigOverrides;
use crate::utils::concat::ConcatOptions;
use clap::Parser;
use std::path::PathBuf;

/// Capture serial telemetry into a timestamped log file
#[derive(Parser, Debug)]
#[command(name = "loralog", version, about, long_about = None)]
pub struct CaptureArgs {
    /// Serial port name (e.g., COM4, /dev/ttyUSB0)
    #[arg(short, long, env = "LORALOG_PORT")]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long, env = "LORALOG_BAUD")]
    pub baud: Option<u32>,

    /// Read timeout in milliseconds
    #[arg(short, long = "timeout-ms", env = "LORALOG_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Directory to create the log file in
    #[arg(short = 'd', long, env = "LORALOG_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log file name prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Skip the disk sync after each record (flush only)
    #[arg(long)]
    pub no_sync: bool,

    /// Config file (TOML)
    #[arg(short, long, env = "LORALOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Verbose diagnostics
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (records and errors only)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CaptureArgs {
    /// Flag and environment values that override the config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port.clone(),
            baud_rate: self.baud,
            timeout_ms: self.timeout_ms,
            directory: self.log_dir.clone(),
            prefix: self.prefix.clone(),
            no_sync: self.no_sync,
        }
    }

    /// Diagnostics filter directive for these flags
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Concatenate source files under selected subdirectories into one text file
#[derive(Parser, Debug)]
#[command(name = "loralog-concat", version, about, long_about = None)]
pub struct ConcatArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Subdirectory to include, in order (repeatable)
    #[arg(short = 'd', long = "dir")]
    pub dirs: Vec<String>,

    /// File extension to include, without the dot (repeatable)
    #[arg(short = 'e', long = "ext")]
    pub extensions: Vec<String>,

    /// Build-description file at the root to put first
    #[arg(long)]
    pub root_file: Option<String>,

    /// Skip the root build-description file
    #[arg(long, conflicts_with = "root_file")]
    pub no_root_file: bool,

    /// Directory to write the output file to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

impl ConcatArgs {
    /// Options for [`crate::utils::concat::concatenate`]
    pub fn options(&self) -> ConcatOptions {
        let mut options = ConcatOptions::new(&self.root).output_dir(&self.output);
        if !self.dirs.is_empty() {
            options = options.target_dirs(self.dirs.clone());
        }
        if !self.extensions.is_empty() {
            options = options.extensions(self.extensions.clone());
        }
        if self.no_root_file {
            options = options.root_file(None);
        } else if let Some(name) = &self.root_file {
            options = options.root_file(Some(name.clone()));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_flags() {
        let args = CaptureArgs::try_parse_from([
            "loralog", "--port", "COM4", "--baud", "9600", "--timeout-ms", "200", "--no-sync", "-v",
        ])
        .unwrap();

        let overrides = args.overrides();
        assert_eq!(overrides.port.as_deref(), Some("COM4"));
        assert_eq!(overrides.baud_rate, Some(9600));
        assert_eq!(overrides.timeout_ms, Some(200));
        assert!(overrides.no_sync);
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(CaptureArgs::try_parse_from(["loralog", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_bad_baud_rejected() {
        assert!(CaptureArgs::try_parse_from(["loralog", "--baud", "fast"]).is_err());
    }

    #[test]
    fn test_concat_defaults() {
        let args = ConcatArgs::try_parse_from(["loralog-concat", "firmware"]).unwrap();
        let options = args.options();
        assert_eq!(options.root, PathBuf::from("firmware"));
        assert_eq!(options.target_dirs, vec!["include", "lib", "src"]);
        assert_eq!(options.root_file.as_deref(), Some("CMakeLists.txt"));
    }

    #[test]
    fn test_concat_custom_dirs() {
        let args = ConcatArgs::try_parse_from([
            "loralog-concat", "fw", "-d", "src", "-d", "drivers", "-e", "rs", "--no-root-file",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.target_dirs, vec!["src", "drivers"]);
        assert_eq!(options.extensions, vec!["rs"]);
        assert!(options.root_file.is_none());
    }
}
