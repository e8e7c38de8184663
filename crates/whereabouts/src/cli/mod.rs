//! Command-line interface for whereabouts.
//!
//! This module provides the CLI structure for the `whereabouts` binary. The
//! command handlers live in the binary itself.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CaptureCommand, ClearCommand, ConfigCommand, ExportCommand, HistoryCommand, OutputFormat,
    ProfileCommand, StatusCommand, WatchCommand,
};

use crate::logging::Verbosity;

/// whereabouts - Capture, store and inspect location fixes
///
/// Requests positions from the location service, keeps every fix in local
/// storage, and shows what the host reveals about itself.
#[derive(Debug, Parser)]
#[command(name = "whereabouts")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Request one position and store it
    Capture(CaptureCommand),

    /// Follow position updates, storing each one
    Watch(WatchCommand),

    /// List stored location entries
    History(HistoryCommand),

    /// Delete all stored entries and the session id
    Clear(ClearCommand),

    /// Write stored entries to a dated JSON file
    Export(ExportCommand),

    /// Collect and show the device profile
    Profile(ProfileCommand),

    /// Show storage and host status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "whereabouts");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_capture() {
        let cli = Cli::try_parse_from(["whereabouts", "capture", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Capture(CaptureCommand { json: true })));
    }

    #[test]
    fn test_parse_watch_count() {
        let cli = Cli::try_parse_from(["whereabouts", "watch", "--count", "5"]).unwrap();
        match cli.command {
            Command::Watch(cmd) => assert_eq!(cmd.count, Some(5)),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["whereabouts", "watch"]).unwrap();
        assert!(matches!(cli.command, Command::Watch(WatchCommand { count: None })));
    }

    #[test]
    fn test_parse_history() {
        let cli =
            Cli::try_parse_from(["whereabouts", "history", "-l", "3", "-f", "json"]).unwrap();
        match cli.command {
            Command::History(cmd) => {
                assert_eq!(cmd.limit, Some(3));
                assert_eq!(cmd.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_default_format() {
        let cli = Cli::try_parse_from(["whereabouts", "history"]).unwrap();
        match cli.command {
            Command::History(cmd) => assert_eq!(cmd.format, OutputFormat::Table),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_clear_and_export() {
        let cli = Cli::try_parse_from(["whereabouts", "clear", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Clear(ClearCommand { yes: true })));

        let cli = Cli::try_parse_from(["whereabouts", "export", "-o", "/tmp/out"]).unwrap();
        match cli.command {
            Command::Export(cmd) => assert_eq!(cmd.output, Some(PathBuf::from("/tmp/out"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["whereabouts", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: None })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = ["whereabouts", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["whereabouts", "profile", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["whereabouts", "status", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
