//! Command-line interface for issuelog.
//!
//! This module provides the CLI structure for the `issuelog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    context_from_pairs, CategoryArg, ClearCommand, ConfigCommand, CopyCommand, CountCommand,
    ExportCommand, IssueSeverityArg, LogCommand, LogKind, LogSelector, ReportCommand,
    SeverityArg, ShowCommand, SummaryCommand,
};

/// issuelog - Inspect and export captured errors and platform issues
///
/// Reads the persisted general error log and platform issue log, prints
/// support reports, and records new entries from scripts.
#[derive(Debug, Parser)]
#[command(name = "issuelog")]
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
    /// Show entries, tinted by severity
    Show(ShowCommand),

    /// Print the support summary
    Summary(SummaryCommand),

    /// Copy the support summary to the clipboard
    Copy(CopyCommand),

    /// Export all entries as JSON
    Export(ExportCommand),

    /// Remove all entries
    Clear(ClearCommand),

    /// Print the number of entries
    Count(CountCommand),

    /// Record an entry in the general error log
    Log(LogCommand),

    /// Record an issue in the platform issue log
    Report(ReportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "issuelog");
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["issuelog", "-q", "count"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["issuelog", "count"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["issuelog", "-v", "count"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["issuelog", "-vv", "count"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_show_defaults_to_general() {
        let cli = parse(&["issuelog", "show"]);
        match cli.command {
            Command::Show(cmd) => {
                assert_eq!(cmd.selector.log, LogKind::General);
                assert!(!cmd.no_color);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_summary_platform() {
        let cli = parse(&["issuelog", "summary", "--log", "platform"]);
        assert!(matches!(
            cli.command,
            Command::Summary(SummaryCommand {
                selector: LogSelector {
                    log: LogKind::Platform
                }
            })
        ));
    }

    #[test]
    fn test_parse_log_with_context() {
        let cli = parse(&[
            "issuelog",
            "log",
            "Contractor lookup failed",
            "--severity",
            "warning",
            "-C",
            "inn=7701234567",
            "-C",
            "retry=true",
        ]);
        match cli.command {
            Command::Log(cmd) => {
                assert_eq!(cmd.message, "Contractor lookup failed");
                assert_eq!(cmd.severity, Some(SeverityArg::Warning));
                assert_eq!(
                    cmd.context,
                    vec![
                        ("inn".to_string(), json!(7_701_234_567_u64)),
                        ("retry".to_string(), json!(true)),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_requires_category() {
        assert!(Cli::try_parse_from(["issuelog", "report", "Deploy failed"]).is_err());

        let cli = parse(&[
            "issuelog",
            "report",
            "Deploy failed",
            "--category",
            "deployment",
            "-s",
            "critical",
        ]);
        match cli.command {
            Command::Report(cmd) => {
                assert_eq!(cmd.category, CategoryArg::Deployment);
                assert_eq!(cmd.severity, Some(IssueSeverityArg::Critical));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_export_output() {
        let cli = parse(&["issuelog", "export", "-o", "/tmp/logs.json"]);
        match cli.command {
            Command::Export(cmd) => {
                assert_eq!(cmd.output, Some(PathBuf::from("/tmp/logs.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["issuelog", "-c", "/custom/config.toml", "count"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
