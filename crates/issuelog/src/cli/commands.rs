//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::general::Severity;
use crate::platform::{IssueCategory, IssueSeverity};
use crate::store::Context;

/// Which store a command operates on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogKind {
    /// The general error log
    #[default]
    General,
    /// The platform issue log
    Platform,
}

/// Store selection shared by the store commands.
#[derive(Debug, Clone, Copy, Args)]
pub struct LogSelector {
    /// Store to operate on
    #[arg(short, long, value_enum, default_value = "general")]
    pub log: LogKind,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    #[command(flatten)]
    pub selector: LogSelector,

    /// Disable severity colors
    #[arg(long)]
    pub no_color: bool,
}

/// Summary command arguments.
#[derive(Debug, Args)]
pub struct SummaryCommand {
    #[command(flatten)]
    pub selector: LogSelector,
}

/// Copy command arguments.
#[derive(Debug, Args)]
pub struct CopyCommand {
    #[command(flatten)]
    pub selector: LogSelector,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    #[command(flatten)]
    pub selector: LogSelector,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    #[command(flatten)]
    pub selector: LogSelector,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Count command arguments.
#[derive(Debug, Args)]
pub struct CountCommand {
    #[command(flatten)]
    pub selector: LogSelector,
}

/// Log command arguments (general log).
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Short description
    pub message: String,

    /// Severity
    #[arg(short, long, value_enum)]
    pub severity: Option<SeverityArg>,

    /// Stack or cause text
    #[arg(long)]
    pub stack: Option<String>,

    /// Context field as KEY=VALUE (repeatable; VALUE parsed as JSON when possible)
    #[arg(short = 'C', long = "context", value_name = "KEY=VALUE", value_parser = parse_context_pair)]
    pub context: Vec<(String, serde_json::Value)>,
}

/// Report command arguments (platform log).
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Short description
    pub message: String,

    /// Operational category
    #[arg(short = 'k', long, value_enum)]
    pub category: CategoryArg,

    /// Severity
    #[arg(short, long, value_enum)]
    pub severity: Option<IssueSeverityArg>,

    /// Stack or cause text
    #[arg(long)]
    pub stack: Option<String>,

    /// Context field as KEY=VALUE (repeatable; VALUE parsed as JSON when possible)
    #[arg(short = 'C', long = "context", value_name = "KEY=VALUE", value_parser = parse_context_pair)]
    pub context: Vec<(String, serde_json::Value)>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// General log severity argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    /// Error
    Error,
    /// Warning
    Warning,
    /// Info
    Info,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Error => Self::Error,
            SeverityArg::Warning => Self::Warning,
            SeverityArg::Info => Self::Info,
        }
    }
}

/// Platform issue severity argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IssueSeverityArg {
    /// Critical
    Critical,
    /// Error
    Error,
    /// Warning
    Warning,
}

impl From<IssueSeverityArg> for IssueSeverity {
    fn from(arg: IssueSeverityArg) -> Self {
        match arg {
            IssueSeverityArg::Critical => Self::Critical,
            IssueSeverityArg::Error => Self::Error,
            IssueSeverityArg::Warning => Self::Warning,
        }
    }
}

/// Platform issue category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum CategoryArg {
    /// Backend synchronization
    SyncBackend,
    /// File system access
    FileSystem,
    /// Database access
    Database,
    /// Deployment
    Deployment,
    /// Build
    Build,
    /// Remote API calls
    Api,
    /// Client-side storage
    Storage,
    /// Secret management
    Secrets,
    /// Anything else
    Other,
}

impl From<CategoryArg> for IssueCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::SyncBackend => Self::SyncBackend,
            CategoryArg::FileSystem => Self::FileSystem,
            CategoryArg::Database => Self::Database,
            CategoryArg::Deployment => Self::Deployment,
            CategoryArg::Build => Self::Build,
            CategoryArg::Api => Self::Api,
            CategoryArg::Storage => Self::Storage,
            CategoryArg::Secrets => Self::Secrets,
            CategoryArg::Other => Self::Other,
        }
    }
}

/// Parse a `KEY=VALUE` context pair.
///
/// The value is taken as JSON when it parses, otherwise as a plain string.
fn parse_context_pair(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err("context key cannot be empty".to_string());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect parsed pairs into a context map, `None` when empty.
#[must_use]
pub fn context_from_pairs(pairs: Vec<(String, serde_json::Value)>) -> Option<Context> {
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.into_iter().collect())
    }
}
