//! The platform issue log.
//!
//! Application code reports non-crash operational problems here, tagged with
//! a category, so they can be exported in one support report.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{error_chain, Captured, Context, LogStore, StoredEntry};

/// Durable slot for the platform log.
pub const STORAGE_KEY: &str = "poehali_platform_issues";

/// Maximum entries retained by the platform log.
pub const CAPACITY: usize = 200;

/// Entries listed individually in the support report.
pub const SUMMARY_RECENT: usize = 15;

/// Stack lines kept per entry in the support report.
const SUMMARY_STACK_LINES: usize = 3;

/// Support contact appended to every report.
pub const SUPPORT_CONTACT: &str = "t.me/+QgiLIa1gFRY4Y2Iy";

/// How serious a platform issue is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// The platform is unusable for the affected operation.
    Critical,
    /// The operation failed.
    #[default]
    Error,
    /// Degraded but working.
    Warning,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Operational area a platform issue belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Backend synchronization.
    SyncBackend,
    /// File system access.
    FileSystem,
    /// Database access.
    Database,
    /// Deployment.
    Deployment,
    /// Build.
    Build,
    /// Remote API calls.
    Api,
    /// Client-side storage.
    Storage,
    /// Secret management.
    Secrets,
    /// Anything else.
    Other,
}

impl IssueCategory {
    /// All categories in declaration order.
    pub const ALL: [Self; 9] = [
        Self::SyncBackend,
        Self::FileSystem,
        Self::Database,
        Self::Deployment,
        Self::Build,
        Self::Api,
        Self::Storage,
        Self::Secrets,
        Self::Other,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncBackend => "sync_backend",
            Self::FileSystem => "file_system",
            Self::Database => "database",
            Self::Deployment => "deployment",
            Self::Build => "build",
            Self::Api => "api",
            Self::Storage => "storage",
            Self::Secrets => "secrets",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported platform issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformIssueEntry {
    /// When the issue was reported.
    pub timestamp: DateTime<Utc>,
    /// Short description.
    pub message: String,
    /// Operational area.
    pub category: IssueCategory,
    /// Severity.
    pub severity: IssueSeverity,
    /// Stack or cause chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Extra diagnostic fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    /// Location of the capturing context.
    #[serde(alias = "projectUrl")]
    pub url: String,
    /// Agent string of the capturing context.
    #[serde(alias = "userAgent")]
    pub agent: String,
}

/// Caller-supplied fields for a new [`PlatformIssueEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlatformIssue {
    /// Short description.
    pub message: String,
    /// Operational area.
    pub category: IssueCategory,
    /// Severity, `error` when absent.
    pub severity: Option<IssueSeverity>,
    /// Stack or cause chain.
    pub stack: Option<String>,
    /// Extra diagnostic fields.
    pub context: Option<Context>,
}

impl NewPlatformIssue {
    /// Fields with a message and category.
    #[must_use]
    pub fn new(message: impl Into<String>, category: IssueCategory) -> Self {
        Self {
            message: message.into(),
            category,
            severity: None,
            stack: None,
            context: None,
        }
    }

    /// Set the severity.
    #[must_use]
    pub fn severity(mut self, severity: IssueSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set the stack text.
    #[must_use]
    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Set the context map.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

impl StoredEntry for PlatformIssueEntry {
    type Fields = NewPlatformIssue;
    const STORAGE_KEY: &'static str = STORAGE_KEY;
    const CAPACITY: usize = CAPACITY;
    const CONSOLE_TAG: &'static str = "[POEHALI.DEV PLATFORM ISSUE]";

    fn build(fields: NewPlatformIssue, captured: Captured) -> Self {
        Self {
            timestamp: captured.timestamp,
            message: fields.message,
            category: fields.category,
            severity: fields.severity.unwrap_or_default(),
            stack: fields.stack,
            context: fields.context,
            url: captured.url,
            agent: captured.agent,
        }
    }

    fn summarize(entries: &[Self], full_json: &str) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write_report(&mut out, entries, full_json);
        out
    }
}

/// Issue counts per category, only for categories that occur.
#[must_use]
pub fn category_counts(entries: &[PlatformIssueEntry]) -> BTreeMap<IssueCategory, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.category).or_insert(0) += 1;
    }
    counts
}

fn write_report(
    out: &mut String,
    entries: &[PlatformIssueEntry],
    full_json: &str,
) -> std::fmt::Result {
    let count = |severity: IssueSeverity| entries.iter().filter(|e| e.severity == severity).count();

    writeln!(out, "=== POEHALI.DEV PLATFORM ISSUE REPORT ===")?;
    writeln!(out)?;
    writeln!(out, "Statistics:")?;
    writeln!(out, "- Total issues: {}", entries.len())?;
    writeln!(out, "- Critical: {}", count(IssueSeverity::Critical))?;
    writeln!(out, "- Errors: {}", count(IssueSeverity::Error))?;
    writeln!(out, "- Warnings: {}", count(IssueSeverity::Warning))?;
    writeln!(out)?;

    writeln!(out, "By category:")?;
    for (category, n) in category_counts(entries) {
        writeln!(out, "- {category}: {n}")?;
    }
    writeln!(out)?;

    // Entries are newest first
    let oldest = entries.last().map(|e| e.timestamp.to_rfc3339());
    let newest = entries.first().map(|e| e.timestamp.to_rfc3339());
    writeln!(
        out,
        "Period: {} - {}",
        oldest.as_deref().unwrap_or("N/A"),
        newest.as_deref().unwrap_or("N/A")
    )?;
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(out)?;
    writeln!(out, "LAST {SUMMARY_RECENT} ISSUES:")?;
    writeln!(out)?;

    for (idx, entry) in entries.iter().take(SUMMARY_RECENT).enumerate() {
        if idx > 0 {
            writeln!(out, "---")?;
        }
        writeln!(
            out,
            "{}. [{}] [{}]",
            idx + 1,
            entry.severity.to_string().to_uppercase(),
            entry.category
        )?;
        writeln!(
            out,
            "   Time: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out, "   Issue: {}", entry.message)?;
        writeln!(out, "   URL: {}", entry.url)?;
        if let Some(context) = &entry.context {
            let compact = serde_json::to_string(context).unwrap_or_default();
            writeln!(out, "   Context: {compact}")?;
        }
        if let Some(stack) = &entry.stack {
            let head: Vec<&str> = stack.lines().take(SUMMARY_STACK_LINES).collect();
            writeln!(out, "   Stack: {}", head.join("\n   "))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "FULL JSON FOR DEVELOPERS:")?;
    writeln!(out, "{full_json}")?;
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(out, "Send this report to support: {SUPPORT_CONTACT}")
}

/// The platform issue log store.
pub type PlatformIssueLog = LogStore<PlatformIssueEntry>;

impl LogStore<PlatformIssueEntry> {
    /// Check if any issue has been recorded.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.is_empty()
    }

    /// Number of recorded issues.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.len()
    }

    /// Record an `error` issue.
    pub fn log_platform_error(
        &self,
        message: impl Into<String>,
        category: IssueCategory,
        context: Option<Context>,
        error: Option<&dyn std::error::Error>,
    ) {
        self.report(message, category, IssueSeverity::Error, context, error);
    }

    /// Record a `critical` issue.
    pub fn log_platform_critical(
        &self,
        message: impl Into<String>,
        category: IssueCategory,
        context: Option<Context>,
        error: Option<&dyn std::error::Error>,
    ) {
        self.report(message, category, IssueSeverity::Critical, context, error);
    }

    /// Record a `warning` issue.
    pub fn log_platform_warning(
        &self,
        message: impl Into<String>,
        category: IssueCategory,
        context: Option<Context>,
    ) {
        self.report(message, category, IssueSeverity::Warning, context, None);
    }

    fn report(
        &self,
        message: impl Into<String>,
        category: IssueCategory,
        severity: IssueSeverity,
        context: Option<Context>,
        error: Option<&dyn std::error::Error>,
    ) {
        self.append(NewPlatformIssue {
            message: message.into(),
            category,
            severity: Some(severity),
            stack: error.map(error_chain),
            context,
        });
    }
}
