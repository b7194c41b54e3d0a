//! The general error log.
//!
//! Holds uncaught failures captured globally plus anything application code
//! reports through [`GeneralErrorLog::log_error`] and friends.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{error_chain, Captured, Context, LogStore, StoredEntry};

/// Durable slot for the general log.
pub const STORAGE_KEY: &str = "poehali_error_logs";

/// Maximum entries retained by the general log.
pub const CAPACITY: usize = 100;

/// Entries listed individually in the summary.
pub const SUMMARY_RECENT: usize = 10;

/// How serious a general log entry is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A failure.
    #[default]
    Error,
    /// Something suspicious that did not fail.
    Warning,
    /// Informational.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// One captured error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was captured.
    pub timestamp: DateTime<Utc>,
    /// Short description.
    pub message: String,
    /// Multi-line stack or cause chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Location of the capturing context.
    pub url: String,
    /// Agent string of the capturing context.
    #[serde(alias = "userAgent")]
    pub agent: String,
    /// Severity.
    pub severity: Severity,
    /// Extra diagnostic fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

/// Caller-supplied fields for a new [`LogEntry`].
///
/// A missing severity becomes [`Severity::Error`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLogEntry {
    /// Short description.
    pub message: String,
    /// Stack or cause chain.
    pub stack: Option<String>,
    /// Severity, `error` when absent.
    pub severity: Option<Severity>,
    /// Extra diagnostic fields.
    pub context: Option<Context>,
}

impl NewLogEntry {
    /// Fields with just a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the severity.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
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

impl StoredEntry for LogEntry {
    type Fields = NewLogEntry;
    const STORAGE_KEY: &'static str = STORAGE_KEY;
    const CAPACITY: usize = CAPACITY;
    const CONSOLE_TAG: &'static str = "[ErrorLogger]";

    fn build(fields: NewLogEntry, captured: Captured) -> Self {
        Self {
            timestamp: captured.timestamp,
            message: fields.message,
            stack: fields.stack,
            url: captured.url,
            agent: captured.agent,
            severity: fields.severity.unwrap_or_default(),
            context: fields.context,
        }
    }

    fn summarize(entries: &[Self], full_json: &str) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write_summary(&mut out, entries, full_json);
        out
    }
}

fn write_summary(out: &mut String, entries: &[LogEntry], full_json: &str) -> std::fmt::Result {
    let count = |severity: Severity| entries.iter().filter(|e| e.severity == severity).count();

    writeln!(out, "=== POEHALI.DEV ERROR LOGS ===")?;
    writeln!(out, "Total entries: {}", entries.len())?;
    writeln!(out, "Errors: {}", count(Severity::Error))?;
    writeln!(out, "Warnings: {}", count(Severity::Warning))?;
    writeln!(out, "Info: {}", count(Severity::Info))?;
    writeln!(out)?;
    writeln!(out, "Last {SUMMARY_RECENT} entries:")?;

    for (idx, entry) in entries.iter().take(SUMMARY_RECENT).enumerate() {
        writeln!(
            out,
            "{}. [{}] {}",
            idx + 1,
            entry.severity.to_string().to_uppercase(),
            entry.timestamp.to_rfc3339()
        )?;
        writeln!(out, "   {}", entry.message)?;
        writeln!(out, "   URL: {}", entry.url)?;
        if let Some(first) = entry.stack.as_deref().and_then(|s| s.lines().next()) {
            writeln!(out, "   Stack: {first}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Full log (JSON):")?;
    writeln!(out, "{full_json}")
}

/// The general error log store.
pub type GeneralErrorLog = LogStore<LogEntry>;

impl LogStore<LogEntry> {
    /// Record an error, with the error's cause chain as stack when given.
    pub fn log_error(
        &self,
        message: impl Into<String>,
        error: Option<&dyn std::error::Error>,
        context: Option<Context>,
    ) {
        self.append(NewLogEntry {
            message: message.into(),
            stack: error.map(error_chain),
            severity: Some(Severity::Error),
            context,
        });
    }

    /// Record a warning.
    pub fn log_warning(&self, message: impl Into<String>, context: Option<Context>) {
        self.append(NewLogEntry {
            message: message.into(),
            stack: None,
            severity: Some(Severity::Warning),
            context,
        });
    }

    /// Record an informational entry.
    pub fn log_info(&self, message: impl Into<String>, context: Option<Context>) {
        self.append(NewLogEntry {
            message: message.into(),
            stack: None,
            severity: Some(Severity::Info),
            context,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::FixedEnvironment;
    use crate::storage::{MemoryStorage, SlotStorage};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn open(storage: &MemoryStorage) -> GeneralErrorLog {
        let at = Utc.with_ymd_and_hms(2024, 2, 10, 9, 15, 0).unwrap();
        let env = FixedEnvironment::new(at, "https://crm.example/orders", "Mozilla/5.0 test");
        GeneralErrorLog::open(Arc::new(storage.clone()), Arc::new(env))
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        assert_eq!(Severity::default(), Severity::Error);
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn test_append_defaults_severity_to_error() {
        let log = open(&MemoryStorage::new());
        log.append(NewLogEntry::new("Failed to load contractors"));

        let entry = &log.get_all()[0];
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.message, "Failed to load contractors");
        assert_eq!(entry.url, "https://crm.example/orders");
        assert_eq!(entry.agent, "Mozilla/5.0 test");
        assert!(entry.stack.is_none());
    }

    #[test]
    fn test_log_helpers_set_severity() {
        let log = open(&MemoryStorage::new());
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "lookup timed out");
        log.log_error("Driver lookup failed", Some(&io), None);
        log.log_warning("Slow response", None);
        log.log_info("Form opened", None);

        let severities: Vec<Severity> = log.get_all().iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Info, Severity::Warning, Severity::Error]
        );
        assert_eq!(log.get_all()[2].stack.as_deref(), Some("lookup timed out"));
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let log = open(&MemoryStorage::new());
        log.append(NewLogEntry::new("plain"));

        let json = log.export_as_json();
        assert!(!json.contains("stack"));
        assert!(!json.contains("context"));
        assert!(json.contains("\"agent\""));
    }

    #[test]
    fn test_deserialize_legacy_user_agent_key() {
        let raw = r#"[{
            "timestamp": "2024-01-01T00:00:00.000Z",
            "message": "legacy",
            "url": "https://crm.example/",
            "userAgent": "Mozilla/5.0",
            "severity": "warning"
        }]"#;
        let storage = MemoryStorage::new();
        storage.write(STORAGE_KEY, raw).unwrap();

        let log = open(&storage);
        let entries = log.get_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].agent, "Mozilla/5.0");
        assert_eq!(entries[0].severity, Severity::Warning);
    }

    #[test]
    fn test_summary_lists_counts_and_recent_entries() {
        let log = open(&MemoryStorage::new());
        log.append(NewLogEntry::new("first").stack("TypeError: x is undefined\n    at a.js:1"));
        log.log_warning("second", None);
        log.log_info("third", None);

        let summary = log.summarize();
        assert!(summary.starts_with("=== POEHALI.DEV ERROR LOGS ==="));
        assert!(summary.contains("Total entries: 3\n"));
        assert!(summary.contains("Errors: 1\n"));
        assert!(summary.contains("Warnings: 1\n"));
        assert!(summary.contains("Info: 1\n"));
        assert!(summary.contains("1. [INFO] 2024-02-10T09:15:00+00:00"));
        assert!(summary.contains("   Stack: TypeError: x is undefined\n"));
        assert!(!summary.contains("at a.js:1\n   URL"));
        assert!(summary.contains("Full log (JSON):"));
        assert!(summary.trim_end().ends_with(log.export_as_json().trim_end()));
    }

    #[test]
    fn test_summary_lists_at_most_ten() {
        let log = open(&MemoryStorage::new());
        for i in 0..12 {
            log.log_info(format!("entry {i}"), None);
        }

        let summary = log.summarize();
        assert!(summary.contains("\n10. [INFO]"));
        assert!(!summary.contains("\n11. [INFO]"));
    }

    #[test]
    fn test_context_round_trips() {
        let log = open(&MemoryStorage::new());
        let mut context = Context::new();
        context.insert("orderId".to_string(), json!(42));
        context.insert("fields".to_string(), json!(["inn", "kpp"]));
        log.log_error("Validation failed", None, Some(context.clone()));

        let parsed: Vec<LogEntry> = serde_json::from_str(&log.export_as_json()).unwrap();
        assert_eq!(parsed[0].context.as_ref(), Some(&context));
    }
}
