//! A stateless-over-the-store log viewer.
//!
//! [`LogViewer`] keeps a snapshot of a store's entries, re-reads it on
//! [`refresh`](LogViewer::refresh), and offers the copy-to-clipboard and
//! clear actions. Every action returns a [`Notification`] describing the
//! outcome; no failure propagates out of the viewer.

use std::fmt::{Debug, Write as _};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clipboard_rs::{Clipboard, ClipboardContext};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::general::{LogEntry, Severity};
use crate::platform::{IssueSeverity, PlatformIssueEntry};
use crate::store::{Context, LogStore, StoredEntry};

const RESET: &str = "\x1b[0m";

/// Display color for an entry, by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Errors and critical issues.
    Red,
    /// Warnings.
    Orange,
    /// Informational entries.
    Blue,
}

impl Tone {
    /// ANSI escape sequence for this tone.
    #[must_use]
    pub fn ansi(self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Orange => "\x1b[33m",
            Self::Blue => "\x1b[34m",
        }
    }
}

/// An entry kind the viewer knows how to present.
pub trait ViewEntry: StoredEntry {
    /// Color for this entry.
    fn tone(&self) -> Tone;

    /// Upper-case heading label, e.g. `ERROR` or `CRITICAL [deployment]`.
    fn heading(&self) -> String;

    /// When the entry was captured.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Short description.
    fn message(&self) -> &str;

    /// Location of the capturing context.
    fn url(&self) -> &str;

    /// Stack text, if any.
    fn stack(&self) -> Option<&str>;

    /// Extra diagnostic fields, if any.
    fn context(&self) -> Option<&Context>;

    /// One-line count summary for a set of entries.
    fn footer(entries: &[Self]) -> String;
}

impl ViewEntry for LogEntry {
    fn tone(&self) -> Tone {
        match self.severity {
            Severity::Error => Tone::Red,
            Severity::Warning => Tone::Orange,
            Severity::Info => Tone::Blue,
        }
    }

    fn heading(&self) -> String {
        self.severity.to_string().to_uppercase()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    fn footer(entries: &[Self]) -> String {
        let count = |s: Severity| entries.iter().filter(|e| e.severity == s).count();
        format!(
            "Total entries: {} | Errors: {} | Warnings: {}",
            entries.len(),
            count(Severity::Error),
            count(Severity::Warning)
        )
    }
}

impl ViewEntry for PlatformIssueEntry {
    fn tone(&self) -> Tone {
        match self.severity {
            IssueSeverity::Critical | IssueSeverity::Error => Tone::Red,
            IssueSeverity::Warning => Tone::Orange,
        }
    }

    fn heading(&self) -> String {
        format!(
            "{} [{}]",
            self.severity.to_string().to_uppercase(),
            self.category
        )
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    fn footer(entries: &[Self]) -> String {
        let count = |s: IssueSeverity| entries.iter().filter(|e| e.severity == s).count();
        format!(
            "Total issues: {} | Critical: {} | Errors: {} | Warnings: {}",
            entries.len(),
            count(IssueSeverity::Critical),
            count(IssueSeverity::Error),
            count(IssueSeverity::Warning)
        )
    }
}

/// Destination for copied summaries.
pub trait ClipboardSink: Debug {
    /// Replace the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    fn write_text(&self, text: &str) -> Result<()>;
}

/// The system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let ctx = ClipboardContext::new().map_err(|e| Error::clipboard(e.to_string()))?;
        ctx.set_text(text.to_string())
            .map_err(|e| Error::clipboard(e.to_string()))
    }
}

/// Whether an action succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The action completed.
    Success,
    /// The action failed.
    Failure,
}

/// Transient user-facing outcome of a viewer action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Outcome.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// One-sentence description.
    pub description: String,
}

impl Notification {
    fn success(title: &str, description: &str) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    fn failure(title: &str, description: String) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.to_string(),
            description,
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// A view over one log store.
#[derive(Debug)]
pub struct LogViewer<E: ViewEntry> {
    store: Arc<LogStore<E>>,
    clipboard: Box<dyn ClipboardSink>,
    entries: Vec<E>,
}

impl<E: ViewEntry> LogViewer<E> {
    /// Create a viewer and take the initial snapshot.
    #[must_use]
    pub fn new(store: Arc<LogStore<E>>, clipboard: Box<dyn ClipboardSink>) -> Self {
        let entries = store.get_all();
        Self {
            store,
            clipboard,
            entries,
        }
    }

    /// Re-read the store.
    pub fn refresh(&mut self) {
        self.entries = self.store.get_all();
        debug!("Viewer refreshed with {} entries", self.entries.len());
    }

    /// The current snapshot, newest first.
    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Entry count for a badge, `None` when there is nothing to show.
    #[must_use]
    pub fn badge(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.entries.len())
    }

    /// Count line for the current snapshot.
    #[must_use]
    pub fn footer(&self) -> String {
        E::footer(&self.entries)
    }

    /// Render the snapshot, one block per entry, tinted by tone when `color`.
    #[must_use]
    pub fn render(&self, color: bool) -> String {
        if self.entries.is_empty() {
            return "No errors detected\n".to_string();
        }

        let mut out = String::new();
        for entry in &self.entries {
            // Writing into a String cannot fail
            let _ = render_entry(&mut out, entry, color);
        }
        out.push_str(&self.footer());
        out.push('\n');
        out
    }

    /// Copy the store's summary to the clipboard.
    pub fn copy_summary(&self) -> Notification {
        let summary = self.store.summarize();
        match self.clipboard.write_text(&summary) {
            Ok(()) => Notification::success(
                "Copied!",
                "Logs copied to the clipboard. Send them to poehali.dev support.",
            ),
            Err(e) => {
                warn!("Failed to copy summary: {}", e);
                Notification::failure("Copy failed", e.to_string())
            }
        }
    }

    /// Clear the store and the snapshot.
    pub fn clear(&mut self) -> Notification {
        self.store.clear();
        self.entries.clear();
        Notification::success("Logs cleared", "All error logs were removed.")
    }
}

fn render_entry<E: ViewEntry>(out: &mut String, entry: &E, color: bool) -> std::fmt::Result {
    let (start, end) = if color {
        (entry.tone().ansi(), RESET)
    } else {
        ("", "")
    };

    writeln!(
        out,
        "{start}{}{end}  {}",
        entry.heading(),
        entry.timestamp().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "  {}", entry.message())?;
    writeln!(out, "  URL: {}", entry.url())?;
    if let Some(context) = entry.context() {
        let pretty = serde_json::to_string_pretty(context).unwrap_or_default();
        writeln!(out, "  Context:")?;
        for line in pretty.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    if let Some(stack) = entry.stack() {
        writeln!(out, "  Stack trace:")?;
        for line in stack.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    writeln!(out)
}
