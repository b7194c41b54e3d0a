//! `issuelog` - Persisted, bounded error and platform-issue logs
//!
//! Two stores keep the most recent entries newest-first and mirror them into
//! durable slot storage: a general error log fed by global panic and
//! rejection capture, and a platform issue log for categorized operational
//! problems. Both render a human-readable support report.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod general;
pub mod logging;
pub mod platform;
pub mod storage;
pub mod store;
pub mod viewer;

pub use capture::{attach_global_capture, GlobalCapture};
pub use config::Config;
pub use diagnostics::Diagnostics;
pub use environment::{Environment, FixedEnvironment, ProcessEnvironment};
pub use error::{Error, Result};
pub use general::{GeneralErrorLog, LogEntry, NewLogEntry, Severity};
pub use logging::init_logging;
pub use platform::{
    IssueCategory, IssueSeverity, NewPlatformIssue, PlatformIssueEntry, PlatformIssueLog,
};
pub use storage::{FileStorage, MemoryStorage, SlotStorage, SqliteStorage};
pub use store::{Context, LogStore, StoredEntry};
pub use viewer::{ClipboardSink, LogViewer, Notification, SystemClipboard};
