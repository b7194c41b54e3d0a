//! Global failure capture into the general log.
//!
//! Two kinds of failure are captured without the failing code reporting them:
//! panics (through a process-wide panic hook) and background tasks that finish
//! with an error (through [`GlobalCapture::spawn`]). Wiring is explicit: call
//! [`attach_global_capture`] once at startup.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Display;
use std::future::Future;
use std::panic;
use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::general::{GeneralErrorLog, NewLogEntry, Severity};
use crate::store::{mutating_on_current_thread, Context};

/// Install the panic hook and return a handle for reporting rejections.
///
/// The previously installed panic hook still runs after each capture.
#[must_use]
pub fn attach_global_capture(store: Arc<GeneralErrorLog>) -> GlobalCapture {
    let capture = GlobalCapture::new(store);
    capture.install_panic_hook();
    capture
}

/// Handle for routing uncaught failures into the general log.
#[derive(Debug, Clone)]
pub struct GlobalCapture {
    store: Arc<GeneralErrorLog>,
    rejections: bool,
}

impl GlobalCapture {
    /// Create a handle without installing the panic hook.
    #[must_use]
    pub fn new(store: Arc<GeneralErrorLog>) -> Self {
        Self {
            store,
            rejections: true,
        }
    }

    /// Enable or disable recording of rejections.
    ///
    /// Disabled rejections still reach the diagnostic channel.
    #[must_use]
    pub fn with_rejections(mut self, enabled: bool) -> Self {
        self.rejections = enabled;
        self
    }

    /// The store captures are written to.
    #[must_use]
    pub fn store(&self) -> &Arc<GeneralErrorLog> {
        &self.store
    }

    /// Chain a panic hook that records each panic as an `error` entry.
    pub fn install_panic_hook(&self) {
        let store = Arc::clone(&self.store);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let message = panic_message(info.payload());

            if mutating_on_current_thread() {
                // The store is mid-update on this thread; don't re-enter it
                error!("panic during log store mutation: {}", message);
            } else {
                let mut context = Context::new();
                if let Some(location) = info.location() {
                    context.insert("location".to_string(), json!(location.to_string()));
                }
                context.insert(
                    "thread".to_string(),
                    json!(std::thread::current().name().unwrap_or("<unnamed>")),
                );

                let backtrace = Backtrace::capture();
                let stack = (backtrace.status() == BacktraceStatus::Captured)
                    .then(|| backtrace.to_string());

                store.append(NewLogEntry {
                    message,
                    stack,
                    severity: Some(Severity::Error),
                    context: Some(context),
                });
            }

            previous(info);
        }));
    }

    /// Record an operation that failed with nobody handling the failure.
    pub fn report_rejection(&self, reason: impl Display, stack: Option<String>) {
        let message = format!("Unhandled rejection: {reason}");
        if !self.rejections {
            warn!("{}", message);
            return;
        }
        self.store.append(NewLogEntry {
            message,
            stack,
            severity: Some(Severity::Error),
            context: None,
        });
    }

    /// Spawn a fallible task whose error is recorded as a rejection.
    ///
    /// The handle resolves to `None` when the task failed. Panics inside the
    /// task are left to the panic hook.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, T, E>(&self, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let capture = self.clone();
        tokio::spawn(async move {
            match future.await {
                Ok(value) => Some(value),
                Err(e) => {
                    capture.report_rejection(e, None);
                    None
                }
            }
        })
    }
}

/// Extract the message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::FixedEnvironment;
    use crate::storage::MemoryStorage;
    use chrono::Utc;

    fn store() -> Arc<GeneralErrorLog> {
        let env = FixedEnvironment::new(Utc::now(), "file:///srv/app", "agent");
        Arc::new(GeneralErrorLog::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(env),
        ))
    }

    #[test]
    fn test_panic_message_str_and_string() {
        let s: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(s.as_ref()), "static str");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "Box<dyn Any>");
    }

    #[test]
    fn test_report_rejection_records_error() {
        let capture = GlobalCapture::new(store());
        capture.report_rejection("connection reset", Some("at fetch".to_string()));

        let entries = capture.store().get_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Unhandled rejection: connection reset");
        assert_eq!(entries[0].severity, Severity::Error);
        assert_eq!(entries[0].stack.as_deref(), Some("at fetch"));
    }

    #[test]
    fn test_disabled_rejections_are_not_stored() {
        let capture = GlobalCapture::new(store()).with_rejections(false);
        capture.report_rejection("ignored", None);
        assert!(capture.store().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_records_failed_task() {
        let capture = GlobalCapture::new(store());

        let failed = capture
            .spawn(async { Err::<u32, _>("address lookup failed") })
            .await
            .unwrap();
        let ok = capture.spawn(async { Ok::<_, String>(5) }).await.unwrap();

        assert_eq!(failed, None);
        assert_eq!(ok, Some(5));
        let entries = capture.store().get_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].message,
            "Unhandled rejection: address lookup failed"
        );
    }
}
