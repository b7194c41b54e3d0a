//! The application-owned handle to both log stores.
//!
//! Construct one [`Diagnostics`] at startup and pass clones to whatever needs
//! to report. Clones share the same stores.

use std::sync::Arc;

use crate::capture::GlobalCapture;
use crate::config::{CaptureConfig, Config};
use crate::environment::{Environment, ProcessEnvironment};
use crate::error::Result;
use crate::general::GeneralErrorLog;
use crate::platform::PlatformIssueLog;
use crate::storage::{self, SlotStorage};

/// Both log stores, sharing one storage backend and environment.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    general: Arc<GeneralErrorLog>,
    platform: Arc<PlatformIssueLog>,
}

impl Diagnostics {
    /// Open both stores over injected capabilities.
    #[must_use]
    pub fn new(storage: Arc<dyn SlotStorage>, environment: Arc<dyn Environment>) -> Self {
        Self {
            general: Arc::new(GeneralErrorLog::open(
                Arc::clone(&storage),
                Arc::clone(&environment),
            )),
            platform: Arc::new(PlatformIssueLog::open(storage, environment)),
        }
    }

    /// Open both stores over the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be created. Reading the
    /// stored entries never fails.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = storage::open_configured(config)?;
        let environment = Arc::new(ProcessEnvironment::from_config(&config.environment));
        Ok(Self::new(storage, environment))
    }

    /// The general error log.
    #[must_use]
    pub fn general(&self) -> &Arc<GeneralErrorLog> {
        &self.general
    }

    /// The platform issue log.
    #[must_use]
    pub fn platform(&self) -> &Arc<PlatformIssueLog> {
        &self.platform
    }

    /// Wire global capture into the general log as configured.
    #[must_use]
    pub fn attach_global_capture(&self, config: &CaptureConfig) -> GlobalCapture {
        let capture =
            GlobalCapture::new(Arc::clone(&self.general)).with_rejections(config.rejections);
        if config.panics {
            capture.install_panic_hook();
        }
        capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::environment::FixedEnvironment;
    use crate::platform::IssueCategory;
    use crate::storage::MemoryStorage;
    use chrono::Utc;

    fn diagnostics(storage: &MemoryStorage) -> Diagnostics {
        let env = FixedEnvironment::new(Utc::now(), "file:///app", "agent");
        Diagnostics::new(Arc::new(storage.clone()), Arc::new(env))
    }

    #[test]
    fn test_stores_use_separate_slots() {
        let storage = MemoryStorage::new();
        let diag = diagnostics(&storage);

        diag.general().log_warning("general", None);
        diag.platform()
            .log_platform_warning("platform", IssueCategory::Api, None);

        assert_eq!(storage.len(), 2);
        assert_eq!(diag.general().len(), 1);
        assert_eq!(diag.platform().issue_count(), 1);
    }

    #[test]
    fn test_clones_share_stores() {
        let diag = diagnostics(&MemoryStorage::new());
        let clone = diag.clone();

        clone.general().log_info("from clone", None);
        assert_eq!(diag.general().get_all()[0].message, "from clone");
    }

    #[test]
    fn test_open_memory_backend() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        config.environment.location = Some("https://crm.example/".to_string());

        let diag = Diagnostics::open(&config).unwrap();
        diag.general().log_info("opened", None);
        assert_eq!(diag.general().get_all()[0].url, "https://crm.example/");
    }

    #[test]
    fn test_attach_without_panic_hook() {
        let diag = diagnostics(&MemoryStorage::new());
        let capture = diag.attach_global_capture(&CaptureConfig {
            panics: false,
            rejections: true,
        });

        capture.report_rejection("late failure", None);
        assert_eq!(diag.general().len(), 1);
    }
}
