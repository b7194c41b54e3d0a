//! The capturing context stamped onto every entry.
//!
//! An entry records when it was captured, where (a location identifier such
//! as a URL or working directory), and by what (an agent string). Stores ask
//! an [`Environment`] for all three at append time.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::config::EnvironmentConfig;

/// Source of the timestamp, location, and agent for new entries.
pub trait Environment: Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Location identifier of the capturing context.
    fn location(&self) -> String;

    /// Agent string of the capturing context.
    fn agent(&self) -> String;
}

/// The running process as the capturing context.
///
/// Location defaults to the working directory as a `file://` URL; agent
/// defaults to `issuelog/<version> (<os>; <arch>)`. Both can be overridden.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment {
    location: Option<String>,
    agent: Option<String>,
}

impl ProcessEnvironment {
    /// Create an environment with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment from configured overrides.
    #[must_use]
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self {
            location: config.location.clone(),
            agent: config.agent.clone(),
        }
    }

    /// Default agent string for this build.
    #[must_use]
    pub fn default_agent() -> String {
        format!(
            "{}/{} ({}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }
}

impl Environment for ProcessEnvironment {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn location(&self) -> String {
        if let Some(location) = &self.location {
            return location.clone();
        }
        std::env::current_dir().map_or_else(
            |_| "file://unknown".to_string(),
            |dir| format!("file://{}", dir.display()),
        )
    }

    fn agent(&self) -> String {
        self.agent.clone().unwrap_or_else(Self::default_agent)
    }
}

/// A pinned capturing context, for tests and scripted replays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedEnvironment {
    /// Timestamp returned by every call to `now`.
    pub now: DateTime<Utc>,
    /// Location identifier.
    pub location: String,
    /// Agent string.
    pub agent: String,
}

impl FixedEnvironment {
    /// Create a fixed environment.
    #[must_use]
    pub fn new(now: DateTime<Utc>, location: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            now,
            location: location.into(),
            agent: agent.into(),
        }
    }
}

impl Environment for FixedEnvironment {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn agent(&self) -> String {
        self.agent.clone()
    }
}
