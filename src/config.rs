//! Engine configuration
//!
//! Defaults reproduce the deployment service's behaviour; every field may be
//! overridden from a JSON document, missing fields keep their default.
//!
//! ```rust
//! use expfactory_credit::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{"credit_countdown_secs": 120}"#)?;
//! assert_eq!(config.credit_countdown().as_secs(), 120);
//! assert_eq!(config.selection_number(), 1);
//! # Ok::<(), expfactory_credit::Error>(())
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyMode;
use crate::{Error, Result};

/// Tunables of the credit engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    selection_number: usize,
    credit_countdown_secs: u64,
    assignment_countdown_secs_per_hour: u64,
    session_gap_minutes: i64,
    dependency_mode: DependencyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection_number: 1,
            credit_countdown_secs: 60,
            assignment_countdown_secs_per_hour: 360,
            session_gap_minutes: 60,
            dependency_mode: DependencyMode::Direct,
        }
    }
}

impl EngineConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed JSON or unknown fields, and
    /// [`Error::Config`] if a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_json_str`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.selection_number == 0 {
            return Err(Error::Config(
                "selection_number must be at least 1".to_string(),
            ));
        }
        if self.session_gap_minutes < 0 {
            return Err(Error::Config(
                "session_gap_minutes must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of experiments selected per step.
    #[must_use]
    pub const fn selection_number(&self) -> usize {
        self.selection_number
    }

    /// Delay before crediting a worker who finished a battery.
    #[must_use]
    pub const fn credit_countdown(&self) -> Duration {
        Duration::from_secs(self.credit_countdown_secs)
    }

    /// Delay before crediting a worker whose assignment of
    /// `duration_hours` may have run out.
    #[must_use]
    pub const fn assignment_countdown(&self, duration_hours: u64) -> Duration {
        Duration::from_secs(self.assignment_countdown_secs_per_hour.saturating_mul(duration_hours))
    }

    /// Idle time after which a visit starts a new worker session.
    #[must_use]
    pub fn session_gap(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_gap_minutes)
    }

    /// How required batteries are followed.
    #[must_use]
    pub const fn dependency_mode(&self) -> DependencyMode {
        self.dependency_mode
    }
}

/// Builder for `EngineConfig`.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    inner: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the number of experiments selected per step.
    #[must_use]
    pub const fn selection_number(mut self, n: usize) -> Self {
        self.inner.selection_number = n;
        self
    }

    /// Set the battery-finished credit countdown.
    #[must_use]
    pub const fn credit_countdown_secs(mut self, secs: u64) -> Self {
        self.inner.credit_countdown_secs = secs;
        self
    }

    /// Set the assignment countdown per hour of assignment duration.
    #[must_use]
    pub const fn assignment_countdown_secs_per_hour(mut self, secs: u64) -> Self {
        self.inner.assignment_countdown_secs_per_hour = secs;
        self
    }

    /// Set the session gap in minutes.
    #[must_use]
    pub const fn session_gap_minutes(mut self, minutes: i64) -> Self {
        self.inner.session_gap_minutes = minutes;
        self
    }

    /// Set the dependency mode.
    #[must_use]
    pub const fn dependency_mode(mut self, mode: DependencyMode) -> Self {
        self.inner.dependency_mode = mode;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is out of range.
    pub fn build(self) -> Result<EngineConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
