//! Blacklist - per (worker, battery) record of rejection violations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One experiment's rejection violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// Experiment (experiment-in-battery) id.
    pub experiment_id: u64,
    /// Human-readable violation, e.g. `credit_var true EQUALS true`.
    pub description: String,
}

/// Flags for a worker in a battery, keyed by template `exp_id`.
///
/// Once `active` is set it is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blacklist {
    worker_id: String,
    battery_id: u64,
    flags: BTreeMap<String, Flag>,
    active: bool,
    blacklist_time: Option<DateTime<Utc>>,
}

impl Blacklist {
    /// Create an empty, inactive blacklist record.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, battery_id: u64) -> Self {
        Self {
            worker_id: worker_id.into(),
            battery_id,
            flags: BTreeMap::new(),
            active: false,
            blacklist_time: None,
        }
    }

    /// Get the worker ID.
    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Get the battery ID.
    #[must_use]
    pub const fn battery_id(&self) -> u64 {
        self.battery_id
    }

    /// Get the flags keyed by template `exp_id`.
    #[must_use]
    pub const fn flags(&self) -> &BTreeMap<String, Flag> {
        &self.flags
    }

    /// Whether the worker is blacklisted from the battery.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    /// When the blacklist was (last) stamped active.
    #[must_use]
    pub const fn blacklist_time(&self) -> Option<DateTime<Utc>> {
        self.blacklist_time
    }

    /// Insert or overwrite the flag for `exp_id`, then activate the
    /// blacklist if the number of flagged experiments exceeds `threshold`.
    ///
    /// Returns whether the blacklist is active afterwards.
    pub fn flag(&mut self, exp_id: impl Into<String>, flag: Flag, threshold: u32) -> bool {
        self.flags.insert(exp_id.into(), flag);
        if self.flags.len() > threshold as usize {
            self.active = true;
            self.blacklist_time = Some(Utc::now());
        }
        self.active
    }
}
