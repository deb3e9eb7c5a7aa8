//! Bonus - per (worker, battery) accumulator of granted amounts

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// One experiment's bonus grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusEntry {
    /// Experiment (experiment-in-battery) id.
    pub experiment_id: u64,
    /// Human-readable reason, e.g. `avg_rt 556.3 LESSTHAN 600`.
    pub description: String,
    /// Amount in dollars.
    pub amount: f64,
}

/// Bonus amounts for a worker in a battery, keyed by template `exp_id`.
///
/// Writing an entry for an `exp_id` overwrites the previous one, so
/// re-evaluating a result never double-counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    worker_id: String,
    battery_id: u64,
    amounts: BTreeMap<String, BonusEntry>,
    granted: bool,
}

impl Bonus {
    /// Create an empty bonus record.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, battery_id: u64) -> Self {
        Self {
            worker_id: worker_id.into(),
            battery_id,
            amounts: BTreeMap::new(),
            granted: false,
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

    /// Get the entries keyed by template `exp_id`.
    #[must_use]
    pub const fn amounts(&self) -> &BTreeMap<String, BonusEntry> {
        &self.amounts
    }

    /// Whether the bonus has been paid out.
    #[must_use]
    pub const fn granted(&self) -> bool {
        self.granted
    }

    /// Insert or overwrite the entry for `exp_id`.
    pub fn add(&mut self, exp_id: impl Into<String>, entry: BonusEntry) {
        self.amounts.insert(exp_id.into(), entry);
    }

    /// Mark the bonus as paid out.
    pub fn mark_granted(&mut self) {
        self.granted = true;
    }

    /// Total bonus in dollars across all experiments.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.amounts.values().map(|e| e.amount).sum()
    }

    /// Message explaining the bonus to the worker, one line per experiment.
    #[must_use]
    pub fn reason(&self) -> String {
        let mut reason = String::new();
        for (exp_id, entry) in &self.amounts {
            let _ = writeln!(
                reason,
                "{exp_id}: granted ${} because {}",
                entry.amount, entry.description
            );
        }
        reason
    }
}
