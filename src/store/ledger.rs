//! Credit ledger - concurrent Bonus/Blacklist records per (worker, battery)
//!
//! Records are created lazily on the first reward or violation. Updates go
//! through `DashMap` entries, so the flag count and threshold check of one
//! (worker, battery) pair happen under that entry's lock even when several
//! results of the same worker are evaluated concurrently.

use dashmap::DashMap;

use crate::model::{Blacklist, Bonus, BonusEntry, Flag};

type LedgerKey = (String, u64);

fn key(worker_id: &str, battery_id: u64) -> LedgerKey {
    (worker_id.to_string(), battery_id)
}

/// In-memory Bonus and Blacklist ledger.
#[derive(Debug, Default)]
pub struct CreditLedger {
    bonuses: DashMap<LedgerKey, Bonus>,
    blacklists: DashMap<LedgerKey, Blacklist>,
}

impl CreditLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the bonus entry for `exp_id`.
    pub fn record_bonus(&self, worker_id: &str, battery_id: u64, exp_id: &str, entry: BonusEntry) {
        self.bonuses
            .entry(key(worker_id, battery_id))
            .or_insert_with(|| Bonus::new(worker_id, battery_id))
            .add(exp_id, entry);
    }

    /// Record a violation for `exp_id` and apply the blacklist threshold.
    ///
    /// Returns whether the worker is blacklisted from the battery afterwards.
    pub fn record_violation(
        &self,
        worker_id: &str,
        battery_id: u64,
        exp_id: &str,
        flag: Flag,
        threshold: u32,
    ) -> bool {
        self.blacklists
            .entry(key(worker_id, battery_id))
            .or_insert_with(|| Blacklist::new(worker_id, battery_id))
            .flag(exp_id, flag, threshold)
    }

    /// Snapshot of the bonus record, if any.
    #[must_use]
    pub fn bonus(&self, worker_id: &str, battery_id: u64) -> Option<Bonus> {
        self.bonuses
            .get(&key(worker_id, battery_id))
            .map(|b| b.value().clone())
    }

    /// Mark the bonus as paid out. Returns `false` if no record exists.
    pub fn mark_bonus_granted(&self, worker_id: &str, battery_id: u64) -> bool {
        self.bonuses
            .get_mut(&key(worker_id, battery_id))
            .map(|mut b| b.mark_granted())
            .is_some()
    }

    /// Snapshot of the blacklist record, if any.
    #[must_use]
    pub fn blacklist(&self, worker_id: &str, battery_id: u64) -> Option<Blacklist> {
        self.blacklists
            .get(&key(worker_id, battery_id))
            .map(|b| b.value().clone())
    }

    /// Whether the worker is blacklisted from the battery.
    #[must_use]
    pub fn is_blacklisted(&self, worker_id: &str, battery_id: u64) -> bool {
        self.blacklists
            .get(&key(worker_id, battery_id))
            .is_some_and(|b| b.active())
    }

    /// All blacklist records of a battery, for subject management views.
    #[must_use]
    pub fn blacklists_for_battery(&self, battery_id: u64) -> Vec<Blacklist> {
        self.blacklists
            .iter()
            .filter(|b| b.battery_id() == battery_id)
            .map(|b| b.value().clone())
            .collect()
    }

    /// Drop all records of a deleted battery.
    pub fn remove_battery(&self, battery_id: u64) {
        self.bonuses.retain(|(_, b), _| *b != battery_id);
        self.blacklists.retain(|(_, b), _| *b != battery_id);
    }
}
