//! In-memory stores backing the engine
//!
//! - [`Catalog`]: researcher-defined templates, variables, experiments and
//!   batteries. Read-mostly, edited between deployments.
//! - [`ResultStore`]: workers and their results, written by the sync
//!   endpoint and the credit jobs concurrently.
//! - [`CreditLedger`]: Bonus and Blacklist records.

mod ledger;

pub use ledger::CreditLedger;

use std::collections::HashMap;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::dependency::find_cycle;
use crate::model::{
    Battery, Experiment, ExperimentTemplate, ExperimentVariable, ResultRecord, Worker,
};
use crate::{Error, Result};

/// Researcher-defined deployment catalog.
///
/// Hash maps give O(1) lookups by id; battery experiments keep the order in
/// which they were added to the battery.
#[derive(Debug, Default)]
pub struct Catalog {
    templates: HashMap<String, ExperimentTemplate>,
    variables: HashMap<u64, ExperimentVariable>,
    experiments: HashMap<u64, Experiment>,
    batteries: HashMap<u64, Battery>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
            && self.variables.is_empty()
            && self.experiments.is_empty()
            && self.batteries.is_empty()
    }

    /// Get the number of batteries.
    #[must_use]
    pub fn battery_count(&self) -> usize {
        self.batteries.len()
    }

    /// Add or replace a template.
    pub fn add_template(&mut self, template: ExperimentTemplate) {
        self.templates.insert(template.exp_id().to_string(), template);
    }

    /// Get a template by `exp_id`.
    #[must_use]
    pub fn template(&self, exp_id: &str) -> Option<&ExperimentTemplate> {
        self.templates.get(exp_id)
    }

    /// Add or replace a variable.
    pub fn add_variable(&mut self, variable: ExperimentVariable) {
        self.variables.insert(variable.id(), variable);
    }

    /// Get a variable by id.
    #[must_use]
    pub fn variable(&self, id: u64) -> Option<&ExperimentVariable> {
        self.variables.get(&id)
    }

    /// Delete a variable. Conditions still referencing it no longer match.
    pub fn remove_variable(&mut self, id: u64) -> Option<ExperimentVariable> {
        self.variables.remove(&id)
    }

    /// Add or replace an experiment.
    pub fn add_experiment(&mut self, experiment: Experiment) {
        self.experiments.insert(experiment.id(), experiment);
    }

    /// Get an experiment by id.
    #[must_use]
    pub fn experiment(&self, id: u64) -> Option<&Experiment> {
        self.experiments.get(&id)
    }

    /// Get a mutable experiment by id.
    pub fn experiment_mut(&mut self, id: u64) -> Option<&mut Experiment> {
        self.experiments.get_mut(&id)
    }

    /// Add or replace a battery.
    ///
    /// Requirement cycles are accepted but logged.
    pub fn add_battery(&mut self, battery: Battery) {
        let id = battery.id();
        self.batteries.insert(id, battery);
        if let Some(cycle) = find_cycle(self, id) {
            warn!(battery_id = id, ?cycle, "battery requirements form a cycle");
        }
    }

    /// Get a battery by id.
    #[must_use]
    pub fn battery(&self, id: u64) -> Option<&Battery> {
        self.batteries.get(&id)
    }

    /// Get a battery by id or fail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBattery`] if the battery does not exist.
    pub fn require_battery(&self, id: u64) -> Result<&Battery> {
        self.battery(id).ok_or(Error::UnknownBattery(id))
    }

    /// Delete a battery.
    pub fn remove_battery(&mut self, id: u64) -> Option<Battery> {
        self.batteries.remove(&id)
    }

    /// Experiments currently in a battery, in battery order.
    ///
    /// Ids whose experiment was deleted are skipped.
    #[must_use]
    pub fn battery_experiments(&self, battery: &Battery) -> Vec<&Experiment> {
        battery
            .experiments()
            .iter()
            .filter_map(|id| self.experiments.get(id))
            .collect()
    }

    /// The battery experiment customizing `template_id`, if any.
    #[must_use]
    pub fn experiment_for_template(&self, battery: &Battery, template_id: &str) -> Option<&Experiment> {
        self.battery_experiments(battery)
            .into_iter()
            .find(|e| e.template_id() == template_id)
    }
}

/// Concurrent store of workers and results.
#[derive(Debug, Default)]
pub struct ResultStore {
    workers: DashMap<String, Worker>,
    results: DashMap<u64, ResultRecord>,
}

impl ResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of results.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Record a worker visit, creating the worker on first sight.
    ///
    /// Returns a snapshot of the updated worker.
    pub fn visit(&self, worker_id: &str, session_gap: Duration) -> Worker {
        let mut worker = self
            .workers
            .entry(worker_id.to_string())
            .or_insert_with(|| Worker::new(worker_id));
        worker.record_visit(Utc::now(), session_gap);
        worker.clone()
    }

    /// Get a worker snapshot.
    #[must_use]
    pub fn worker(&self, worker_id: &str) -> Option<Worker> {
        self.workers.get(worker_id).map(|w| w.value().clone())
    }

    /// Add or replace a result.
    pub fn insert(&self, result: ResultRecord) {
        self.results.insert(result.id(), result);
    }

    /// Get a result snapshot.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<ResultRecord> {
        self.results.get(&id).map(|r| r.value().clone())
    }

    /// Get a result snapshot or fail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResult`] if the result does not exist.
    pub fn require(&self, id: u64) -> Result<ResultRecord> {
        self.get(id).ok_or(Error::UnknownResult(id))
    }

    /// Apply `f` to a stored result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResult`] if the result does not exist.
    pub fn update<T>(&self, id: u64, f: impl FnOnce(&mut ResultRecord) -> T) -> Result<T> {
        self.results
            .get_mut(&id)
            .map(|mut r| f(r.value_mut()))
            .ok_or(Error::UnknownResult(id))
    }

    /// All results of a worker, ordered by id.
    #[must_use]
    pub fn for_worker(&self, worker_id: &str) -> Vec<ResultRecord> {
        let mut results: Vec<ResultRecord> = self
            .results
            .iter()
            .filter(|r| r.worker_id() == worker_id)
            .map(|r| r.value().clone())
            .collect();
        results.sort_by_key(ResultRecord::id);
        results
    }

    /// Completed results of a worker, ordered by id.
    #[must_use]
    pub fn completed_for_worker(&self, worker_id: &str) -> Vec<ResultRecord> {
        let mut results = self.for_worker(worker_id);
        results.retain(ResultRecord::completed);
        results
    }

    /// All results of a battery, ordered by id.
    #[must_use]
    pub fn for_battery(&self, battery_id: u64) -> Vec<ResultRecord> {
        let mut results: Vec<ResultRecord> = self
            .results
            .iter()
            .filter(|r| r.battery_id() == battery_id)
            .map(|r| r.value().clone())
            .collect();
        results.sort_by_key(ResultRecord::id);
        results
    }

    /// The worker's result for a template in a battery, if one exists.
    #[must_use]
    pub fn find(&self, worker_id: &str, battery_id: u64, template_id: &str) -> Option<ResultRecord> {
        self.results
            .iter()
            .find(|r| {
                r.worker_id() == worker_id
                    && r.battery_id() == battery_id
                    && r.template_id() == template_id
            })
            .map(|r| r.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_default() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.battery_count(), 0);
    }

    #[test]
    fn test_battery_experiments_skip_deleted() {
        let mut catalog = Catalog::new();
        catalog.add_experiment(Experiment::new(1, "stroop"));
        catalog.add_experiment(Experiment::new(2, "flanker"));
        let battery = Battery::builder(10, "B").experiments([2, 99, 1]).build();
        catalog.add_battery(battery);

        let battery = catalog.require_battery(10).unwrap();
        let ids: Vec<u64> = catalog
            .battery_experiments(battery)
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(
            catalog.experiment_for_template(battery, "stroop").map(Experiment::id),
            Some(1)
        );
        assert!(matches!(catalog.require_battery(11), Err(Error::UnknownBattery(11))));
    }

    #[test]
    fn test_result_store_queries() {
        let store = ResultStore::new();
        store.insert(ResultRecord::new(2, "W1", 1, "flanker"));
        store.insert(ResultRecord::new(1, "W1", 1, "stroop"));
        store.insert(ResultRecord::new(3, "W2", 1, "stroop"));

        store.update(1, |r| r.complete(None)).unwrap();

        assert_eq!(store.result_count(), 3);
        assert_eq!(store.for_worker("W1").len(), 2);
        assert_eq!(store.completed_for_worker("W1").len(), 1);
        assert_eq!(store.for_battery(1).len(), 3);
        assert_eq!(store.find("W2", 1, "stroop").map(|r| r.id()), Some(3));
        assert!(matches!(store.update(9, |_| ()), Err(Error::UnknownResult(9))));
    }

    #[test]
    fn test_visit_creates_worker() {
        let store = ResultStore::new();
        assert!(store.worker("W1").is_none());
        let worker = store.visit("W1", Duration::minutes(60));
        assert_eq!(worker.session_count(), 1);
        store.visit("W1", Duration::minutes(60));
        assert_eq!(store.worker("W1").unwrap().visit_count(), 2);
    }
}
