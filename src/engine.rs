//! The credit engine: deployment steps, result completion and job processing
//!
//! [`Engine`] ties the catalog, the result store and the credit ledger
//! together. Request handlers call [`Engine::next_experiments`] to decide
//! what a worker sees next and [`Engine::finish_result`] when an experiment
//! ends; credit work is deferred through the configured [`JobQueue`].

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::credit::{CreditEvaluator, CreditOutcome};
use crate::dependency;
use crate::jobs::{Job, JobQueue, LaborMarket, ScheduledJob};
use crate::model::{Battery, Experiment, ResultRecord};
use crate::select::select_experiments;
use crate::store::{Catalog, CreditLedger, ResultStore};
use crate::Result;

/// What a worker should be shown next in a battery.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// The worker may not take the battery yet (or at all).
    Blocked {
        /// Required batteries the worker has not completed
        missing: Vec<Battery>,
        /// Restricted batteries the worker has completed
        blocking: Vec<Battery>,
    },
    /// The worker is blacklisted from the battery.
    Blacklisted,
    /// Every experiment of the battery is completed.
    BatteryComplete,
    /// Present these experiments.
    Present(Vec<Experiment>),
}

/// Credit engine over in-memory stores.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    results: ResultStore,
    ledger: CreditLedger,
    queue: Option<Arc<dyn JobQueue>>,
}

impl Engine {
    /// Create an engine with empty stores and no job queue.
    ///
    /// Without a queue, blacklist and reward evaluation run inline and
    /// marketplace jobs are skipped.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            catalog: Catalog::new(),
            results: ResultStore::new(),
            ledger: CreditLedger::new(),
            queue: None,
        }
    }

    /// Use `catalog` instead of an empty one.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Defer credit work through `queue`.
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Templates, variables, experiments and batteries.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Mutable catalog, for setup before the engine is shared.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Workers and results.
    #[must_use]
    pub const fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Bonus and blacklist records.
    #[must_use]
    pub const fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Delete a battery together with its bonus and blacklist records.
    ///
    /// Results of the battery are kept; they are skipped wherever the
    /// battery is looked up.
    pub fn delete_battery(&mut self, battery_id: u64) -> Option<Battery> {
        self.ledger.remove_battery(battery_id);
        self.catalog.remove_battery(battery_id)
    }

    /// Decide the next deployment step of a worker in a battery.
    ///
    /// Records the visit, then checks dependencies, the blacklist and the
    /// remaining experiments, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownBattery`] if the battery does not exist.
    pub fn next_experiments<R: Rng + ?Sized>(
        &self,
        worker_id: &str,
        battery_id: u64,
        rng: &mut R,
    ) -> Result<NextStep> {
        let battery = self.catalog.require_battery(battery_id)?;
        self.results.visit(worker_id, self.config.session_gap());

        let worker_results = self.results.for_worker(worker_id);
        let dependencies = dependency::check(
            &self.catalog,
            battery,
            &worker_results,
            self.config.dependency_mode(),
        );
        if !dependencies.may_proceed() {
            debug!(
                worker_id,
                battery_id,
                missing = dependencies.missing.len(),
                blocking = dependencies.blocking.len(),
                "battery dependencies not met"
            );
            return Ok(NextStep::Blocked {
                missing: dependencies.missing,
                blocking: dependencies.blocking,
            });
        }

        if self.ledger.is_blacklisted(worker_id, battery_id) {
            return Ok(NextStep::Blacklisted);
        }

        let candidates = self.worker_experiments(worker_id, battery_id, false)?;
        if candidates.is_empty() {
            return Ok(NextStep::BatteryComplete);
        }

        let selected = select_experiments(
            battery.presentation_order(),
            &candidates,
            self.config.selection_number(),
            rng,
        );
        Ok(NextStep::Present(selected.into_iter().cloned().collect()))
    }

    /// The battery's experiments the worker has (`completed = true`) or has
    /// not (`completed = false`) completed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownBattery`] if the battery does not exist.
    pub fn worker_experiments(
        &self,
        worker_id: &str,
        battery_id: u64,
        completed: bool,
    ) -> Result<Vec<&Experiment>> {
        let battery = self.catalog.require_battery(battery_id)?;
        let results = self.results.completed_for_worker(worker_id);
        let done: HashSet<&str> = results
            .iter()
            .filter(|r| r.battery_id() == battery_id)
            .map(|r| r.template_id())
            .collect();

        Ok(self
            .catalog
            .battery_experiments(battery)
            .into_iter()
            .filter(|e| done.contains(e.template_id()) == completed)
            .collect())
    }

    /// Mark a result completed and schedule its credit work.
    ///
    /// Blacklist and reward evaluation are submitted immediately; once the
    /// worker has completed the whole battery, assignment credit follows
    /// after the configured countdown. Finishing an already completed
    /// result schedules nothing.
    ///
    /// Returns whether the worker has now completed the battery. A result
    /// whose battery was deleted is completed but never credited.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownResult`] if the result does not exist
    /// and [`crate::Error::QueueClosed`] if the queue is gone.
    pub fn finish_result(&self, result_id: u64, version: Option<&str>) -> Result<bool> {
        let (result, newly_completed) = self.results.update(result_id, |r| {
            let newly_completed = !r.completed();
            r.complete(version);
            (r.clone(), newly_completed)
        })?;
        let worker_id = result.worker_id();
        let battery_id = result.battery_id();
        info!(result_id, worker_id, exp_id = result.template_id(), "result completed");

        if self.catalog.battery(battery_id).is_none() {
            debug!(result_id, battery_id, "result of a deleted battery, no credit");
            return Ok(false);
        }
        let battery_complete = self.worker_experiments(worker_id, battery_id, false)?.is_empty();
        if !newly_completed {
            debug!(result_id, "result already completed, nothing scheduled");
            return Ok(battery_complete);
        }

        self.submit(ScheduledJob::now(Job::CheckBlacklist { result_id }))?;
        self.submit(ScheduledJob::now(Job::ExperimentReward { result_id }))?;
        if battery_complete {
            self.submit(ScheduledJob::after(
                Job::AssignExperimentCredit {
                    worker_id: worker_id.to_string(),
                    battery_id,
                },
                self.config.credit_countdown(),
            ))?;
        }
        Ok(battery_complete)
    }

    /// Schedule assignment credit for when an accepted assignment of
    /// `duration_hours` may have expired.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownBattery`] if the battery does not exist
    /// and [`crate::Error::QueueClosed`] if the queue is gone.
    pub fn accept_assignment(&self, worker_id: &str, battery_id: u64, duration_hours: u64) -> Result<()> {
        self.catalog.require_battery(battery_id)?;
        self.submit(ScheduledJob::after(
            Job::AssignExperimentCredit {
                worker_id: worker_id.to_string(),
                battery_id,
            },
            self.config.assignment_countdown(duration_hours),
        ))
    }

    /// Evaluate rejection conditions of a stored result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownResult`] if the result does not exist.
    pub fn check_blacklist(&self, result_id: u64) -> Result<CreditOutcome> {
        let result = self.results.require(result_id)?;
        Ok(self.evaluator().check_blacklist(&result))
    }

    /// Evaluate performance conditions of a stored result and mark it
    /// `credit_granted` when a bonus was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownResult`] if the result does not exist.
    pub fn experiment_reward(&self, result_id: u64) -> Result<CreditOutcome> {
        let result = self.results.require(result_id)?;
        let outcome = self.evaluator().experiment_reward(&result);
        if outcome.credit_granted() {
            self.results.update(result_id, ResultRecord::grant_credit)?;
        }
        Ok(outcome)
    }

    /// Approve the worker's submitted assignment and pay the bonus.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LaborMarket`] if the marketplace call fails.
    pub async fn assign_experiment_credit<M: LaborMarket>(
        &self,
        worker_id: &str,
        battery_id: u64,
        market: &M,
    ) -> Result<()> {
        if market.approve_assignment(worker_id, battery_id).await? {
            info!(worker_id, battery_id, "assignment approved");
            self.grant_bonus(worker_id, battery_id, market).await?;
        } else {
            debug!(worker_id, battery_id, "no submitted assignment to approve");
        }
        Ok(())
    }

    /// Pay the worker's accumulated bonus for a battery once.
    ///
    /// Returns the amount paid, or `None` if there was nothing to pay.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LaborMarket`] if the payment fails; the bonus
    /// then stays unpaid.
    pub async fn grant_bonus<M: LaborMarket>(
        &self,
        worker_id: &str,
        battery_id: u64,
        market: &M,
    ) -> Result<Option<f64>> {
        let Some(bonus) = self.ledger.bonus(worker_id, battery_id) else {
            return Ok(None);
        };
        if bonus.granted() {
            debug!(worker_id, battery_id, "bonus already granted");
            return Ok(None);
        }
        let amount = bonus.total();
        if amount <= 0.0 {
            return Ok(None);
        }

        market
            .grant_bonus(worker_id, battery_id, amount, &bonus.reason())
            .await?;
        self.ledger.mark_bonus_granted(worker_id, battery_id);
        info!(worker_id, battery_id, amount, "bonus granted");
        Ok(Some(amount))
    }

    /// Run one job.
    ///
    /// # Errors
    ///
    /// Propagates the job's failure.
    pub async fn process<M: LaborMarket>(&self, job: &Job, market: &M) -> Result<()> {
        debug!(%job, "processing job");
        match job {
            Job::CheckBlacklist { result_id } => self.check_blacklist(*result_id).map(drop),
            Job::ExperimentReward { result_id } => self.experiment_reward(*result_id).map(drop),
            Job::AssignExperimentCredit {
                worker_id,
                battery_id,
            } => {
                self.assign_experiment_credit(worker_id, *battery_id, market)
                    .await
            }
            Job::UpdateAssignments { hit_id } => market.update_assignments(hit_id).await,
        }
    }

    fn evaluator(&self) -> CreditEvaluator<'_> {
        CreditEvaluator::new(&self.catalog, &self.ledger)
    }

    fn submit(&self, scheduled: ScheduledJob) -> Result<()> {
        if let Some(queue) = &self.queue {
            return queue.submit(scheduled);
        }
        match scheduled.job {
            Job::CheckBlacklist { result_id } => self.check_blacklist(result_id).map(drop),
            Job::ExperimentReward { result_id } => self.experiment_reward(result_id).map(drop),
            job => {
                debug!(%job, "no job queue configured, skipping");
                Ok(())
            }
        }
    }
}
