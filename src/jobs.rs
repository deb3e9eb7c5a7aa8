//! Deferred credit jobs and the labor-market collaborator
//!
//! Finishing a result or accepting an assignment does not evaluate credit
//! inline; the engine submits [`ScheduledJob`]s to a [`JobQueue`]. A
//! [`JobRunner`] drains the queue, waits out each job's countdown and hands
//! the job back to the [`Engine`] for processing.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use expfactory_credit::jobs::{ChannelJobQueue, JobRunner, LaborMarket};
//! use expfactory_credit::{Engine, EngineConfig};
//!
//! # async fn example<M: LaborMarket + 'static>(market: M) {
//! let (queue, receiver) = ChannelJobQueue::channel();
//! let engine = Arc::new(Engine::new(EngineConfig::default()).with_queue(Arc::new(queue)));
//! let runner = JobRunner::new(Arc::clone(&engine), Arc::new(market), receiver);
//! tokio::spawn(runner.run());
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::{Error, Result};

/// A unit of deferred credit work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
    /// Evaluate rejection conditions for a finished result.
    CheckBlacklist {
        /// Result to evaluate
        result_id: u64,
    },
    /// Evaluate performance conditions for a finished result.
    ExperimentReward {
        /// Result to evaluate
        result_id: u64,
    },
    /// Approve the worker's submitted assignment and pay any bonus.
    AssignExperimentCredit {
        /// Worker to credit
        worker_id: String,
        /// Battery the worker took
        battery_id: u64,
    },
    /// Refresh assignment state of a HIT from the marketplace.
    UpdateAssignments {
        /// Marketplace HIT identifier
        hit_id: String,
    },
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckBlacklist { result_id } => write!(f, "check_blacklist({result_id})"),
            Self::ExperimentReward { result_id } => write!(f, "experiment_reward({result_id})"),
            Self::AssignExperimentCredit {
                worker_id,
                battery_id,
            } => write!(f, "assign_experiment_credit({worker_id}, {battery_id})"),
            Self::UpdateAssignments { hit_id } => write!(f, "update_assignments({hit_id})"),
        }
    }
}

/// A job with the delay to wait before running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    /// The job
    pub job: Job,
    /// Delay before the job runs
    pub countdown: Duration,
}

impl ScheduledJob {
    /// Schedule `job` to run as soon as possible.
    #[must_use]
    pub const fn now(job: Job) -> Self {
        Self {
            job,
            countdown: Duration::ZERO,
        }
    }

    /// Schedule `job` to run after `countdown`.
    #[must_use]
    pub const fn after(job: Job, countdown: Duration) -> Self {
        Self { job, countdown }
    }
}

/// Destination for deferred jobs.
pub trait JobQueue: Send + Sync + fmt::Debug {
    /// Enqueue a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if nothing drains the queue anymore.
    fn submit(&self, job: ScheduledJob) -> Result<()>;
}

/// `JobQueue` backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::UnboundedSender<ScheduledJob>,
}

impl ChannelJobQueue {
    /// Create a queue and the receiver a [`JobRunner`] drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScheduledJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobQueue for ChannelJobQueue {
    fn submit(&self, job: ScheduledJob) -> Result<()> {
        debug!(job = %job.job, countdown_secs = job.countdown.as_secs(), "job submitted");
        self.sender.send(job).map_err(|_| Error::QueueClosed)
    }
}

/// The crowdsourcing marketplace (assignments, approvals, bonus payments).
///
/// Only the interface lives here; deployments plug in their marketplace
/// client.
pub trait LaborMarket: Send + Sync {
    /// Approve the worker's submitted assignment for the battery.
    ///
    /// Returns `true` if an assignment was approved by this call.
    fn approve_assignment(
        &self,
        worker_id: &str,
        battery_id: u64,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Pay a bonus for an approved assignment.
    fn grant_bonus(
        &self,
        worker_id: &str,
        battery_id: u64,
        amount: f64,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Refresh the assignments of a HIT.
    fn update_assignments(&self, hit_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Drains a [`ChannelJobQueue`] and processes jobs against an [`Engine`].
#[derive(Debug)]
pub struct JobRunner<M> {
    engine: Arc<Engine>,
    market: Arc<M>,
    receiver: mpsc::UnboundedReceiver<ScheduledJob>,
}

impl<M: LaborMarket + 'static> JobRunner<M> {
    /// Create a runner.
    #[must_use]
    pub const fn new(
        engine: Arc<Engine>,
        market: Arc<M>,
        receiver: mpsc::UnboundedReceiver<ScheduledJob>,
    ) -> Self {
        Self {
            engine,
            market,
            receiver,
        }
    }

    /// Run until every queue handle is dropped and all delayed jobs have
    /// finished. An engine built with this runner's queue keeps a handle, so
    /// this normally runs for the life of the process.
    ///
    /// Jobs without a countdown run in submission order; delayed jobs wait
    /// out their countdown on their own task and are reaped as they finish.
    ///
    /// Returns the number of jobs that failed.
    pub async fn run(mut self) -> usize {
        let mut delayed = JoinSet::new();
        let mut failed = 0;
        loop {
            tokio::select! {
                scheduled = self.receiver.recv() => {
                    let Some(scheduled) = scheduled else {
                        break;
                    };
                    failed += dispatch(&self.engine, &self.market, &mut delayed, scheduled).await;
                }
                Some(done) = delayed.join_next(), if !delayed.is_empty() => {
                    failed += usize::from(!matches!(done, Ok(true)));
                }
            }
        }
        debug!(pending = delayed.len(), "job queue closed");
        failed + join_all(&mut delayed).await
    }

    /// Process every job queued so far, including jobs those jobs submit,
    /// then return.
    ///
    /// Returns the number of jobs that failed.
    pub async fn run_until_idle(&mut self) -> usize {
        let mut failed = 0;
        loop {
            let mut delayed = JoinSet::new();
            let mut drained = false;
            while let Ok(scheduled) = self.receiver.try_recv() {
                drained = true;
                failed += dispatch(&self.engine, &self.market, &mut delayed, scheduled).await;
            }
            if !drained {
                return failed;
            }
            failed += join_all(&mut delayed).await;
        }
    }
}

async fn dispatch<M: LaborMarket + 'static>(
    engine: &Arc<Engine>,
    market: &Arc<M>,
    delayed: &mut JoinSet<bool>,
    scheduled: ScheduledJob,
) -> usize {
    if scheduled.countdown.is_zero() {
        let ok = run_job(engine, market.as_ref(), &scheduled.job).await;
        return usize::from(!ok);
    }

    let engine = Arc::clone(engine);
    let market = Arc::clone(market);
    delayed.spawn(async move {
        tokio::time::sleep(scheduled.countdown).await;
        run_job(&engine, market.as_ref(), &scheduled.job).await
    });
    0
}

async fn run_job<M: LaborMarket>(engine: &Engine, market: &M, job: &Job) -> bool {
    match engine.process(job, market).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%job, error = %e, "job failed");
            false
        }
    }
}

async fn join_all(delayed: &mut JoinSet<bool>) -> usize {
    let mut failed = 0;
    while let Some(done) = delayed.join_next().await {
        failed += usize::from(!matches!(done, Ok(true)));
    }
    failed
}
