//! # expfactory-credit: Credit Evaluation for Online Experiment Batteries
//!
//! **Version**: 0.1.0
//!
//! Evaluates workers' completed experiment results against per-experiment
//! credit conditions, accumulating bonuses for good performance and
//! blacklisting workers who repeatedly fail catch conditions. Also decides
//! which experiments a worker sees next and whether battery dependencies
//! allow them to start.
//!
//! ## Design Principles
//!
//! - **Conditions never error**: a missing variable or an uncomparable value
//!   simply does not match
//! - **Idempotent rewards**: bonus entries overwrite per experiment, so
//!   re-evaluation never double-counts
//! - **Monotonic blacklist**: once active, a blacklist stays active
//! - **Cycle-safe dependencies**: required-battery traversal marks visited
//!   batteries
//!
//! ## Example Usage
//!
//! ```rust
//! use expfactory_credit::model::{Battery, Experiment, ExperimentTemplate, ResultRecord};
//! use expfactory_credit::engine::NextStep;
//! use expfactory_credit::{Engine, EngineConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! let catalog = engine.catalog_mut();
//! catalog.add_template(ExperimentTemplate::builder("stroop", "Stroop").build());
//! catalog.add_experiment(Experiment::new(1, "stroop"));
//! catalog.add_battery(Battery::builder(7, "Pilot").experiments([1]).build());
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let step = engine.next_experiments("W1", 7, &mut rng)?;
//! assert!(matches!(step, NextStep::Present(ref exps) if exps.len() == 1));
//!
//! engine.results().insert(ResultRecord::new(1, "W1", 7, "stroop"));
//! assert!(engine.finish_result(1, None)?);
//! assert_eq!(engine.next_experiments("W1", 7, &mut rng)?, NextStep::BatteryComplete);
//! # Ok::<(), expfactory_credit::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod credit;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod model;
pub mod select;
pub mod store;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{Engine, NextStep};
pub use error::{Error, Result};
