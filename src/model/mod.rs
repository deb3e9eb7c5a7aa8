//! Deployment records: templates, batteries, results and credit ledgers
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentTemplate (1) ──< Experiment (N) >── Battery (N)
//!        │                       │                 │
//!        │                       └──< CreditCondition (N) ──> ExperimentVariable
//!        │                                         │
//!        └──< ResultRecord (N) >── Worker          ├── required_batteries  (self M2M)
//!                                                  └── restricted_batteries (self M2M)
//!
//! (Worker, Battery) ──> Bonus, Blacklist
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use expfactory_credit::model::{
//!     Battery, CreditCondition, Experiment, ExperimentTemplate, Operator, ResultRecord,
//! };
//!
//! let template = ExperimentTemplate::builder("stroop", "Stroop")
//!     .performance_variable(1)
//!     .build();
//! let experiment = Experiment::new(10, template.exp_id())
//!     .with_bonus(true)
//!     .with_condition(CreditCondition::new(1, 1, Operator::LessThan, "600").with_amount(1.0));
//! let battery = Battery::builder(100, "Cognitive Control")
//!     .experiments([experiment.id()])
//!     .bonus_active(true)
//!     .build();
//!
//! let mut result = ResultRecord::new(1, "W1", battery.id(), template.exp_id());
//! result.complete(None);
//! assert!(result.completed());
//! ```

mod battery;
mod blacklist;
mod bonus;
mod condition;
mod experiment;
mod result_record;
mod template;
mod variable;
mod worker;

pub use battery::{Battery, BatteryBuilder, PresentationOrder, DEFAULT_BLACKLIST_THRESHOLD};
pub use blacklist::{Blacklist, Flag};
pub use bonus::{Bonus, BonusEntry};
pub use condition::{CreditCondition, Operator};
pub use experiment::Experiment;
pub use result_record::ResultRecord;
pub use template::{ExperimentKind, ExperimentTemplate, ExperimentTemplateBuilder};
pub use variable::{ExperimentVariable, VariableKind};
pub use worker::Worker;
