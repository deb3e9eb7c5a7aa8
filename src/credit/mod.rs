//! Credit evaluation: bonuses for performance, blacklist flags for rejection
//!
//! Each experiment in a battery carries credit conditions of the form
//! `variable OPERATOR value [amount]`. When a worker completes the
//! experiment, conditions on the template's performance variable grant
//! bonus amounts and conditions on its rejection variable flag the worker.
//!
//! ## Asymmetry
//!
//! A single [`CreditEvaluator::check_blacklist`] call records at most one
//! violation, while [`CreditEvaluator::experiment_reward`] records every
//! satisfied performance condition (later matches overwrite earlier ones for
//! the same experiment).
//!
//! ## Example
//!
//! ```rust
//! use expfactory_credit::credit::CreditEvaluator;
//! use expfactory_credit::model::{
//!     Battery, CreditCondition, Experiment, ExperimentTemplate, ExperimentVariable, Operator,
//!     ResultRecord, VariableKind,
//! };
//! use expfactory_credit::store::{Catalog, CreditLedger};
//! use serde_json::json;
//!
//! let mut catalog = Catalog::new();
//! catalog.add_variable(ExperimentVariable::new(1, "rt", VariableKind::Numeric { min: None, max: None }));
//! catalog.add_template(ExperimentTemplate::builder("stroop", "Stroop").performance_variable(1).build());
//! catalog.add_experiment(
//!     Experiment::new(10, "stroop")
//!         .with_bonus(true)
//!         .with_condition(CreditCondition::new(1, 1, Operator::LessThan, "600").with_amount(0.5)),
//! );
//! catalog.add_battery(Battery::builder(100, "B").experiments([10]).bonus_active(true).build());
//!
//! let mut result = ResultRecord::new(1, "W1", 100, "stroop")
//!     .with_taskdata(vec![json!({"trialdata": {"rt": 450}})]);
//! result.complete(None);
//!
//! let ledger = CreditLedger::new();
//! let outcome = CreditEvaluator::new(&catalog, &ledger).experiment_reward(&result);
//! assert!(outcome.credit_granted());
//! assert_eq!(ledger.bonus("W1", 100).unwrap().total(), 0.5);
//! ```

mod compare;
mod evaluator;

pub use compare::{coerce, compare, parse_bool, Coerced};
pub use evaluator::{CreditEvaluator, CreditOutcome};
