//! Credit condition evaluation against completed results

use tracing::{debug, info};

use super::compare::compare;
use crate::extract::get_variables;
use crate::model::{
    Battery, BonusEntry, CreditCondition, Experiment, ExperimentTemplate, Flag, ResultRecord,
};
use crate::store::{Catalog, CreditLedger};

/// What an evaluation recorded in the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditOutcome {
    /// Bonus entries written, keyed by template `exp_id`, in match order.
    pub bonuses: Vec<(String, BonusEntry)>,
    /// Violation recorded, if any.
    pub violation: Option<Flag>,
    /// Whether the worker is blacklisted from the battery afterwards.
    pub blacklisted: bool,
}

impl CreditOutcome {
    /// Whether a bonus condition granted credit for the result.
    #[must_use]
    pub fn credit_granted(&self) -> bool {
        !self.bonuses.is_empty()
    }
}

/// A condition that held for one extracted value.
struct Match {
    description: String,
}

/// Evaluates an experiment's credit conditions and records bonuses and
/// blacklist flags in the ledger.
#[derive(Debug, Clone, Copy)]
pub struct CreditEvaluator<'a> {
    catalog: &'a Catalog,
    ledger: &'a CreditLedger,
}

impl<'a> CreditEvaluator<'a> {
    /// Create an evaluator over a catalog and ledger.
    #[must_use]
    pub const fn new(catalog: &'a Catalog, ledger: &'a CreditLedger) -> Self {
        Self { catalog, ledger }
    }

    /// Record a blacklist flag if the result violates a rejection condition.
    ///
    /// Runs only for completed results of experiments with catch enabled,
    /// whose template has a rejection variable, in batteries with
    /// blacklisting on. At most one violation is recorded per call: the
    /// first matching value of the first matching condition.
    ///
    /// Results whose battery, template or experiment no longer exists are
    /// skipped.
    #[must_use]
    pub fn check_blacklist(&self, result: &ResultRecord) -> CreditOutcome {
        let mut outcome = CreditOutcome::default();
        let Some((battery, template, experiment)) = self.resolve(result) else {
            return outcome;
        };
        let Some(rejection_variable) = template.rejection_variable() else {
            return outcome;
        };
        if !(result.completed() && experiment.include_catch() && battery.blacklist_active()) {
            return outcome;
        }

        let threshold = battery.blacklist_threshold().unwrap_or(0);
        for condition in experiment.credit_conditions() {
            if condition.variable_id() != rejection_variable {
                continue;
            }
            let Some(hit) = self.first_match(result, template, condition) else {
                continue;
            };

            let flag = Flag {
                experiment_id: experiment.id(),
                description: hit.description,
            };
            let active = self.ledger.record_violation(
                result.worker_id(),
                battery.id(),
                template.exp_id(),
                flag.clone(),
                threshold,
            );
            info!(
                worker_id = result.worker_id(),
                battery_id = battery.id(),
                exp_id = template.exp_id(),
                description = %flag.description,
                blacklisted = active,
                "rejection condition violated"
            );
            outcome.violation = Some(flag);
            outcome.blacklisted = active;
            break;
        }

        outcome
    }

    /// Record bonus entries for every satisfied performance condition.
    ///
    /// Runs only for completed results of experiments with bonus enabled,
    /// whose template has a performance variable, in batteries with bonuses
    /// on. Conditions without an amount are ignored. Entries overwrite per
    /// template `exp_id`, so re-evaluating never double-counts. The caller
    /// marks the result's `credit_granted` from the outcome.
    ///
    /// Results whose battery, template or experiment no longer exists are
    /// skipped.
    #[must_use]
    pub fn experiment_reward(&self, result: &ResultRecord) -> CreditOutcome {
        let mut outcome = CreditOutcome::default();
        let Some((battery, template, experiment)) = self.resolve(result) else {
            return outcome;
        };
        let Some(performance_variable) = template.performance_variable() else {
            return outcome;
        };
        if !(result.completed() && experiment.include_bonus() && battery.bonus_active()) {
            return outcome;
        }

        for condition in experiment.credit_conditions() {
            if condition.variable_id() != performance_variable {
                continue;
            }
            let Some(amount) = condition.amount() else {
                continue;
            };
            for hit in self.matches(result, template, condition) {
                let entry = BonusEntry {
                    experiment_id: experiment.id(),
                    description: hit.description,
                    amount,
                };
                self.ledger.record_bonus(
                    result.worker_id(),
                    battery.id(),
                    template.exp_id(),
                    entry.clone(),
                );
                info!(
                    worker_id = result.worker_id(),
                    battery_id = battery.id(),
                    exp_id = template.exp_id(),
                    amount,
                    "performance condition satisfied"
                );
                outcome.bonuses.push((template.exp_id().to_string(), entry));
            }
        }

        outcome
    }

    fn resolve(
        &self,
        result: &ResultRecord,
    ) -> Option<(&'a Battery, &'a ExperimentTemplate, &'a Experiment)> {
        let Some(battery) = self.catalog.battery(result.battery_id()) else {
            debug!(
                result_id = result.id(),
                battery_id = result.battery_id(),
                "result references a deleted battery"
            );
            return None;
        };
        let Some(template) = self.catalog.template(result.template_id()) else {
            debug!(
                result_id = result.id(),
                exp_id = result.template_id(),
                "result references a deleted template"
            );
            return None;
        };
        let experiment = self.catalog.experiment_for_template(battery, template.exp_id());
        if experiment.is_none() {
            debug!(
                battery_id = battery.id(),
                exp_id = template.exp_id(),
                "template no longer in battery"
            );
        }
        Some((battery, template, experiment?))
    }

    fn first_match(
        &self,
        result: &ResultRecord,
        template: &ExperimentTemplate,
        condition: &CreditCondition,
    ) -> Option<Match> {
        self.matches(result, template, condition).into_iter().next()
    }

    fn matches(
        &self,
        result: &ResultRecord,
        template: &ExperimentTemplate,
        condition: &CreditCondition,
    ) -> Vec<Match> {
        let Some(variable) = self.catalog.variable(condition.variable_id()) else {
            debug!(
                condition_id = condition.id(),
                variable_id = condition.variable_id(),
                "credit condition references a missing variable"
            );
            return Vec::new();
        };

        get_variables(result, template, variable.name())
            .iter()
            .filter_map(|value| {
                let (lhs, rhs) = compare(value, condition.operator(), condition.value())?;
                Some(Match {
                    description: format!("{} {lhs} {} {rhs}", variable.name(), condition.operator()),
                })
            })
            .collect()
    }
}
