//! Experiment - a template customized for one battery

use serde::{Deserialize, Serialize};

use super::{CreditCondition, ExperimentTemplate};

/// Experiment-in-battery: a template plus presentation order, bonus/catch
/// switches and the credit conditions evaluated against its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    id: u64,
    template_id: String,
    order: i32,
    include_bonus: bool,
    include_catch: bool,
    credit_conditions: Vec<CreditCondition>,
}

impl Experiment {
    /// Create a new experiment with order 1 and bonus/catch disabled.
    #[must_use]
    pub fn new(id: u64, template_id: impl Into<String>) -> Self {
        Self {
            id,
            template_id: template_id.into(),
            order: 1,
            include_bonus: false,
            include_catch: false,
            credit_conditions: Vec::new(),
        }
    }

    /// Set the presentation order. Smaller numbers are presented first.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Enable or disable bonus evaluation.
    #[must_use]
    pub const fn with_bonus(mut self, include_bonus: bool) -> Self {
        self.include_bonus = include_bonus;
        self
    }

    /// Enable or disable catch (rejection) evaluation.
    #[must_use]
    pub const fn with_catch(mut self, include_catch: bool) -> Self {
        self.include_catch = include_catch;
        self
    }

    /// Add a credit condition.
    #[must_use]
    pub fn with_condition(mut self, condition: CreditCondition) -> Self {
        self.credit_conditions.push(condition);
        self
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the template ID (`exp_id`).
    #[must_use]
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Get the presentation order.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Whether bonus evaluation is enabled.
    #[must_use]
    pub const fn include_bonus(&self) -> bool {
        self.include_bonus
    }

    /// Whether catch (rejection) evaluation is enabled.
    #[must_use]
    pub const fn include_catch(&self) -> bool {
        self.include_catch
    }

    /// Get the credit conditions.
    #[must_use]
    pub fn credit_conditions(&self) -> &[CreditCondition] {
        &self.credit_conditions
    }

    /// Replace the credit conditions, e.g. after a researcher edit.
    pub fn set_credit_conditions(&mut self, conditions: Vec<CreditCondition>) {
        self.credit_conditions = conditions;
    }

    /// Turn off bonus or catch evaluation once no credit conditions remain
    /// for the template's performance or rejection variable `variable_id`.
    pub fn sync_credit_flags(&mut self, variable_id: u64, template: &ExperimentTemplate) {
        if !self.credit_conditions.is_empty() {
            return;
        }
        if template.performance_variable() == Some(variable_id) {
            self.include_bonus = false;
        }
        if template.rejection_variable() == Some(variable_id) {
            self.include_catch = false;
        }
    }
}
