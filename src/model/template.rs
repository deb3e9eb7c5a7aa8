//! Experiment Template - canonical, reusable experiment definition

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::ExperimentVariable;
use crate::{Error, Result};

/// Installation family of a template, derived from its `template` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentKind {
    /// jsPsych experiments; the only kind with trial-level variables.
    Experiments,
    /// Survey forms.
    Surveys,
    /// Phaser games.
    Games,
}

impl ExperimentKind {
    /// Map a `template` field (`jspsych`, `survey`, `phaser`) to its kind.
    #[must_use]
    pub fn from_template(template: &str) -> Option<Self> {
        match template {
            "jspsych" => Some(Self::Experiments),
            "survey" => Some(Self::Surveys),
            "phaser" => Some(Self::Games),
            _ => None,
        }
    }
}

/// Experiment Template, customized by researchers into battery experiments.
///
/// A template designates at most one performance variable (drives bonuses)
/// and at most one rejection variable (drives blacklisting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentTemplate {
    exp_id: String,
    name: String,
    time_minutes: u32,
    reference: Option<String>,
    template: Option<String>,
    version: Option<String>,
    publish: bool,
    performance_variable: Option<u64>,
    rejection_variable: Option<u64>,
}

impl ExperimentTemplate {
    /// Create a new jsPsych template with no designated variables.
    #[must_use]
    pub fn new(exp_id: impl Into<String>, name: impl Into<String>) -> Self {
        ExperimentTemplateBuilder::new(exp_id, name).build()
    }

    /// Create a builder for constructing a template with optional fields.
    #[must_use]
    pub fn builder(exp_id: impl Into<String>, name: impl Into<String>) -> ExperimentTemplateBuilder {
        ExperimentTemplateBuilder::new(exp_id, name)
    }

    /// Parse a template from an experiment `config.json` entry.
    ///
    /// Variables listed under `experiment_variables` are parsed and returned
    /// alongside the template; `type: bonus` designates the performance
    /// variable and `type: credit` the rejection variable. Variable entries
    /// that fail to parse are skipped with a warning. `next_id` allocates
    /// variable ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if `exp_id` or `name` is missing.
    pub fn from_config(
        entry: &Value,
        mut next_id: impl FnMut() -> u64,
    ) -> Result<(Self, Vec<ExperimentVariable>)> {
        let field = |key: &str| entry.get(key).and_then(Value::as_str);
        let exp_id = field("exp_id")
            .ok_or_else(|| Error::InvalidTemplate("missing \"exp_id\"".to_string()))?;
        let name = field("name")
            .ok_or_else(|| Error::InvalidTemplate(format!("{exp_id}: missing \"name\"")))?;

        // Reference may be a list; the first entry wins
        let reference = match entry.get("reference") {
            Some(Value::Array(refs)) => refs.first().and_then(Value::as_str),
            Some(Value::String(r)) => Some(r.as_str()),
            _ => None,
        };

        let mut builder = Self::builder(exp_id, name)
            .time_minutes(
                entry
                    .get("time")
                    .and_then(Value::as_u64)
                    .and_then(|t| u32::try_from(t).ok())
                    .unwrap_or(0),
            )
            .publish(entry.get("publish").map_or(true, truthy));
        if let Some(reference) = reference {
            builder = builder.reference(reference);
        }
        if let Some(template) = field("template") {
            builder = builder.template(template);
        }

        let mut variables = Vec::new();
        for var in entry
            .get("experiment_variables")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let variable = match ExperimentVariable::from_config(next_id(), var) {
                Ok(v) => v,
                Err(e) => {
                    warn!(exp_id, error = %e, "skipping experiment variable");
                    continue;
                }
            };
            let role = var
                .get("type")
                .and_then(Value::as_str)
                .map(|t| t.trim().to_lowercase());
            match role.as_deref() {
                Some("bonus") => builder = builder.performance_variable(variable.id()),
                Some("credit") => builder = builder.rejection_variable(variable.id()),
                _ => {}
            }
            variables.push(variable);
        }

        Ok((builder.build(), variables))
    }

    /// Get the template ID (`exp_id`).
    #[must_use]
    pub fn exp_id(&self) -> &str {
        &self.exp_id
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the expected duration in minutes.
    #[must_use]
    pub const fn time_minutes(&self) -> u32 {
        self.time_minutes
    }

    /// Get the reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Get the installed version (repository commit), if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether the template is published.
    #[must_use]
    pub const fn publish(&self) -> bool {
        self.publish
    }

    /// Get the installation family, if the `template` field is recognised.
    #[must_use]
    pub fn kind(&self) -> Option<ExperimentKind> {
        self.template.as_deref().and_then(ExperimentKind::from_template)
    }

    /// Get the performance (bonus) variable id.
    #[must_use]
    pub const fn performance_variable(&self) -> Option<u64> {
        self.performance_variable
    }

    /// Get the rejection (blacklist) variable id.
    #[must_use]
    pub const fn rejection_variable(&self) -> Option<u64> {
        self.rejection_variable
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Builder for `ExperimentTemplate`.
#[derive(Debug)]
pub struct ExperimentTemplateBuilder {
    inner: ExperimentTemplate,
}

impl ExperimentTemplateBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(exp_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            inner: ExperimentTemplate {
                exp_id: exp_id.into(),
                name: name.into(),
                time_minutes: 0,
                reference: None,
                template: Some("jspsych".to_string()),
                version: None,
                publish: true,
                performance_variable: None,
                rejection_variable: None,
            },
        }
    }

    /// Set the expected duration in minutes.
    #[must_use]
    pub const fn time_minutes(mut self, minutes: u32) -> Self {
        self.inner.time_minutes = minutes;
        self
    }

    /// Set the reference.
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.inner.reference = Some(reference.into());
        self
    }

    /// Set the `template` field (`jspsych`, `survey`, `phaser`).
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.inner.template = Some(template.into());
        self
    }

    /// Set the installed version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.inner.version = Some(version.into());
        self
    }

    /// Set the publish flag.
    #[must_use]
    pub const fn publish(mut self, publish: bool) -> Self {
        self.inner.publish = publish;
        self
    }

    /// Designate the performance (bonus) variable.
    #[must_use]
    pub const fn performance_variable(mut self, variable_id: u64) -> Self {
        self.inner.performance_variable = Some(variable_id);
        self
    }

    /// Designate the rejection (blacklist) variable.
    #[must_use]
    pub const fn rejection_variable(mut self, variable_id: u64) -> Self {
        self.inner.rejection_variable = Some(variable_id);
        self
    }

    /// Build the `ExperimentTemplate`.
    #[must_use]
    pub fn build(self) -> ExperimentTemplate {
        self.inner
    }
}
