//! Experiment Variable - performance and rejection measures declared by a template

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Kind-specific payload of an experiment variable.
///
/// Serialized with a `datatype` tag matching the experiment `config.json`
/// vocabulary (`numeric`, `string`, `boolean`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "datatype", rename_all = "lowercase")]
pub enum VariableKind {
    /// Numeric measure with optional bounds.
    Numeric {
        /// Lower bound, if one exists.
        min: Option<f64>,
        /// Upper bound, if one exists.
        max: Option<f64>,
    },
    /// String measure with an enumerated set of options.
    String {
        /// Allowed options, in declaration order.
        options: Vec<String>,
    },
    /// Boolean measure.
    Boolean {
        /// Default option shown to researchers.
        default: bool,
    },
}

/// A variable an experiment records, which credit conditions refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentVariable {
    id: u64,
    name: String,
    description: Option<String>,
    kind: VariableKind,
}

impl ExperimentVariable {
    /// Create a new experiment variable.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            kind,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a variable entry from an experiment `config.json`.
    ///
    /// Expected shape:
    ///
    /// ```json
    /// {"name": "credit_var", "description": "...", "datatype": "numeric", "range": [0, 100]}
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVariable`] if the entry is not an object, has no
    /// `name`, or declares an unknown `datatype`.
    pub fn from_config(id: u64, entry: &Value) -> Result<Self> {
        let object = entry
            .as_object()
            .ok_or_else(|| Error::InvalidVariable("entry is not an object".to_string()))?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidVariable("missing \"name\"".to_string()))?;

        let datatype = object
            .get("datatype")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .ok_or_else(|| Error::InvalidVariable(format!("{name}: missing \"datatype\"")))?;

        let kind = match datatype.as_str() {
            "numeric" => {
                let range = object.get("range").and_then(Value::as_array);
                let bound = |i: usize| range.and_then(|r| r.get(i)).and_then(Value::as_f64);
                VariableKind::Numeric {
                    min: bound(0),
                    max: bound(1),
                }
            }
            "string" => VariableKind::String {
                options: object
                    .get("options")
                    .and_then(Value::as_array)
                    .map(|opts| {
                        opts.iter()
                            .filter_map(|o| o.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            "boolean" => VariableKind::Boolean { default: false },
            other => {
                return Err(Error::InvalidVariable(format!(
                    "{name}: unknown datatype \"{other}\""
                )))
            }
        };

        let mut variable = Self::new(id, name, kind);
        variable.description = object
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(variable)
    }

    /// Get the variable ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the variable name as recorded in trial data.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the kind-specific payload.
    #[must_use]
    pub const fn kind(&self) -> &VariableKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_from_config() {
        let entry = json!({"name": "rt", "datatype": "Numeric", "range": [0, 5000]});
        let var = ExperimentVariable::from_config(1, &entry).unwrap();
        assert_eq!(var.name(), "rt");
        assert_eq!(
            var.kind(),
            &VariableKind::Numeric {
                min: Some(0.0),
                max: Some(5000.0)
            }
        );
    }

    #[test]
    fn test_string_from_config() {
        let entry = json!({"name": "resp", "datatype": "string", "options": ["a", "b"]});
        let var = ExperimentVariable::from_config(2, &entry).unwrap();
        assert_eq!(
            var.kind(),
            &VariableKind::String {
                options: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_datatype_rejected() {
        let entry = json!({"name": "x", "datatype": "complex"});
        assert!(matches!(
            ExperimentVariable::from_config(3, &entry),
            Err(Error::InvalidVariable(_))
        ));
    }

    #[test]
    fn test_missing_name_rejected() {
        let entry = json!({"datatype": "boolean"});
        assert!(ExperimentVariable::from_config(4, &entry).is_err());
    }

    #[test]
    fn test_kind_serializes_with_datatype_tag() {
        let var = ExperimentVariable::new(5, "flag", VariableKind::Boolean { default: false });
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["kind"]["datatype"], "boolean");
    }
}
