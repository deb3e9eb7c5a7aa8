//! Variable extraction from trial data
//!
//! Resolves a credit-condition variable name against a result's trial
//! records. Names that do not match any recorded key may carry a summary
//! statistic prefix (`mean_rt`, `max_correct`, ...) which is stripped and
//! applied over the remaining variable.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::{ExperimentKind, ExperimentTemplate, ResultRecord};

/// Key under which jsPsych nests per-trial values.
pub const TRIALDATA_KEY: &str = "trialdata";

/// Summary statistic named by a variable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStatistic {
    /// Arithmetic mean (`avg`, `mean`, `average`)
    Mean,
    /// Median (`med`, `median`)
    Median,
    /// Sum (`sum`, `total`)
    Sum,
    /// Maximum (`max`)
    Max,
    /// Minimum (`min`)
    Min,
}

impl SummaryStatistic {
    /// Parse a prefix token, case-insensitively.
    #[must_use]
    pub fn from_prefix(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "avg" | "mean" | "average" => Some(Self::Mean),
            "med" | "median" => Some(Self::Median),
            "sum" | "total" => Some(Self::Sum),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            _ => None,
        }
    }

    /// Split `mean_rt` into `(Mean, "rt")`.
    #[must_use]
    pub fn split_name(name: &str) -> Option<(Self, &str)> {
        let (prefix, rest) = name.split_once('_')?;
        Self::from_prefix(prefix).map(|stat| (stat, rest))
    }

    /// Reduce values; `None` when empty.
    #[must_use]
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let reduced = match self {
            Self::Mean => values.iter().sum::<f64>() / n,
            Self::Sum => values.iter().sum(),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Some(reduced)
    }
}

/// Numeric view of a trial value: numbers, booleans as 1/0, numeric strings.
#[must_use]
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Collect the raw values recorded under exactly `name`, one per trial.
///
/// A trial's nested `trialdata` object takes precedence over its top-level
/// keys. Only jsPsych experiments carry trial-level variables; surveys and
/// games yield nothing.
#[must_use]
pub fn find_variable(result: &ResultRecord, template: &ExperimentTemplate, name: &str) -> Vec<Value> {
    if template.kind() != Some(ExperimentKind::Experiments) || name == TRIALDATA_KEY {
        return Vec::new();
    }

    result
        .taskdata()
        .iter()
        .filter_map(|trial| {
            trial
                .get(TRIALDATA_KEY)
                .and_then(|nested| nested.get(name))
                .or_else(|| trial.get(name))
                .cloned()
        })
        .collect()
}

/// Resolve `name` to the values a credit condition compares against.
///
/// Direct matches are returned as-is. Otherwise a summary statistic prefix
/// is stripped and the statistic of the remaining variable is returned as a
/// singleton. Non-numeric values are left out of the statistic; if nothing
/// numeric remains the result is empty.
#[must_use]
pub fn get_variables(result: &ResultRecord, template: &ExperimentTemplate, name: &str) -> Vec<Value> {
    let direct = find_variable(result, template, name);
    if !direct.is_empty() {
        return direct;
    }

    let Some((stat, base)) = SummaryStatistic::split_name(name) else {
        return direct;
    };

    let numbers: Vec<f64> = find_variable(result, template, base)
        .iter()
        .filter_map(numeric_value)
        .collect();

    stat.apply(&numbers)
        .and_then(serde_json::Number::from_f64)
        .map(|n| vec![Value::Number(n)])
        .unwrap_or_default()
}

/// Sorted variable names recorded across completed results, at the top
/// level of each trial and inside `trialdata`.
#[must_use]
pub fn unique_variables<'a>(results: impl IntoIterator<Item = &'a ResultRecord>) -> Vec<String> {
    let mut names = BTreeSet::new();
    for result in results.into_iter().filter(|r| r.completed()) {
        for trial in result.taskdata() {
            let Some(object) = trial.as_object() else {
                continue;
            };
            for (key, value) in object {
                if key == TRIALDATA_KEY {
                    if let Some(nested) = value.as_object() {
                        names.extend(nested.keys().cloned());
                    }
                } else {
                    names.insert(key.clone());
                }
            }
        }
    }
    names.into_iter().collect()
}

/// Sorted distinct template ids of completed results.
#[must_use]
pub fn unique_experiments<'a>(results: impl IntoIterator<Item = &'a ResultRecord>) -> Vec<String> {
    results
        .into_iter()
        .filter(|r| r.completed())
        .map(|r| r.template_id().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stroop() -> ExperimentTemplate {
        ExperimentTemplate::new("stroop", "Stroop")
    }

    fn result_with(trials: Vec<Value>) -> ResultRecord {
        ResultRecord::new(1, "W1", 1, "stroop").with_taskdata(trials)
    }

    #[test]
    fn test_find_variable_nested_and_top_level() {
        let result = result_with(vec![
            json!({"trialdata": {"rt": 400}}),
            json!({"rt": 500, "trialdata": {}}),
            json!({"trialdata": {"correct": true}}),
        ]);
        let values = find_variable(&result, &stroop(), "rt");
        assert_eq!(values, vec![json!(400), json!(500)]);
    }

    #[test]
    fn test_find_variable_ignores_surveys() {
        let survey = ExperimentTemplate::builder("bis11", "BIS-11").template("survey").build();
        let result = result_with(vec![json!({"trialdata": {"rt": 400}})]);
        assert!(find_variable(&result, &survey, "rt").is_empty());
    }

    #[test]
    fn test_direct_match_wins_over_statistic() {
        let result = result_with(vec![json!({"trialdata": {"mean_rt": 1, "rt": 100}})]);
        assert_eq!(get_variables(&result, &stroop(), "mean_rt"), vec![json!(1)]);
    }

    #[test]
    fn test_summary_statistics() {
        let result = result_with(vec![
            json!({"trialdata": {"rt": 100}}),
            json!({"trialdata": {"rt": 400}}),
            json!({"trialdata": {"rt": 200}}),
            json!({"trialdata": {"rt": 300}}),
        ]);
        let t = stroop();
        assert_eq!(get_variables(&result, &t, "avg_rt"), vec![json!(250.0)]);
        assert_eq!(get_variables(&result, &t, "MEDIAN_rt"), vec![json!(250.0)]);
        assert_eq!(get_variables(&result, &t, "total_rt"), vec![json!(1000.0)]);
        assert_eq!(get_variables(&result, &t, "max_rt"), vec![json!(400.0)]);
        assert_eq!(get_variables(&result, &t, "min_rt"), vec![json!(100.0)]);
    }

    #[test]
    fn test_statistic_keeps_underscored_base_name() {
        let result = result_with(vec![
            json!({"trialdata": {"key_press": 1}}),
            json!({"trialdata": {"key_press": 3}}),
        ]);
        assert_eq!(get_variables(&result, &stroop(), "sum_key_press"), vec![json!(4.0)]);
    }

    #[test]
    fn test_statistic_skips_non_numeric() {
        let result = result_with(vec![
            json!({"trialdata": {"rt": "n/a"}}),
            json!({"trialdata": {"rt": "300"}}),
            json!({"trialdata": {"rt": true}}),
        ]);
        assert_eq!(get_variables(&result, &stroop(), "sum_rt"), vec![json!(301.0)]);
    }

    #[test]
    fn test_unknown_variable_is_empty() {
        let result = result_with(vec![json!({"trialdata": {"rt": 100}})]);
        assert!(get_variables(&result, &stroop(), "accuracy").is_empty());
        assert!(get_variables(&result, &stroop(), "mean_accuracy").is_empty());
        assert!(get_variables(&result, &stroop(), "mode_rt").is_empty());
    }

    #[test]
    fn test_unique_variables_and_experiments() {
        let mut a = result_with(vec![json!({"exp_id": "stroop", "trialdata": {"rt": 1}})]);
        a.complete(None);
        let b = ResultRecord::new(2, "W1", 1, "flanker")
            .with_taskdata(vec![json!({"trialdata": {"hidden": 1}})]);
        let mut c = ResultRecord::new(3, "W2", 1, "ant");
        c.complete(None);

        assert_eq!(unique_variables([&a, &b, &c]), vec!["exp_id", "rt"]);
        assert_eq!(unique_experiments([&a, &b, &c]), vec!["ant", "stroop"]);
    }
}
