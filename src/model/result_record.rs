//! Result Record - one worker's trial data for one experiment in a battery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result Record holds the trial-level submission of a worker.
///
/// `taskdata` is the ordered list of trial records posted by the experiment,
/// each an object that may nest per-trial values under `trialdata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    id: u64,
    worker_id: String,
    battery_id: u64,
    template_id: String,
    taskdata: Vec<Value>,
    completed: bool,
    credit_granted: bool,
    current_trial: Option<u32>,
    finished_at: Option<DateTime<Utc>>,
    version: Option<String>,
}

impl ResultRecord {
    /// Create a new, empty, incomplete result.
    #[must_use]
    pub fn new(
        id: u64,
        worker_id: impl Into<String>,
        battery_id: u64,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            worker_id: worker_id.into(),
            battery_id,
            template_id: template_id.into(),
            taskdata: Vec::new(),
            completed: false,
            credit_granted: false,
            current_trial: None,
            finished_at: None,
            version: None,
        }
    }

    /// Attach trial data.
    #[must_use]
    pub fn with_taskdata(mut self, taskdata: Vec<Value>) -> Self {
        self.taskdata = taskdata;
        self
    }

    /// Get the result ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the worker ID.
    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Get the battery ID.
    #[must_use]
    pub const fn battery_id(&self) -> u64 {
        self.battery_id
    }

    /// Get the experiment template ID (`exp_id`).
    #[must_use]
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Get the trial records.
    #[must_use]
    pub fn taskdata(&self) -> &[Value] {
        &self.taskdata
    }

    /// Whether the worker finished the experiment.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Whether a bonus condition has granted credit.
    #[must_use]
    pub const fn credit_granted(&self) -> bool {
        self.credit_granted
    }

    /// Last trial recorded as complete.
    #[must_use]
    pub const fn current_trial(&self) -> Option<u32> {
        self.current_trial
    }

    /// When the worker finished, if completed.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Template version at completion time.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Replace trial data from a sync post.
    pub fn sync(&mut self, taskdata: Vec<Value>, current_trial: Option<u32>) {
        self.taskdata = taskdata;
        self.current_trial = current_trial;
    }

    /// Mark the result completed, stamping the finish time and version.
    pub fn complete(&mut self, version: Option<&str>) {
        self.completed = true;
        self.finished_at = Some(Utc::now());
        self.version = version.map(str::to_string);
    }

    /// Record that a bonus condition granted credit.
    pub fn grant_credit(&mut self) {
        self.credit_granted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_lifecycle() {
        let mut result = ResultRecord::new(1, "W1", 10, "stroop");
        assert!(!result.completed());
        assert!(result.finished_at().is_none());

        result.sync(vec![json!({"trialdata": {"rt": 500}})], Some(1));
        assert_eq!(result.taskdata().len(), 1);
        assert_eq!(result.current_trial(), Some(1));

        result.complete(Some("abc123"));
        assert!(result.completed());
        assert!(result.finished_at().is_some());
        assert_eq!(result.version(), Some("abc123"));
    }

    #[test]
    fn test_grant_credit() {
        let mut result = ResultRecord::new(1, "W1", 10, "stroop");
        result.grant_credit();
        assert!(result.credit_granted());
    }
}
