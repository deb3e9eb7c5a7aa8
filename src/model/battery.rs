//! Battery - a researcher-assembled collection of experiments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default number of flagged experiments tolerated before blacklisting.
pub const DEFAULT_BLACKLIST_THRESHOLD: u32 = 10;

/// How the next experiment is picked from those a worker has left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationOrder {
    /// Uniformly at random.
    #[default]
    Random,
    /// Lowest `order` first, ties broken at random.
    Specified,
}

impl fmt::Display for PresentationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random"),
            Self::Specified => f.write_str("specified"),
        }
    }
}

impl FromStr for PresentationOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "specified" => Ok(Self::Specified),
            other => Err(Error::Config(format!(
                "unknown presentation order \"{other}\" (expected random or specified)"
            ))),
        }
    }
}

/// Battery of experiments deployed to workers.
///
/// `required_batteries` and `restricted_batteries` reference other batteries
/// by id and form a dependency graph that may contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    id: u64,
    name: String,
    experiments: Vec<u64>,
    presentation_order: PresentationOrder,
    number_of_experiments: u32,
    maximum_time_minutes: u32,
    active: bool,
    blacklist_active: bool,
    blacklist_threshold: Option<u32>,
    bonus_active: bool,
    required_batteries: Vec<u64>,
    restricted_batteries: Vec<u64>,
}

impl Battery {
    /// Create a new active battery with random order and credit features off.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        BatteryBuilder::new(id, name).build()
    }

    /// Create a builder for constructing a battery with optional fields.
    #[must_use]
    pub fn builder(id: u64, name: impl Into<String>) -> BatteryBuilder {
        BatteryBuilder::new(id, name)
    }

    /// Get the battery ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the battery name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the ids of the experiments currently in the battery.
    #[must_use]
    pub fn experiments(&self) -> &[u64] {
        &self.experiments
    }

    /// Get the presentation order.
    #[must_use]
    pub const fn presentation_order(&self) -> PresentationOrder {
        self.presentation_order
    }

    /// Maximum number of experiments selected per deployment.
    #[must_use]
    pub const fn number_of_experiments(&self) -> u32 {
        self.number_of_experiments
    }

    /// Maximum duration of the battery in minutes.
    #[must_use]
    pub const fn maximum_time_minutes(&self) -> u32 {
        self.maximum_time_minutes
    }

    /// Whether the battery accepts workers.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    /// Whether rejection conditions blacklist workers.
    #[must_use]
    pub const fn blacklist_active(&self) -> bool {
        self.blacklist_active
    }

    /// Number of flagged experiments tolerated; `None` tolerates none.
    #[must_use]
    pub const fn blacklist_threshold(&self) -> Option<u32> {
        self.blacklist_threshold
    }

    /// Whether performance conditions grant bonuses.
    #[must_use]
    pub const fn bonus_active(&self) -> bool {
        self.bonus_active
    }

    /// Batteries that must be completed before this one.
    #[must_use]
    pub fn required_batteries(&self) -> &[u64] {
        &self.required_batteries
    }

    /// Batteries that must not have been completed before this one.
    #[must_use]
    pub fn restricted_batteries(&self) -> &[u64] {
        &self.restricted_batteries
    }

    /// Add an experiment to the battery.
    pub fn add_experiment(&mut self, experiment_id: u64) {
        if !self.experiments.contains(&experiment_id) {
            self.experiments.push(experiment_id);
        }
    }

    /// Remove an experiment from the battery.
    pub fn remove_experiment(&mut self, experiment_id: u64) {
        self.experiments.retain(|&id| id != experiment_id);
    }
}

/// Builder for `Battery`.
#[derive(Debug)]
pub struct BatteryBuilder {
    inner: Battery,
}

impl BatteryBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            inner: Battery {
                id,
                name: name.into(),
                experiments: Vec::new(),
                presentation_order: PresentationOrder::Random,
                number_of_experiments: 1,
                maximum_time_minutes: 0,
                active: true,
                blacklist_active: false,
                blacklist_threshold: Some(DEFAULT_BLACKLIST_THRESHOLD),
                bonus_active: false,
                required_batteries: Vec::new(),
                restricted_batteries: Vec::new(),
            },
        }
    }

    /// Set the experiments by id.
    #[must_use]
    pub fn experiments(mut self, experiments: impl IntoIterator<Item = u64>) -> Self {
        self.inner.experiments = experiments.into_iter().collect();
        self
    }

    /// Set the presentation order.
    #[must_use]
    pub const fn presentation_order(mut self, order: PresentationOrder) -> Self {
        self.inner.presentation_order = order;
        self
    }

    /// Set the number of experiments selected per deployment.
    #[must_use]
    pub const fn number_of_experiments(mut self, n: u32) -> Self {
        self.inner.number_of_experiments = n;
        self
    }

    /// Set the maximum battery duration in minutes.
    #[must_use]
    pub const fn maximum_time_minutes(mut self, minutes: u32) -> Self {
        self.inner.maximum_time_minutes = minutes;
        self
    }

    /// Set the active flag.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.inner.active = active;
        self
    }

    /// Turn blacklisting on with the given threshold.
    #[must_use]
    pub const fn blacklist(mut self, threshold: Option<u32>) -> Self {
        self.inner.blacklist_active = true;
        self.inner.blacklist_threshold = threshold;
        self
    }

    /// Turn bonuses on or off.
    #[must_use]
    pub const fn bonus_active(mut self, active: bool) -> Self {
        self.inner.bonus_active = active;
        self
    }

    /// Set required batteries.
    #[must_use]
    pub fn required_batteries(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.inner.required_batteries = ids.into_iter().collect();
        self
    }

    /// Set restricted batteries.
    #[must_use]
    pub fn restricted_batteries(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.inner.restricted_batteries = ids.into_iter().collect();
        self
    }

    /// Build the `Battery`.
    #[must_use]
    pub fn build(self) -> Battery {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_defaults() {
        let battery = Battery::new(1, "Battery");
        assert_eq!(battery.presentation_order(), PresentationOrder::Random);
        assert_eq!(battery.blacklist_threshold(), Some(DEFAULT_BLACKLIST_THRESHOLD));
        assert!(!battery.blacklist_active());
        assert!(!battery.bonus_active());
        assert!(battery.active());
    }

    #[test]
    fn test_presentation_order_parse() {
        assert_eq!("specified".parse::<PresentationOrder>().unwrap(), PresentationOrder::Specified);
        assert!("alphabetical".parse::<PresentationOrder>().is_err());
    }

    #[test]
    fn test_add_remove_experiment() {
        let mut battery = Battery::builder(1, "B").experiments([1, 2]).build();
        battery.add_experiment(2);
        battery.add_experiment(3);
        assert_eq!(battery.experiments(), &[1, 2, 3]);
        battery.remove_experiment(1);
        assert_eq!(battery.experiments(), &[2, 3]);
    }
}
