//! Battery dependency checking
//!
//! A battery may require other batteries to have been completed and may be
//! restricted to workers who have *not* completed certain batteries. A
//! worker has completed a battery when every experiment currently in it has
//! a completed result from that worker in that battery. Battery composition
//! is not versioned: editing a battery changes which workers count as having
//! completed it.
//!
//! Requirements form a directed graph that may contain cycles, so every
//! traversal marks visited batteries.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Battery, ResultRecord};
use crate::store::Catalog;

/// How far required batteries are followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// Only the battery's own required batteries.
    #[default]
    Direct,
    /// Required batteries and, recursively, their requirements.
    Transitive,
}

/// Outcome of a dependency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependencies {
    /// Required batteries the worker has not completed.
    pub missing: Vec<Battery>,
    /// Restricted batteries the worker has completed.
    pub blocking: Vec<Battery>,
}

impl Dependencies {
    /// Whether the worker may attempt the battery.
    #[must_use]
    pub fn may_proceed(&self) -> bool {
        self.missing.is_empty() && self.blocking.is_empty()
    }
}

/// Batteries the worker has fully completed, judged against each battery's
/// current experiments.
///
/// Results are bucketed by battery; buckets for deleted batteries are skipped.
#[must_use]
pub fn completed_batteries(catalog: &Catalog, worker_results: &[ResultRecord]) -> HashSet<u64> {
    let mut buckets: BTreeMap<u64, HashSet<&str>> = BTreeMap::new();
    for result in worker_results.iter().filter(|r| r.completed()) {
        buckets
            .entry(result.battery_id())
            .or_default()
            .insert(result.template_id());
    }

    buckets
        .into_iter()
        .filter_map(|(battery_id, done)| {
            let Some(battery) = catalog.battery(battery_id) else {
                debug!(battery_id, "skipping results of deleted battery");
                return None;
            };
            catalog
                .battery_experiments(battery)
                .iter()
                .all(|e| done.contains(e.template_id()))
                .then_some(battery_id)
        })
        .collect()
}

/// Check whether a worker with `worker_results` may attempt `battery`.
///
/// Referenced batteries that no longer exist are ignored.
#[must_use]
pub fn check(
    catalog: &Catalog,
    battery: &Battery,
    worker_results: &[ResultRecord],
    mode: DependencyMode,
) -> Dependencies {
    let completed = completed_batteries(catalog, worker_results);

    let required = match mode {
        DependencyMode::Direct => battery.required_batteries().to_vec(),
        DependencyMode::Transitive => required_closure(catalog, battery.id()),
    };

    let missing = required
        .into_iter()
        .filter(|id| !completed.contains(id))
        .filter_map(|id| catalog.battery(id).cloned())
        .collect();

    let blocking = battery
        .restricted_batteries()
        .iter()
        .filter(|id| completed.contains(*id))
        .filter_map(|id| catalog.battery(*id).cloned())
        .collect();

    Dependencies { missing, blocking }
}

/// Every battery reachable through requirements from `battery_id`, in
/// depth-first discovery order, excluding `battery_id` itself.
#[must_use]
pub fn required_closure(catalog: &Catalog, battery_id: u64) -> Vec<u64> {
    let mut visited = HashSet::from([battery_id]);
    let mut order = Vec::new();
    let mut stack: Vec<u64> = requirements(catalog, battery_id).rev().collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id);
        stack.extend(requirements(catalog, id).rev());
    }
    order
}

/// A requirement cycle through `battery_id`, as the path of battery ids
/// starting and ending at `battery_id`.
#[must_use]
pub fn find_cycle(catalog: &Catalog, battery_id: u64) -> Option<Vec<u64>> {
    // Iterative DFS keeping the current path; `parent` reconstructs it
    let mut parent: HashMap<u64, u64> = HashMap::new();
    let mut visited = HashSet::from([battery_id]);
    let mut stack = vec![battery_id];

    while let Some(id) = stack.pop() {
        for next in requirements(catalog, id) {
            if next == battery_id {
                let mut path = vec![battery_id, id];
                let mut cursor = id;
                while let Some(&p) = parent.get(&cursor) {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some(path);
            }
            if visited.insert(next) {
                parent.insert(next, id);
                stack.push(next);
            }
        }
    }
    None
}

fn requirements(catalog: &Catalog, battery_id: u64) -> impl DoubleEndedIterator<Item = u64> + '_ {
    catalog
        .battery(battery_id)
        .map(Battery::required_batteries)
        .unwrap_or_default()
        .iter()
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Experiment;

    fn completed(id: u64, battery_id: u64, template: &str) -> ResultRecord {
        let mut r = ResultRecord::new(id, "W1", battery_id, template);
        r.complete(None);
        r
    }

    fn catalog_with(batteries: Vec<Battery>) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_experiment(Experiment::new(1, "stroop"));
        catalog.add_experiment(Experiment::new(2, "flanker"));
        for b in batteries {
            catalog.add_battery(b);
        }
        catalog
    }

    #[test]
    fn test_completed_requires_every_current_experiment() {
        let catalog = catalog_with(vec![Battery::builder(10, "R").experiments([1, 2]).build()]);
        let partial = vec![completed(1, 10, "stroop")];
        assert!(completed_batteries(&catalog, &partial).is_empty());

        let full = vec![completed(1, 10, "stroop"), completed(2, 10, "flanker")];
        assert!(completed_batteries(&catalog, &full).contains(&10));
    }

    #[test]
    fn test_incomplete_results_do_not_count() {
        let catalog = catalog_with(vec![Battery::builder(10, "R").experiments([1]).build()]);
        let results = vec![ResultRecord::new(1, "W1", 10, "stroop")];
        assert!(completed_batteries(&catalog, &results).is_empty());
    }

    #[test]
    fn test_deleted_battery_bucket_skipped() {
        let catalog = catalog_with(vec![]);
        let results = vec![completed(1, 77, "stroop")];
        assert!(completed_batteries(&catalog, &results).is_empty());
    }

    #[test]
    fn test_required_closure_handles_cycles() {
        let catalog = catalog_with(vec![
            Battery::builder(1, "A").required_batteries([2]).build(),
            Battery::builder(2, "B").required_batteries([3]).build(),
            Battery::builder(3, "C").required_batteries([1, 2]).build(),
        ]);
        assert_eq!(required_closure(&catalog, 1), vec![2, 3]);
    }

    #[test]
    fn test_find_cycle() {
        let catalog = catalog_with(vec![
            Battery::builder(1, "A").required_batteries([2]).build(),
            Battery::builder(2, "B").required_batteries([3]).build(),
            Battery::builder(3, "C").required_batteries([1]).build(),
            Battery::builder(4, "D").required_batteries([1]).build(),
        ]);
        assert_eq!(find_cycle(&catalog, 1), Some(vec![1, 2, 3, 1]));
        assert_eq!(find_cycle(&catalog, 4), None);
    }

    #[test]
    fn test_self_requirement_is_a_cycle() {
        let catalog = catalog_with(vec![Battery::builder(1, "A").required_batteries([1]).build()]);
        assert_eq!(find_cycle(&catalog, 1), Some(vec![1, 1]));
    }

    #[test]
    fn test_transitive_mode_reports_indirect_requirement() {
        let catalog = catalog_with(vec![
            Battery::builder(1, "A").required_batteries([2]).build(),
            Battery::builder(2, "B").experiments([1]).required_batteries([3]).build(),
            Battery::builder(3, "C").experiments([2]).build(),
        ]);
        let battery = catalog.battery(1).unwrap();
        let results = vec![completed(1, 2, "stroop")];

        let direct = check(&catalog, battery, &results, DependencyMode::Direct);
        assert!(direct.may_proceed());

        let transitive = check(&catalog, battery, &results, DependencyMode::Transitive);
        let missing: Vec<u64> = transitive.missing.iter().map(Battery::id).collect();
        assert_eq!(missing, vec![3]);
    }
}
