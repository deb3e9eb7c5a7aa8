//! Battery dependency tests: required and restricted batteries, deleted
//! batteries and requirement cycles

use expfactory_credit::dependency::{
    check, completed_batteries, find_cycle, required_closure, DependencyMode,
};
use expfactory_credit::model::{Battery, Experiment, ExperimentTemplate, ResultRecord};
use expfactory_credit::store::Catalog;

/// Battery `id` holds one experiment on template `t{id}`.
fn add_battery(catalog: &mut Catalog, id: u64, required: &[u64], restricted: &[u64]) {
    let template = format!("t{id}");
    catalog.add_template(ExperimentTemplate::builder(&template, &template).build());
    catalog.add_experiment(Experiment::new(id, &template));
    catalog.add_battery(
        Battery::builder(id, format!("Battery {id}"))
            .experiments([id])
            .required_batteries(required.iter().copied())
            .restricted_batteries(restricted.iter().copied())
            .build(),
    );
}

fn finished(battery_id: u64) -> ResultRecord {
    let mut result = ResultRecord::new(battery_id, "W1", battery_id, format!("t{battery_id}"));
    result.complete(None);
    result
}

fn ids(batteries: &[Battery]) -> Vec<u64> {
    batteries.iter().map(Battery::id).collect()
}

// ============================================================================
// Required and restricted batteries
// ============================================================================

#[test]
fn test_missing_required_battery_blocks() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[1], &[]);
    let battery = catalog.battery(2).unwrap().clone();

    let deps = check(&catalog, &battery, &[], DependencyMode::Direct);
    assert_eq!(ids(&deps.missing), vec![1]);
    assert!(deps.blocking.is_empty());
    assert!(!deps.may_proceed());

    let deps = check(&catalog, &battery, &[finished(1)], DependencyMode::Direct);
    assert!(deps.may_proceed());
}

#[test]
fn test_incomplete_result_does_not_satisfy_requirement() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[1], &[]);
    let battery = catalog.battery(2).unwrap().clone();

    let started = ResultRecord::new(1, "W1", 1, "t1");
    let deps = check(&catalog, &battery, &[started], DependencyMode::Direct);
    assert_eq!(ids(&deps.missing), vec![1]);
}

#[test]
fn test_completed_restricted_battery_blocks() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[], &[1]);
    let battery = catalog.battery(2).unwrap().clone();

    assert!(check(&catalog, &battery, &[], DependencyMode::Direct).may_proceed());

    let deps = check(&catalog, &battery, &[finished(1)], DependencyMode::Direct);
    assert_eq!(ids(&deps.blocking), vec![1]);
    assert!(!deps.may_proceed());
}

#[test]
fn test_deleted_battery_results_are_skipped() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[], &[1]);
    catalog.remove_battery(1);
    let battery = catalog.battery(2).unwrap().clone();

    let results = [finished(1)];
    assert!(completed_batteries(&catalog, &results).is_empty());
    assert!(check(&catalog, &battery, &results, DependencyMode::Direct).may_proceed());
}

#[test]
fn test_direct_mode_ignores_indirect_requirements() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[1], &[]);
    add_battery(&mut catalog, 3, &[2], &[]);
    let battery = catalog.battery(3).unwrap().clone();

    let results = [finished(2)];
    assert!(check(&catalog, &battery, &results, DependencyMode::Direct).may_proceed());

    let deps = check(&catalog, &battery, &results, DependencyMode::Transitive);
    assert_eq!(ids(&deps.missing), vec![1]);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_required_closure_terminates_on_cycle() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[2], &[]);
    add_battery(&mut catalog, 2, &[3], &[]);
    add_battery(&mut catalog, 3, &[1], &[]);

    assert_eq!(required_closure(&catalog, 1), vec![2, 3]);
    assert_eq!(find_cycle(&catalog, 1), Some(vec![1, 2, 3, 1]));
}

#[test]
fn test_transitive_check_on_cycle() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[2], &[]);
    add_battery(&mut catalog, 2, &[1], &[]);
    let battery = catalog.battery(1).unwrap().clone();

    let deps = check(&catalog, &battery, &[], DependencyMode::Transitive);
    assert_eq!(ids(&deps.missing), vec![2]);
}

#[test]
fn test_acyclic_graph_has_no_cycle() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[], &[]);
    add_battery(&mut catalog, 2, &[1], &[]);
    add_battery(&mut catalog, 3, &[1, 2], &[]);

    assert_eq!(find_cycle(&catalog, 3), None);
    assert_eq!(required_closure(&catalog, 3), vec![1, 2]);
}

#[test]
fn test_self_requirement_is_a_cycle() {
    let mut catalog = Catalog::new();
    add_battery(&mut catalog, 1, &[1], &[]);
    assert_eq!(find_cycle(&catalog, 1), Some(vec![1, 1]));
    assert!(required_closure(&catalog, 1).is_empty());
}
