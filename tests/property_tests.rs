//! Property-based tests for expfactory-credit
//!
//! - Test selection, extraction and ledger invariants
//! - Run with ProptestConfig::with_cases(100)

use expfactory_credit::credit::{compare, CreditEvaluator};
use expfactory_credit::extract::get_variables;
use expfactory_credit::model::{
    Battery, CreditCondition, Experiment, ExperimentTemplate, ExperimentVariable, Flag, Operator,
    PresentationOrder, ResultRecord, VariableKind,
};
use expfactory_credit::select::select_experiments;
use expfactory_credit::store::{Catalog, CreditLedger};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Experiment orders for a specified-order battery
fn arb_orders() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(1i32..5, 1..12)
}

/// Reaction times recorded across trials
fn arb_reaction_times() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(100u32..2000, 1..40)
}

fn jspsych_result(values: &[u32]) -> (ResultRecord, ExperimentTemplate) {
    let template = ExperimentTemplate::builder("stroop", "Stroop").build();
    let taskdata = values
        .iter()
        .map(|rt| json!({"trialdata": {"rt": rt}}))
        .collect();
    let mut result = ResultRecord::new(1, "W1", 1, "stroop").with_taskdata(taskdata);
    result.complete(None);
    (result, template)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Selection
    // ========================================================================

    /// Property: specified order only ever selects the lowest remaining order
    #[test]
    fn prop_specified_selects_lowest_order(
        orders in arb_orders(),
        n in 1usize..4,
        seed in any::<u64>()
    ) {
        let exps: Vec<Experiment> = orders
            .iter()
            .zip(1..)
            .map(|(&order, id)| Experiment::new(id, format!("t{id}")).with_order(order))
            .collect();
        let candidates: Vec<&Experiment> = exps.iter().collect();
        let lowest = orders.iter().copied().min().unwrap();
        let tied = orders.iter().filter(|&&o| o == lowest).count();

        let mut rng = StdRng::seed_from_u64(seed);
        let picked = select_experiments(PresentationOrder::Specified, &candidates, n, &mut rng);

        prop_assert_eq!(picked.len(), n.min(tied));
        prop_assert!(picked.iter().all(|e| e.order() == lowest));
    }

    /// Property: random selection never repeats an experiment
    #[test]
    fn prop_random_without_replacement(
        orders in arb_orders(),
        n in 1usize..12,
        seed in any::<u64>()
    ) {
        let exps: Vec<Experiment> = orders
            .iter()
            .zip(1..)
            .map(|(&order, id)| Experiment::new(id, format!("t{id}")).with_order(order))
            .collect();
        let candidates: Vec<&Experiment> = exps.iter().collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let picked = select_experiments(PresentationOrder::Random, &candidates, n, &mut rng);
        let mut ids: Vec<u64> = picked.iter().map(|e| e.id()).collect();
        ids.sort_unstable();
        ids.dedup();

        prop_assert_eq!(ids.len(), n.min(exps.len()));
    }

    // ========================================================================
    // Extraction
    // ========================================================================

    /// Property: mean_X is the arithmetic mean of all X values, as a singleton
    #[test]
    fn prop_mean_extraction(values in arb_reaction_times()) {
        let (result, template) = jspsych_result(&values);
        let extracted = get_variables(&result, &template, "mean_rt");

        prop_assert_eq!(extracted.len(), 1);
        let expected = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
        let got = extracted[0].as_f64().unwrap();
        prop_assert!((got - expected).abs() < 1e-9);
    }

    /// Property: direct extraction returns one value per trial
    #[test]
    fn prop_direct_extraction_per_trial(values in arb_reaction_times()) {
        let (result, template) = jspsych_result(&values);
        prop_assert_eq!(get_variables(&result, &template, "rt").len(), values.len());
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Property: EQUALS on booleans matches iff the coerced values are equal
    #[test]
    fn prop_boolean_equals(value in any::<bool>(), comparator in any::<bool>()) {
        let matched = compare(&json!(value), Operator::Equals, &comparator.to_string()).is_some();
        prop_assert_eq!(matched, value == comparator);
    }

    /// Property: numeric operators agree with f64 comparison
    #[test]
    fn prop_numeric_operators(a in -1000i64..1000, b in -1000i64..1000) {
        let value = json!(a);
        let rhs = b.to_string();
        prop_assert_eq!(compare(&value, Operator::LessThan, &rhs).is_some(), a < b);
        prop_assert_eq!(compare(&value, Operator::GreaterThanEqualTo, &rhs).is_some(), a >= b);
        prop_assert_eq!(compare(&value, Operator::NotEqualTo, &rhs).is_some(), a != b);
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    /// Property: once active, a blacklist stays active
    #[test]
    fn prop_blacklist_monotonic(
        threshold in 0u32..5,
        exps in proptest::collection::vec(0u8..8, 1..30)
    ) {
        let ledger = CreditLedger::new();
        let mut was_active = false;
        let mut distinct = std::collections::HashSet::new();

        for exp in exps {
            distinct.insert(exp);
            let flag = Flag { experiment_id: u64::from(exp), description: String::new() };
            let active = ledger.record_violation("W1", 1, &format!("exp-{exp}"), flag, threshold);

            prop_assert!(!was_active || active);
            prop_assert_eq!(active, was_active || distinct.len() > threshold as usize);
            was_active = active;
        }
    }

    /// Property: re-running rewards never changes the bonus total
    #[test]
    fn prop_reward_idempotent(values in arb_reaction_times(), runs in 1usize..5) {
        let mut catalog = Catalog::new();
        catalog.add_variable(ExperimentVariable::new(
            1,
            "mean_rt",
            VariableKind::Numeric { min: None, max: None },
        ));
        catalog.add_template(
            ExperimentTemplate::builder("stroop", "Stroop").performance_variable(1).build(),
        );
        catalog.add_experiment(
            Experiment::new(1, "stroop")
                .with_bonus(true)
                .with_condition(CreditCondition::new(1, 1, Operator::LessThan, "3000").with_amount(0.75)),
        );
        catalog.add_battery(Battery::builder(1, "B").experiments([1]).bonus_active(true).build());

        let (result, _) = jspsych_result(&values);
        let ledger = CreditLedger::new();
        let evaluator = CreditEvaluator::new(&catalog, &ledger);
        for _ in 0..runs {
            let _ = evaluator.experiment_reward(&result);
        }

        let total = ledger.bonus("W1", 1).unwrap().total();
        prop_assert!((total - 0.75).abs() < f64::EPSILON);
    }
}
