//! Credit Pipeline: from experiment config to bonus payment
//!
//! This example registers two experiment templates from `config.json`
//! entries, deploys them as a battery, simulates a worker completing both
//! experiments and lets the job runner approve the assignment and pay the
//! bonus through a console-only labor market.
//!
//! Run with: cargo run --example credit_pipeline
//! Log level: RUST_LOG=expfactory_credit=debug

use std::sync::Arc;

use anyhow::Context;
use expfactory_credit::jobs::{ChannelJobQueue, JobRunner, LaborMarket};
use expfactory_credit::model::{Battery, CreditCondition, Experiment, ExperimentTemplate, Operator, ResultRecord};
use expfactory_credit::telemetry::init_tracing;
use expfactory_credit::{Engine, EngineConfig, NextStep};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

/// Labor market that only prints what it would do.
struct ConsoleMarket;

impl LaborMarket for ConsoleMarket {
    async fn approve_assignment(&self, worker_id: &str, battery_id: u64) -> expfactory_credit::Result<bool> {
        println!("  [market] approve assignment of {worker_id} for battery {battery_id}");
        Ok(true)
    }

    async fn grant_bonus(
        &self,
        worker_id: &str,
        _battery_id: u64,
        amount: f64,
        reason: &str,
    ) -> expfactory_credit::Result<()> {
        println!("  [market] pay ${amount:.2} to {worker_id}:");
        for line in reason.lines() {
            println!("           {line}");
        }
        Ok(())
    }

    async fn update_assignments(&self, hit_id: &str) -> expfactory_credit::Result<()> {
        println!("  [market] refresh HIT {hit_id}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    println!("=== expfactory-credit pipeline ===\n");

    let config = EngineConfig::builder()
        .credit_countdown_secs(1)
        .build()
        .context("invalid engine config")?;
    let (queue, receiver) = ChannelJobQueue::channel();
    let mut engine = Engine::new(config).with_queue(Arc::new(queue));

    // Templates from experiment config.json entries
    let entries = [
        json!({
            "exp_id": "stroop", "name": "Stroop", "time": 5, "template": "jspsych",
            "experiment_variables": [
                {"name": "mean_rt", "type": "bonus", "datatype": "numeric"},
                {"name": "credit_var", "type": "credit", "datatype": "boolean"}
            ]
        }),
        json!({
            "exp_id": "flanker", "name": "Flanker", "time": 4, "template": "jspsych",
            "experiment_variables": [
                {"name": "mean_rt", "type": "bonus", "datatype": "numeric"}
            ]
        }),
    ];

    let mut next_id = 0;
    let catalog = engine.catalog_mut();
    for (experiment_id, entry) in (1..).zip(&entries) {
        let (template, variables) = ExperimentTemplate::from_config(entry, || {
            next_id += 1;
            next_id
        })?;
        let mut experiment = Experiment::new(experiment_id, template.exp_id())
            .with_order(i32::try_from(experiment_id)?)
            .with_bonus(true)
            .with_catch(true);
        if let Some(performance) = template.performance_variable() {
            experiment = experiment.with_condition(
                CreditCondition::new(experiment_id, performance, Operator::LessThan, "600")
                    .with_amount(0.75),
            );
        }
        if let Some(rejection) = template.rejection_variable() {
            experiment = experiment.with_condition(CreditCondition::new(
                experiment_id + 100,
                rejection,
                Operator::Equals,
                "true",
            ));
        }
        println!(
            "Registered {} ({} variables, {} conditions)",
            template.exp_id(),
            variables.len(),
            experiment.credit_conditions().len()
        );
        for variable in variables {
            catalog.add_variable(variable);
        }
        catalog.add_template(template);
        catalog.add_experiment(experiment);
    }
    catalog.add_battery(
        Battery::builder(1, "Cognitive Control")
            .experiments([1, 2])
            .presentation_order(expfactory_credit::model::PresentationOrder::Specified)
            .blacklist(Some(3))
            .bonus_active(true)
            .build(),
    );

    let engine = Arc::new(engine);
    let market = Arc::new(ConsoleMarket);
    let mut runner = JobRunner::new(Arc::clone(&engine), market, receiver);
    let mut rng = StdRng::seed_from_u64(2024);

    println!("\n=== Worker A1B2C3 takes the battery ===");
    let mut result_id = 0;
    loop {
        match engine.next_experiments("A1B2C3", 1, &mut rng)? {
            NextStep::Present(experiments) => {
                for experiment in experiments {
                    result_id += 1;
                    println!("  presenting {}", experiment.template_id());
                    let trials = (0..20)
                        .map(|i| json!({"trialdata": {"rt": 420 + i * 7, "credit_var": false}}))
                        .collect();
                    engine.results().insert(
                        ResultRecord::new(result_id, "A1B2C3", 1, experiment.template_id())
                            .with_taskdata(trials),
                    );
                    engine.finish_result(result_id, Some("1.0.0"))?;
                }
            }
            NextStep::BatteryComplete => {
                println!("  battery complete");
                break;
            }
            other => anyhow::bail!("unexpected step: {other:?}"),
        }
    }

    println!("\n=== Running credit jobs ===");
    let failed = runner.run_until_idle().await;
    println!("  failed jobs: {failed}");

    let bonus = engine
        .ledger()
        .bonus("A1B2C3", 1)
        .context("worker earned no bonus")?;
    println!("\nBonus total: ${:.2} (granted: {})", bonus.total(), bonus.granted());
    println!("Blacklisted: {}", engine.ledger().is_blacklisted("A1B2C3", 1));

    Ok(())
}
