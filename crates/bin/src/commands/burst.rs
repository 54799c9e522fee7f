//! Burst command - concurrent increments against the g-counter group.

use std::{sync::Arc, time::Duration};

use converge::{CrdtKind, ReplicaClient, ScenarioRunner, Value, scenario::NullObserver};

use crate::cli::BurstArgs;
use crate::output::{OutputFormat, print_json};

/// Run the burst command
pub async fn run(args: &BurstArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args.source)?;
    let scenario = config
        .scenario(CrdtKind::GCounter)?
        .with_settle_delay(Duration::from_millis(args.settle_ms));
    let expected = (args.ops * scenario.replicas.len()) as i64;

    let client: Arc<dyn ReplicaClient> = Arc::new(config.client()?);
    let mut runner = ScenarioRunner::new(scenario, client);
    let report = runner.run_burst(args.ops, &mut NullObserver).await;

    let verdict = &report.final_verdict;
    let total_matches = verdict.agreed_value().and_then(Value::as_scalar) == Some(expected);
    let passed = report.converged() && total_matches;

    match format {
        OutputFormat::Human => {
            for snapshot in &verdict.snapshots {
                println!("{}: {}", snapshot.replica, snapshot.value);
            }
            println!(
                "{} ops sent, {} failed, expected total {expected}",
                report.results().count(),
                report.operation_failures()
            );
            println!("converged: {}", report.converged());
            println!("total matches: {total_matches}");
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "ops": report.results().count(),
            "failures": report.operation_failures(),
            "expected": expected,
            "converged": report.converged(),
            "total_matches": total_matches,
            "final": verdict,
        }))?,
    }

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
