//! Run command - executes the convergence scenario for each replica group.

use std::sync::Arc;

use converge::{
    ConvergenceVerdict, CrdtKind, ReplicaClient, ScenarioReport, ScenarioRunner,
    scenario::{Phase, ScenarioObserver, StepReport},
};

use crate::cli::RunArgs;
use crate::output::{OutputFormat, print_json, print_table};

/// Prints progress as the scenario runs.
struct ConsoleObserver;

impl ScenarioObserver for ConsoleObserver {
    fn on_phase(&mut self, kind: CrdtKind, phase: Phase) {
        match phase {
            Phase::Init => println!("== {kind} =="),
            Phase::SyncWait => println!("[{kind}] waiting for replicas to settle"),
            _ => {}
        }
    }

    fn on_step(&mut self, report: &StepReport) {
        let agreement = match &report.verdict {
            Some(v) if v.equal => "agree",
            Some(_) => "differ",
            None => "not polled",
        };
        println!(
            "[{}] step {}: {} ops, {} failed, replicas {}",
            report.kind,
            report.step,
            report.results.len(),
            report.failures(),
            agreement
        );
    }

    fn on_verdict(&mut self, verdict: &ConvergenceVerdict) {
        print_snapshots(verdict);
        let status = if verdict.equal {
            "CONVERGED"
        } else {
            "NOT CONVERGED"
        };
        println!("[{}] {status}", verdict.kind);
        println!();
    }
}

fn print_snapshots(verdict: &ConvergenceVerdict) {
    let rows: Vec<Vec<String>> = verdict
        .snapshots
        .iter()
        .map(|s| {
            vec![
                s.replica.clone(),
                s.value.to_string(),
                s.error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["REPLICA", "VALUE", "ERROR"], &rows);
}

fn report_json(report: &ScenarioReport) -> serde_json::Value {
    let steps: Vec<serde_json::Value> = report
        .steps
        .iter()
        .map(|s| {
            serde_json::json!({
                "step": s.step,
                "ops": s.results.len(),
                "failures": s.failures(),
                "equal": s.verdict.as_ref().map(|v| v.equal),
            })
        })
        .collect();
    serde_json::json!({
        "kind": report.kind,
        "converged": report.converged(),
        "operation_failures": report.operation_failures(),
        "steps": steps,
        "final": report.final_verdict,
    })
}

/// Run the run command
pub async fn run(args: &RunArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(&args.source)?;
    let settings = &mut config.scenario;
    if let Some(steps) = args.steps {
        settings.steps = steps;
    }
    if let Some(delay) = args.step_delay_ms {
        settings.step_delay_ms = delay;
    }
    if let Some(factor) = args.settle_factor {
        settings.settle_factor = factor;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if args.no_step_polls {
        settings.poll_each_step = false;
    }

    let client: Arc<dyn ReplicaClient> = Arc::new(config.client()?);
    let mut all_converged = true;

    for kind in super::selected_kinds(&config, &args.kinds) {
        let scenario = config.scenario(kind)?;
        let mut runner = ScenarioRunner::new(scenario, Arc::clone(&client));
        let report = match format {
            OutputFormat::Human => runner.run_observed(&mut ConsoleObserver).await,
            OutputFormat::Json => runner.run().await,
        };
        if format == OutputFormat::Json {
            print_json(&report_json(&report))?;
        }
        all_converged &= report.converged();
    }

    if !all_converged {
        std::process::exit(1);
    }
    Ok(())
}
