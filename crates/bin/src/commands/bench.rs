//! Bench command - sequential latency figures per replica group.

use std::sync::Arc;

use converge::{ReplicaClient, metrics::MetricsCollector};

use crate::cli::BenchArgs;
use crate::output::{OutputFormat, millis, print_json, print_table};

/// Run the bench command
pub async fn run(args: &BenchArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args.source)?;
    let ops = args.ops.unwrap_or(config.bench.ops);
    let client: Arc<dyn ReplicaClient> = Arc::new(config.client()?);
    let collector = MetricsCollector::new(client);

    let mut reports = Vec::new();
    for kind in super::selected_kinds(&config, &args.kinds) {
        let endpoints = config.group(kind)?.endpoints()?;
        let Some(endpoint) = endpoints.first() else {
            continue;
        };
        reports.push(collector.benchmark(endpoint, ops).await);
    }

    match format {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = reports
                .iter()
                .map(|r| {
                    vec![
                        r.kind.to_string(),
                        r.replica.clone(),
                        r.ops.to_string(),
                        r.failures.to_string(),
                        millis(r.mean),
                        millis(r.p95.as_ref().ok().copied()),
                        r.final_value.to_string(),
                    ]
                })
                .collect();
            print_table(
                &["KIND", "REPLICA", "OPS", "FAILED", "MEAN MS", "P95 MS", "FINAL"],
                &rows,
            );
        }
        OutputFormat::Json => print_json(&reports)?,
    }

    Ok(())
}
