//! CLI argument definitions for the Converge binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use converge::CrdtKind;

use crate::output::OutputFormat;

/// Output format flag
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum FormatArg {
    /// Aligned tables and one line per event
    #[default]
    Human,
    /// One JSON document per report
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Human => OutputFormat::Human,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Convergence verification for replicated CRDT services
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(about = "Converge: drive CRDT replicas over HTTP and check that they agree")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the convergence scenario for each selected replica group
    Run(RunArgs),
    /// Measure sequential operation latency against one replica per group
    Bench(BenchArgs),
    /// Hammer the g-counter group concurrently and check the total
    Burst(BurstArgs),
    /// Print the effective configuration as JSON
    Config(ConfigArgs),
}

/// Options shared by every command that reads the harness configuration
#[derive(clap::Args, Debug)]
pub struct ConfigSource {
    /// JSON configuration file; the built-in local layout is used without one
    #[arg(short, long, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "CONVERGE_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,
}

/// Arguments for the run command
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Replica groups to check; all configured groups when omitted
    #[arg(short, long = "kind")]
    pub kinds: Vec<CrdtKind>,

    /// Operation rounds per scenario
    #[arg(short, long, env = "CONVERGE_STEPS")]
    pub steps: Option<usize>,

    /// Pause between a step and its poll
    #[arg(long, env = "CONVERGE_STEP_DELAY_MS")]
    pub step_delay_ms: Option<u64>,

    /// Settle wait before the final poll, in step delays
    #[arg(long)]
    pub settle_factor: Option<u32>,

    /// Seed for operation selection
    #[arg(long, env = "CONVERGE_SEED")]
    pub seed: Option<u64>,

    /// Skip the informational poll after each step
    #[arg(long)]
    pub no_step_polls: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,
}

/// Arguments for the bench command
#[derive(clap::Args, Debug)]
pub struct BenchArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Replica groups to benchmark; all configured groups when omitted
    #[arg(short, long = "kind")]
    pub kinds: Vec<CrdtKind>,

    /// Round trips per replica
    #[arg(short, long, env = "CONVERGE_BENCH_OPS")]
    pub ops: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,
}

/// Arguments for the burst command
#[derive(clap::Args, Debug)]
pub struct BurstArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Increments sent back-to-back to each replica
    #[arg(short, long, default_value_t = 50)]
    pub ops: usize,

    /// Wait before the final poll
    #[arg(long, default_value_t = 3000)]
    pub settle_ms: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}
