use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("converge=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(&args, args.format.into()).await,
        Commands::Bench(args) => commands::bench::run(&args, args.format.into()).await,
        Commands::Burst(args) => commands::burst::run(&args, args.format.into()).await,
        Commands::Config(args) => commands::config::run(&args).await,
    };

    if let Err(err) = &result {
        if let Some(err) = err.downcast_ref::<converge::Error>() {
            tracing::error!(
                module = err.module(),
                config = err.is_config_error(),
                transport = err.is_transport_failure(),
                "{err}"
            );
        }
    }
    result
}
