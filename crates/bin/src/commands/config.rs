//! Config command - prints the effective configuration.

use crate::cli::ConfigArgs;

/// Run the config command
pub async fn run(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args.source)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
