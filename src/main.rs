use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use falgen::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    // Needs no configuration
    if let cli::Commands::Version = args.command {
        print_version();
        return Ok(());
    }

    let cfg = config::load_config(args.config.as_deref())?;
    init_tracing(args.verbose, cfg.logging.format);
    let credentials = commands::credentials(&cfg, args.api_key);

    // Dispatch to appropriate command handler
    match args.command {
        cli::Commands::Estimate { kind } => {
            commands::estimate::execute(&cfg, credentials, kind).await?;
        }
        cli::Commands::Record(record) => {
            commands::record::execute(&cfg, credentials, record).await?;
        }
        cli::Commands::History { limit, json } => {
            commands::history::execute(&cfg, limit, json).await?;
        }
        cli::Commands::Last { json } => {
            commands::history::last(&cfg, json).await?;
        }
        cli::Commands::Pricing { action } => match action {
            cli::PricingCommands::Show => commands::pricing::show(&cfg, credentials).await?,
            cli::PricingCommands::Refresh { endpoint_ids } => {
                commands::pricing::refresh(&cfg, credentials, endpoint_ids).await?
            }
        },
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&cfg)?,
            cli::ConfigCommands::Validate => commands::config::validate(&cfg)?,
        },
        cli::Commands::Version => print_version(),
    }

    Ok(())
}

fn print_version() {
    println!("falgen v{}", env!("CARGO_PKG_VERSION"));
}
