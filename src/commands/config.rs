use anyhow::Result;
use colored::Colorize;
use falgen::config::Config;
use falgen::credentials::{CredentialProvider, EnvCredential};
use falgen::pricing::catalog::{self, ModelKind};
use tracing::info;

/// Execute the config show command
///
/// Prints the effective configuration, with the resolved storage directory
pub fn show(cfg: &Config) -> Result<()> {
    info!("Displaying configuration");

    let mut resolved = cfg.clone();
    resolved.storage.dir = Some(cfg.storage_dir()?);

    println!("{}", "Current Configuration:".green().bold());
    println!();
    println!("{}", toml::to_string_pretty(&resolved)?);
    Ok(())
}

/// Execute the config validate command
///
/// Loading already validated the file; this reports what it resolved to.
pub fn validate(cfg: &Config) -> Result<()> {
    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  API:           {}", cfg.api.base_url);
    println!("  API key:       {}", key_status(cfg));
    println!("  Cache TTL:     {}h", cfg.pricing.cache_ttl_hours);
    println!("  History:       {}", cfg.history_path()?.display());
    println!(
        "  Models:        {} generation, {} upscale, {} background removal",
        catalog::models_of_kind(ModelKind::Generation).count(),
        catalog::models_of_kind(ModelKind::Upscale).count(),
        catalog::models_of_kind(ModelKind::BackgroundRemoval).count()
    );

    info!("Configuration validation successful");
    Ok(())
}

fn key_status(cfg: &Config) -> String {
    let env = EnvCredential::new(cfg.api.api_key_env.clone());
    match env.api_key() {
        Some(_) => format!("set via {}", cfg.api.api_key_env),
        None => format!("{} not set (estimates use fallback rates)", cfg.api.api_key_env)
            .yellow()
            .to_string(),
    }
}
