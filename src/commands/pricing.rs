use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::sync::Arc;

use falgen::config::Config;
use falgen::credentials::CredentialProvider;
use falgen::pricing::{self, catalog, CacheSnapshot, PricingCache};

use super::format_cost;

/// Execute the pricing show command
pub async fn show(cfg: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<()> {
    let engine = pricing::build_engine(cfg, credentials)?;
    let cache = engine.cache();

    let Some(snapshot) = cache.load().await else {
        println!(
            "{}",
            "No pricing cache yet; run `falgen pricing refresh`".yellow()
        );
        return Ok(());
    };

    print_snapshot(cache, &snapshot);
    Ok(())
}

/// Execute the pricing refresh command
///
/// With no ids, refreshes every endpoint in the model catalog. Exits non-zero
/// when no fresh prices could be fetched.
pub async fn refresh(
    cfg: &Config,
    credentials: Arc<dyn CredentialProvider>,
    endpoint_ids: Vec<String>,
) -> Result<()> {
    let engine = pricing::build_engine(cfg, credentials)?;
    let cache = engine.cache();

    let ids = if endpoint_ids.is_empty() {
        catalog::all_endpoint_ids()
    } else {
        endpoint_ids
    };

    println!("{}", format!("Refreshing {} endpoints...", ids.len()).yellow());
    let before = cache.load().await.map(|snapshot| snapshot.fetched_at);
    let prices = cache.get_or_refresh(&ids, true).await;
    let after = cache.load().await;

    let snapshot = match after {
        Some(snapshot) if refresh_succeeded(before.as_deref(), &snapshot) => snapshot,
        _ => bail!(
            "pricing refresh failed; cached prices (if any) left unchanged. Run with -v for details"
        ),
    };

    let found = ids.iter().filter(|id| prices.contains_key(*id)).count();
    println!(
        "{} {} of {} endpoints priced",
        "✓ Pricing refreshed:".green(),
        found,
        ids.len()
    );
    print_snapshot(cache, &snapshot);
    Ok(())
}

/// A forced refresh only rewrites the cache when the fetch succeeded.
fn refresh_succeeded(before: Option<&str>, after: &CacheSnapshot) -> bool {
    before != Some(after.fetched_at.as_str())
}

fn print_snapshot(cache: &PricingCache, snapshot: &CacheSnapshot) {
    let freshness = if cache.is_fresh(snapshot, Utc::now()) {
        "fresh".green()
    } else {
        "stale".red()
    };
    println!(
        "Pricing cache {} (fetched {}, {})",
        cache.path().display(),
        snapshot.fetched_at,
        freshness
    );

    let mut entries: Vec<_> = snapshot.prices.values().collect();
    entries.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ENDPOINT").fg(Color::Cyan),
        Cell::new("ALIAS").fg(Color::Cyan),
        Cell::new("UNIT PRICE").fg(Color::Cyan),
        Cell::new("UNIT").fg(Color::Cyan),
    ]);

    for entry in entries {
        let alias = catalog::lookup(&entry.endpoint_id)
            .map(|catalog_entry| catalog_entry.alias)
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(&entry.endpoint_id),
            Cell::new(alias),
            Cell::new(format_cost(entry.unit_price, &entry.currency)),
            Cell::new(&entry.unit),
        ]);
    }

    println!("{}", table);
}
