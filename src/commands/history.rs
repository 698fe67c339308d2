use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use falgen::config::Config;
use falgen::ledger::{CostLedger, Generation, History};

use super::estimate::source_label;
use super::{format_cost, truncate};

/// Execute the history command
pub async fn execute(cfg: &Config, limit: usize, json: bool) -> Result<()> {
    let ledger = CostLedger::new(cfg.history_path()?);
    let history = ledger.load_history().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.generations.is_empty() {
        println!("{}", "No generations recorded yet".yellow());
    } else {
        println!(
            "Recent generations ({} of {}):",
            limit.min(history.generations.len()),
            history.generations.len()
        );
        println!("{}", generations_table(&history, limit));
    }

    println!();
    println!("{}", "Spend:".bold());
    println!("{}", totals_table(&history));
    Ok(())
}

/// Execute the last command
pub async fn last(cfg: &Config, json: bool) -> Result<()> {
    let ledger = CostLedger::new(cfg.history_path()?);

    let Some(generation) = ledger.get_last_generation().await else {
        println!("{}", "No generations recorded yet".yellow());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&generation)?);
    } else {
        print_generation(&generation);
    }
    Ok(())
}

fn generations_table(history: &History, limit: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("WHEN").fg(Color::Cyan),
        Cell::new("MODEL").fg(Color::Cyan),
        Cell::new("PROMPT").fg(Color::Cyan),
        Cell::new("COST").fg(Color::Cyan),
        Cell::new("SOURCE").fg(Color::Cyan),
        Cell::new("OUTPUT").fg(Color::Cyan),
    ]);

    for generation in history.recent(limit) {
        let source = generation
            .cost_details
            .as_ref()
            .map(|details| details.estimate_source.as_str())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(
                generation
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
            ),
            Cell::new(&generation.model),
            Cell::new(truncate(&generation.prompt, 40)),
            Cell::new(format_cost(generation.cost, generation.currency())),
            Cell::new(source),
            Cell::new(&generation.output_path),
        ]);
    }

    table
}

fn totals_table(history: &History) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    table.set_header(vec![
        Cell::new("CURRENCY").fg(Color::Cyan),
        Cell::new("SESSION").fg(Color::Cyan),
        Cell::new("TODAY").fg(Color::Cyan),
        Cell::new("ALL TIME").fg(Color::Cyan),
    ]);

    for (currency, totals) in &history.total_cost {
        table.add_row(vec![
            Cell::new(currency),
            Cell::new(format_cost(totals.session, currency)),
            Cell::new(format_cost(totals.today, currency)),
            Cell::new(format_cost(totals.all_time, currency)),
        ]);
    }

    table
}

fn print_generation(generation: &Generation) {
    println!("{} {}", "Generation".bold(), generation.id);
    println!(
        "  When:      {}",
        generation.timestamp.with_timezone(&Local).to_rfc2822()
    );
    println!("  Model:     {}", generation.model);
    println!("  Prompt:    {}", generation.prompt);
    if !generation.aspect.is_empty() {
        println!("  Aspect:    {}", generation.aspect);
    }
    if !generation.resolution.is_empty() {
        println!("  Size:      {}", generation.resolution);
    }
    println!("  Output:    {}", generation.output_path);
    if let Some(seed) = generation.seed {
        println!("  Seed:      {}", seed);
    }
    if let Some(source) = &generation.edited_from {
        println!("  Edited:    {}", source);
    }
    print!(
        "  Cost:      {}",
        format_cost(generation.cost, generation.currency())
    );
    match &generation.cost_details {
        Some(details) => println!(" ({})", source_label(details.estimate_source)),
        None => println!(),
    }
}
