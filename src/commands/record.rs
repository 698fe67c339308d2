use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use falgen::config::Config;
use falgen::credentials::CredentialProvider;
use falgen::ledger::{CostLedger, Generation};
use falgen::pricing::catalog::{self, ModelKind};
use falgen::pricing::{
    self, BackgroundRemovalParams, CostEstimate, EstimateRequest, GenerationParams,
    UpscaleParams,
};

use super::format_cost;
use crate::cli::RecordArgs;

/// Execute the record command
///
/// Prices the operation through the estimation chain for the model's kind and
/// appends it to the history. A failed write exits non-zero.
pub async fn execute(
    cfg: &Config,
    credentials: Arc<dyn CredentialProvider>,
    args: RecordArgs,
) -> Result<()> {
    let engine = pricing::build_engine(cfg, credentials)?;

    let estimate = engine.estimate(&request_for(&args)).await;

    let generation = build_generation(&args, estimate);
    let ledger = CostLedger::new(cfg.history_path()?);
    let history = ledger.add_generation(generation.clone()).await?;
    info!("Recorded generation {}", generation.id);

    println!(
        "{} {} ({})",
        "✓ Recorded".green(),
        generation.id,
        format_cost(generation.cost, generation.currency())
    );
    if let Some(totals) = history.total_cost.get(generation.currency()) {
        println!(
            "  Session: {}  Today: {}  All time: {}",
            format_cost(totals.session, generation.currency()),
            format_cost(totals.today, generation.currency()),
            format_cost(totals.all_time, generation.currency())
        );
    }
    Ok(())
}

/// Estimate request matching the catalog kind of the recorded model.
///
/// Models outside the catalog are priced as generations.
fn request_for(args: &RecordArgs) -> EstimateRequest {
    let kind = catalog::lookup(&args.model).map(|entry| entry.kind);
    match kind {
        Some(ModelKind::Upscale) => {
            let mut params = UpscaleParams::new(args.model.clone(), args.scale);
            params.input_width = args.width;
            params.input_height = args.height;
            EstimateRequest::Upscale(params)
        }
        Some(ModelKind::BackgroundRemoval) => {
            EstimateRequest::BackgroundRemoval(BackgroundRemovalParams {
                model: args.model.clone(),
            })
        }
        Some(ModelKind::Generation) | None => {
            let mut params = GenerationParams::new(args.model.clone());
            params.resolution = args.resolution.clone();
            params.num_images = args.num_images;
            params.edit = args.edited_from.is_some();
            EstimateRequest::Generation(params)
        }
    }
}

fn build_generation(args: &RecordArgs, estimate: CostEstimate) -> Generation {
    let mut generation = Generation::new(
        args.prompt.clone(),
        args.model.clone(),
        args.output.display().to_string(),
        estimate,
    )
    .with_aspect(args.aspect.clone());

    if let Some(resolution) = &args.resolution {
        generation = generation.with_resolution(resolution.clone());
    }
    if let Some(seed) = args.seed {
        generation = generation.with_seed(seed);
    }
    if let Some(source) = &args.edited_from {
        generation = generation.with_edited_from(source.clone());
    }
    generation
}
