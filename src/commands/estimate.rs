use anyhow::Result;
use colored::{ColoredString, Colorize};
use std::sync::Arc;
use tracing::info;

use falgen::config::Config;
use falgen::credentials::CredentialProvider;
use falgen::pricing::{
    self, BackgroundRemovalParams, CostEstimate, EstimateRequest, EstimateSource,
    GenerationParams, UpscaleParams,
};

use super::format_cost;
use crate::cli::EstimateCommands;

/// Execute the estimate command
pub async fn execute(
    cfg: &Config,
    credentials: Arc<dyn CredentialProvider>,
    kind: EstimateCommands,
) -> Result<()> {
    let (request, json) = request_for(kind);
    let engine = pricing::build_engine(cfg, credentials)?;

    info!("Estimating cost for {}", request.model());
    let estimate = engine.estimate(&request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        print_estimate(&request, &estimate);
    }
    Ok(())
}

fn request_for(kind: EstimateCommands) -> (EstimateRequest, bool) {
    match kind {
        EstimateCommands::Generate {
            model,
            resolution,
            num_images,
            edit,
            json,
        } => {
            let mut params = GenerationParams::new(model);
            params.resolution = resolution;
            params.num_images = num_images;
            params.edit = edit;
            (EstimateRequest::Generation(params), json)
        }
        EstimateCommands::Upscale {
            model,
            scale,
            width,
            height,
            json,
        } => {
            let mut params = UpscaleParams::new(model, scale);
            params.input_width = width;
            params.input_height = height;
            (EstimateRequest::Upscale(params), json)
        }
        EstimateCommands::RemoveBg { model, json } => (
            EstimateRequest::BackgroundRemoval(BackgroundRemovalParams { model }),
            json,
        ),
    }
}

fn print_estimate(request: &EstimateRequest, estimate: &CostEstimate) {
    println!(
        "{} {}",
        "Estimated cost:".bold(),
        format_cost(estimate.amount, &estimate.currency).green().bold()
    );
    println!("  Model:     {}", request.model());
    println!("  Endpoint:  {}", estimate.endpoint_id);
    println!(
        "  Quantity:  {} ({})",
        estimate.unit_quantity,
        estimate.estimate_type.as_str()
    );
    if let Some(unit_price) = estimate.unit_price {
        println!("  Unit:      {}", format_cost(unit_price, &estimate.currency));
    }
    println!("  Source:    {}", source_label(estimate.estimate_source));
}

pub fn source_label(source: EstimateSource) -> ColoredString {
    match source {
        EstimateSource::Estimate => source.as_str().green(),
        EstimateSource::Pricing => source.as_str().yellow(),
        EstimateSource::Fallback => source.as_str().red(),
    }
}
