use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "falgen", version, about = "Image generation cost estimates and spend history")]
pub struct Cli {
    /// Configuration file path (defaults to config.toml in the config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API key; overrides the environment variable named by api.api_key_env
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Estimate the cost of an operation
    Estimate {
        #[command(subcommand)]
        kind: EstimateCommands,
    },

    /// Record a completed generation in the history
    Record(RecordArgs),

    /// Show recent generations and spend totals
    History {
        /// Number of generations to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent generation
    Last {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or refresh the pricing cache
    Pricing {
        #[command(subcommand)]
        action: PricingCommands,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EstimateCommands {
    /// Image generation or editing
    Generate {
        /// Model alias or endpoint id
        model: String,

        /// Output resolution, e.g. 1K, 2K, 4K
        #[arg(short, long)]
        resolution: Option<String>,

        /// Number of images
        #[arg(short = 'n', long, default_value = "1")]
        num_images: u32,

        /// Price the model's edit endpoint
        #[arg(long)]
        edit: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Image upscaling
    Upscale {
        model: String,

        /// Linear scale factor
        #[arg(short, long, default_value = "2")]
        scale: f64,

        /// Input width in pixels
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Input height in pixels
        #[arg(long, requires = "width")]
        height: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Background removal
    RemoveBg {
        model: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct RecordArgs {
    /// Model alias or endpoint id
    pub model: String,

    /// Prompt used for the generation
    #[arg(short, long)]
    pub prompt: String,

    /// Where the image was saved
    #[arg(short, long)]
    pub output: PathBuf,

    /// Aspect ratio, e.g. 16:9
    #[arg(short, long, default_value = "1:1")]
    pub aspect: String,

    #[arg(short, long)]
    pub resolution: Option<String>,

    #[arg(short = 'n', long, default_value = "1")]
    pub num_images: u32,

    /// Linear scale factor, for upscale models
    #[arg(short, long, default_value = "2")]
    pub scale: f64,

    /// Input width in pixels, for upscale models
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Input height in pixels, for upscale models
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Source image when the generation was an edit
    #[arg(long)]
    pub edited_from: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PricingCommands {
    /// Display cached prices
    Show,

    /// Force a refresh of the given endpoints (all catalog models by default)
    Refresh {
        endpoint_ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Validate configuration file
    Validate,
}
