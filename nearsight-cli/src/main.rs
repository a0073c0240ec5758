// Nearsight Command Line Interface
// Runs the depth/detection fusion pipeline over recorded frames

mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nearsight_eye::camera::load_depth_png;
use nearsight_eye::processing::sampler::sample;
use nearsight_eye::{FusionPipeline, ReplaySource, SidecarDetector};
use settings::Overrides;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nearsight")]
#[command(about = "Rank nearby objects by fusing detections with depth frames", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ~/.nearsight/config.toml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fusion pipeline over a recorded frame sequence
    Run {
        /// Directory of frame_NNNNN_depth.png / frame_NNNNN_color.png pairs
        #[arg(long)]
        frames: PathBuf,

        /// Directory of frame_NNNNN_detections.json files (defaults to --frames)
        #[arg(long)]
        detections: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Sample the depth around one pixel of a 16-bit depth image
    Sample {
        /// Depth image path
        #[arg(long)]
        depth: PathBuf,

        #[arg(long)]
        x: f32,

        #[arg(long)]
        y: f32,

        /// Neighborhood radius (defaults to the configured radius)
        #[arg(long)]
        radius: Option<u32>,
    },

    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { frames, detections, overrides } => {
            let config = settings::resolve(cli.config.as_deref(), &overrides)?;
            run_pipeline(config, frames, detections).await?;
        }
        Commands::Sample { depth, x, y, radius } => {
            let config = settings::resolve(cli.config.as_deref(), &Overrides::default())?;
            let radius = radius.unwrap_or(config.fusion.sample_radius);
            let map = load_depth_png(&depth)
                .with_context(|| format!("Failed to read depth image {}", depth.display()))?;

            match sample(&map, x, y, radius) {
                Some(mm) => println!("{} mm", mm),
                None => println!("NA"),
            }
        }
        Commands::Config { overrides } => {
            let config = settings::resolve(cli.config.as_deref(), &overrides)?;
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

async fn run_pipeline(
    config: nearsight_eye::PipelineConfig,
    frames: PathBuf,
    detections: Option<PathBuf>,
) -> anyhow::Result<()> {
    let detection_dir = detections.unwrap_or_else(|| frames.clone());
    let detector = SidecarDetector::new(&detection_dir)
        .with_context(|| format!("Failed to open detections in {}", detection_dir.display()))?;
    let mut pipeline = FusionPipeline::from_config(&config, detector)
        .context("Failed to initialize fusion pipeline")?;
    let mut source = ReplaySource::new(&frames);

    let stop = pipeline.stop_signal();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current frame");
                stop.request_stop();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });

    let stats = tokio::task::spawn_blocking(move || pipeline.run(&mut source))
        .await
        .context("Fusion pipeline thread panicked")??;

    info!(
        "Done: {} frames processed, {} skipped, {} detector failures, {} sink failures",
        stats.frames_processed, stats.frames_skipped, stats.detector_failures, stats.sink_failures
    );
    Ok(())
}
