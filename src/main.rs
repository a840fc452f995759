use clap::{Parser, Subcommand};
use model_thumbs::{config, fetch, process};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "model-thumbs")]
#[command(about = "Thumbnail pipeline for the model catalog")]
#[command(long_about = "\
Thumbnail pipeline for the model catalog

Reads one JSON record per model, derives display thumbnails for every
referenced image, and writes the thumbnail paths back into the records.
Thumbnail names are content-addressed, so anything generated before — in
the local output, the persisted cache, or the published remote cache — is
reused instead of rebuilt.

Record layout:

  data/models/
  ├── 4x-Example.json          # Record id is the filename stem
  └── 1x-Other.json

Each record's first image drives its main card thumbnail: an LR/SR crop
pair for upscaling models, a ratio-clamped cover for everything else.
Every image additionally gets a small gallery thumbnail.

Run 'model-thumbs gen-config' to generate a documented thumbs.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "thumbs.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate thumbnails for every model record
    Generate {
        /// Skip all remote endpoints (published cache, size metadata,
        /// cache archive); sources must already be downloaded
        #[arg(long)]
        offline: bool,

        /// Override the model record directory
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Override the output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Print a stock thumbs.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            offline,
            models_dir,
            output_dir,
            cache_dir,
        } => {
            let mut config = config::PipelineConfig::load(&cli.config)?;
            if offline {
                config.disable_remote();
            }
            if let Some(dir) = models_dir {
                config.paths.models_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }
            if let Some(dir) = cache_dir {
                config.paths.cache_dir = dir;
            }
            let remote = fetch::HttpRemote::new();
            process::run(&config, &remote)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
