use clap::{Parser, Subcommand};
use gallery_optimizer::config::{self, OptimizerConfig};
use gallery_optimizer::process::{self, RunOutcome};
use gallery_optimizer::{output, scan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that encode assets.
#[derive(clap::Args, Clone, Default)]
struct CacheArgs {
    /// Disable the processing cache and re-encode every source
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "gallery-optimizer")]
#[command(about = "Optimize gallery images and GIFs for the web")]
#[command(long_about = "\
Optimize gallery images and GIFs for the web

Static images (jpg, jpeg, png, webp) are resized to a maximum width and
encoded as WebP and AVIF, with 480x480 square thumbnails. Animated GIFs are
transcoded to WebM (VP9, falling back to VP8, then to copying the GIF).
A JSON manifest lists every output per source.

Layout with the defaults:

  images/                          # Sources (never modified)
  images-optimized/
  ├── index.json                   # Manifest
  ├── trips/beach.webp             # Mirrors the source tree
  ├── trips/beach.avif
  ├── trips/party.webm
  └── thumbs/
      ├── trips/beach.webp
      └── trips/party.webm

Run 'gallery-optimizer gen-config' to generate a documented gallery.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, default_value = "gallery.toml", global = true)]
    config: PathBuf,

    /// Source directory (overrides paths.source)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Optimized output directory (overrides paths.optimized)
    #[arg(long, global = true)]
    optimized: Option<PathBuf>,

    /// Thumbnail output directory (overrides paths.thumbnails)
    #[arg(long, global = true)]
    thumbnails: Option<PathBuf>,

    /// Manifest file (overrides paths.manifest)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Optimize every source and write the manifest (default)
    Optimize(CacheArgs),
    /// List the sources that would be processed
    Scan,
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

impl Cli {
    /// Load the config file and apply command-line path overrides.
    fn resolve_config(&self) -> Result<OptimizerConfig, config::ConfigError> {
        let mut config = config::load_config(&self.config)?;
        let paths = &mut config.paths;
        if let Some(source) = &self.source {
            paths.source = source.clone();
        }
        if let Some(optimized) = &self.optimized {
            paths.optimized = optimized.clone();
        }
        if let Some(thumbnails) = &self.thumbnails {
            paths.thumbnails = thumbnails.clone();
        }
        if let Some(manifest) = &self.manifest {
            paths.manifest = manifest.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Command::Optimize(CacheArgs::default())) {
        Command::Optimize(cache_args) => {
            let config = cli.resolve_config()?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let outcome = process::process(&config, !cache_args.no_cache, Some(tx));
            printer.join().unwrap();
            match outcome? {
                RunOutcome::NoFiles => println!("No files found"),
                RunOutcome::Completed(summary) => output::print_run_summary(&summary),
            }
        }
        Command::Scan => {
            let config = cli.resolve_config()?;
            let paths = &config.paths;
            let result = scan::scan(
                &paths.source,
                &[paths.optimized.as_path(), paths.thumbnails.as_path()],
            )?;
            output::print_scan_output(&result);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
