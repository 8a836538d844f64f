//! CLI entry point for the vidloader tool.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use vidloader_core::{
    Acquisition, DashPageFactory, FfmpegMuxer, FfprobeProbe, LoaderFactory, LoaderRegistry,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let options = args.to_options();
    options.validate()?;

    let muxer = FfmpegMuxer::from_path().context("ffmpeg is required to merge tracks")?;
    let probe = FfprobeProbe::from_path().context("ffprobe is required to measure tracks")?;

    // Browser-driven site loaders register here; redirects to manifest
    // hosts are served by the DASH loader.
    let mut registry = LoaderRegistry::new();
    for suffix in &args.manifest_host {
        registry.register(suffix, Box::new(DashPageFactory));
    }
    debug!(?registry, "loaders registered");

    let factory: &dyn LoaderFactory = registry
        .find_for_url(&args.url)
        .unwrap_or(&DashPageFactory);
    let page = factory.create(&options)?;
    info!(url = %args.url, loader = factory.name(), "vidloader starting");

    let acquisition = Acquisition::new(&registry, options, &muxer, &probe);

    if args.playlist {
        let outcomes = acquisition.run_playlist(page, &args.url).await?;
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(path) => println!("{}", path.display()),
                Err(error) => warn!(url = %outcome.url, error = %error, "video not saved"),
            }
        }
        if failed > 0 {
            bail!("{failed} of {} videos failed", outcomes.len());
        }
    } else {
        let saved = acquisition.run(page, &args.url).await?;
        println!("{}", saved.display());
    }

    Ok(())
}
