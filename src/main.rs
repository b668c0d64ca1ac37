use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use raster_window_map::cli::{Args, TransformKind};
use raster_window_map::{GdalBackend, RasterProcessor, Result};
use std::process::ExitCode;

fn run(args: &Args) -> Result<()> {
    let options = args.map_options();

    if args.transform == TransformKind::FocalMean {
        warn!("Focal means are computed per tile and are truncated along tile seams");
    }

    let transform = args.build_transform();
    let processor = RasterProcessor::new(GdalBackend);

    info!("Mapping {:?} over {} -> {}", args.transform, args.input, args.output);
    let summary = processor.map(&*transform, &args.input, &args.output, &options)?;
    info!(
        "Processed {} band(s): {} tile(s) written, {} skipped",
        summary.bands, summary.tiles_written, summary.tiles_skipped
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== Raster Window Map ===");

    match run(&args) {
        Ok(()) => {
            info!("=== Done! ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.kind().code() as u8)
        }
    }
}
