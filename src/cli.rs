use crate::focal::FocalMean;
use crate::options::Compression;
use crate::process::MapOptions;
use crate::transform::{Identity, Threshold, ThresholdKind, Transform};
use clap::{Parser, ValueEnum};

/// Transform applied to every tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// Copy pixels unchanged
    Identity,
    /// Fixed-level threshold
    Threshold,
    /// Square-window mean
    FocalMean,
}

#[derive(Parser, Debug)]
#[command(name = "window-map")]
#[command(about = "Apply a per-tile transform to a raster in fixed-size, optionally overlapping windows")]
#[command(version)]
pub struct Args {
    /// Input raster path (any GDAL-readable format)
    #[arg(short, long, value_name = "FILE")]
    pub input: String,

    /// Output GeoTIFF path
    #[arg(short, long, value_name = "FILE")]
    pub output: String,

    /// Tile width in pixels (default: the input's natural block width)
    #[arg(long, value_name = "PIXELS", requires = "block_height")]
    pub block_width: Option<usize>,

    /// Tile height in pixels (default: the input's natural block height)
    #[arg(long, value_name = "PIXELS", requires = "block_width")]
    pub block_height: Option<usize>,

    /// Overlap between neighbouring tiles in pixels
    #[arg(short, long, value_name = "PIXELS")]
    pub buffer: Option<usize>,

    /// Write a sparse output and skip tiles that are entirely no-data
    #[arg(long)]
    pub skip_holes: bool,

    /// Output compression
    #[arg(long, value_enum, default_value_t = Compression::Lzw)]
    pub compression: Compression,

    /// Transform to run on each tile
    #[arg(short, long, value_enum, default_value_t = TransformKind::Identity)]
    pub transform: TransformKind,

    /// Threshold level (threshold transform)
    #[arg(long, default_value_t = 0.0)]
    pub threshold: f64,

    /// Value written above/below the threshold by the binary kinds
    #[arg(long, default_value_t = 0.0)]
    pub max_value: f64,

    /// Threshold rule
    #[arg(long, value_enum, default_value_t = ThresholdKind::ToZero)]
    pub threshold_kind: ThresholdKind,

    /// Window radius in pixels (focal-mean transform)
    #[arg(short, long, value_name = "PIXELS", default_value_t = 1)]
    pub radius: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn map_options(&self) -> MapOptions {
        let mut options = MapOptions {
            compression: self.compression,
            buffer_size: self.buffer,
            skip_holes: self.skip_holes,
            ..MapOptions::default()
        };
        if let (Some(width), Some(height)) = (self.block_width, self.block_height) {
            options = options.with_block_size(width, height);
        }
        options
    }

    pub fn build_transform(&self) -> Box<dyn Transform> {
        match self.transform {
            TransformKind::Identity => Box::new(Identity),
            TransformKind::Threshold => Box::new(Threshold::new(
                self.threshold,
                self.max_value,
                self.threshold_kind,
            )),
            TransformKind::FocalMean => Box::new(FocalMean::new(self.radius)),
        }
    }
}
