use clap::ValueEnum;
use std::fmt;

/// Compression codec requested for the destination raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Compression {
    #[default]
    Lzw,
    Deflate,
    Zstd,
    None,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::Lzw => "LZW",
            Compression::Deflate => "DEFLATE",
            Compression::Zstd => "ZSTD",
            Compression::None => "NONE",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage layout for a newly created destination raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    pub compression: Compression,
    pub tiled: bool,
    /// Allow blocks that were never written to stay unallocated.
    pub sparse: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            tiled: true,
            sparse: false,
        }
    }
}

impl CreateOptions {
    /// GeoTIFF creation options in `KEY=VALUE` form.
    pub fn to_creation_options(&self) -> Vec<String> {
        let mut options = Vec::with_capacity(3);
        if self.tiled {
            options.push("TILED=YES".to_string());
        }
        options.push(format!("COMPRESS={}", self.compression));
        if self.sparse {
            options.push("SPARSE_OK=TRUE".to_string());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_value_names() {
        assert_eq!(Compression::from_str("lzw", false).unwrap(), Compression::Lzw);
        assert_eq!(Compression::from_str("DEFLATE", true).unwrap(), Compression::Deflate);
        assert_eq!(Compression::from_str("zstd", false).unwrap(), Compression::Zstd);
        assert_eq!(Compression::from_str("none", false).unwrap(), Compression::None);
        assert!(Compression::from_str("jpeg", true).is_err());
    }

    #[test]
    fn test_display_matches_gdal_names() {
        assert_eq!(Compression::Zstd.to_string(), "ZSTD");
        assert_eq!(Compression::default().to_string(), "LZW");
    }

    #[test]
    fn test_default_creation_options() {
        let opts = CreateOptions::default().to_creation_options();
        assert_eq!(opts, vec!["TILED=YES".to_string(), "COMPRESS=LZW".to_string()]);
    }

    #[test]
    fn test_sparse_creation_options() {
        let opts = CreateOptions {
            compression: Compression::Deflate,
            tiled: true,
            sparse: true,
        }
        .to_creation_options();
        assert_eq!(opts.len(), 3);
        assert!(opts.contains(&"COMPRESS=DEFLATE".to_string()));
        assert!(opts.contains(&"SPARSE_OK=TRUE".to_string()));
    }
}
