use thiserror::Error;

/// Coarse classification of a [`WindowMapError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfig,
    InvalidDimensions,
    SourceOpenFailed,
    DestCreateFailed,
    AllocFailed,
    NotImplemented,
    TransformFailed,
    ReadFailed,
    WriteFailed,
    Backend,
}

impl ErrorKind {
    /// Non-zero numeric code, used as the process exit status.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidConfig => 2,
            ErrorKind::InvalidDimensions => 3,
            ErrorKind::SourceOpenFailed => 4,
            ErrorKind::DestCreateFailed => 5,
            ErrorKind::AllocFailed => 6,
            ErrorKind::NotImplemented => 7,
            ErrorKind::TransformFailed => 8,
            ErrorKind::ReadFailed => 9,
            ErrorKind::WriteFailed => 10,
            ErrorKind::Backend => 11,
        }
    }
}

#[derive(Error, Debug)]
pub enum WindowMapError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Could not open source dataset {path}: {reason}")]
    SourceOpenFailed { path: String, reason: String },

    #[error("Could not create output dataset {path}: {reason}")]
    DestCreateFailed { path: String, reason: String },

    #[error("Unable to allocate tile buffers of {0} elements")]
    AllocFailed(usize),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("Transform failed on band {band} at ({x_off},{y_off}): {reason}")]
    TransformFailed {
        band: usize,
        x_off: usize,
        y_off: usize,
        reason: String,
    },

    #[error("Read failed on band {band} at ({x_off},{y_off}): {reason}")]
    ReadFailed {
        band: usize,
        x_off: usize,
        y_off: usize,
        reason: String,
    },

    #[error("Write failed on band {band} at ({x_off},{y_off}): {reason}")]
    WriteFailed {
        band: usize,
        x_off: usize,
        y_off: usize,
        reason: String,
    },

    #[error("Band {band} out of range (raster has {count} bands)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Tile at ({x_off},{y_off}) sized {x_size}x{y_size} lies outside the {width}x{height} raster")]
    TileOutOfBounds {
        x_off: usize,
        y_off: usize,
        x_size: usize,
        y_size: usize,
        width: usize,
        height: usize,
    },

    #[error("Tile buffer holds {actual} elements, tile needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Raster not found: {0}")]
    MissingRaster(String),

    #[error("Processing error: {0}")]
    Process(String),
}

impl WindowMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WindowMapError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            WindowMapError::InvalidDimensions(..) => ErrorKind::InvalidDimensions,
            WindowMapError::SourceOpenFailed { .. } => ErrorKind::SourceOpenFailed,
            WindowMapError::DestCreateFailed { .. } => ErrorKind::DestCreateFailed,
            WindowMapError::AllocFailed(_) => ErrorKind::AllocFailed,
            WindowMapError::NotImplemented(_) => ErrorKind::NotImplemented,
            WindowMapError::TransformFailed { .. } | WindowMapError::Process(_) => {
                ErrorKind::TransformFailed
            }
            WindowMapError::ReadFailed { .. } => ErrorKind::ReadFailed,
            WindowMapError::WriteFailed { .. } => ErrorKind::WriteFailed,
            WindowMapError::Gdal(_)
            | WindowMapError::ShapeError(_)
            | WindowMapError::MissingRaster(_)
            | WindowMapError::BandOutOfRange { .. }
            | WindowMapError::TileOutOfBounds { .. }
            | WindowMapError::BufferSizeMismatch { .. } => ErrorKind::Backend,
        }
    }
}

pub type Result<T> = std::result::Result<T, WindowMapError>;
