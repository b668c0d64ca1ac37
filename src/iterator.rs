use crate::error::{Result, WindowMapError};
use log::debug;
use std::iter::FusedIterator;

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
}

impl Extent {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(WindowMapError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height })
    }
}

/// Nominal tile dimensions requested from an iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    pub width: usize,
    pub height: usize,
}

impl BlockSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// One read/process/write window. Offsets and sizes are in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x_off: usize,
    pub y_off: usize,
    pub x_size: usize,
    pub y_size: usize,
}

impl Tile {
    pub fn new(x_off: usize, y_off: usize, x_size: usize, y_size: usize) -> Self {
        Self {
            x_off,
            y_off,
            x_size,
            y_size,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.x_size * self.y_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stepping {
    Plain,
    Buffered { halo: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    NotStarted,
    At { x_off: usize, y_off: usize },
    Exhausted,
}

/// Walks a raster extent in row-major tiles.
///
/// A plain iterator emits non-overlapping blocks. A buffered iterator widens
/// every tile by a halo of `buffer_size` pixels on each side facing a
/// neighbour, so adjacent tiles share `buffer_size` pixels. In both modes
/// tiles on the trailing edge are clipped to the extent.
///
/// The row-wrap test of the plain mode (`x_off >= width - 1`) and its
/// exhaustion test (`y_off >= height - 1`) are one pixel short of the true
/// edge. They are kept as-is because they decide which call returns `None`.
///
/// Iteration cannot be rewound. Clone an unstarted iterator to walk the
/// same tiles again.
#[derive(Debug, Clone)]
pub struct TileIterator {
    extent: Extent,
    block: BlockSize,
    stepping: Stepping,
    cursor: Cursor,
}

impl TileIterator {
    /// Plain iterator whose block initially spans the whole extent.
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            block: BlockSize::new(extent.width, extent.height),
            stepping: Stepping::Plain,
            cursor: Cursor::NotStarted,
        }
    }

    /// Overlapping iterator with a zero halo. Use [`set_buffer_size`](Self::set_buffer_size)
    /// to widen it.
    pub fn buffered(extent: Extent) -> Self {
        Self {
            stepping: Stepping::Buffered { halo: 0 },
            ..Self::new(extent)
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn block_size(&self) -> BlockSize {
        self.block
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.stepping, Stepping::Buffered { .. })
    }

    pub fn buffer_size(&self) -> usize {
        match self.stepping {
            Stepping::Plain => 0,
            Stepping::Buffered { halo } => halo,
        }
    }

    /// Set the nominal tile size. On error the previous block size is kept.
    pub fn set_block_size(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(WindowMapError::InvalidConfig(format!(
                "Block size must be positive, got {}x{}",
                width, height
            )));
        }
        if width > self.extent.width || height > self.extent.height {
            return Err(WindowMapError::InvalidConfig(format!(
                "Requested block size {}x{} is greater than the raster size {}x{}",
                width, height, self.extent.width, self.extent.height
            )));
        }
        self.block = BlockSize::new(width, height);
        debug!("Block size set to {}x{}", width, height);
        Ok(())
    }

    /// Set the halo width. Only valid on a buffered iterator; on error the
    /// previous halo is kept.
    pub fn set_buffer_size(&mut self, buffer_size: usize) -> Result<()> {
        if !self.is_buffered() {
            return Err(WindowMapError::InvalidConfig(
                "Buffer size requires an overlapping iterator".to_string(),
            ));
        }
        if buffer_size >= self.extent.width + self.block.width
            || buffer_size >= self.extent.height + self.block.height
        {
            return Err(WindowMapError::InvalidConfig(format!(
                "Requested buffer size {} is greater than the raster size {}x{} plus block size {}x{}",
                buffer_size,
                self.extent.width,
                self.extent.height,
                self.block.width,
                self.block.height
            )));
        }
        self.stepping = Stepping::Buffered { halo: buffer_size };
        debug!("Buffer size set to {}", buffer_size);
        Ok(())
    }

    /// Number of pixels in the largest tile this configuration can emit.
    pub fn max_tile_len(&self) -> usize {
        match self.stepping {
            Stepping::Plain => self.block.width * self.block.height,
            Stepping::Buffered { halo } => {
                let w = (self.block.width + 2 * halo).min(self.extent.width);
                let h = (self.block.height + 2 * halo).min(self.extent.height);
                w * h
            }
        }
    }

    /// Whether every pixel of the extent falls in some emitted tile.
    ///
    /// Overlapping stepping always reaches the edge. Plain stepping never
    /// visits a block that would start on the last column or row, so it
    /// leaves that column (row) out when `width - 1` (`height - 1`) is a
    /// multiple of the block width (height).
    pub fn covers_extent(&self) -> bool {
        match self.stepping {
            Stepping::Plain => {
                (self.extent.width - 1) % self.block.width != 0
                    && (self.extent.height - 1) % self.block.height != 0
            }
            Stepping::Buffered { .. } => true,
        }
    }

    fn next_x_off(&self, x_off: usize) -> usize {
        match self.stepping {
            Stepping::Plain => x_off + self.block.width,
            Stepping::Buffered { .. } if x_off == 0 => self.block.width,
            Stepping::Buffered { halo } => x_off + self.block.width + halo,
        }
    }

    fn next_y_off(&self, y_off: usize) -> usize {
        match self.stepping {
            Stepping::Plain => y_off + self.block.height,
            Stepping::Buffered { .. } if y_off == 0 => self.block.height,
            Stepping::Buffered { halo } => y_off + self.block.height + halo,
        }
    }

    fn row_done(&self, x_off: usize) -> bool {
        match self.stepping {
            Stepping::Plain => x_off >= self.extent.width - 1,
            Stepping::Buffered { halo } => x_off + halo >= self.extent.width,
        }
    }

    fn rows_done(&self, y_off: usize) -> bool {
        match self.stepping {
            Stepping::Plain => y_off >= self.extent.height - 1,
            Stepping::Buffered { halo } => y_off + halo >= self.extent.height,
        }
    }

    fn nominal_size(&self, x_off: usize, y_off: usize) -> (usize, usize) {
        match self.stepping {
            Stepping::Plain => (self.block.width, self.block.height),
            Stepping::Buffered { halo } => {
                let x_size = if x_off == 0 {
                    self.block.width + halo
                } else {
                    self.block.width + 2 * halo
                };
                let y_size = if y_off == 0 {
                    self.block.height + halo
                } else {
                    self.block.height + 2 * halo
                };
                (x_size, y_size)
            }
        }
    }

    fn clip(&self, mut tile: Tile) -> Tile {
        if tile.x_off + tile.x_size >= self.extent.width {
            tile.x_size = self.extent.width - tile.x_off;
        }
        if tile.y_off + tile.y_size >= self.extent.height {
            tile.y_size = self.extent.height - tile.y_off;
        }
        tile
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let (mut x_off, mut y_off) = match self.cursor {
            Cursor::NotStarted => (0, 0),
            Cursor::At { x_off, y_off } => (self.next_x_off(x_off), y_off),
            Cursor::Exhausted => return None,
        };

        if self.row_done(x_off) {
            x_off = 0;
            y_off = self.next_y_off(y_off);
            if self.rows_done(y_off) {
                self.cursor = Cursor::Exhausted;
                return None;
            }
        }
        self.cursor = Cursor::At { x_off, y_off };

        let (x_size, y_size) = self.nominal_size(x_off, y_off);
        Some(self.clip(Tile::new(x_off, y_off, x_size, y_size)))
    }
}

impl FusedIterator for TileIterator {}
