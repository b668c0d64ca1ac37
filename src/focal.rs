use crate::error::Result;
use crate::transform::{check_shape, is_no_data, Transform};
use ndarray::{ArrayView2, ArrayViewMut2};

/// Mean of the valid pixels in a square window around each pixel.
///
/// The window only sees the current tile, so it is truncated at tile edges.
/// A halo does not hide the seams: tiles are written back whole, and the
/// pixels along a seam come from the later tile, where they sit on its edge.
/// Only a block spanning the whole raster gives untruncated means everywhere.
/// No-data pixels are excluded from the mean.
/// A window with no valid pixels yields the output no-data value, or 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocalMean {
    pub radius: usize,
}

impl FocalMean {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }
}

impl Transform for FocalMean {
    fn process(
        &self,
        input: &[f32],
        output: &mut [f32],
        width: usize,
        height: usize,
        in_no_data: Option<f64>,
        out_no_data: Option<f64>,
    ) -> Result<()> {
        check_shape(input, output, width, height)?;
        let data = ArrayView2::from_shape((height, width), input)?;
        let mut out = ArrayViewMut2::from_shape((height, width), output)?;
        let fallback = out_no_data.map_or(0.0, |nd| nd as f32);

        for ((row, col), value) in out.indexed_iter_mut() {
            *value = window_mean(&data, row, col, self.radius, in_no_data).unwrap_or(fallback);
        }
        Ok(())
    }
}

fn window_mean(
    data: &ArrayView2<f32>,
    center_row: usize,
    center_col: usize,
    radius: usize,
    no_data: Option<f64>,
) -> Option<f32> {
    let (nrows, ncols) = data.dim();

    let row_min = center_row.saturating_sub(radius);
    let row_max = (center_row + radius + 1).min(nrows);
    let col_min = center_col.saturating_sub(radius);
    let col_max = (center_col + radius + 1).min(ncols);

    let mut sum = 0.0f64;
    let mut valid_count = 0u32;
    for &value in data.slice(ndarray::s![row_min..row_max, col_min..col_max]) {
        if is_no_data(value, no_data) {
            continue;
        }
        sum += value as f64;
        valid_count += 1;
    }

    if valid_count > 0 {
        Some((sum / valid_count as f64) as f32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_tile_is_unchanged() {
        let input = vec![4.0; 9];
        let mut output = vec![0.0; 9];
        FocalMean::new(1)
            .process(&input, &mut output, 3, 3, None, None)
            .unwrap();
        assert!(output.iter().all(|&v| (v - 4.0).abs() < 1e-6));
    }

    #[test]
    fn test_center_mean_with_nodata() {
        #[rustfmt::skip]
        let input = vec![
            1.0, 2.0, -9999.0,
            2.0, 1.0, 2.0,
            1.0, 2.0, 1.0,
        ];
        let mut output = vec![0.0; 9];
        FocalMean::new(1)
            .process(&input, &mut output, 3, 3, Some(-9999.0), Some(-9999.0))
            .unwrap();
        // 8 valid cells summing to 12
        assert!((output[4] - 1.5).abs() < 1e-6);
        // Corner window: 1, 2, 2, 1
        assert!((output[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_window_truncated_at_tile_edge() {
        // 4x1 strip, radius 1: ends only see two cells
        let input = vec![0.0, 3.0, 6.0, 9.0];
        let mut output = vec![0.0; 4];
        FocalMean::new(1)
            .process(&input, &mut output, 4, 1, None, None)
            .unwrap();
        assert_eq!(output, vec![1.5, 3.0, 6.0, 7.5]);
    }

    #[test]
    fn test_all_nodata_window_yields_output_sentinel() {
        let input = vec![-1.0; 4];
        let mut output = vec![0.0; 4];
        FocalMean::new(1)
            .process(&input, &mut output, 2, 2, Some(-1.0), Some(f64::NAN))
            .unwrap();
        assert!(output.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_radius_zero_is_identity_on_valid_pixels() {
        let input = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut output = vec![0.0; 6];
        FocalMean::new(0)
            .process(&input, &mut output, 3, 2, None, None)
            .unwrap();
        assert_eq!(input, output);
    }
}
