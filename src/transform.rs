use crate::error::{Result, WindowMapError};
use clap::ValueEnum;

/// A per-tile raster operation.
///
/// `process` is called once per tile per band. `input` and `output` both hold
/// exactly `width * height` pixels in row-major order, and `output` must be
/// fully populated. The buffers are reused by the caller for the next tile.
/// Tiles arrive in row-major order within a band, bands in ascending order.
pub trait Transform {
    fn process(
        &self,
        input: &[f32],
        output: &mut [f32],
        width: usize,
        height: usize,
        in_no_data: Option<f64>,
        out_no_data: Option<f64>,
    ) -> Result<()>;
}

impl<F> Transform for F
where
    F: Fn(&[f32], &mut [f32], usize, usize, Option<f64>, Option<f64>) -> Result<()>,
{
    fn process(
        &self,
        input: &[f32],
        output: &mut [f32],
        width: usize,
        height: usize,
        in_no_data: Option<f64>,
        out_no_data: Option<f64>,
    ) -> Result<()> {
        self(input, output, width, height, in_no_data, out_no_data)
    }
}

/// True if `value` is the no-data sentinel. A NaN sentinel matches any NaN.
pub fn is_no_data(value: f32, no_data: Option<f64>) -> bool {
    match no_data {
        Some(nd) if nd.is_nan() => value.is_nan(),
        Some(nd) => value == nd as f32,
        None => false,
    }
}

pub(crate) fn check_shape(input: &[f32], output: &[f32], width: usize, height: usize) -> Result<()> {
    let expected = width * height;
    if input.len() != expected {
        return Err(WindowMapError::BufferSizeMismatch {
            expected,
            actual: input.len(),
        });
    }
    if output.len() != expected {
        return Err(WindowMapError::BufferSizeMismatch {
            expected,
            actual: output.len(),
        });
    }
    Ok(())
}

/// Copies every tile through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn process(
        &self,
        input: &[f32],
        output: &mut [f32],
        width: usize,
        height: usize,
        _in_no_data: Option<f64>,
        _out_no_data: Option<f64>,
    ) -> Result<()> {
        check_shape(input, output, width, height)?;
        output.copy_from_slice(input);
        Ok(())
    }
}

/// Fixed-level threshold rules, applied where `value > threshold` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ThresholdKind {
    /// `max_value` above the threshold, 0 otherwise
    Binary,
    /// 0 above the threshold, `max_value` otherwise
    BinaryInv,
    /// Clamp to the threshold
    Trunc,
    /// Keep values above the threshold, 0 otherwise
    #[default]
    ToZero,
    /// 0 above the threshold, keep otherwise
    ToZeroInv,
}

/// Fixed-level threshold applied pixel by pixel.
///
/// Input no-data pixels are carried to the output no-data value (or kept as
/// they are when the destination has none) rather than thresholded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Threshold {
    pub threshold: f64,
    pub max_value: f64,
    pub kind: ThresholdKind,
}

impl Threshold {
    pub fn new(threshold: f64, max_value: f64, kind: ThresholdKind) -> Self {
        Self {
            threshold,
            max_value,
            kind,
        }
    }

    fn apply(&self, value: f32) -> f32 {
        let threshold = self.threshold as f32;
        let max_value = self.max_value as f32;
        let above = value > threshold;
        match self.kind {
            ThresholdKind::Binary => {
                if above {
                    max_value
                } else {
                    0.0
                }
            }
            ThresholdKind::BinaryInv => {
                if above {
                    0.0
                } else {
                    max_value
                }
            }
            ThresholdKind::Trunc => {
                if above {
                    threshold
                } else {
                    value
                }
            }
            ThresholdKind::ToZero => {
                if above {
                    value
                } else {
                    0.0
                }
            }
            ThresholdKind::ToZeroInv => {
                if above {
                    0.0
                } else {
                    value
                }
            }
        }
    }
}

impl Transform for Threshold {
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
        for (out, &value) in output.iter_mut().zip(input) {
            *out = if is_no_data(value, in_no_data) {
                out_no_data.map_or(value, |nd| nd as f32)
            } else {
                self.apply(value)
            };
        }
        Ok(())
    }
}
