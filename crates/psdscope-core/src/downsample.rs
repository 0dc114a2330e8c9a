//! Block-average downsampling of a PSD row to the display width.

use crate::error::{PipelineError, PipelineResult};

/// Reduce `values` to exactly `target_width` block means.
///
/// Block size is `values.len() / target_width` (integer division). Samples
/// past `target_width * block` are dropped rather than redistributed.
pub fn downsample(values: &[f64], target_width: usize) -> PipelineResult<Vec<f64>> {
    if target_width == 0 {
        return Err(PipelineError::InvalidWidth(target_width));
    }
    if values.len() < target_width {
        return Err(PipelineError::InsufficientData {
            samples: values.len(),
            width: target_width,
        });
    }

    let block = values.len() / target_width;
    let out = values
        .chunks_exact(block)
        .take(target_width)
        .map(|chunk| chunk.iter().sum::<f64>() / block as f64)
        .collect();
    Ok(out)
}
