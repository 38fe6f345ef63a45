//! Pixel reconstruction (demosaicing) stages
//!
//! Both variants consume single-channel mosaic scanlines through a
//! [`FetchWindow`](crate::pipeline::fetch::FetchWindow) and emit 3-channel
//! RGB scanlines. The bilinear variant averages the nearest same-color
//! neighbors; the Malvar variant adds gradient-corrected weighted estimators
//! with an edge fallback.

pub mod bilinear;
pub mod malvar;

pub use bilinear::BilinearDemosaicStage;
pub use malvar::MalvarDemosaicStage;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::descriptor::{ImageDescriptor, MosaicPattern};

/// Builds the 3-channel output descriptor for a demosaic stage and extracts
/// the mosaic pattern the interpolation will dispatch on. The upstream must
/// produce single-channel mosaic data with a recognized pattern, and must be
/// large enough that edge reflection stays in range.
fn demosaic_descriptor(
    upstream: &ImageDescriptor,
    margin: usize,
) -> Result<(ImageDescriptor, MosaicPattern)> {
    let pattern = upstream
        .mosaic_pattern
        .ok_or_else(|| PipelineError::UnsupportedPattern("(none)".to_string()))?;

    if upstream.buffer_channels != 1 {
        return Err(PipelineError::ChannelMismatch {
            expected: 1,
            actual: upstream.buffer_channels,
        });
    }

    if upstream.buffer_width <= margin || upstream.buffer_height <= margin {
        return Err(PipelineError::InvalidDimensions(
            upstream.buffer_width,
            upstream.buffer_height,
        ));
    }

    let mut descriptor = upstream.clone();
    descriptor.buffer_channels = 3;
    descriptor.mosaic_pattern = None;
    Ok((descriptor, pattern))
}

/// Widens a demanded row range by the stage's vertical margin, clamped to
/// the buffer.
fn widen(first_line: usize, last_line: usize, margin: usize, height: usize) -> (usize, usize) {
    (
        first_line.saturating_sub(margin),
        (last_line + margin).min(height - 1),
    )
}
