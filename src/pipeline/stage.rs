//! The pipeline element contract
//!
//! Every element of the chain (decoder, cache, demosaic, transforms, sink)
//! implements [`Stage`]. A chain is driven in two phases: the terminal
//! consumer first declares demand bottom-up (each stage widening the range
//! by whatever vertical context it needs), then pulls data forward with
//! repeated `compute` calls on scanline ranges.

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::descriptor::ImageDescriptor;

/// A pipeline element that produces scanlines on demand.
///
/// Each stage exclusively owns its upstream (`Box<dyn Stage>`); the chain is
/// a simple line, never a cycle. All scanline I/O is interleaved `f32`,
/// channel-minor, `buffer_width * buffer_channels` samples per row.
pub trait Stage {
    /// Output geometry of this stage, fixed for its lifetime.
    fn descriptor(&self) -> &ImageDescriptor;

    /// Records that the caller will eventually compute the inclusive row
    /// range `[first_line, last_line]`. Stages that need vertical context
    /// widen the range they pass upstream, clamped to the buffer. For simple
    /// producers this is a hint; only the cache stage treats it as
    /// load-bearing.
    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()>;

    /// Fills `out` with this stage's output for the inclusive row range.
    /// `out` must hold exactly `(last_line - first_line + 1)` scanlines at
    /// this stage's stride.
    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()>;
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn descriptor(&self) -> &ImageDescriptor {
        (**self).descriptor()
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        (**self).declare_demand(first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        (**self).compute(first_line, last_line, out)
    }
}

/// Validates a compute request against a stage's geometry: the range must be
/// ordered, inside `[0, buffer_height - 1]`, and the output buffer must be
/// sized for exactly that many scanlines. Out-of-range requests are
/// programming errors and are never silently clamped.
pub fn check_request(
    descriptor: &ImageDescriptor,
    first_line: usize,
    last_line: usize,
    out_len: usize,
) -> Result<()> {
    check_range(descriptor, first_line, last_line)?;

    let expected = (last_line - first_line + 1) * descriptor.stride();
    if out_len != expected {
        return Err(PipelineError::BufferSizeMismatch {
            expected,
            actual: out_len,
        });
    }

    Ok(())
}

/// Validates a demand declaration range (no buffer involved).
pub fn check_range(descriptor: &ImageDescriptor, first_line: usize, last_line: usize) -> Result<()> {
    if first_line > last_line || last_line >= descriptor.buffer_height {
        return Err(PipelineError::RangeOutOfBounds(
            first_line,
            last_line,
            descriptor.buffer_height,
        ));
    }
    Ok(())
}
