//! Per-pixel linear transforms
//!
//! Stateless maps applied in place after pulling the full range from
//! upstream: a 3x3 color matrix and a uniform exposure scale. Geometry
//! passes through unchanged.

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::descriptor::ImageDescriptor;
use crate::pipeline::stage::{check_request, Stage};

/// Multiplies every pixel by a 3x3 matrix (row-major, `out = m * rgb`).
pub struct MatrixStage<S: Stage> {
    upstream: S,
    matrix: [[f32; 3]; 3],
}

impl<S: Stage> MatrixStage<S> {
    pub fn new(upstream: S, matrix: [[f32; 3]; 3]) -> Result<Self> {
        if upstream.descriptor().buffer_channels != 3 {
            return Err(PipelineError::ChannelMismatch {
                expected: 3,
                actual: upstream.descriptor().buffer_channels,
            });
        }
        Ok(MatrixStage { upstream, matrix })
    }
}

impl<S: Stage> Stage for MatrixStage<S> {
    fn descriptor(&self) -> &ImageDescriptor {
        self.upstream.descriptor()
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        self.upstream.declare_demand(first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        check_request(self.upstream.descriptor(), first_line, last_line, out.len())?;
        self.upstream.compute(first_line, last_line, out)?;

        let m = &self.matrix;
        for pixel in out.chunks_exact_mut(3) {
            let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
            pixel[0] = m[0][0] * r + m[0][1] * g + m[0][2] * b;
            pixel[1] = m[1][0] * r + m[1][1] * g + m[1][2] * b;
            pixel[2] = m[2][0] * r + m[2][1] * g + m[2][2] * b;
        }
        Ok(())
    }
}

/// Multiplies every sample by a constant.
pub struct ScaleStage<S: Stage> {
    upstream: S,
    scale: f32,
}

impl<S: Stage> ScaleStage<S> {
    pub fn new(upstream: S, scale: f32) -> Self {
        ScaleStage { upstream, scale }
    }
}

impl<S: Stage> Stage for ScaleStage<S> {
    fn descriptor(&self) -> &ImageDescriptor {
        self.upstream.descriptor()
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        self.upstream.declare_demand(first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        self.upstream.compute(first_line, last_line, out)?;
        for sample in out.iter_mut() {
            *sample *= self.scale;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::BufferSource;

    #[test]
    fn matrix_multiplies_each_pixel() {
        let source = BufferSource::new(2, 1, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let swap_rb = [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
        let mut stage = MatrixStage::new(source, swap_rb).unwrap();

        let mut out = vec![0.0; 6];
        stage.compute(0, 0, &mut out).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn matrix_requires_three_channels() {
        let source = BufferSource::new(2, 1, 1, vec![0.0, 0.0]);
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(matches!(
            MatrixStage::new(source, identity),
            Err(PipelineError::ChannelMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn scale_is_uniform() {
        let source = BufferSource::new(2, 2, 1, vec![1.0, 2.0, 3.0, 4.0]);
        let mut stage = ScaleStage::new(source, 0.5);

        let mut out = vec![0.0; 4];
        stage.compute(0, 1, &mut out).unwrap();
        assert_eq!(out, vec![0.5, 1.0, 1.5, 2.0]);
    }
}
