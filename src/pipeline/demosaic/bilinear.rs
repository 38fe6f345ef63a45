//! Bilinear demosaicing
//!
//! Reconstructs the two missing channels at each mosaic site by averaging
//! the 2 or 4 nearest same-color neighbors: horizontal or vertical pairs at
//! distance 1, or the 4 diagonals. The physically sampled value is copied
//! through unchanged. Needs one row of context above and below.

use crate::pipeline::common::error::Result;
use crate::pipeline::descriptor::{ImageDescriptor, MosaicPattern, RowPhase};
use crate::pipeline::fetch::{reflect, FetchWindow};
use crate::pipeline::stage::{check_range, check_request, Stage};

const MARGIN: usize = 1;

pub struct BilinearDemosaicStage<S: Stage> {
    upstream: S,
    descriptor: ImageDescriptor,
    pattern: MosaicPattern,
}

impl<S: Stage> BilinearDemosaicStage<S> {
    pub fn new(upstream: S) -> Result<Self> {
        let (descriptor, pattern) = super::demosaic_descriptor(upstream.descriptor(), MARGIN)?;
        Ok(BilinearDemosaicStage {
            upstream,
            descriptor,
            pattern,
        })
    }
}

impl<S: Stage> Stage for BilinearDemosaicStage<S> {
    fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        check_range(&self.descriptor, first_line, last_line)?;
        let (first, last) = super::widen(first_line, last_line, MARGIN, self.descriptor.buffer_height);
        self.upstream.declare_demand(first, last)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        check_request(&self.descriptor, first_line, last_line, out.len())?;

        let width = self.descriptor.buffer_width;
        let stride = self.descriptor.stride();
        let mut window = FetchWindow::new(&mut self.upstream, MARGIN, first_line);

        for line in first_line..=last_line {
            window.step()?;
            let phase = self.pattern.row_phase(line);
            let dst = &mut out[(line - first_line) * stride..(line - first_line + 1) * stride];
            interpolate_row(phase, width, window.row(0), window.row(1), window.row(2), dst);
        }
        Ok(())
    }
}

/// Demosaics one scanline. `above`/`below` are the vertical neighbors the
/// fetch window resolved (already reflected at the image edges); horizontal
/// neighbors are reflected here at the left/right borders.
fn interpolate_row(
    phase: RowPhase,
    width: usize,
    above: &[f32],
    current: &[f32],
    below: &[f32],
    out: &mut [f32],
) {
    for x in 0..width {
        let xl = reflect(x as isize - 1, width);
        let xr = reflect(x as isize + 1, width);

        let even = x & 1 == 0;
        let pixel = match (phase, even) {
            (RowPhase::RedGreen, true) | (RowPhase::GreenRed, false) => {
                red_site(above, current, below, x, xl, xr)
            }
            (RowPhase::RedGreen, false) | (RowPhase::GreenRed, true) => {
                green_in_red_row(above, current, below, x, xl, xr)
            }
            (RowPhase::BlueGreen, true) | (RowPhase::GreenBlue, false) => {
                blue_site(above, current, below, x, xl, xr)
            }
            (RowPhase::BlueGreen, false) | (RowPhase::GreenBlue, true) => {
                green_in_blue_row(above, current, below, x, xl, xr)
            }
        };
        out[x * 3..x * 3 + 3].copy_from_slice(&pixel);
    }
}

fn red_site(above: &[f32], cur: &[f32], below: &[f32], x: usize, xl: usize, xr: usize) -> [f32; 3] {
    [
        cur[x],
        (cur[xl] + cur[xr] + above[x] + below[x]) / 4.0,
        (above[xl] + above[xr] + below[xl] + below[xr]) / 4.0,
    ]
}

fn blue_site(above: &[f32], cur: &[f32], below: &[f32], x: usize, xl: usize, xr: usize) -> [f32; 3] {
    [
        (above[xl] + above[xr] + below[xl] + below[xr]) / 4.0,
        (cur[xl] + cur[xr] + above[x] + below[x]) / 4.0,
        cur[x],
    ]
}

/// Green pixel in a row carrying red: red is horizontal, blue vertical.
fn green_in_red_row(above: &[f32], cur: &[f32], below: &[f32], x: usize, xl: usize, xr: usize) -> [f32; 3] {
    [
        (cur[xl] + cur[xr]) / 2.0,
        cur[x],
        (above[x] + below[x]) / 2.0,
    ]
}

/// Green pixel in a row carrying blue: blue is horizontal, red vertical.
fn green_in_blue_row(above: &[f32], cur: &[f32], below: &[f32], x: usize, xl: usize, xr: usize) -> [f32; 3] {
    [
        (above[x] + below[x]) / 2.0,
        cur[x],
        (cur[xl] + cur[xr]) / 2.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::BufferSource;

    fn mosaic(width: usize, height: usize, data: Vec<f32>) -> BufferSource {
        BufferSource::new(width, height, 1, data).with_pattern(MosaicPattern::Rggb)
    }

    #[test]
    fn constant_mosaic_is_a_fixed_point() {
        let mut stage = BilinearDemosaicStage::new(mosaic(4, 4, vec![1.0; 16])).unwrap();
        stage.declare_demand(0, 3).unwrap();

        let mut out = vec![0.0; 4 * 4 * 3];
        stage.compute(0, 3, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 1.0), "{out:?}");
    }

    #[test]
    fn sampled_channel_is_copied_through() {
        // Distinct value at every site; the physically sampled channel must
        // survive interpolation untouched.
        let data: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let mut stage = BilinearDemosaicStage::new(mosaic(8, 8, data.clone())).unwrap();
        stage.declare_demand(0, 7).unwrap();

        let mut out = vec![0.0; 8 * 8 * 3];
        stage.compute(0, 7, &mut out).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                // RGGB: channel sampled at (y, x)
                let channel = match (y & 1, x & 1) {
                    (0, 0) => 0,
                    (1, 1) => 2,
                    _ => 1,
                };
                assert_eq!(out[(y * 8 + x) * 3 + channel], data[y * 8 + x]);
            }
        }
    }

    #[test]
    fn single_bright_pixel_spreads_by_the_documented_divisors() {
        // 8x8 RGGB, 1.0 at (row 4, col 4), which is a red site.
        let mut data = vec![0.0; 64];
        data[4 * 8 + 4] = 1.0;
        let mut stage = BilinearDemosaicStage::new(mosaic(8, 8, data)).unwrap();

        stage.declare_demand(3, 5).unwrap();
        let mut out = vec![0.0; 3 * 8 * 3];
        stage.compute(3, 5, &mut out).unwrap();

        let px = |row: usize, col: usize| -> [f32; 3] {
            let base = ((row - 3) * 8 + col) * 3;
            [out[base], out[base + 1], out[base + 2]]
        };

        // Row 4 (red row): red copied at col 4, halved into the green sites.
        assert_eq!(px(4, 4), [1.0, 0.0, 0.0]);
        assert_eq!(px(4, 3), [0.5, 0.0, 0.0]);
        assert_eq!(px(4, 5), [0.5, 0.0, 0.0]);

        // Rows 3 and 5 (blue rows): vertical halves at col 4, diagonal
        // quarters at cols 3 and 5.
        for row in [3, 5] {
            assert_eq!(px(row, 4), [0.5, 0.0, 0.0]);
            assert_eq!(px(row, 3), [0.25, 0.0, 0.0]);
            assert_eq!(px(row, 5), [0.25, 0.0, 0.0]);
        }

        // Nothing outside rows 3-5 x cols 3-5.
        for row in 3..=5 {
            for col in 0..8 {
                if !(3..=5).contains(&col) {
                    assert_eq!(px(row, col), [0.0, 0.0, 0.0], "row {row} col {col}");
                }
            }
        }
    }

    #[test]
    fn odd_width_constant_mosaic_is_a_fixed_point() {
        let mut stage = BilinearDemosaicStage::new(mosaic(5, 5, vec![1.0; 25])).unwrap();
        stage.declare_demand(0, 4).unwrap();

        let mut out = vec![0.0; 5 * 5 * 3];
        stage.compute(0, 4, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 1.0), "{out:?}");
    }

    #[test]
    fn last_column_mirrors_its_left_neighbor_on_odd_widths() {
        // 5x5 RGGB, 1.0 at (row 2, col 3), a green site in a red row. The
        // last column has no right neighbor; its red site interpolates
        // green from the mirrored left neighbor, counted twice.
        let mut data = vec![0.0; 25];
        data[2 * 5 + 3] = 1.0;
        let mut stage = BilinearDemosaicStage::new(mosaic(5, 5, data)).unwrap();

        stage.declare_demand(1, 3).unwrap();
        let mut out = vec![0.0; 3 * 5 * 3];
        stage.compute(1, 3, &mut out).unwrap();

        let px = |row: usize, col: usize| -> [f32; 3] {
            let base = ((row - 1) * 5 + col) * 3;
            [out[base], out[base + 1], out[base + 2]]
        };

        assert_eq!(px(2, 3), [0.0, 1.0, 0.0]);
        // Interior red site: one of four green neighbors is bright.
        assert_eq!(px(2, 2), [0.0, 0.25, 0.0]);
        // Boundary red site: the mirrored neighbor contributes twice.
        assert_eq!(px(2, 4), [0.0, 0.5, 0.0]);
        // Blue sites above and below see the bright green vertically.
        assert_eq!(px(1, 3), [0.0, 0.25, 0.0]);
        assert_eq!(px(3, 3), [0.0, 0.25, 0.0]);

        for row in 1..=3 {
            for col in 0..5 {
                if (row == 2 && (2..=4).contains(&col)) || col == 3 {
                    continue;
                }
                assert_eq!(px(row, col), [0.0, 0.0, 0.0], "row {row} col {col}");
            }
        }
    }

    #[test]
    fn context_rows_are_pulled_once_each() {
        let source = mosaic(4, 8, vec![0.0; 32]).counting();
        let ranges = source.ranges_handle();
        let mut stage = BilinearDemosaicStage::new(source).unwrap();
        stage.declare_demand(3, 4).unwrap();

        let mut out = vec![0.0; 2 * 4 * 3];
        stage.compute(3, 4, &mut out).unwrap();

        // Computing rows 3-4 needs upstream rows 2..=5, each exactly once.
        let mut counts = [0usize; 8];
        for &(first, last) in ranges.lock().unwrap().iter() {
            for row in first..=last {
                counts[row] += 1;
            }
        }
        assert_eq!(counts, [0, 0, 1, 1, 1, 1, 0, 0]);
    }
}
