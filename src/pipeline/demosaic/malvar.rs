//! Edge-aware demosaicing after Malvar, He and Cutler
//!
//! Gradient-corrected bilinear interpolation over a 13-sample diamond
//! neighborhood, two rows of context above and below. Each missing channel
//! gets a weighted estimate mixing orthogonal and diagonal terms; estimates
//! that go negative or undershoot their plain-bilinear fallback by more than
//! 1.5x are replaced by the fallback, which tames ringing on strong edges
//! (the original paper has no such guard).

use crate::pipeline::common::error::Result;
use crate::pipeline::descriptor::{ImageDescriptor, MosaicPattern, RowPhase};
use crate::pipeline::fetch::{reflect, FetchWindow};
use crate::pipeline::stage::{check_range, check_request, Stage};

const MARGIN: usize = 2;

pub struct MalvarDemosaicStage<S: Stage> {
    upstream: S,
    descriptor: ImageDescriptor,
    pattern: MosaicPattern,
}

impl<S: Stage> MalvarDemosaicStage<S> {
    pub fn new(upstream: S) -> Result<Self> {
        let (descriptor, pattern) = super::demosaic_descriptor(upstream.descriptor(), MARGIN)?;
        Ok(MalvarDemosaicStage {
            upstream,
            descriptor,
            pattern,
        })
    }
}

impl<S: Stage> Stage for MalvarDemosaicStage<S> {
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
            let rows = [
                window.row(0),
                window.row(1),
                window.row(2),
                window.row(3),
                window.row(4),
            ];
            let phase = self.pattern.row_phase(line);
            let dst = &mut out[(line - first_line) * stride..(line - first_line + 1) * stride];
            interpolate_row(phase, width, &rows, dst);
        }
        Ok(())
    }
}

/// The 13-sample neighborhood of one pixel: itself, the orthogonal
/// neighbors at distance 1 and 2, and the diagonal neighbors at distance 1.
/// Field names are `v_<row offset>_<column offset>`.
#[rustfmt::skip]
struct Diamond {
                              v_m2_0: f32,
                 v_m1_m1: f32, v_m1_0: f32, v_m1_p1: f32,
    v_0_m2: f32,  v_0_m1: f32,  v_0_0: f32,  v_0_p1: f32, v_0_p2: f32,
                 v_p1_m1: f32,  v_p1_0: f32, v_p1_p1: f32,
                              v_p2_0: f32,
}

/// Gathers the diamond around column `x`, reflecting horizontal indices at
/// the left/right borders the same way the fetch window reflects rows.
fn build_diamond(x: usize, width: usize, rows: &[&[f32]; 5]) -> Diamond {
    let xm2 = reflect(x as isize - 2, width);
    let xm1 = reflect(x as isize - 1, width);
    let xp1 = reflect(x as isize + 1, width);
    let xp2 = reflect(x as isize + 2, width);

    Diamond {
        v_m2_0: rows[0][x],
        v_m1_m1: rows[1][xm1],
        v_m1_0: rows[1][x],
        v_m1_p1: rows[1][xp1],
        v_0_m2: rows[2][xm2],
        v_0_m1: rows[2][xm1],
        v_0_0: rows[2][x],
        v_0_p1: rows[2][xp1],
        v_0_p2: rows[2][xp2],
        v_p1_m1: rows[3][xm1],
        v_p1_0: rows[3][x],
        v_p1_p1: rows[3][xp1],
        v_p2_0: rows[4][x],
    }
}

/// Falls back to the plain bilinear estimate when the weighted one goes
/// negative or is more than 1.5x smaller than the fallback.
fn guard(weighted: f32, fallback: f32) -> f32 {
    if weighted < 0.0 || (weighted > 0.0 && fallback / weighted > 1.5) {
        fallback
    } else {
        weighted
    }
}

/// Estimators at a red or blue site: green from the orthogonal cross, the
/// opposite color from the diagonals.
fn mix_at_sample_site(d: &Diamond) -> (f32, f32) {
    let corner = d.v_m2_0 + d.v_p2_0 + d.v_0_m2 + d.v_0_p2;

    let cross = (4.0 * d.v_0_0 + 2.0 * (d.v_m1_0 + d.v_p1_0 + d.v_0_m1 + d.v_0_p1) - corner) / 8.0;
    let diag = (6.0 * d.v_0_0 + 2.0 * (d.v_m1_m1 + d.v_m1_p1 + d.v_p1_m1 + d.v_p1_p1)
        - 1.5 * corner)
        / 8.0;

    let cross_lin = 0.25 * (d.v_m1_0 + d.v_p1_0 + d.v_0_m1 + d.v_0_p1);
    let diag_lin = 0.25 * (d.v_m1_m1 + d.v_m1_p1 + d.v_p1_m1 + d.v_p1_p1);

    (guard(cross, cross_lin), guard(diag, diag_lin))
}

/// Estimators at a green site: the row color from the horizontal pair, the
/// column color from the vertical pair.
fn mix_at_green_site(d: &Diamond) -> (f32, f32) {
    let ring = d.v_m1_m1 + d.v_m1_p1 + d.v_p1_m1 + d.v_p1_p1;

    let horizontal = (5.0 * d.v_0_0 + 4.0 * (d.v_0_m1 + d.v_0_p1)
        - (ring + d.v_0_m2 + d.v_0_p2)
        + 0.5 * (d.v_m2_0 + d.v_p2_0))
        / 8.0;
    let vertical = (5.0 * d.v_0_0 + 4.0 * (d.v_m1_0 + d.v_p1_0)
        - (ring + d.v_m2_0 + d.v_p2_0)
        + 0.5 * (d.v_0_m2 + d.v_0_p2))
        / 8.0;

    let horizontal_lin = 0.5 * (d.v_0_m1 + d.v_0_p1);
    let vertical_lin = 0.5 * (d.v_m1_0 + d.v_p1_0);

    (guard(horizontal, horizontal_lin), guard(vertical, vertical_lin))
}

fn interpolate_row(phase: RowPhase, width: usize, rows: &[&[f32]; 5], out: &mut [f32]) {
    for x in 0..width {
        let d = build_diamond(x, width, rows);
        let even = x & 1 == 0;

        let pixel = match (phase, even) {
            (RowPhase::RedGreen, true) | (RowPhase::GreenRed, false) => {
                let (green, blue) = mix_at_sample_site(&d);
                [d.v_0_0, green, blue]
            }
            (RowPhase::BlueGreen, true) | (RowPhase::GreenBlue, false) => {
                let (green, red) = mix_at_sample_site(&d);
                [red, green, d.v_0_0]
            }
            (RowPhase::RedGreen, false) | (RowPhase::GreenRed, true) => {
                let (red, blue) = mix_at_green_site(&d);
                [red, d.v_0_0, blue]
            }
            (RowPhase::BlueGreen, false) | (RowPhase::GreenBlue, true) => {
                let (blue, red) = mix_at_green_site(&d);
                [red, d.v_0_0, blue]
            }
        };
        out[x * 3..x * 3 + 3].copy_from_slice(&pixel);
    }
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
        let mut stage = MalvarDemosaicStage::new(mosaic(4, 4, vec![1.0; 16])).unwrap();
        stage.declare_demand(0, 3).unwrap();

        let mut out = vec![0.0; 4 * 4 * 3];
        stage.compute(0, 3, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 1.0), "{out:?}");
    }

    #[test]
    fn sampled_channel_is_copied_through() {
        let data: Vec<f32> = (0..64).map(|v| v as f32 * 0.01).collect();
        let mut stage = MalvarDemosaicStage::new(mosaic(8, 8, data.clone())).unwrap();
        stage.declare_demand(0, 7).unwrap();

        let mut out = vec![0.0; 8 * 8 * 3];
        stage.compute(0, 7, &mut out).unwrap();

        for y in 0..8 {
            for x in 0..8 {
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
    fn odd_width_constant_mosaic_is_a_fixed_point() {
        // Width 5 forces every horizontal diamond index at columns 0, 1, 3
        // and 4 through the mirror reflection.
        let mut stage = MalvarDemosaicStage::new(mosaic(5, 6, vec![1.0; 30])).unwrap();
        stage.declare_demand(0, 5).unwrap();

        let mut out = vec![0.0; 5 * 6 * 3];
        stage.compute(0, 5, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 1.0), "{out:?}");
    }

    #[test]
    fn odd_width_keeps_the_sampled_channel_intact() {
        let data: Vec<f32> = (0..30).map(|v| v as f32 * 0.01).collect();
        let mut stage = MalvarDemosaicStage::new(mosaic(5, 6, data.clone())).unwrap();
        stage.declare_demand(0, 5).unwrap();

        let mut out = vec![0.0; 5 * 6 * 3];
        stage.compute(0, 5, &mut out).unwrap();

        for y in 0..6 {
            for x in 0..5 {
                let channel = match (y & 1, x & 1) {
                    (0, 0) => 0,
                    (1, 1) => 2,
                    _ => 1,
                };
                assert_eq!(out[(y * 5 + x) * 3 + channel], data[y * 5 + x]);
            }
        }
    }

    #[test]
    fn weighted_estimate_is_used_on_smooth_gradients() {
        // Horizontal ramp: at a green site in a red row, the red estimate
        // must match the gradient-corrected value, which for a linear ramp
        // equals the bilinear one (both interpolate exactly).
        let data: Vec<f32> = (0..8 * 8).map(|i| (i % 8) as f32 + 1.0).collect();
        let mut stage = MalvarDemosaicStage::new(mosaic(8, 8, data)).unwrap();
        stage.declare_demand(2, 2).unwrap();

        let mut out = vec![0.0; 8 * 3];
        stage.compute(2, 2, &mut out).unwrap();

        // Row 2 is a red row (RGGB). Column 3 is a green site; its red
        // neighbors hold 3.0 and 5.0, so red interpolates to 4.0.
        assert_eq!(out[3 * 3], 4.0);
    }

    #[test]
    fn negative_estimate_falls_back_to_linear() {
        // A bright ring of orthogonal distance-2 samples around a dark
        // center drives the weighted green estimate at the center red site
        // negative; the linear average of the distance-1 neighbors (all
        // zero) must be used instead.
        let mut data = vec![0.0; 8 * 8];
        for (y, x) in [(2, 4), (6, 4), (4, 2), (4, 6)] {
            data[y * 8 + x] = 1.0;
        }
        let mut stage = MalvarDemosaicStage::new(mosaic(8, 8, data)).unwrap();
        stage.declare_demand(4, 4).unwrap();

        let mut out = vec![0.0; 8 * 3];
        stage.compute(4, 4, &mut out).unwrap();

        // Weighted: (4*0 + 2*0 - 4) / 8 = -0.5 -> fallback 0.0.
        assert_eq!(out[4 * 3 + 1], 0.0);
    }

    #[test]
    fn both_variants_agree_on_the_sampled_channel() {
        let data: Vec<f32> = (0..64).map(|v| ((v * 37) % 19) as f32 * 0.05).collect();

        let mut malvar = MalvarDemosaicStage::new(mosaic(8, 8, data.clone())).unwrap();
        let mut bilinear =
            super::super::BilinearDemosaicStage::new(mosaic(8, 8, data)).unwrap();

        malvar.declare_demand(0, 7).unwrap();
        bilinear.declare_demand(0, 7).unwrap();

        let mut out_m = vec![0.0; 8 * 8 * 3];
        let mut out_b = vec![0.0; 8 * 8 * 3];
        malvar.compute(0, 7, &mut out_m).unwrap();
        bilinear.compute(0, 7, &mut out_b).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let channel = match (y & 1, x & 1) {
                    (0, 0) => 0,
                    (1, 1) => 2,
                    _ => 1,
                };
                let idx = (y * 8 + x) * 3 + channel;
                assert_eq!(out_m[idx], out_b[idx], "({y}, {x})");
            }
        }
    }
}
