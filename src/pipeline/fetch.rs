//! Sliding-window scanline fetcher
//!
//! Stages that need vertical neighbor context (the demosaic kernels) do not
//! pull upstream rows directly; they walk a [`FetchWindow`] down the image.
//! The window keeps the `2 * margin + 1` rows around the current output row
//! in a circular store, pulling each upstream row exactly once as the window
//! slides, and resolves out-of-range rows at the top and bottom edges by
//! mirror reflection across the boundary.

use crate::pipeline::common::error::Result;
use crate::pipeline::stage::Stage;

/// A moving band of upstream scanlines, scoped to one compute invocation of
/// the owning stage.
///
/// Logical position `i` in `0..=2 * margin` maps to source row
/// `center + i - margin`, reflected into `[0, height - 1]`. Source row `r`
/// always lives in physical slot `r % (2 * margin + 1)`, so rows within one
/// window never collide and a loaded row is only overwritten once the window
/// has slid past it.
pub struct FetchWindow<'a> {
    upstream: &'a mut dyn Stage,
    margin: usize,
    height: usize,
    stride: usize,
    size: usize,
    /// Row the window will center on at the next `step()`.
    next_center: usize,
    /// Row currently centered; meaningful only after the first `step()`.
    center: usize,
    /// First upstream row not yet fetched.
    next_to_load: usize,
    buffer: Vec<f32>,
}

impl<'a> FetchWindow<'a> {
    pub fn new(upstream: &'a mut dyn Stage, margin: usize, first_line: usize) -> Self {
        let info = upstream.descriptor();
        let height = info.buffer_height;
        let stride = info.stride();
        let size = 2 * margin + 1;

        FetchWindow {
            upstream,
            margin,
            height,
            stride,
            size,
            next_center: first_line,
            center: first_line,
            next_to_load: first_line.saturating_sub(margin),
            buffer: vec![0.0; size * stride],
        }
    }

    /// Advances the window by one row. Called once per output row, strictly
    /// top to bottom. Pulls the minimal new row range from upstream: the
    /// whole initial band on the first step, then normally a single row
    /// entering at the trailing edge, and nothing once the bottom margin has
    /// been reached.
    pub fn step(&mut self) -> Result<()> {
        let center = self.next_center;
        let last_needed = (center + self.margin).min(self.height - 1);

        while self.next_to_load <= last_needed {
            let slot = self.next_to_load % self.size;
            // A contiguous row range lands in contiguous slots up to the
            // circular wrap point; split the upstream call there.
            let run = (self.size - slot).min(last_needed - self.next_to_load + 1);
            let dst = &mut self.buffer[slot * self.stride..(slot + run) * self.stride];
            self.upstream
                .compute(self.next_to_load, self.next_to_load + run - 1, dst)?;
            self.next_to_load += run;
        }

        self.center = center;
        self.next_center = center + 1;
        Ok(())
    }

    /// The scanline at logical window position `i` in `0..=2 * margin`;
    /// position `margin` is the current center row. Positions that fall
    /// outside the image resolve to the mirrored in-range row.
    pub fn row(&self, i: usize) -> &[f32] {
        debug_assert!(i < self.size);
        let offset = i as isize - self.margin as isize;
        let src = reflect(self.center as isize + offset, self.height);
        let slot = src % self.size;
        &self.buffer[slot * self.stride..(slot + 1) * self.stride]
    }
}

/// Mirrors an index across the nearest boundary: `-r` below zero,
/// `2 * (len - 1) - r` past the end. The demosaic kernels apply the same
/// policy horizontally that the window applies vertically.
pub(crate) fn reflect(row: isize, height: usize) -> usize {
    if row < 0 {
        (-row) as usize
    } else if row as usize >= height {
        2 * (height - 1) - row as usize
    } else {
        row as usize
    }
}
