//! In-memory scanline producer
//!
//! [`BufferSource`] serves scanlines out of a materialized buffer. It is the
//! terminal producer used by the test fixtures and by callers that already
//! hold decoded sensor data; like any simple producer it satisfies `compute`
//! for any row range without requiring a prior demand declaration.

use crate::pipeline::common::error::Result;
use crate::pipeline::descriptor::{ImageDescriptor, Metadata, MosaicPattern};
use crate::pipeline::stage::{check_range, check_request, Stage};

pub struct BufferSource {
    descriptor: ImageDescriptor,
    data: Vec<f32>,
}

impl BufferSource {
    /// `data` holds `height` scanlines of `width * channels` interleaved
    /// samples.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), width * height * channels);
        BufferSource {
            descriptor: ImageDescriptor {
                buffer_width: width,
                buffer_height: height,
                buffer_channels: channels,
                image_width: width,
                image_height: height,
                left_offset: 0,
                top_offset: 0,
                mosaic_pattern: None,
                metadata: Metadata::default(),
            },
            data,
        }
    }

    /// Marks the buffer as mosaic data with the given pattern.
    pub fn with_pattern(mut self, pattern: MosaicPattern) -> Self {
        self.descriptor.mosaic_pattern = Some(pattern);
        self
    }

    /// Restricts the visually meaningful region to a sub-rectangle of the
    /// buffer, mimicking sensor margins.
    pub fn with_region(mut self, width: usize, height: usize, left: usize, top: usize) -> Self {
        assert!(left + width <= self.descriptor.buffer_width);
        assert!(top + height <= self.descriptor.buffer_height);
        self.descriptor.image_width = width;
        self.descriptor.image_height = height;
        self.descriptor.left_offset = left;
        self.descriptor.top_offset = top;
        self
    }

    #[cfg(test)]
    pub(crate) fn counting(self) -> CountingSource {
        CountingSource {
            inner: self,
            ranges: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

impl Stage for BufferSource {
    fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        // Terminal producer; the demand phase is a hint it does not need.
        check_range(&self.descriptor, first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        check_request(&self.descriptor, first_line, last_line, out.len())?;

        let stride = self.descriptor.stride();
        let src = &self.data[first_line * stride..(last_line + 1) * stride];
        out.copy_from_slice(src);
        Ok(())
    }
}

/// Test instrumentation: a [`BufferSource`] that records every computed row
/// range behind a shared handle, for asserting fetch-once and
/// minimal-upstream-work invariants after the source has been moved into a
/// downstream stage.
#[cfg(test)]
pub(crate) struct CountingSource {
    inner: BufferSource,
    ranges: std::sync::Arc<std::sync::Mutex<Vec<(usize, usize)>>>,
}

#[cfg(test)]
impl CountingSource {
    pub(crate) fn ranges_handle(&self) -> std::sync::Arc<std::sync::Mutex<Vec<(usize, usize)>>> {
        self.ranges.clone()
    }

    pub(crate) fn ranges(&self) -> Vec<(usize, usize)> {
        self.ranges.lock().unwrap().clone()
    }

    /// How many times each row was pulled, indexed by row.
    pub(crate) fn fetch_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.inner.descriptor.buffer_height];
        for &(first, last) in self.ranges.lock().unwrap().iter() {
            for count in &mut counts[first..=last] {
                *count += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
impl Stage for CountingSource {
    fn descriptor(&self) -> &ImageDescriptor {
        self.inner.descriptor()
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        self.inner.declare_demand(first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        self.ranges.lock().unwrap().push((first_line, last_line));
        self.inner.compute(first_line, last_line, out)
    }
}
