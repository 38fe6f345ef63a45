//! Reference-counted scanline cache
//!
//! Sits between one producer and several independent consumers. Each
//! consumer declares its own row demand; the cache counts outstanding
//! demand per row, pulls every upstream row at most once, and keeps a copy
//! of exactly the rows that a later consumer will revisit, dropping each
//! copy as soon as its last consumer has been served.
//!
//! Mutable state (the counter table and cache entries) is unsynchronized;
//! concurrent `compute` calls on one instance are unsupported, even for
//! disjoint ranges.

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::descriptor::ImageDescriptor;
use crate::pipeline::stage::{check_range, check_request, Stage};

pub struct ScanlineCacheStage<S: Stage> {
    upstream: S,
    /// Outstanding declared-but-not-consumed requests per row.
    counters: Vec<usize>,
    /// Cached copy of a row, present only while its counter exceeds one.
    cache: Vec<Option<Vec<f32>>>,
}

impl<S: Stage> ScanlineCacheStage<S> {
    pub fn new(upstream: S) -> Self {
        let height = upstream.descriptor().buffer_height;
        ScanlineCacheStage {
            upstream,
            counters: vec![0; height],
            cache: (0..height).map(|_| None).collect(),
        }
    }

    /// Pulls `[first, last]` from upstream into `out` and caches every row
    /// in the run that a later consumer still needs.
    fn fetch_run(&mut self, first: usize, last: usize, out_base: usize, out: &mut [f32]) -> Result<()> {
        let stride = self.upstream.descriptor().stride();
        let dst = &mut out[(first - out_base) * stride..(last - out_base + 1) * stride];
        self.upstream.compute(first, last, dst)?;

        for row in first..=last {
            // A row demanded exactly once is never worth caching.
            if self.counters[row] > 1 {
                let copy = out[(row - out_base) * stride..(row - out_base + 1) * stride].to_vec();
                self.cache[row] = Some(copy);
            }
        }
        Ok(())
    }
}

impl<S: Stage> Stage for ScanlineCacheStage<S> {
    fn descriptor(&self) -> &ImageDescriptor {
        self.upstream.descriptor()
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        check_range(self.upstream.descriptor(), first_line, last_line)?;

        // Demand coalesces here: whatever the fan-out below, each row is
        // pulled from upstream once, so only first-time rows are forwarded.
        let mut run_start = None;
        for line in first_line..=last_line + 1 {
            let fresh = line <= last_line && self.counters[line] == 0;
            if fresh {
                run_start.get_or_insert(line);
                self.counters[line] += 1;
            } else {
                if let Some(start) = run_start.take() {
                    self.upstream.declare_demand(start, line - 1)?;
                }
                if line <= last_line {
                    self.counters[line] += 1;
                }
            }
        }
        Ok(())
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        check_request(self.upstream.descriptor(), first_line, last_line, out.len())?;

        for line in first_line..=last_line {
            if self.counters[line] == 0 {
                return Err(PipelineError::UndeclaredRow(line));
            }
        }

        let stride = self.upstream.descriptor().stride();

        // Walk the range with a sentinel one past the end so a trailing
        // uncached run is flushed. Cached rows close the pending run; the
        // run is fetched from upstream in one call.
        let mut run_start = first_line;
        for line in first_line..=last_line + 1 {
            let cached = line <= last_line && self.cache[line].is_some();
            if line > last_line || cached {
                if run_start < line {
                    self.fetch_run(run_start, line - 1, first_line, out)?;
                }
                if line <= last_line {
                    if let Some(row) = &self.cache[line] {
                        let dst = &mut out[(line - first_line) * stride..(line - first_line + 1) * stride];
                        dst.copy_from_slice(row);
                    }
                    run_start = line + 1;
                }
            }
        }

        for line in first_line..=last_line {
            self.counters[line] -= 1;
            if self.counters[line] == 0 {
                self.cache[line] = None;
            }
        }
        Ok(())
    }
}
