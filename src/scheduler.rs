//! Row scheduler.
//!
//! The rows of the raster are synthesized independently of each other by a
//! pool of worker threads. The output of all the rows is written into a single
//! buffer allocated up-front and indexed by row number, so the rows end up in
//! transmission order regardless of the order in which the workers finish.

use crate::chirp::RowChirp;
use crate::error::{ensure_param, Error, Result};
use crate::raster::Raster;
use num_complex::Complex32;
use rayon::prelude::*;

/// Maximum number of samples in a synthesized waveform.
///
/// This bounds the memory taken by the output buffer to 2 GiB.
pub const MAX_SAMPLES: usize = 1 << 28;

/// Synthesized rows.
///
/// Contains the chirps of all the rows of a raster, concatenated in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSlices {
    samples_per_row: usize,
    samples: Vec<Complex32>,
}

impl RowSlices {
    /// Gives the number of rows.
    pub fn num_rows(&self) -> usize {
        self.samples.len() / self.samples_per_row
    }

    /// Gives the number of samples in each row.
    pub fn samples_per_row(&self) -> usize {
        self.samples_per_row
    }

    /// Returns the samples of one of the rows.
    ///
    /// # Panics
    ///
    /// This function panics if `row` is greater or equal to the number of
    /// rows.
    pub fn row(&self, row: usize) -> &[Complex32] {
        assert!(row < self.num_rows());
        &self.samples[row * self.samples_per_row..(row + 1) * self.samples_per_row]
    }

    /// Returns the samples of all the rows concatenated in order.
    pub fn into_samples(self) -> Vec<Complex32> {
        self.samples
    }
}

/// Synthesizes all the rows of a raster in parallel.
///
/// Uses `workers` threads. The first row that fails aborts the synthesis, and
/// its error is returned as an [`Error::WorkerFailure`].
pub fn synthesize_rows(raster: &Raster, chirp: &RowChirp, workers: usize) -> Result<RowSlices> {
    schedule(
        raster.height(),
        chirp.samples_per_row(),
        workers,
        |row, output| chirp.synthesize_row(raster.row(row), output),
    )
}

/// Runs a work function for each row on a pool of worker threads.
///
/// The `work` function is called once for each row index in `0..num_rows`,
/// and it writes the samples of that row into the slice given as its second
/// argument.
#[tracing::instrument(level = "debug", skip(work))]
pub fn schedule<F>(
    num_rows: usize,
    samples_per_row: usize,
    workers: usize,
    work: F,
) -> Result<RowSlices>
where
    F: Fn(usize, &mut [Complex32]) -> Result<()> + Sync,
{
    ensure_param!(workers >= 1, "at least one worker is needed");
    ensure_param!(samples_per_row >= 1, "rows must have at least one sample");
    let len = num_rows
        .checked_mul(samples_per_row)
        .filter(|&len| len <= MAX_SAMPLES)
        .ok_or_else(|| {
            Error::InvalidParameter(format!(
                "{num_rows} rows of {samples_per_row} samples exceed the limit of {MAX_SAMPLES} samples"
            ))
        })?;
    let mut samples = vec![Complex32::default(); len];
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|j| format!("row-worker-{j}"))
        .build()?;
    pool.install(|| {
        samples
            .par_chunks_mut(samples_per_row)
            .enumerate()
            .try_for_each(|(row, output)| {
                work(row, output).map_err(|err| {
                    tracing::debug!(row, %err, "row synthesis failed");
                    Error::WorkerFailure {
                        row,
                        source: Box::new(err),
                    }
                })
            })
    })?;
    Ok(RowSlices {
        samples_per_row,
        samples,
    })
}
