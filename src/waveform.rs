//! Waveform synthesis and post-processing.
//!
//! This module contains [`Waveform`], the complete baseband signal for a
//! raster. The rows synthesized by the [`scheduler`](crate::scheduler) are
//! concatenated, the DC component is removed, and the signal is normalized to
//! a fixed peak amplitude.

use crate::chirp::RowChirp;
use crate::config::SynthesisConfig;
use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::scheduler::{self, RowSlices};
use num_complex::{Complex32, Complex64};
use std::time::Duration;

/// Peak amplitude of the normalized waveform.
///
/// The 5% of headroom absorbs quantization and interpolation overshoot.
pub const PEAK_AMPLITUDE: f32 = 0.95;

// Below this peak the waveform is considered to be silent.
const PEAK_FLOOR: f32 = 1e-6;

/// Baseband waveform.
///
/// The samples are normalized so that their peak magnitude is
/// [`PEAK_AMPLITUDE`], and they have zero mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<Complex32>,
    samples_per_row: usize,
    config: SynthesisConfig,
    frequency_range: (f64, f64),
    duration: Duration,
}

impl Waveform {
    /// Synthesizes the waveform for a raster.
    ///
    /// The rows are synthesized in parallel using the number of workers given
    /// by the `config`. Returns [`Error::InvalidParameter`] if the `config` is
    /// not valid and [`Error::InvalidInput`] if the raster gives a silent
    /// waveform (for instance, if it is completely black).
    #[tracing::instrument(level = "debug", skip(raster), fields(width = raster.width(), height = raster.height()))]
    pub fn synthesize(raster: &Raster, config: SynthesisConfig) -> Result<Waveform> {
        let chirp = RowChirp::new(&config)?;
        let duration = config.duration(raster.height())?;
        let workers = config.workers();
        tracing::info!(
            rows = raster.height(),
            samples_per_row = chirp.samples_per_row(),
            workers,
            "synthesizing chirps"
        );
        let rows = scheduler::synthesize_rows(raster, &chirp, workers)?;
        Waveform::from_rows(rows, config, chirp.frequency_range(), duration)
    }

    fn from_rows(
        rows: RowSlices,
        config: SynthesisConfig,
        frequency_range: (f64, f64),
        duration: Duration,
    ) -> Result<Waveform> {
        let samples_per_row = rows.samples_per_row();
        let mut samples = rows.into_samples();
        let dc = remove_dc(&mut samples);
        let peak = peak_magnitude(&samples);
        if peak.is_nan() || peak < PEAK_FLOOR {
            return Err(Error::InvalidInput(format!(
                "waveform peak magnitude {peak} is too small (is the raster black?)"
            )));
        }
        let scale = PEAK_AMPLITUDE / peak;
        for x in samples.iter_mut() {
            *x *= scale;
        }
        tracing::debug!(%dc, peak, scale, "waveform normalized");
        Ok(Waveform {
            samples,
            samples_per_row,
            config,
            frequency_range,
            duration,
        })
    }

    /// Gives the samples of the waveform.
    pub fn samples(&self) -> &[Complex32] {
        &self.samples
    }

    /// Gives the number of raster rows in the waveform.
    pub fn num_rows(&self) -> usize {
        self.samples.len() / self.samples_per_row
    }

    /// Gives the number of samples used for each row.
    pub fn samples_per_row(&self) -> usize {
        self.samples_per_row
    }

    /// Gives the synthesis configuration of the waveform.
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Gives the baseband frequency range swept by each chirp, in Hz.
    pub fn frequency_range(&self) -> (f64, f64) {
        self.frequency_range
    }

    /// Gives the duration of the waveform.
    ///
    /// This is the number of rows divided by the number of rows per second.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

// Subtracts the mean of the samples, which is returned.
fn remove_dc(samples: &mut [Complex32]) -> Complex32 {
    if samples.is_empty() {
        return Complex32::default();
    }
    let sum = samples.iter().fold(Complex64::default(), |acc, x| {
        acc + Complex64::new(f64::from(x.re), f64::from(x.im))
    });
    let mean = sum / samples.len() as f64;
    let mean = Complex32::new(mean.re as f32, mean.im as f32);
    for x in samples.iter_mut() {
        *x -= mean;
    }
    mean
}

fn peak_magnitude(samples: &[Complex32]) -> f32 {
    samples.iter().map(|x| x.norm()).fold(0.0, f32::max)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Sideband;
    use approx::assert_abs_diff_eq;

    fn config() -> SynthesisConfig {
        SynthesisConfig {
            samp_rate: 200e3,
            bandwidth: 50e3,
            rows_per_second: 100.0,
            sideband: Sideband::Upper { fmin: 10e3 },
            workers: Some(2),
        }
    }

    fn checkerboard(width: usize, height: usize) -> Raster {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x / 4 + y) % 2) as f32))
            .collect();
        Raster::new(width, height, data).unwrap()
    }

    #[test]
    fn length_and_duration() {
        let raster = checkerboard(32, 12);
        let waveform = Waveform::synthesize(&raster, config()).unwrap();
        assert_eq!(waveform.samples_per_row(), 2000);
        assert_eq!(waveform.num_rows(), 12);
        assert_eq!(waveform.samples().len(), 12 * 2000);
        assert_abs_diff_eq!(waveform.duration().as_secs_f64(), 0.12, epsilon = 1e-9);
        assert_eq!(waveform.frequency_range(), (10e3, 60e3));
    }

    #[test]
    fn normalized_peak() {
        let raster = checkerboard(32, 12);
        let waveform = Waveform::synthesize(&raster, config()).unwrap();
        let peak = peak_magnitude(waveform.samples());
        assert!(peak <= 1.0);
        assert_abs_diff_eq!(peak, PEAK_AMPLITUDE, epsilon = 1e-5);
    }

    #[test]
    fn zero_mean() {
        let raster = checkerboard(32, 12);
        let waveform = Waveform::synthesize(&raster, config()).unwrap();
        let n = waveform.samples().len() as f64;
        let mean = waveform.samples().iter().fold(Complex64::default(), |acc, x| {
            acc + Complex64::new(f64::from(x.re), f64::from(x.im))
        }) / n;
        assert!(mean.norm() < 1e-5, "mean {mean}");
    }

    #[test]
    fn black_raster_is_rejected() {
        let raster = Raster::new(8, 4, vec![0.0; 32]).unwrap();
        assert!(matches!(
            Waveform::synthesize(&raster, config()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn single_column_raster() {
        let raster = Raster::new(1, 3, vec![1.0, 1.0, 1.0]).unwrap();
        let waveform = Waveform::synthesize(&raster, config()).unwrap();
        assert_eq!(waveform.samples().len(), 3 * 2000);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let raster = checkerboard(8, 2);
        let config = SynthesisConfig {
            samp_rate: -1.0,
            ..config()
        };
        assert!(matches!(
            Waveform::synthesize(&raster, config),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn remove_dc_offset() {
        let mut samples = vec![Complex32::new(1.0, 2.0), Complex32::new(3.0, -2.0)];
        let dc = remove_dc(&mut samples);
        assert_eq!(dc, Complex32::new(2.0, 0.0));
        assert_eq!(
            samples,
            vec![Complex32::new(-1.0, 2.0), Complex32::new(1.0, -2.0)]
        );
    }
}
