//! Chirp synthesis.
//!
//! Each raster row is transmitted as a linear-FM chirp whose amplitude follows
//! the intensities of the row. All the rows share the same chirp law, so the
//! complex exponential of the chirp phase is computed once in [`RowChirp::new`]
//! and reused for every row.
//!
//! The phase of the chirp is
//!
//! ```text
//! φ(t) = 2π (f0 t + k t² / 2),    0 <= t < Tr
//! ```
//!
//! where `Tr` is the row duration, `k = BW / Tr` is the chirp rate and `f0` is
//! the start frequency, which depends on the [`Sideband`](crate::config::Sideband)
//! mode.

use crate::config::SynthesisConfig;
use crate::error::{ensure_param, Error, Result};
use crate::scheduler::MAX_SAMPLES;
use num_complex::Complex32;
use std::f64::consts::PI;

/// Minimum number of samples in each chirp.
pub const MIN_SAMPLES_PER_ROW: usize = 16;

/// Per-row chirp.
///
/// This contains the chirp parameters derived from a [`SynthesisConfig`] and
/// the phase template `exp(iφ(t))`. It is read-only once constructed, so it can
/// be shared between threads that synthesize different rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChirp {
    row_duration: f64,
    bandwidth: f64,
    start_frequency: f64,
    chirp_rate: f64,
    template: Vec<Complex32>,
}

impl RowChirp {
    /// Creates the chirp for a synthesis configuration.
    ///
    /// The number of samples per row is `round(samp_rate / rows_per_second)`,
    /// but never less than [`MIN_SAMPLES_PER_ROW`]. Returns
    /// [`Error::InvalidParameter`] if the configuration is not valid or a row
    /// would take more than [`MAX_SAMPLES`] samples.
    pub fn new(config: &SynthesisConfig) -> Result<RowChirp> {
        config.validate()?;
        let row_duration = 1.0 / config.rows_per_second;
        let samples = (config.samp_rate * row_duration).round();
        ensure_param!(
            samples <= MAX_SAMPLES as f64,
            "{samples} samples per row exceed the limit of {MAX_SAMPLES} samples"
        );
        let samples_per_row = (samples as usize).max(MIN_SAMPLES_PER_ROW);
        let start_frequency = config.sideband.start_frequency(config.bandwidth);
        let chirp_rate = config.bandwidth / row_duration;
        let dt = row_duration / samples_per_row as f64;
        let template = (0..samples_per_row)
            .map(|n| {
                let t = n as f64 * dt;
                let phase = 2.0 * PI * (start_frequency * t + 0.5 * chirp_rate * t * t);
                let (sin, cos) = phase.sin_cos();
                Complex32::new(cos as f32, sin as f32)
            })
            .collect();
        Ok(RowChirp {
            row_duration,
            bandwidth: config.bandwidth,
            start_frequency,
            chirp_rate,
            template,
        })
    }

    /// Gives the number of samples in each row.
    pub fn samples_per_row(&self) -> usize {
        self.template.len()
    }

    /// Gives the duration of each row in seconds.
    pub fn row_duration(&self) -> f64 {
        self.row_duration
    }

    /// Gives the chirp rate in Hz per second.
    pub fn chirp_rate(&self) -> f64 {
        self.chirp_rate
    }

    /// Gives the baseband frequency range swept by the chirp, in Hz.
    pub fn frequency_range(&self) -> (f64, f64) {
        (self.start_frequency, self.start_frequency + self.bandwidth)
    }

    /// Gives the phase template `exp(iφ(t))`.
    pub fn template(&self) -> &[Complex32] {
        &self.template
    }

    /// Synthesizes the chirp for one raster row.
    ///
    /// The row is linearly interpolated to the number of samples per row and
    /// multiplied by the phase template. The result is written to `output`,
    /// which must have a length equal to [`RowChirp::samples_per_row`].
    pub fn synthesize_row(&self, row: &[f32], output: &mut [Complex32]) -> Result<()> {
        if row.is_empty() {
            return Err(Error::InvalidInput("raster row is empty".to_string()));
        }
        ensure_param!(
            output.len() == self.samples_per_row(),
            "row output has {} samples, but {} were expected",
            output.len(),
            self.samples_per_row()
        );
        for ((out, &carrier), amplitude) in output
            .iter_mut()
            .zip(self.template.iter())
            .zip(resample(row, self.samples_per_row()))
        {
            *out = carrier * amplitude;
        }
        Ok(())
    }
}

/// Linearly interpolates `row` to `num_samples` evenly spaced points.
///
/// The first and last output points coincide with the first and last elements
/// of `row`. A row with a single element gives a constant output.
pub fn resample(row: &[f32], num_samples: usize) -> impl Iterator<Item = f32> + '_ {
    let last = row.len().saturating_sub(1);
    let step = if last == 0 || num_samples < 2 {
        0.0
    } else {
        last as f64 / (num_samples - 1) as f64
    };
    (0..num_samples).map(move |j| {
        let x = j as f64 * step;
        let index = (x.floor() as usize).min(last);
        if index == last {
            row[last]
        } else {
            let frac = (x - index as f64) as f32;
            row[index] + (row[index + 1] - row[index]) * frac
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Sideband;
    use approx::assert_abs_diff_eq;

    fn config(sideband: Sideband) -> SynthesisConfig {
        SynthesisConfig {
            samp_rate: 1e6,
            bandwidth: 100e3,
            rows_per_second: 100.0,
            sideband,
            workers: Some(1),
        }
    }

    // Instantaneous frequency between consecutive samples, in Hz
    fn instantaneous_frequency(samples: &[Complex32], samp_rate: f64) -> Vec<f64> {
        samples
            .windows(2)
            .map(|w| f64::from((w[1] * w[0].conj()).arg()) * samp_rate / (2.0 * PI))
            .collect()
    }

    #[test]
    fn samples_per_row() {
        let chirp = RowChirp::new(&SynthesisConfig::default()).unwrap();
        assert_eq!(chirp.samples_per_row(), 66667);
        assert_abs_diff_eq!(chirp.row_duration(), 1.0 / 30.0);
        assert_abs_diff_eq!(chirp.chirp_rate(), 3e6, epsilon = 1e-6);
    }

    #[test]
    fn minimum_samples_per_row() {
        let chirp = RowChirp::new(&SynthesisConfig {
            samp_rate: 100.0,
            bandwidth: 10.0,
            rows_per_second: 30.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(chirp.samples_per_row(), MIN_SAMPLES_PER_ROW);
    }

    #[test]
    fn invalid_config() {
        let result = RowChirp::new(&SynthesisConfig {
            rows_per_second: 0.0,
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        let result = RowChirp::new(&SynthesisConfig {
            samp_rate: 1e12,
            rows_per_second: 1e-3,
            bandwidth: 1e3,
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        // 2e9 samples per row
        let result = RowChirp::new(&SynthesisConfig {
            samp_rate: 20e6,
            rows_per_second: 0.01,
            bandwidth: 100e3,
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn template_is_unit_magnitude() {
        let chirp = RowChirp::new(&config(Sideband::Double)).unwrap();
        assert_eq!(chirp.template()[0], Complex32::new(1.0, 0.0));
        for x in chirp.template() {
            assert_abs_diff_eq!(x.norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn sideband_frequency_ranges() {
        let samp_rate = 1e6;
        let bandwidth = 100e3;
        let row = vec![1.0; 64];
        let mut sweeps = Vec::new();
        for sideband in [Sideband::Upper { fmin: 0.0 }, Sideband::Double] {
            let chirp = RowChirp::new(&config(sideband)).unwrap();
            let mut output = vec![Complex32::default(); chirp.samples_per_row()];
            chirp.synthesize_row(&row, &mut output).unwrap();
            let freq = instantaneous_frequency(&output, samp_rate);
            // monotonically increasing sweep
            assert!(freq.windows(2).all(|w| w[1] > w[0]));
            let low = freq[0];
            let high = freq[freq.len() - 1];
            // the estimates are offset by half a sample at the chirp rate
            let tolerance = 2.0 * chirp.chirp_rate() / samp_rate + 1.0;
            let (f0, f1) = chirp.frequency_range();
            assert_abs_diff_eq!(low, f0, epsilon = tolerance);
            assert_abs_diff_eq!(high, f1, epsilon = tolerance);
            sweeps.push((low, high));
        }
        let (usb, dsb) = (sweeps[0], sweeps[1]);
        assert_abs_diff_eq!(usb.0, 0.0, epsilon = 20.0);
        assert_abs_diff_eq!(usb.0 - dsb.0, bandwidth / 2.0, epsilon = 1.0);
        assert_abs_diff_eq!(usb.1 - dsb.1, bandwidth / 2.0, epsilon = 1.0);
    }

    #[test]
    fn usb_fmin_offset() {
        let chirp = RowChirp::new(&config(Sideband::Upper { fmin: 200e3 })).unwrap();
        assert_eq!(chirp.frequency_range(), (200e3, 300e3));
        let freq = instantaneous_frequency(chirp.template(), 1e6);
        assert_abs_diff_eq!(freq[0], 200e3, epsilon = 20.0);
    }

    #[test]
    fn single_column_is_constant_amplitude() {
        let chirp = RowChirp::new(&config(Sideband::Double)).unwrap();
        let mut output = vec![Complex32::default(); chirp.samples_per_row()];
        chirp.synthesize_row(&[0.5], &mut output).unwrap();
        for x in &output {
            assert_abs_diff_eq!(x.norm(), 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn row_amplitude_follows_intensity() {
        let chirp = RowChirp::new(&config(Sideband::Double)).unwrap();
        let mut output = vec![Complex32::default(); chirp.samples_per_row()];
        chirp.synthesize_row(&[0.0, 1.0], &mut output).unwrap();
        let n = output.len();
        assert_abs_diff_eq!(output[0].norm(), 0.0);
        assert_abs_diff_eq!(output[n - 1].norm(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output[n / 2].norm(), 0.5, epsilon = 1e-3);
    }

    #[test]
    fn synthesize_row_errors() {
        let chirp = RowChirp::new(&config(Sideband::Double)).unwrap();
        let mut output = vec![Complex32::default(); chirp.samples_per_row()];
        assert!(matches!(
            chirp.synthesize_row(&[], &mut output),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            chirp.synthesize_row(&[1.0], &mut output[1..]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn resample_linear() {
        let out = resample(&[0.0, 1.0], 16).collect::<Vec<_>>();
        assert_eq!(out.len(), 16);
        for (j, &x) in out.iter().enumerate() {
            assert_abs_diff_eq!(x, j as f32 / 15.0, epsilon = 1e-6);
        }
        let out = resample(&[0.0, 1.0, 0.0], 5).collect::<Vec<_>>();
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.5, 0.0]);
        assert!(resample(&[0.25], 4).all(|x| x == 0.25));
    }
}
