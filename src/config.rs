//! Painter configuration.
//!
//! This module contains the configuration structures used by the painter. The
//! [`SynthesisConfig`] is the immutable value that drives chirp synthesis. The
//! [`Config`] structure groups it together with the raster and transmitter
//! settings, and can be loaded from a JSON file.

use crate::error::{ensure_param, Error, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// Fraction of the usable baseband that the chirp is allowed to occupy
const BANDWIDTH_MARGIN: f64 = 0.9;

/// A frequency in Hz.
///
/// This is used for frequencies, bandwidths and sample rates given on the
/// command line. It can be parsed from strings such as `435M`, `100k`, `2e6`
/// or `1.5G`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Hertz(pub f64);

impl Hertz {
    /// Returns the frequency in Hz.
    pub fn hz(self) -> f64 {
        self.0
    }
}

impl FromStr for Hertz {
    type Err = Error;

    fn from_str(s: &str) -> Result<Hertz> {
        let s = s.trim();
        let (number, multiplier) = match s.char_indices().last() {
            Some((j, 'k' | 'K')) => (&s[..j], 1e3),
            Some((j, 'M')) => (&s[..j], 1e6),
            Some((j, 'G')) => (&s[..j], 1e9),
            _ => (s, 1.0),
        };
        let value = number
            .trim_end()
            .parse::<f64>()
            .map_err(|_| Error::InvalidParameter(format!("{s:?} is not a frequency")))?
            * multiplier;
        ensure_param!(
            value.is_finite() && value >= 0.0,
            "frequency {s:?} is not a finite non-negative value"
        );
        Ok(Hertz(value))
    }
}

impl std::fmt::Display for Hertz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let (value, unit) = match self.0.abs() {
            x if x >= 1e9 => (self.0 / 1e9, "GHz"),
            x if x >= 1e6 => (self.0 / 1e6, "MHz"),
            x if x >= 1e3 => (self.0 / 1e3, "kHz"),
            _ => (self.0, "Hz"),
        };
        write!(f, "{value} {unit}")
    }
}

/// Sideband mode of the chirp.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sideband {
    /// Single-sideband (USB).
    ///
    /// The chirp sweeps upwards from `fmin` to `fmin + bandwidth`, so it only
    /// occupies positive baseband frequencies.
    Upper {
        /// Start frequency of the chirp in Hz.
        fmin: f64,
    },
    /// Double-sideband.
    ///
    /// The chirp sweeps from `-bandwidth / 2` to `bandwidth / 2`.
    Double,
}

impl Default for Sideband {
    fn default() -> Sideband {
        Sideband::Upper { fmin: 0.0 }
    }
}

impl Sideband {
    /// Returns the start frequency of a chirp with the given bandwidth.
    pub fn start_frequency(&self, bandwidth: f64) -> f64 {
        match *self {
            Sideband::Upper { fmin } => fmin,
            Sideband::Double => -0.5 * bandwidth,
        }
    }
}

/// Chirp synthesis configuration.
///
/// All the frequencies are given in Hz.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Sample rate in samples per second.
    pub samp_rate: f64,
    /// Bandwidth swept by each chirp.
    pub bandwidth: f64,
    /// Number of raster rows transmitted per second.
    pub rows_per_second: f64,
    /// Sideband mode.
    pub sideband: Sideband,
    /// Number of parallel synthesis workers.
    ///
    /// If this is `None`, one worker less than the available hardware
    /// parallelism is used (and at least one).
    pub workers: Option<usize>,
}

impl Default for SynthesisConfig {
    fn default() -> SynthesisConfig {
        SynthesisConfig {
            samp_rate: 2e6,
            bandwidth: 100e3,
            rows_per_second: 30.0,
            sideband: Sideband::default(),
            workers: None,
        }
    }
}

impl SynthesisConfig {
    /// Checks that the configuration can be synthesized.
    ///
    /// Returns [`Error::InvalidParameter`] if some value is not finite, if the
    /// sample rate, bandwidth or number of rows per second is not positive, if
    /// the single-sideband `fmin` is negative, or if the chirp does not fit in
    /// the baseband given by the sample rate.
    pub fn validate(&self) -> Result<()> {
        ensure_param!(
            self.samp_rate.is_finite() && self.samp_rate > 0.0,
            "sample rate {} must be positive",
            self.samp_rate
        );
        ensure_param!(
            self.rows_per_second.is_finite() && self.rows_per_second > 0.0,
            "rows per second {} must be positive",
            self.rows_per_second
        );
        ensure_param!(
            self.bandwidth.is_finite() && self.bandwidth > 0.0,
            "chirp bandwidth {} must be positive",
            self.bandwidth
        );
        match self.sideband {
            Sideband::Upper { fmin } => {
                ensure_param!(
                    fmin.is_finite() && fmin >= 0.0,
                    "USB fmin {fmin} must be non-negative"
                );
                ensure_param!(
                    fmin + self.bandwidth <= 0.5 * self.samp_rate,
                    "USB chirp upper edge {} Hz exceeds the Nyquist frequency {} Hz",
                    fmin + self.bandwidth,
                    0.5 * self.samp_rate
                );
            }
            Sideband::Double => {
                ensure_param!(
                    self.bandwidth <= self.samp_rate,
                    "DSB chirp bandwidth {} Hz exceeds the sample rate {} Hz",
                    self.bandwidth,
                    self.samp_rate
                );
            }
        }
        if let Some(workers) = self.workers {
            ensure_param!(workers >= 1, "at least one worker is needed");
        }
        Ok(())
    }

    /// Clamps the chirp bandwidth to 90% of the usable baseband.
    ///
    /// The usable baseband is `samp_rate` for double-sideband and
    /// `samp_rate / 2 - fmin` for single-sideband. A warning is logged if the
    /// bandwidth is modified.
    pub fn clamp_bandwidth(mut self) -> SynthesisConfig {
        let usable = match self.sideband {
            Sideband::Upper { fmin } => 0.5 * self.samp_rate - fmin,
            Sideband::Double => self.samp_rate,
        };
        let max = BANDWIDTH_MARGIN * usable;
        if max > 0.0 && self.bandwidth > max {
            tracing::warn!(
                requested = self.bandwidth,
                clamped = max,
                "chirp bandwidth clamped for Nyquist"
            );
            self.bandwidth = max;
        }
        self
    }

    /// Returns the number of synthesis workers to use.
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }

    /// Returns the duration of a waveform with `rows` raster rows.
    pub fn duration(&self, rows: usize) -> Result<Duration> {
        Duration::try_from_secs_f64(rows as f64 / self.rows_per_second).map_err(|_| {
            Error::InvalidParameter(format!(
                "duration of {rows} rows at {} rows/s is not representable",
                self.rows_per_second
            ))
        })
    }
}

/// Raster rendering configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Raster width in pixels.
    pub width: usize,
    /// Raster height in pixels (number of chirps).
    pub height: usize,
    /// Invert the intensities of the raster.
    pub invert: bool,
    /// Flip the raster vertically.
    ///
    /// This makes the top row of the picture the last one to be transmitted,
    /// so that the picture reads upright on a waterfall that scrolls
    /// downwards.
    pub flip: bool,
}

impl Default for RasterConfig {
    fn default() -> RasterConfig {
        RasterConfig {
            width: 1024,
            height: 512,
            invert: false,
            flip: true,
        }
    }
}

/// Transmitter configuration.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    /// Center frequency in Hz.
    pub frequency: f64,
    /// Transmit gain in dB.
    pub gain_db: f64,
    /// Transmit the file in a loop until stopped.
    pub repeat: bool,
    /// Enable the HackRF antenna port power.
    pub antenna_power: bool,
    /// Enable the bladeRF RX bias tee.
    pub bias_tee_rx: bool,
    /// Enable the bladeRF TX bias tee.
    pub bias_tee_tx: bool,
}

impl Default for TransmitConfig {
    fn default() -> TransmitConfig {
        TransmitConfig {
            frequency: 435e6,
            gain_db: 30.0,
            repeat: false,
            antenna_power: false,
            bias_tee_rx: false,
            bias_tee_tx: false,
        }
    }
}

/// Painter configuration.
///
/// This can be loaded from a JSON file. Missing sections and fields take
/// their default values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chirp synthesis settings.
    pub synthesis: SynthesisConfig,
    /// Raster settings.
    pub raster: RasterConfig,
    /// Transmitter settings.
    pub transmit: TransmitConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_hertz() {
        assert_eq!("435M".parse::<Hertz>().unwrap(), Hertz(435e6));
        assert_eq!("100k".parse::<Hertz>().unwrap(), Hertz(100e3));
        assert_eq!("2e6".parse::<Hertz>().unwrap(), Hertz(2e6));
        assert_eq!("1.5G".parse::<Hertz>().unwrap(), Hertz(1.5e9));
        assert_eq!(" 30 ".parse::<Hertz>().unwrap(), Hertz(30.0));
        assert!(matches!(
            "fast".parse::<Hertz>(),
            Err(Error::InvalidParameter(_))
        ));
        assert!("-2M".parse::<Hertz>().is_err());
        assert!("infk".parse::<Hertz>().is_err());
        assert!("M".parse::<Hertz>().is_err());
    }

    #[test]
    fn display_hertz() {
        assert_eq!(Hertz(435e6).to_string(), "435 MHz");
        assert_eq!(Hertz(1.75e6).to_string(), "1.75 MHz");
        assert_eq!(Hertz(100e3).to_string(), "100 kHz");
        assert_eq!(Hertz(12.0).to_string(), "12 Hz");
    }

    #[test]
    fn default_is_valid() {
        assert!(SynthesisConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let base = SynthesisConfig::default();
        let invalid = [
            SynthesisConfig {
                samp_rate: 0.0,
                ..base
            },
            SynthesisConfig {
                rows_per_second: 0.0,
                ..base
            },
            SynthesisConfig {
                rows_per_second: f64::NAN,
                ..base
            },
            SynthesisConfig {
                bandwidth: 0.0,
                ..base
            },
            SynthesisConfig {
                bandwidth: -50e3,
                ..base
            },
            SynthesisConfig {
                sideband: Sideband::Upper { fmin: -1.0 },
                ..base
            },
            SynthesisConfig {
                sideband: Sideband::Upper { fmin: 950e3 },
                ..base
            },
            SynthesisConfig {
                bandwidth: 2.5e6,
                sideband: Sideband::Double,
                ..base
            },
            SynthesisConfig {
                workers: Some(0),
                ..base
            },
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(Error::InvalidParameter(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn clamp_bandwidth() {
        let config = SynthesisConfig {
            bandwidth: 5e6,
            sideband: Sideband::Double,
            ..Default::default()
        }
        .clamp_bandwidth();
        approx::assert_relative_eq!(config.bandwidth, 1.8e6, max_relative = 1e-12);
        assert!(config.validate().is_ok());

        let config = SynthesisConfig {
            bandwidth: 5e6,
            sideband: Sideband::Upper { fmin: 100e3 },
            ..Default::default()
        }
        .clamp_bandwidth();
        approx::assert_relative_eq!(config.bandwidth, 810e3, max_relative = 1e-12);
        assert!(config.validate().is_ok());

        // already within limits
        let config = SynthesisConfig::default().clamp_bandwidth();
        assert_eq!(config.bandwidth, 100e3);
    }

    #[test]
    fn workers() {
        let config = SynthesisConfig {
            workers: Some(3),
            ..Default::default()
        };
        assert_eq!(config.workers(), 3);
        assert!(SynthesisConfig::default().workers() >= 1);
    }

    #[test]
    fn duration() {
        let config = SynthesisConfig::default();
        assert_eq!(config.duration(60).unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn json_sections_are_optional() {
        let config: Config = serde_json::from_str(
            r#"{
  "synthesis": { "bandwidth": 200000.0, "sideband": { "kind": "double" } },
  "transmit": { "repeat": true }
}"#,
        )
        .unwrap();
        assert_eq!(config.synthesis.bandwidth, 200e3);
        assert_eq!(config.synthesis.samp_rate, 2e6);
        assert_eq!(config.synthesis.sideband, Sideband::Double);
        assert_eq!(config.raster, RasterConfig::default());
        assert!(config.transmit.repeat);
        assert_eq!(config.transmit.frequency, 435e6);
    }
}
