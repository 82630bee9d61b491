//! HackRF transmitter.
//!
//! Transmission with a HackRF One is done by running `hackrf_transfer` on an
//! sc8 file. This module builds the arguments for `hackrf_transfer` from the
//! painter configuration.

use crate::config::TransmitConfig;
use crate::encoder::{EncodedSamples, SampleFormat};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub mod constants;

/// `hackrf_transfer` transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    file: PathBuf,
    frequency: u64,
    samp_rate: u32,
    gain: u32,
    baseband_filter: u32,
    repeat: bool,
    antenna_power: bool,
}

impl Transfer {
    /// Creates a transmission of an encoded file.
    ///
    /// The TX VGA gain is clamped to its valid range, and the baseband filter
    /// is selected from the catalog supported by the HackRF according to the
    /// sample rate and chirp bandwidth of the samples.
    pub fn new(
        file: &Path,
        samples: &EncodedSamples,
        config: &TransmitConfig,
    ) -> anyhow::Result<Transfer> {
        anyhow::ensure!(
            samples.format() == SampleFormat::Sc8,
            "hackrf_transfer needs sc8 samples, but the samples are {}",
            samples.format()
        );
        let samp_rate = samples.samp_rate();
        if !(constants::MIN_SAMP_RATE..=constants::MAX_SAMP_RATE).contains(&samp_rate) {
            tracing::warn!(
                samp_rate,
                "sample rate is outside the HackRF range of {} to {} Msps",
                constants::MIN_SAMP_RATE / 1e6,
                constants::MAX_SAMP_RATE / 1e6
            );
        }
        let gain = config
            .gain_db
            .clamp(0.0, f64::from(constants::MAX_TX_VGA_GAIN)) as u32;
        if f64::from(gain) != config.gain_db {
            tracing::info!(requested = config.gain_db, gain, "TX VGA gain adjusted");
        }
        anyhow::ensure!(
            config.frequency.is_finite() && config.frequency > 0.0,
            "invalid center frequency {}",
            config.frequency
        );
        let samp_rate = samp_rate.round() as u32;
        let baseband_filter =
            constants::BASEBAND_FILTERS.select(samp_rate, samples.bandwidth().round() as u32);
        tracing::debug!(baseband_filter, "HackRF baseband filter selected");
        Ok(Transfer {
            file: file.to_owned(),
            frequency: config.frequency.round() as u64,
            samp_rate,
            gain,
            baseband_filter,
            repeat: config.repeat,
            antenna_power: config.antenna_power,
        })
    }

    /// Gives the TX VGA gain in dB.
    pub fn gain(&self) -> u32 {
        self.gain
    }

    /// Gives the selected baseband filter bandwidth in Hz.
    pub fn baseband_filter(&self) -> u32 {
        self.baseband_filter
    }

    /// Returns true if the transmission is repeated until stopped.
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Gives the command line arguments for `hackrf_transfer`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-t".into(),
            self.file.clone().into(),
            "-f".into(),
            self.frequency.to_string().into(),
            "-s".into(),
            self.samp_rate.to_string().into(),
            "-x".into(),
            self.gain.to_string().into(),
            "-b".into(),
            self.baseband_filter.to_string().into(),
        ];
        if self.repeat {
            args.push("-R".into());
        }
        if self.antenna_power {
            args.extend(["-a".into(), "1".into()]);
        }
        args
    }
}
