//! spectrum-painter CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the
//! spectrum-painter application, and how they override the values of a
//! [`Config`].

use crate::config::{Config, Hertz, Sideband};
use crate::encoder::SampleFormat;
use crate::transmit::Backend;
use clap::Parser;
use std::path::PathBuf;

/// spectrum-painter CLI arguments.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Text to paint [default: HELLO]
    #[clap(long, conflicts_with = "image")]
    pub text: Option<String>,
    /// Image file to paint
    #[clap(long)]
    pub image: Option<PathBuf>,
    /// JSON configuration file
    ///
    /// Arguments given in the command line override the values in the file.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Center frequency (for example 435M) [default: 435M]
    #[clap(short, long)]
    pub frequency: Option<Hertz>,
    /// Sample rate [default: 2M]
    #[clap(short, long)]
    pub samp_rate: Option<Hertz>,
    /// Chirp bandwidth [default: 100k]
    #[clap(short, long)]
    pub bandwidth: Option<Hertz>,
    /// Raster rows transmitted per second [default: 30]
    #[clap(long)]
    pub speed: Option<f64>,
    /// Transmit gain in dB [default: 30]
    #[clap(short, long, allow_negative_numbers = true)]
    pub gain: Option<f64>,
    /// Raster width [default: 1024]
    #[clap(long)]
    pub width: Option<usize>,
    /// Raster height [default: 512]
    #[clap(long)]
    pub height: Option<usize>,
    /// Use double-sideband chirps centered at 0 Hz
    #[clap(long, conflicts_with = "fmin")]
    pub dsb: bool,
    /// Start frequency of the single-sideband chirps [default: 0]
    #[clap(long)]
    pub fmin: Option<Hertz>,
    /// Invert the intensities of the raster
    #[clap(long)]
    pub invert: bool,
    /// Do not flip the raster vertically
    #[clap(long)]
    pub no_flip: bool,
    /// Transmit the file in a loop until Ctrl-C
    #[clap(long)]
    pub repeat: bool,
    /// Number of synthesis workers [default: number of CPUs minus one]
    #[clap(long)]
    pub workers: Option<usize>,
    /// Transmitter to use (hackrf or bladerf)
    #[clap(long)]
    pub transmit: Option<Backend>,
    /// Only write the sample file, even if a transmitter is given
    #[clap(long)]
    pub no_transmit: bool,
    /// Sample format (sc16q11 or sc8) [default: given by the transmitter]
    #[clap(long)]
    pub format: Option<SampleFormat>,
    /// Output sample file [default: paint.bin or paint_sc8.bin]
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    /// Write a SigMF metadata file next to the sample file
    #[clap(long)]
    pub sigmf: bool,
    /// Path of the transmitter tool [default: looked up in the PATH]
    #[clap(long)]
    pub tool: Option<PathBuf>,
    /// Enable the HackRF antenna port power
    #[clap(long)]
    pub antenna_power: bool,
    /// Enable the bladeRF RX bias tee
    #[clap(long)]
    pub bias_tee_rx: bool,
    /// Enable the bladeRF TX bias tee
    #[clap(long)]
    pub bias_tee_tx: bool,
    /// Author field of the SigMF metadata
    #[clap(long, default_value = "")]
    pub author: String,
}

impl Args {
    /// Applies the arguments given in the command line to a configuration.
    pub fn apply(&self, config: &mut Config) {
        let synthesis = &mut config.synthesis;
        if let Some(samp_rate) = self.samp_rate {
            synthesis.samp_rate = samp_rate.hz();
        }
        if let Some(bandwidth) = self.bandwidth {
            synthesis.bandwidth = bandwidth.hz();
        }
        if let Some(speed) = self.speed {
            synthesis.rows_per_second = speed;
        }
        if self.dsb {
            synthesis.sideband = Sideband::Double;
        } else if let Some(fmin) = self.fmin {
            synthesis.sideband = Sideband::Upper { fmin: fmin.hz() };
        }
        if self.workers.is_some() {
            synthesis.workers = self.workers;
        }

        let raster = &mut config.raster;
        if let Some(width) = self.width {
            raster.width = width;
        }
        if let Some(height) = self.height {
            raster.height = height;
        }
        raster.invert |= self.invert;
        if self.no_flip {
            raster.flip = false;
        }

        let transmit = &mut config.transmit;
        if let Some(frequency) = self.frequency {
            transmit.frequency = frequency.hz();
        }
        if let Some(gain) = self.gain {
            transmit.gain_db = gain;
        }
        transmit.repeat |= self.repeat;
        transmit.antenna_power |= self.antenna_power;
        transmit.bias_tee_rx |= self.bias_tee_rx;
        transmit.bias_tee_tx |= self.bias_tee_tx;
    }
}
