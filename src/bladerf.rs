//! bladeRF transmitter.
//!
//! Transmission with a bladeRF is done through an interactive `bladeRF-cli`
//! session that plays an sc16q11 file. This module contains the commands of
//! that session.

use crate::config::TransmitConfig;
use crate::encoder::{EncodedSamples, SampleFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `bladeRF-cli` interactive command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Enables or disables the RX bias tee.
    BiasTeeRx(bool),
    /// Enables or disables the TX bias tee.
    BiasTeeTx(bool),
    /// Sets the TX sample rate in samples per second.
    SampleRate(u64),
    /// Sets the TX center frequency in Hz.
    Frequency(u64),
    /// Sets the TX analog bandwidth in Hz.
    Bandwidth(u64),
    /// Sets the TX gain in dB.
    Gain(i32),
    /// Configures the file to transmit.
    TxConfig {
        /// Path of the sc16q11 file.
        file: PathBuf,
        /// Transmit the file in a loop until stopped.
        repeat: bool,
    },
    /// Starts transmitting.
    TxStart,
    /// Waits for the transmission to finish.
    TxWait,
    /// Stops transmitting.
    TxStop,
    /// Ends the session.
    Quit,
}

impl Command {
    /// Gives the time to wait after sending the command.
    pub fn delay(&self) -> Duration {
        match self {
            Command::TxWait => Duration::from_millis(50),
            _ => Duration::from_millis(20),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Command::BiasTeeRx(enabled) => write!(f, "set biastee rx {}", on_off(*enabled)),
            Command::BiasTeeTx(enabled) => write!(f, "set biastee tx {}", on_off(*enabled)),
            Command::SampleRate(samp_rate) => write!(f, "set samplerate tx {samp_rate}"),
            Command::Frequency(frequency) => write!(f, "set frequency tx {frequency}"),
            Command::Bandwidth(bandwidth) => write!(f, "set bandwidth tx {bandwidth}"),
            Command::Gain(gain) => write!(f, "set gain tx {gain}"),
            Command::TxConfig { file, repeat } => {
                // in bladeRF-cli, repeat=0 means repeat forever
                let repeat = if *repeat { 0 } else { 1 };
                write!(
                    f,
                    "tx config file=\"{}\" format=bin repeat={repeat}",
                    file.display()
                )
            }
            Command::TxStart => write!(f, "tx start"),
            Command::TxWait => write!(f, "tx wait"),
            Command::TxStop => write!(f, "tx stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// Returns the commands that transmit an encoded file.
///
/// A single-shot session waits for the file to finish, stops the transmitter
/// and quits. A repeating session ends with `tx start`, and it must be
/// finished with the [`shutdown`] commands.
pub fn session_script(
    file: &Path,
    samples: &EncodedSamples,
    config: &TransmitConfig,
) -> anyhow::Result<Vec<Command>> {
    anyhow::ensure!(
        samples.format() == SampleFormat::Sc16Q11,
        "bladeRF-cli needs sc16q11 samples, but the samples are {}",
        samples.format()
    );
    anyhow::ensure!(
        config.frequency.is_finite() && config.frequency > 0.0,
        "invalid center frequency {}",
        config.frequency
    );
    anyhow::ensure!(config.gain_db.is_finite(), "invalid gain {}", config.gain_db);
    let mut script = vec![
        Command::BiasTeeRx(config.bias_tee_rx),
        Command::BiasTeeTx(config.bias_tee_tx),
        Command::SampleRate(samples.samp_rate().round() as u64),
        Command::Frequency(config.frequency.round() as u64),
        Command::Bandwidth(samples.bandwidth().round() as u64),
        Command::Gain(config.gain_db.round() as i32),
        Command::TxConfig {
            file: file.to_owned(),
            repeat: config.repeat,
        },
        Command::TxStart,
    ];
    if !config.repeat {
        script.extend([Command::TxWait, Command::TxStop, Command::Quit]);
    }
    Ok(script)
}

/// Returns the commands that stop a transmission and end the session.
pub fn shutdown() -> [Command; 2] {
    [Command::TxStop, Command::Quit]
}
