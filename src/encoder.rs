//! Sample encoder.
//!
//! This module quantizes a normalized [`Waveform`] into the interleaved
//! fixed-point formats used by the transmitters. The samples are stored with
//! the I component first and the Q component second, and there is no header.

use crate::error::{Error, Result};
use crate::waveform::Waveform;
use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use num_complex::Complex32;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Sample format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SampleFormat {
    /// 12-bit values in 16-bit signed containers, native endianness.
    ///
    /// This is the bladeRF `SC16 Q11` format. Values are in `[-2048, 2047]`.
    Sc16Q11,
    /// 8-bit signed values.
    ///
    /// This is the format used by `hackrf_transfer`.
    Sc8,
}

impl SampleFormat {
    /// Gives the size in bytes of each of the I and Q components.
    pub fn container_size(self) -> usize {
        match self {
            SampleFormat::Sc16Q11 => 2,
            SampleFormat::Sc8 => 1,
        }
    }

    /// Gives the scale factor applied to a sample before quantization.
    pub fn scale(self) -> f32 {
        match self {
            SampleFormat::Sc16Q11 => 2047.0,
            SampleFormat::Sc8 => 127.0,
        }
    }

    /// Gives the range of values that can be represented.
    pub fn range(self) -> (i16, i16) {
        match self {
            SampleFormat::Sc16Q11 => (-2048, 2047),
            SampleFormat::Sc8 => (i8::MIN.into(), i8::MAX.into()),
        }
    }

    /// Gives the default output file name for this format.
    pub fn default_file_name(self) -> &'static str {
        match self {
            SampleFormat::Sc16Q11 => "paint.bin",
            SampleFormat::Sc8 => "paint_sc8.bin",
        }
    }

    /// Quantizes and encodes a sequence of samples.
    ///
    /// Returns the encoded bytes and the number of components that had to be
    /// clamped to the range of the format.
    pub fn encode(self, samples: &[Complex32]) -> (Bytes, usize) {
        let mut data = BytesMut::with_capacity(2 * samples.len() * self.container_size());
        let mut clipped = 0;
        for x in samples {
            for component in [x.re, x.im] {
                let (value, clamped) = self.quantize(component);
                clipped += usize::from(clamped);
                match self {
                    SampleFormat::Sc16Q11 => data.put_i16_ne(value),
                    // quantize() keeps the value within the i8 range
                    SampleFormat::Sc8 => data.put_i8(value as i8),
                }
            }
        }
        (data.freeze(), clipped)
    }

    // Scales, clamps and truncates towards zero. Also returns whether the
    // value was clamped.
    fn quantize(self, component: f32) -> (i16, bool) {
        let (min, max) = self.range();
        let (min, max) = (f32::from(min), f32::from(max));
        let x = component * self.scale();
        if x.is_nan() {
            (0, true)
        } else if x < min {
            (min as i16, true)
        } else if x > max {
            (max as i16, true)
        } else {
            (x as i16, false)
        }
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<SampleFormat> {
        Ok(match s {
            "sc16q11" | "sc16" => SampleFormat::Sc16Q11,
            "sc8" => SampleFormat::Sc8,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "unknown sample format {s:?} (expected sc16q11 or sc8)"
                )))
            }
        })
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let s = match self {
            SampleFormat::Sc16Q11 => "sc16q11",
            SampleFormat::Sc8 => "sc8",
        };
        write!(f, "{s}")
    }
}

/// Encoded samples.
///
/// This is the byte buffer that is handed to the transmitter, together with
/// the parameters needed to interpret it, since the file format does not
/// contain any header.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSamples {
    format: SampleFormat,
    rows: usize,
    samp_rate: f64,
    bandwidth: f64,
    duration: Duration,
    clipped: usize,
    data: Bytes,
}

impl EncodedSamples {
    /// Encodes a waveform with a sample format.
    ///
    /// Components that fall outside the range of the format are clamped. The
    /// number of clamped components is available in
    /// [`EncodedSamples::clipped`] and logged as a warning.
    #[tracing::instrument(level = "debug", skip(waveform), fields(rows = waveform.num_rows()))]
    pub fn new(waveform: &Waveform, format: SampleFormat) -> EncodedSamples {
        let (data, clipped) = format.encode(waveform.samples());
        if clipped > 0 {
            tracing::warn!(clipped, %format, "sample components clamped during encoding");
        }
        let config = waveform.config();
        EncodedSamples {
            format,
            rows: waveform.num_rows(),
            samp_rate: config.samp_rate,
            bandwidth: config.bandwidth,
            duration: waveform.duration(),
            clipped,
            data,
        }
    }

    /// Gives the sample format.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Gives the number of raster rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Gives the sample rate in samples per second.
    pub fn samp_rate(&self) -> f64 {
        self.samp_rate
    }

    /// Gives the chirp bandwidth in Hz.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Gives the duration of the transmission.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Gives the number of components that were clamped.
    pub fn clipped(&self) -> usize {
        self.clipped
    }

    /// Gives the number of complex samples.
    pub fn num_samples(&self) -> usize {
        self.data.len() / (2 * self.format.container_size())
    }

    /// Gives the encoded bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Writes the encoded bytes to a file.
    pub async fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::write(path, &self.data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            bytes = self.data.len(),
            format = %self.format,
            "samples written"
        );
        Ok(())
    }
}
