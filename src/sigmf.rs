//! SigMF format.
//!
//! This module contains a minimal implementation of [SigMF](https://github.com/gnuradio/SigMF/),
//! used to describe the files written by the painter so that they can be
//! inspected with SigMF-aware tools.

use crate::encoder::{EncodedSamples, SampleFormat};
use anyhow::{Context, Result};
use chrono::prelude::*;
use serde_json::json;
use std::path::Path;

const SIGMF_VERSION: &str = "1.0.0";
const SIGMF_GENERATOR: &str = concat!("spectrum-painter v", env!("CARGO_PKG_VERSION"));

/// SigMF metadata.
///
/// This structure describes a painter file, and can be converted to JSON
/// format for its storage in a `.sigmf-meta` file.
///
/// # Examples
/// ```
/// use spectrum_painter::sigmf::{Datatype, Metadata};
/// let sample_rate = 2e6; // 2 Msps
/// let frequency = 435e6; // 435 MHz
/// let metadata = Metadata::new(Datatype::Ci8, sample_rate, frequency);
/// println!("{}", metadata.to_json().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    datatype: Datatype,
    sample_rate: f64,
    description: String,
    author: String,
    frequency: f64,
    datetime: DateTime<Utc>,
    annotation: Option<Annotation>,
}

/// SigMF datatype.
///
/// Only the complex integer datatypes produced by the painter are supported.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Datatype {
    /// Complex 16-bit signed integers.
    Ci16(Endianness),
    /// Complex 8-bit signed integers.
    Ci8,
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Datatype::Ci16(Endianness::Le) => write!(f, "ci16_le"),
            Datatype::Ci16(Endianness::Be) => write!(f, "ci16_be"),
            Datatype::Ci8 => write!(f, "ci8"),
        }
    }
}

/// Endianness.
///
/// The endianness indicates the order of the bytes forming a multi-byte number
/// in memory or in a file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Endianness {
    /// Little-endian.
    Le,
    /// Big-endian.
    Be,
}

impl Endianness {
    /// Gives the endianness of the host.
    pub fn native() -> Endianness {
        if cfg!(target_endian = "big") {
            Endianness::Be
        } else {
            Endianness::Le
        }
    }
}

impl From<SampleFormat> for Datatype {
    fn from(value: SampleFormat) -> Datatype {
        match value {
            // sc16q11 is written in native endianness
            SampleFormat::Sc16Q11 => Datatype::Ci16(Endianness::native()),
            SampleFormat::Sc8 => Datatype::Ci8,
        }
    }
}

/// SigMF annotation.
///
/// The painter uses a single annotation that spans the whole file and gives
/// the RF band occupied by the chirps.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    sample_count: u64,
    freq_lower_edge: f64,
    freq_upper_edge: f64,
    label: String,
}

impl Annotation {
    /// Creates an annotation.
    ///
    /// The frequency edges are given in Hz.
    pub fn new(
        sample_count: u64,
        freq_lower_edge: f64,
        freq_upper_edge: f64,
        label: &str,
    ) -> Annotation {
        Annotation {
            sample_count,
            freq_lower_edge,
            freq_upper_edge,
            label: label.to_string(),
        }
    }

    fn to_json_value(&self) -> serde_json::Value {
        json!({
            "core:sample_start": 0,
            "core:sample_count": self.sample_count,
            "core:freq_lower_edge": self.freq_lower_edge,
            "core:freq_upper_edge": self.freq_upper_edge,
            "core:label": self.label
        })
    }
}

impl Metadata {
    /// Creates a new SigMF metadata object.
    ///
    /// The datatype, sample rate and frequency are mandatory parameters. The
    /// datetime field is set to the current time. The description and author
    /// fields are initialized to empty strings.
    pub fn new(datatype: Datatype, sample_rate: f64, frequency: f64) -> Metadata {
        Metadata {
            datatype,
            sample_rate,
            description: String::new(),
            author: String::new(),
            frequency,
            datetime: Utc::now(),
            annotation: None,
        }
    }

    /// Creates the metadata for a painter file.
    ///
    /// The `frequency` is the center frequency of the transmission, and
    /// `baseband_range` is the baseband frequency range swept by the chirps,
    /// which is used to annotate the RF band occupied by the picture.
    pub fn for_samples(
        samples: &EncodedSamples,
        frequency: f64,
        baseband_range: (f64, f64),
        label: &str,
    ) -> Metadata {
        let mut metadata = Metadata::new(samples.format().into(), samples.samp_rate(), frequency);
        metadata.set_annotation(Annotation::new(
            samples.num_samples() as u64,
            frequency + baseband_range.0,
            frequency + baseband_range.1,
            label,
        ));
        metadata
    }

    /// Gives the value of the datatype field.
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Gives the value of the sample rate field (in samples per second).
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Gives the value of the description field.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sets the value of the description field.
    pub fn set_description(&mut self, description: &str) {
        self.description.replace_range(.., description);
    }

    /// Gives the value of the author field.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Sets the value of the author field.
    pub fn set_author(&mut self, author: &str) {
        self.author.replace_range(.., author);
    }

    /// Gives the value of the frequency field (in Hz).
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Gives the value of the datetime field.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.datetime
    }

    /// Sets the value of the datetime field.
    pub fn set_datetime(&mut self, datetime: DateTime<Utc>) {
        self.datetime = datetime;
    }

    /// Gives the annotation.
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    /// Sets the annotation.
    pub fn set_annotation(&mut self, annotation: Annotation) {
        self.annotation = Some(annotation);
    }

    /// Returns a string that represents the metadata in JSON.
    ///
    /// The formatting of the JSON is compliant with the SigMF standard.
    pub fn to_json(&self) -> Result<String> {
        let json = self.to_json_value();
        let mut s = serde_json::to_string_pretty(&json)?;
        s.push('\n'); // to_string_pretty does not include a final \n
        Ok(s)
    }

    /// Returns a JSON [`serde_json::Value`] that represents the metadata in JSON.
    ///
    /// The formatting of the JSON is compliant with the SigMF standard.
    pub fn to_json_value(&self) -> serde_json::Value {
        let annotations = self
            .annotation
            .iter()
            .map(Annotation::to_json_value)
            .collect::<Vec<_>>();
        json!({
            "global": {
                "core:datatype": self.datatype.to_string(),
                "core:version": SIGMF_VERSION,
                "core:sample_rate": self.sample_rate,
                "core:description": self.description,
                "core:author": self.author,
                "core:generator": SIGMF_GENERATOR
            },
            "captures": [
                {
                    "core:sample_start": 0,
                    "core:frequency": self.frequency,
                    "core:datetime": self.datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
                }
            ],
            "annotations": annotations
        })
    }

    /// Writes the metadata to a `.sigmf-meta` file.
    pub async fn write(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json()?)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "SigMF metadata written");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn to_json() {
        let meta = Metadata {
            datatype: Datatype::Ci16(Endianness::Le),
            sample_rate: 2e6,
            description: "HELLO".to_string(),
            author: "Tester".to_string(),
            frequency: 435e6,
            datetime: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            annotation: Some(Annotation::new(
                34_133_504,
                435e6,
                435.1e6,
                "spectrum painter",
            )),
        };
        let json = meta.to_json().unwrap();
        let expected = [
            r#"{
  "annotations": [
    {
      "core:freq_lower_edge": 435000000.0,
      "core:freq_upper_edge": 435100000.0,
      "core:label": "spectrum painter",
      "core:sample_count": 34133504,
      "core:sample_start": 0
    }
  ],
  "captures": [
    {
      "core:datetime": "2024-03-01T12:00:00.000Z",
      "core:frequency": 435000000.0,
      "core:sample_start": 0
    }
  ],
  "global": {
    "core:author": "Tester",
    "core:datatype": "ci16_le",
    "core:description": "HELLO",
    "core:generator": ""#,
            SIGMF_GENERATOR,
            r#"",
    "core:sample_rate": 2000000.0,
    "core:version": ""#,
            SIGMF_VERSION,
            r#""
  }
}
"#,
        ]
        .join("");
        assert_eq!(json, expected);
    }

    #[test]
    fn no_annotations() {
        let meta = Metadata::new(Datatype::Ci8, 10e6, 2.4e9);
        let value = meta.to_json_value();
        assert_eq!(value["annotations"], json!([]));
        assert_eq!(value["global"]["core:datatype"], "ci8");
        assert_eq!(value["captures"][0]["core:frequency"], 2.4e9);
    }

    #[test]
    fn painter_metadata() {
        use crate::config::SynthesisConfig;
        use crate::raster::Raster;
        use crate::waveform::Waveform;
        let raster = Raster::new(2, 3, vec![1.0, 0.0, 0.5, 0.5, 0.0, 1.0]).unwrap();
        let config = SynthesisConfig {
            samp_rate: 64e3,
            bandwidth: 16e3,
            rows_per_second: 1000.0,
            workers: Some(1),
            ..Default::default()
        };
        let waveform = Waveform::synthesize(&raster, config).unwrap();
        let samples = EncodedSamples::new(&waveform, SampleFormat::Sc8);
        let mut meta =
            Metadata::for_samples(&samples, 435e6, waveform.frequency_range(), "painting");
        meta.set_description("HELLO");
        meta.set_author("Tester");
        let datetime = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        meta.set_datetime(datetime);
        assert_eq!(meta.datatype(), Datatype::Ci8);
        assert_eq!(meta.sample_rate(), 64e3);
        assert_eq!(meta.frequency(), 435e6);
        assert_eq!(meta.description(), "HELLO");
        assert_eq!(meta.author(), "Tester");
        assert_eq!(meta.datetime(), datetime);
        assert_eq!(
            meta.annotation(),
            Some(&Annotation::new(3 * 64, 435e6, 435.016e6, "painting"))
        );
    }

    #[test]
    fn datatype_from_format() {
        assert_eq!(Datatype::from(SampleFormat::Sc8), Datatype::Ci8);
        assert_eq!(
            Datatype::from(SampleFormat::Sc16Q11),
            Datatype::Ci16(Endianness::native())
        );
        assert_eq!(Datatype::Ci16(Endianness::Be).to_string(), "ci16_be");
    }
}
