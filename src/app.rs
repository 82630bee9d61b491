//! spectrum-painter application.
//!
//! This module contains a top-level structure [`App`] that represents the whole
//! spectrum-painter application.

use crate::{
    args::Args,
    config::Config,
    encoder::{EncodedSamples, SampleFormat},
    raster::RasterSource,
    sigmf,
    transmit::Transmitter,
    waveform::Waveform,
};
use anyhow::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const DEFAULT_TEXT: &str = "HELLO";
const SIGMF_LABEL: &str = "spectrum painter";

/// spectrum-painter application.
///
/// This struct contains the resolved settings of a painting job. Running it
/// renders the raster, synthesizes the waveform, writes the sample file and
/// optionally transmits it.
#[derive(Debug)]
pub struct App {
    config: Config,
    source: RasterSource,
    format: SampleFormat,
    output: PathBuf,
    sigmf: Option<SigmfSettings>,
    transmitter: Option<Transmitter>,
}

#[derive(Debug)]
struct SigmfSettings {
    path: PathBuf,
    author: String,
}

impl App {
    /// Creates a new application.
    ///
    /// The configuration file given in the arguments (if any) is loaded, the
    /// command line arguments are applied on top of it, and the resulting
    /// configuration is validated.
    #[tracing::instrument(name = "App::new", level = "debug")]
    pub async fn new(args: &Args) -> Result<App> {
        let mut config = match &args.config {
            Some(path) => Config::load(path).await?,
            None => Config::default(),
        };
        args.apply(&mut config);
        config.synthesis = config.synthesis.clamp_bandwidth();
        config.synthesis.validate()?;
        anyhow::ensure!(
            config.raster.width >= 1 && config.raster.height >= 1,
            "raster dimensions {}x{} must be positive",
            config.raster.width,
            config.raster.height
        );

        let source = match &args.image {
            Some(path) => RasterSource::Image(path.clone()),
            None => RasterSource::Text(args.text.as_deref().unwrap_or(DEFAULT_TEXT).to_string()),
        };

        let backend = if args.no_transmit {
            None
        } else {
            args.transmit
        };
        let format = match (args.format, backend) {
            (Some(format), Some(backend)) => {
                anyhow::ensure!(
                    format == backend.sample_format(),
                    "{backend} transmission needs {} samples, but {format} was requested",
                    backend.sample_format()
                );
                format
            }
            (Some(format), None) => format,
            (None, Some(backend)) => backend.sample_format(),
            (None, None) => SampleFormat::Sc16Q11,
        };
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| format.default_file_name().into());
        let sigmf = args.sigmf.then(|| SigmfSettings {
            path: output.with_extension("sigmf-meta"),
            author: args.author.clone(),
        });
        let transmitter = backend.map(|backend| Transmitter::new(backend, args.tool.clone()));

        tracing::info!(
            samp_rate = config.synthesis.samp_rate,
            bandwidth = config.synthesis.bandwidth,
            rows_per_second = config.synthesis.rows_per_second,
            %format,
            output = %output.display(),
            "configuration"
        );
        Ok(App {
            config,
            source,
            format,
            output,
            sigmf,
            transmitter,
        })
    }

    /// Runs the application.
    ///
    /// This returns when the sample file has been written and, if a
    /// transmitter was selected, the transmission has finished or it has been
    /// stopped with Ctrl-C.
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub async fn run(self) -> Result<()> {
        let (samples, baseband_range) = {
            let source = self.source.clone();
            let config = self.config;
            let format = self.format;
            tokio::task::spawn_blocking(move || -> Result<_> {
                let raster = source.raster(&config.raster)?;
                let waveform = Waveform::synthesize(&raster, config.synthesis)?;
                Ok((
                    EncodedSamples::new(&waveform, format),
                    waveform.frequency_range(),
                ))
            })
            .await??
        };
        samples.write_to(&self.output).await?;
        tracing::info!(
            "wrote {} (about {:.2} s)",
            self.output.display(),
            samples.duration().as_secs_f64()
        );

        if let Some(settings) = &self.sigmf {
            let mut metadata = sigmf::Metadata::for_samples(
                &samples,
                self.config.transmit.frequency,
                baseband_range,
                SIGMF_LABEL,
            );
            metadata.set_description(&self.source.to_string());
            metadata.set_author(&settings.author);
            metadata.write(&settings.path).await?;
        }

        let Some(transmitter) = &self.transmitter else {
            return Ok(());
        };
        let cancel = CancellationToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Ctrl-C received");
                    cancel.cancel();
                }
            })
        };
        let result = transmitter
            .transmit(&self.output, &samples, &self.config.transmit, cancel)
            .await;
        ctrl_c.abort();
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn writes_samples_and_sigmf() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("hello.bin");
        let args = Args::parse_from([
            "spectrum-painter",
            "--text",
            "HI",
            "-s",
            "200k",
            "-b",
            "50k",
            "--speed",
            "100",
            "--width",
            "64",
            "--height",
            "32",
            "--format",
            "sc8",
            "--sigmf",
            "-o",
            output.to_str().unwrap(),
        ]);
        let app = App::new(&args).await.unwrap();
        assert!(app.transmitter.is_none());
        app.run().await.unwrap();
        let data = std::fs::read(&output).unwrap();
        assert_eq!(data.len(), 2 * 32 * 2000);
        let meta = std::fs::read_to_string(dir.path().join("hello.sigmf-meta")).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["global"]["core:datatype"], "ci8");
        assert_eq!(meta["global"]["core:description"], "HI");
        assert_eq!(meta["annotations"][0]["core:freq_lower_edge"], 435e6);
        assert_eq!(meta["annotations"][0]["core:freq_upper_edge"], 435.05e6);
    }

    #[tokio::test]
    async fn backend_selects_format() {
        let args = Args::parse_from(["spectrum-painter", "--transmit", "hackrf"]);
        let app = App::new(&args).await.unwrap();
        assert_eq!(app.format, SampleFormat::Sc8);
        assert_eq!(app.output, PathBuf::from("paint_sc8.bin"));

        let args = Args::parse_from([
            "spectrum-painter",
            "--transmit",
            "bladerf",
            "--no-transmit",
        ]);
        let app = App::new(&args).await.unwrap();
        assert!(app.transmitter.is_none());
        assert_eq!(app.output, PathBuf::from("paint.bin"));
    }

    #[tokio::test]
    async fn format_mismatch() {
        let args = Args::parse_from([
            "spectrum-painter",
            "--transmit",
            "hackrf",
            "--format",
            "sc16q11",
        ]);
        assert!(App::new(&args).await.is_err());
    }

    #[tokio::test]
    async fn bandwidth_is_clamped() {
        let args = Args::parse_from(["spectrum-painter", "-s", "1M", "-b", "2M"]);
        let app = App::new(&args).await.unwrap();
        // 90% of the 500 kHz USB band
        approx::assert_relative_eq!(
            app.config.synthesis.bandwidth,
            450e3,
            max_relative = 1e-12
        );
    }

    #[tokio::test]
    async fn invalid_parameters() {
        let args = Args::parse_from(["spectrum-painter", "--speed", "0"]);
        assert!(App::new(&args).await.is_err());
        let args = Args::parse_from(["spectrum-painter", "--width", "0"]);
        assert!(App::new(&args).await.is_err());
    }

    #[tokio::test]
    async fn config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("painter.json");
        std::fs::write(
            &path,
            r#"{"synthesis": {"samp_rate": 4e6, "sideband": {"kind": "double"}},
                "transmit": {"frequency": 1.2e9}}"#,
        )
        .unwrap();
        let args = Args::parse_from([
            "spectrum-painter",
            "--config",
            path.to_str().unwrap(),
            "-f",
            "1.3G",
        ]);
        let app = App::new(&args).await.unwrap();
        assert_eq!(app.config.synthesis.samp_rate, 4e6);
        assert_eq!(app.config.synthesis.sideband, crate::config::Sideband::Double);
        assert_eq!(app.config.transmit.frequency, 1.3e9);
    }
}
