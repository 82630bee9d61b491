//! Transmission.
//!
//! The painter does not access the radio hardware directly. Instead, it runs
//! the command line tools provided by the vendors: `hackrf_transfer` for the
//! HackRF and an interactive `bladeRF-cli` session for the bladeRF. The output
//! of these tools is forwarded to the log.

use crate::bladerf;
use crate::config::TransmitConfig;
use crate::encoder::{EncodedSamples, SampleFormat};
use crate::error::Error;
use crate::hackrf;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

// Time given to bladeRF-cli to exit after quit
const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Transmitter backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Backend {
    /// HackRF One, using `hackrf_transfer`.
    HackRf,
    /// bladeRF, using `bladeRF-cli`.
    BladeRf,
}

impl Backend {
    /// Gives the sample format used by the backend.
    pub fn sample_format(self) -> SampleFormat {
        match self {
            Backend::HackRf => SampleFormat::Sc8,
            Backend::BladeRf => SampleFormat::Sc16Q11,
        }
    }

    /// Gives the name of the vendor tool used by the backend.
    ///
    /// The tool is looked up in the `PATH`.
    pub fn default_program(self) -> &'static str {
        match self {
            Backend::HackRf => "hackrf_transfer",
            Backend::BladeRf => "bladeRF-cli",
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Backend, Error> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "hackrf" => Backend::HackRf,
            "bladerf" => Backend::BladeRf,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "unknown transmitter {s:?} (expected hackrf or bladerf)"
                )))
            }
        })
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let s = match self {
            Backend::HackRf => "hackrf",
            Backend::BladeRf => "bladerf",
        };
        write!(f, "{s}")
    }
}

/// Transmitter.
///
/// This runs the vendor tool of a [`Backend`] to transmit an encoded file.
#[derive(Debug, Clone)]
pub struct Transmitter {
    backend: Backend,
    program: PathBuf,
}

impl Transmitter {
    /// Creates a transmitter.
    ///
    /// If `program` is `None`, the default program of the backend is used.
    pub fn new(backend: Backend, program: Option<PathBuf>) -> Transmitter {
        let program = program.unwrap_or_else(|| backend.default_program().into());
        Transmitter { backend, program }
    }

    /// Gives the backend of the transmitter.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Transmits an encoded file.
    ///
    /// The `samples` must be the contents of `file`. A single-shot
    /// transmission returns when the file has been transmitted. A repeating
    /// transmission runs until the `cancel` token is cancelled.
    #[tracing::instrument(name = "Transmitter::transmit", level = "debug", skip_all, fields(backend = %self.backend))]
    pub async fn transmit(
        &self,
        file: &Path,
        samples: &EncodedSamples,
        config: &TransmitConfig,
        cancel: CancellationToken,
    ) -> Result<()> {
        match self.backend {
            Backend::HackRf => {
                let transfer = hackrf::Transfer::new(file, samples, config)?;
                tracing::info!(
                    baseband_filter = transfer.baseband_filter(),
                    gain = transfer.gain(),
                    "HackRF TX starting"
                );
                self.hackrf_transfer(&transfer, cancel).await
            }
            Backend::BladeRf => {
                let script = bladerf::session_script(file, samples, config)?;
                tracing::info!("bladeRF TX starting");
                self.bladerf_session(&script, cancel).await
            }
        }
    }

    async fn hackrf_transfer(
        &self,
        transfer: &hackrf::Transfer,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut child = self.spawn(Command::new(&self.program).args(transfer.args()))?;
        tokio::select! {
            status = child.wait() => {
                let status = status.context("failed to wait for hackrf_transfer")?;
                check_status(&self.program, status)?;
                tracing::info!("TX complete (file finished)");
            }
            _ = cancel.cancelled() => {
                tracing::info!("stopping HackRF TX");
                child.kill().await.context("failed to stop hackrf_transfer")?;
            }
        }
        Ok(())
    }

    async fn bladerf_session(
        &self,
        script: &[bladerf::Command],
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut child = self.spawn(Command::new(&self.program).arg("-i").stdin(Stdio::piped()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open bladeRF-cli stdin"))?;
        let send_script = async {
            for command in script {
                send(&mut stdin, command).await?;
            }
            anyhow::Ok(())
        };
        tokio::select! {
            result = send_script => result?,
            _ = cancel.cancelled() => {}
        }
        let repeat = script.last() != Some(&bladerf::Command::Quit);
        if repeat && !cancel.is_cancelled() {
            tracing::info!("TX started");
        }
        tokio::select! {
            status = child.wait() => {
                check_status(&self.program, status.context("failed to wait for bladeRF-cli")?)?;
                anyhow::ensure!(
                    !repeat,
                    "{} exited before the transmission was stopped",
                    self.program.display()
                );
                tracing::info!("TX complete (file finished)");
                return Ok(());
            }
            _ = cancel.cancelled() => {}
        }
        tracing::info!("stopping bladeRF TX");
        for command in bladerf::shutdown() {
            if let Err(err) = send(&mut stdin, &command).await {
                tracing::warn!(%err, "failed to send shutdown command");
                break;
            }
        }
        match tokio::time::timeout(QUIT_TIMEOUT, child.wait()).await {
            Ok(status) => {
                status.context("failed to wait for bladeRF-cli")?;
            }
            Err(_) => {
                tracing::warn!("bladeRF-cli did not quit; killing it");
                child.kill().await.context("failed to stop bladeRF-cli")?;
            }
        }
        Ok(())
    }

    // Spawns a child process with its stdout and stderr forwarded to the log.
    fn spawn(&self, command: &mut Command) -> Result<Child> {
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch {}", self.program.display()))?;
        tracing::debug!(program = %self.program.display(), pid = child.id(), "tool launched");
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, self.backend));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, self.backend));
        }
        Ok(child)
    }
}

async fn send(stdin: &mut ChildStdin, command: &bladerf::Command) -> Result<()> {
    tracing::debug!(%command, "bladeRF-cli command");
    stdin
        .write_all(format!("{command}\n").as_bytes())
        .await
        .with_context(|| format!("failed to send {command:?} to bladeRF-cli"))?;
    stdin.flush().await?;
    tokio::time::sleep(command.delay()).await;
    Ok(())
}

fn check_status(program: &Path, status: ExitStatus) -> Result<()> {
    anyhow::ensure!(status.success(), "{} exited with {status}", program.display());
    Ok(())
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, backend: Backend) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::info!(%backend, "{line}");
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(%backend, %err, "failed to read tool output");
                break;
            }
        }
    }
}
