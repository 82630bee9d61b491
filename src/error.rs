//! Synthesis errors.
//!
//! This module contains the [`Error`] type returned by the raster, chirp,
//! scheduler, waveform and encoder modules. Application-level code wraps these
//! errors into [`anyhow::Error`].

/// Synthesis error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is malformed or out of its domain.
    ///
    /// This is detected before any synthesis work is done.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The raster content cannot produce a usable waveform.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The synthesis of a raster row failed, aborting the whole batch.
    #[error("synthesis of row {row} failed")]
    WorkerFailure {
        /// Index of the row that failed.
        row: usize,
        /// Cause of the failure.
        #[source]
        source: Box<Error>,
    },
    /// The pool of worker threads could not be started.
    #[error("failed to start synthesis workers")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type with [`Error`] as its error.
pub type Result<T, E = Error> = std::result::Result<T, E>;

macro_rules! ensure_param {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::InvalidParameter(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_param;
