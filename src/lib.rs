//! spectrum-painter paints text and pictures on a spectrum waterfall. Each row
//! of a raster is transmitted as a linear-FM chirp whose amplitude follows the
//! intensities of the row, so that the raster appears on the waterfall of a
//! receiver. The waveform is written to a file in the sample format of a
//! HackRF or a bladeRF and can be transmitted with the vendor tools of these
//! SDRs.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod bladerf;
pub mod chirp;
pub mod config;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod hackrf;
pub mod raster;
pub mod scheduler;
pub mod sigmf;
pub mod text;
pub mod transmit;
pub mod waveform;
