//! HackRF One constants.
//!
//! This module contains constants that describe the transmit chain of the
//! HackRF One (MAX2837 transceiver).

use crate::filter::FilterCatalog;

/// Baseband filter bandwidths supported by the MAX2837, in Hz.
pub const BASEBAND_FILTER_BANDWIDTHS: [u32; 14] = [
    1_750_000, 2_500_000, 3_500_000, 5_000_000, 5_500_000, 6_000_000, 7_000_000, 8_000_000,
    9_000_000, 10_000_000, 12_000_000, 14_000_000, 15_000_000, 20_000_000,
];

/// Baseband filter catalog.
pub const BASEBAND_FILTERS: FilterCatalog =
    FilterCatalog::new(&BASEBAND_FILTER_BANDWIDTHS, 1_750_000, 20_000_000);

/// Maximum TX VGA gain, in dB.
pub const MAX_TX_VGA_GAIN: u32 = 47;

/// Minimum recommended sample rate, in samples per second.
pub const MIN_SAMP_RATE: f64 = 2e6;

/// Maximum sample rate, in samples per second.
pub const MAX_SAMP_RATE: f64 = 20e6;
