//! Baseband filter selection.
//!
//! SDR hardware usually supports only a discrete set of analog baseband filter
//! bandwidths. A [`FilterCatalog`] lists the bandwidths supported by a device
//! family and selects the one to use for a given sample rate and requested
//! bandwidth.

/// Catalog of supported baseband filter bandwidths.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FilterCatalog {
    bandwidths: &'static [u32],
    min: u32,
    max: u32,
}

impl FilterCatalog {
    /// Creates a filter catalog.
    ///
    /// The `bandwidths` are given in Hz and must be sorted in ascending
    /// order. The `min` and `max` give the range of bandwidths that the device
    /// can use.
    ///
    /// # Panics
    ///
    /// Panics if `min` is larger than `max`. Since this is a `const fn`, the
    /// panic happens at compile time for constant catalogs.
    pub const fn new(bandwidths: &'static [u32], min: u32, max: u32) -> FilterCatalog {
        assert!(min <= max);
        FilterCatalog {
            bandwidths,
            min,
            max,
        }
    }

    /// Gives the supported bandwidths, in ascending order.
    pub fn bandwidths(&self) -> &'static [u32] {
        self.bandwidths
    }

    /// Gives the minimum bandwidth of the device.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Gives the maximum bandwidth of the device.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Selects a filter bandwidth.
    ///
    /// The candidates are the catalog entries not larger than the sample rate
    /// (or the device maximum, if smaller, and never below the device
    /// minimum). The smallest candidate that is at least as large as the
    /// requested bandwidth (or the device minimum, if larger) is selected. If
    /// all the candidates are too narrow, the widest candidate is used. If
    /// there are no candidates, the device minimum is returned.
    pub fn select(&self, samp_rate: u32, requested: u32) -> u32 {
        let cap = samp_rate.min(self.max).max(self.min);
        let target = requested.max(self.min);
        let mut widest = None;
        for bw in self.bandwidths.iter().copied().filter(|&bw| bw <= cap) {
            if bw >= target {
                return bw;
            }
            widest = Some(bw);
        }
        widest.unwrap_or(self.min)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hackrf::constants::BASEBAND_FILTERS;

    #[test]
    fn round_up_to_next_filter() {
        assert_eq!(BASEBAND_FILTERS.select(2_000_000, 100_000), 1_750_000);
        assert_eq!(BASEBAND_FILTERS.select(20_000_000, 9_500_000), 10_000_000);
        assert_eq!(BASEBAND_FILTERS.select(10_000_000, 3_500_000), 3_500_000);
        assert_eq!(BASEBAND_FILTERS.select(8_000_000, 5_200_000), 5_500_000);
    }

    #[test]
    fn cap_below_smallest_filter() {
        // the cap is raised to the device minimum, which is a catalog entry
        assert_eq!(BASEBAND_FILTERS.select(1_000_000, 100_000), 1_750_000);
        const CATALOG: FilterCatalog =
            FilterCatalog::new(&[2_500_000, 5_000_000], 1_750_000, 20_000_000);
        assert_eq!(CATALOG.select(1_000_000, 100_000), 1_750_000);
        assert_eq!(CATALOG.select(2_000_000, 2_000_000), 1_750_000);
    }

    #[test]
    fn target_above_all_candidates() {
        assert_eq!(BASEBAND_FILTERS.select(5_000_000, 8_000_000), 5_000_000);
        assert_eq!(BASEBAND_FILTERS.select(40_000_000, 30_000_000), 20_000_000);
        assert_eq!(BASEBAND_FILTERS.select(7_900_000, 7_500_000), 7_000_000);
    }

    #[test]
    fn hackrf_catalog() {
        let bandwidths = BASEBAND_FILTERS.bandwidths();
        assert_eq!(bandwidths.len(), 14);
        assert!(bandwidths.windows(2).all(|w| w[0] < w[1]));
        for &bandwidth in bandwidths {
            assert_eq!(BASEBAND_FILTERS.select(20_000_000, bandwidth), bandwidth);
        }
    }

    #[test]
    fn empty_catalog() {
        const CATALOG: FilterCatalog = FilterCatalog::new(&[], 1_000_000, 2_000_000);
        assert_eq!(CATALOG.select(1_500_000, 1_200_000), 1_000_000);
    }
}
