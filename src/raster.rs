//! Raster images.
//!
//! This module contains the [`Raster`] type, a grayscale intensity matrix
//! which is the input to chirp synthesis, and the [`RasterSource`] that
//! produces it from text or from an image file.

use crate::config::RasterConfig;
use crate::error::{ensure_param, Error, Result};
use crate::text;
use anyhow::Context;
use image::{imageops, imageops::FilterType, GrayImage};
use std::path::PathBuf;

/// Grayscale raster.
///
/// The raster is stored in row-major order. All the intensities are in the
/// range [0, 1]. A raster always has at least one row and one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Raster {
    /// Creates a raster from row-major intensities.
    ///
    /// Returns [`Error::InvalidParameter`] if some of the dimensions is zero or
    /// the length of `data` is not `width * height`, and
    /// [`Error::InvalidInput`] if some intensity is outside [0, 1].
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Raster> {
        ensure_param!(
            width >= 1 && height >= 1,
            "raster dimensions {width}x{height} must be positive"
        );
        ensure_param!(
            data.len() == width * height,
            "raster data has {} values, but {width}x{height} were expected",
            data.len()
        );
        if let Some(j) = data.iter().position(|x| !(0.0..=1.0).contains(x)) {
            return Err(Error::InvalidInput(format!(
                "raster intensity {} at index {j} is not in [0, 1]",
                data[j]
            )));
        }
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    /// Creates a raster from an 8-bit grayscale image.
    pub fn from_gray_image(image: &GrayImage) -> Result<Raster> {
        let (width, height) = image.dimensions();
        Raster::new(
            width as usize,
            height as usize,
            image.as_raw().iter().map(|&x| f32::from(x) / 255.0).collect(),
        )
    }

    /// Gives the width of the raster (number of columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Gives the height of the raster (number of rows).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns one of the rows of the raster.
    ///
    /// # Panics
    ///
    /// This function panics if `row` is greater or equal to the height.
    pub fn row(&self, row: usize) -> &[f32] {
        assert!(row < self.height);
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// Returns an iterator over the rows of the raster, in order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.width)
    }
}

/// Raster source.
///
/// The source of the picture that is painted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RasterSource {
    /// Free-form text rendered as white on black.
    Text(String),
    /// Image file, in any of the formats supported by the `image` crate.
    Image(PathBuf),
}

impl RasterSource {
    /// Renders the source as a grayscale image.
    ///
    /// The image has exactly the width and height given in the `config`. The
    /// inversion and flip options of the `config` are applied.
    pub fn render(&self, config: &RasterConfig) -> anyhow::Result<GrayImage> {
        anyhow::ensure!(
            config.width >= 1 && config.height >= 1,
            "raster dimensions {}x{} must be positive",
            config.width,
            config.height
        );
        let width = u32::try_from(config.width).context("raster width too large")?;
        let height = u32::try_from(config.height).context("raster height too large")?;
        let mut image = match self {
            RasterSource::Text(text) => text::render(text, width, height),
            RasterSource::Image(path) => {
                let image = image::open(path)
                    .with_context(|| format!("failed to open image {}", path.display()))?
                    .to_luma8();
                tracing::debug!(
                    path = %path.display(),
                    source_width = image.width(),
                    source_height = image.height(),
                    "image loaded"
                );
                imageops::resize(&image, width, height, FilterType::Lanczos3)
            }
        };
        if config.invert {
            imageops::invert(&mut image);
        }
        if config.flip {
            imageops::flip_vertical_in_place(&mut image);
        }
        Ok(image)
    }

    /// Renders the source as a [`Raster`].
    pub fn raster(&self, config: &RasterConfig) -> anyhow::Result<Raster> {
        Ok(Raster::from_gray_image(&self.render(config)?)?)
    }
}

impl std::fmt::Display for RasterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        match self {
            RasterSource::Text(text) => write!(f, "{text}"),
            RasterSource::Image(path) => write!(f, "{}", path.display()),
        }
    }
}
