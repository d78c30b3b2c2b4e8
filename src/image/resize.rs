//! Resizing to stride-factor multiples.

use std::fmt;
use std::str::FromStr;

use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Resampling filter used when resizing images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    Nearest,
    #[serde(alias = "linear")]
    Bilinear,
    Bicubic,
    #[default]
    Lanczos,
    Box,
    Hamming,
}

impl Resample {
    /// Name of the filter as it appears in processor configs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Lanczos => "lanczos",
            Self::Box => "box",
            Self::Hamming => "hamming",
        }
    }

    /// Matching `image` crate filter.
    ///
    /// Box and Hamming have no direct equivalent and fall back to Triangle.
    #[must_use]
    pub const fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear | Self::Box | Self::Hamming => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for Resample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resample {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "nearest" => Ok(Self::Nearest),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "bicubic" => Ok(Self::Bicubic),
            "lanczos" => Ok(Self::Lanczos),
            "box" => Ok(Self::Box),
            "hamming" => Ok(Self::Hamming),
            other => Err(Error::InvalidParameter {
                name: "resample".to_string(),
                reason: format!(
                    "unknown filter `{other}`, expected one of nearest, bilinear, bicubic, lanczos, box, hamming"
                ),
            }),
        }
    }
}

/// Floor `value` to the nearest lower multiple of `factor`.
///
/// `factor` must be non-zero. Values below `factor` floor to 0.
#[inline]
#[must_use]
pub const fn floor_to_multiple(value: u32, factor: u32) -> u32 {
    value - value % factor
}

/// Resize an image so both sides are multiples of `stride_factor`.
///
/// `height` and `width` default to the image's own size and are floored to the
/// nearest lower multiple of `stride_factor` before resampling.
#[must_use]
pub fn resize(
    image: &DynamicImage,
    height: Option<u32>,
    width: Option<u32>,
    stride_factor: u32,
    resample: Resample,
) -> DynamicImage {
    let height = floor_to_multiple(height.unwrap_or_else(|| image.height()), stride_factor);
    let width = floor_to_multiple(width.unwrap_or_else(|| image.width()), stride_factor);

    tracing::debug!(
        from_width = image.width(),
        from_height = image.height(),
        width,
        height,
        filter = %resample,
        "resizing image"
    );

    image.resize_exact(width, height, resample.filter())
}
