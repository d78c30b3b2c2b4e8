//! Processor configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Resample;

/// Configuration for [`VaeImageProcessor`](super::VaeImageProcessor).
///
/// Deserializes from a model's image processor config; `vae_scale_factor` is
/// accepted for `stride_factor` and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Downscale images so height and width are multiples of `stride_factor`.
    pub do_resize: bool,

    /// Factor all spatial dimensions must divide by (the VAE downsampling factor).
    #[serde(alias = "vae_scale_factor")]
    pub stride_factor: u32,

    /// Resampling filter used when resizing.
    pub resample: Resample,

    /// Map [0, 1] inputs to [-1, 1].
    pub do_normalize: bool,

    /// Convert images to RGB before anything else.
    pub do_convert_rgb: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            do_resize: true,
            stride_factor: 8,
            resample: Resample::Lanczos,
            do_normalize: true,
            do_convert_rgb: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.stride_factor == 0 {
            return Err(Error::InvalidParameter {
                name: "stride_factor".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration for [`DepthImageProcessor`](super::DepthImageProcessor).
///
/// Same as [`Config`] without RGB conversion, which the depth processor never applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub do_resize: bool,
    #[serde(alias = "vae_scale_factor")]
    pub stride_factor: u32,
    pub resample: Resample,
    pub do_normalize: bool,
}

impl Default for DepthConfig {
    fn default() -> Self {
        let Config {
            do_resize,
            stride_factor,
            resample,
            do_normalize,
            ..
        } = Config::default();

        Self {
            do_resize,
            stride_factor,
            resample,
            do_normalize,
        }
    }
}

impl From<DepthConfig> for Config {
    fn from(config: DepthConfig) -> Self {
        Self {
            do_resize: config.do_resize,
            stride_factor: config.stride_factor,
            resample: config.resample,
            do_normalize: config.do_normalize,
            do_convert_rgb: false,
        }
    }
}
