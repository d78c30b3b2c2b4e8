//! Preprocessing and postprocessing around VAE encoders and decoders.

mod config;
mod depth;
mod input;
mod vae;

pub use config::{Config, DepthConfig};
pub use depth::DepthImageProcessor;
pub use input::{DepthPostprocessed, ImageInput, InputKind, OutputFormat, Postprocessed};
pub use vae::VaeImageProcessor;

use image::DynamicImage;

use crate::error::Result;

/// Capabilities shared by the plain and the RGB-D processor.
pub trait ImageProcessor {
    /// What `preprocess` consumes.
    type Input;
    /// What `preprocess` produces.
    type Output;
    /// What `postprocess` produces.
    type Postprocessed;

    fn config(&self) -> &Config;

    /// Resize an image down to multiples of the stride factor.
    fn resize(&self, image: &DynamicImage, height: Option<u32>, width: Option<u32>) -> DynamicImage {
        let config = self.config();
        crate::image::resize(image, height, width, config.stride_factor, config.resample)
    }

    /// Turn user input into model-ready tensors.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be converted.
    fn preprocess(
        &self,
        input: Self::Input,
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<Self::Output>;

    /// Turn a model output tensor into the requested representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be converted to `output_type`.
    fn postprocess(
        &self,
        input: ImageInput,
        output_type: OutputFormat,
        do_denormalize: Option<&[bool]>,
    ) -> Result<Self::Postprocessed>;
}

impl ImageProcessor for VaeImageProcessor {
    type Input = ImageInput;
    type Output = crate::image::ImageTensor;
    type Postprocessed = Postprocessed;

    fn config(&self) -> &Config {
        Self::config(self)
    }

    fn preprocess(
        &self,
        input: ImageInput,
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<Self::Output> {
        Self::preprocess(self, input, height, width)
    }

    fn postprocess(
        &self,
        input: ImageInput,
        output_type: OutputFormat,
        do_denormalize: Option<&[bool]>,
    ) -> Result<Postprocessed> {
        Self::postprocess(self, input, output_type, do_denormalize)
    }
}

impl ImageProcessor for DepthImageProcessor {
    /// RGB input and its depth map.
    type Input = (ImageInput, ImageInput);
    type Output = (crate::image::ImageTensor, crate::image::ImageTensor);
    type Postprocessed = DepthPostprocessed;

    fn config(&self) -> &Config {
        Self::config(self)
    }

    fn preprocess(
        &self,
        (rgb, depth): (ImageInput, ImageInput),
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<Self::Output> {
        Self::preprocess(self, rgb, depth, height, width)
    }

    fn postprocess(
        &self,
        input: ImageInput,
        output_type: OutputFormat,
        do_denormalize: Option<&[bool]>,
    ) -> Result<DepthPostprocessed> {
        Self::postprocess(self, input, output_type, do_denormalize)
    }
}
