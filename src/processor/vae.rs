//! Image processor for VAE encoders and decoders.

use image::DynamicImage;
use ndarray::{ArrayD, Axis, Ix4};

use crate::error::{Error, Result};
use crate::image::{
    array_to_image, array_to_tensor, convert_to_rgb, denormalize_value, image_to_array,
    min_value, normalize_value, stack_batch, tensor_to_array, ImageTensor, LATENT_CHANNELS,
};

use super::config::Config;
use super::input::{ImageInput, InputKind, OutputFormat, Postprocessed};

/// Converts user images to normalized NCHW tensors and decoder output back.
#[derive(Debug, Clone)]
pub struct VaeImageProcessor {
    config: Config,
}

impl VaeImageProcessor {
    /// Create a new processor with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Resize an image down to multiples of the stride factor.
    ///
    /// `height` and `width` default to the image's own size.
    #[must_use]
    pub fn resize(
        &self,
        image: &DynamicImage,
        height: Option<u32>,
        width: Option<u32>,
    ) -> DynamicImage {
        crate::image::resize(
            image,
            height,
            width,
            self.config.stride_factor,
            self.config.resample,
        )
    }

    /// Turn images, arrays or tensors into a model-ready NCHW tensor.
    ///
    /// Images are optionally converted to RGB and resized to multiples of the stride
    /// factor. Arrays and tensors are never resized; with resizing enabled their size
    /// must already divide by the stride factor. A 4-channel tensor is taken to be
    /// latents and returned as-is.
    ///
    /// Values are expected in [0, 1] and mapped to [-1, 1] when normalization is
    /// enabled. Input with negative values is treated as already normalized: a
    /// deprecation warning is logged and normalization is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot form a batch, or its size is not
    /// divisible by the stride factor.
    pub fn preprocess(
        &self,
        input: ImageInput,
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<ImageTensor> {
        let kind = input.kind();
        tracing::debug!(%kind, items = input.len(), "preprocessing");

        let tensor = match input {
            ImageInput::Images(images) => {
                let images = if self.config.do_convert_rgb {
                    images.iter().map(convert_to_rgb).collect()
                } else {
                    images
                };
                self.encode_images(&images, height, width)?
            }
            ImageInput::Arrays(arrays) => {
                let tensor = array_to_tensor(stack_batch(&arrays)?)?;
                self.ensure_divisible(&tensor, kind)?;
                tensor
            }
            ImageInput::Tensors(tensors) => {
                let tensor = batch_tensors(&tensors)?;
                if is_latent(&tensor) {
                    tracing::debug!(shape = ?tensor.shape(), "latent input, skipping preprocessing");
                    return Ok(tensor);
                }
                self.ensure_divisible(&tensor, kind)?;
                tensor
            }
        };

        Ok(self.normalize_if_needed(tensor))
    }

    /// Turn a decoder output tensor into the requested representation.
    ///
    /// `Latent` returns the tensor untouched. Otherwise each batch item is denormalized
    /// according to its entry in `do_denormalize`, which defaults to the configured
    /// `do_normalize` for every item.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a single 4-D tensor, `do_denormalize`
    /// does not match the batch size, or the result cannot be encoded as images.
    pub fn postprocess(
        &self,
        input: ImageInput,
        output_type: OutputFormat,
        do_denormalize: Option<&[bool]>,
    ) -> Result<Postprocessed> {
        let tensor = input.into_tensor()?;
        tracing::debug!(%output_type, shape = ?tensor.shape(), "postprocessing");

        match output_type {
            OutputFormat::Latent => Ok(Postprocessed::Latent(tensor)),
            OutputFormat::Pt => Ok(Postprocessed::Tensor(
                self.denormalize_batch(tensor, do_denormalize)?,
            )),
            OutputFormat::Np => Ok(Postprocessed::Array(tensor_to_array(
                self.denormalize_batch(tensor, do_denormalize)?,
            ))),
            OutputFormat::Pil => {
                let array = tensor_to_array(self.denormalize_batch(tensor, do_denormalize)?);
                Ok(Postprocessed::Images(array_to_image(&array)?))
            }
        }
    }

    /// Resize images if enabled and turn them into an NCHW tensor.
    pub(crate) fn encode_images(
        &self,
        images: &[DynamicImage],
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<ImageTensor> {
        let array = if self.config.do_resize {
            let resized: Vec<_> = images
                .iter()
                .map(|image| self.resize(image, height, width))
                .collect();
            image_to_array(&resized)?
        } else {
            image_to_array(images)?
        };

        array_to_tensor(array.into_dyn())
    }

    /// Fail if resizing is enabled and the tensor's size does not divide by the stride factor.
    pub(crate) fn ensure_divisible(&self, tensor: &ImageTensor, kind: InputKind) -> Result<()> {
        let (_, _, height, width) = tensor.dim();
        let factor = self.config.stride_factor as usize;

        if self.config.do_resize && (height % factor != 0 || width % factor != 0) {
            return Err(Error::SizeNotDivisible {
                kind: kind.as_str(),
                height,
                width,
                factor: self.config.stride_factor,
            });
        }

        Ok(())
    }

    /// Whether `tensor` should be normalized.
    ///
    /// Negative values mean the caller already normalized to [-1, 1], which is
    /// deprecated; normalization is skipped for the call.
    pub(crate) fn should_normalize(&self, tensor: &ImageTensor) -> bool {
        let min = min_value(tensor);
        if min < 0.0 {
            let max = tensor.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            tracing::warn!(
                min,
                max,
                "passing input with value range [-1, 1] is deprecated, expected [0, 1]; skipping normalization"
            );
            return false;
        }

        self.config.do_normalize
    }

    fn normalize_if_needed(&self, mut tensor: ImageTensor) -> ImageTensor {
        if self.should_normalize(&tensor) {
            tensor.mapv_inplace(normalize_value);
        }
        tensor
    }

    /// Denormalize each batch item whose flag is set.
    pub(crate) fn denormalize_batch(
        &self,
        mut tensor: ImageTensor,
        do_denormalize: Option<&[bool]>,
    ) -> Result<ImageTensor> {
        let batch = tensor.len_of(Axis(0));

        if let Some(flags) = do_denormalize {
            if flags.len() != batch {
                return Err(Error::InvalidParameter {
                    name: "do_denormalize".to_string(),
                    reason: format!("expected {batch} flags, got {}", flags.len()),
                });
            }
        }

        for (index, mut item) in tensor.outer_iter_mut().enumerate() {
            let denormalize = do_denormalize.map_or(self.config.do_normalize, |flags| flags[index]);
            if denormalize {
                item.mapv_inplace(denormalize_value);
            }
        }

        Ok(tensor)
    }
}

/// Batch a list of channel-first tensors into one NCHW tensor.
pub(crate) fn batch_tensors(tensors: &[ArrayD<f32>]) -> Result<ImageTensor> {
    let batch = stack_batch(tensors)?;
    let shape = batch.shape().to_vec();

    batch
        .into_dimensionality::<Ix4>()
        .map_err(|_| Error::UnsupportedInputFormat {
            reason: format!("expected an (N, C, H, W) tensor batch, got shape {shape:?}"),
        })
}

/// Tensors with exactly four channels are already VAE latents.
pub(crate) fn is_latent(tensor: &ImageTensor) -> bool {
    tensor.len_of(Axis(1)) == LATENT_CHANNELS
}
