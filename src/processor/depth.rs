//! Image processor for RGB-D VAEs that carry a depth map next to the image.

use image::DynamicImage;

use crate::error::{Error, Result};
use crate::image::depth::{array_to_depth, array_to_rgb_image, split_depth, transform_depth};
use crate::image::{array_to_tensor, normalize_value, stack_batch, tensor_to_array, ImageTensor};

use super::config::{Config, DepthConfig};
use super::input::{DepthPostprocessed, ImageInput, InputKind, OutputFormat};
use super::vae::{batch_tensors, is_latent, VaeImageProcessor};

/// Prepares RGB and depth inputs in lockstep and splits decoded RGB-D output.
///
/// Builds on [`VaeImageProcessor`] for the per-representation primitives.
#[derive(Debug, Clone)]
pub struct DepthImageProcessor {
    inner: VaeImageProcessor,
}

impl DepthImageProcessor {
    /// Create a new processor with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: DepthConfig) -> Result<Self> {
        Ok(Self {
            inner: VaeImageProcessor::new(Config::from(config))?,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        self.inner.config()
    }

    /// Resize an image down to multiples of the stride factor.
    #[must_use]
    pub fn resize(
        &self,
        image: &DynamicImage,
        height: Option<u32>,
        width: Option<u32>,
    ) -> DynamicImage {
        self.inner.resize(image, height, width)
    }

    /// Turn an RGB input and its depth map into a pair of model-ready tensors.
    ///
    /// Depth images first go through [`transform_depth`]. Both inputs then take the
    /// same path as [`VaeImageProcessor::preprocess`]; size checks, the latent
    /// passthrough and the negative-range check are decided by the RGB input alone.
    ///
    /// Depth image dimensions floor to multiples of
    /// [`DEPTH_STRIDE`](crate::image::depth::DEPTH_STRIDE), so a depth image under
    /// 32 pixels on a side yields a tensor with a zero-sized dimension. Callers that
    /// can receive such images must check their size first.
    ///
    /// # Errors
    ///
    /// Returns an error if the two inputs use different representations, either
    /// cannot form a batch, or the RGB size is not divisible by the stride factor.
    pub fn preprocess(
        &self,
        rgb: ImageInput,
        depth: ImageInput,
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<(ImageTensor, ImageTensor)> {
        let depth = match depth {
            ImageInput::Images(images) => {
                ImageInput::Images(images.iter().map(transform_depth).collect())
            }
            other => other,
        };

        tracing::debug!(
            kind = %rgb.kind(),
            items = rgb.len(),
            depth_items = depth.len(),
            "preprocessing rgb-d"
        );

        let (rgb, depth) = match (rgb, depth) {
            (ImageInput::Images(rgb), ImageInput::Images(depth)) => {
                let rgb = if self.config().do_convert_rgb {
                    rgb.iter().map(crate::image::convert_to_rgb).collect()
                } else {
                    rgb
                };
                (
                    self.inner.encode_images(&rgb, height, width)?,
                    self.inner.encode_images(&depth, height, width)?,
                )
            }
            (ImageInput::Arrays(rgb), ImageInput::Arrays(depth)) => {
                let rgb = array_to_tensor(stack_batch(&rgb)?)?;
                let depth = array_to_tensor(stack_batch(&depth)?)?;
                self.inner.ensure_divisible(&rgb, InputKind::Array)?;
                (rgb, depth)
            }
            (ImageInput::Tensors(rgb), ImageInput::Tensors(depth)) => {
                let rgb = batch_tensors(&rgb)?;
                let depth = batch_tensors(&depth)?;
                if is_latent(&rgb) {
                    tracing::debug!(shape = ?rgb.shape(), "latent input, skipping preprocessing");
                    return Ok((rgb, depth));
                }
                self.inner.ensure_divisible(&rgb, InputKind::Tensor)?;
                (rgb, depth)
            }
            (rgb, depth) => {
                return Err(Error::UnsupportedInputFormat {
                    reason: format!(
                        "rgb is {} input but depth is {} input; both must match",
                        rgb.kind(),
                        depth.kind()
                    ),
                });
            }
        };

        if self.inner.should_normalize(&rgb) {
            Ok((rgb.mapv(normalize_value), depth.mapv(normalize_value)))
        } else {
            Ok((rgb, depth))
        }
    }

    /// Split a decoded RGB-D tensor into RGB and depth outputs.
    ///
    /// RGB comes from channels 0-2 and depth from channel 3 onward (see
    /// [`crate::image::depth`]). Only `Np` and `Pil` are supported; depth cannot be
    /// returned as a bare tensor.
    ///
    /// # Errors
    ///
    /// Returns an error for `Latent` or `Pt` output, a non-tensor input, a
    /// `do_denormalize` length that does not match the batch, or a tensor without a
    /// decodable depth payload.
    pub fn postprocess(
        &self,
        input: ImageInput,
        output_type: OutputFormat,
        do_denormalize: Option<&[bool]>,
    ) -> Result<DepthPostprocessed> {
        let tensor = input.into_tensor()?;
        tracing::debug!(%output_type, shape = ?tensor.shape(), "postprocessing rgb-d");

        match output_type {
            OutputFormat::Latent | OutputFormat::Pt => Err(Error::UnsupportedOutputFormat {
                format: output_type.to_string(),
            }),
            OutputFormat::Np => {
                let array = tensor_to_array(self.inner.denormalize_batch(tensor, do_denormalize)?);
                let (rgb, depth) = split_depth(&array)?;
                Ok(DepthPostprocessed::Arrays { rgb, depth })
            }
            OutputFormat::Pil => {
                let array = tensor_to_array(self.inner.denormalize_batch(tensor, do_denormalize)?);
                Ok(DepthPostprocessed::Images {
                    rgb: array_to_rgb_image(&array)?,
                    depth: array_to_depth(&array)?,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{GenericImageView, Rgb, RgbImage};
    use ndarray::{s, Array3, Array4, Axis};

    fn processor() -> DepthImageProcessor {
        DepthImageProcessor::new(DepthConfig::default()).unwrap()
    }

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::from(RgbImage::from_pixel(width, height, Rgb([value; 3])))
    }

    #[test]
    fn test_config_never_converts_rgb() {
        assert!(!processor().config().do_convert_rgb);
    }

    #[test]
    fn test_preprocess_images() {
        let (rgb, depth) = processor()
            .preprocess(solid(70, 70, 255).into(), solid(70, 70, 255).into(), None, None)
            .unwrap();

        assert_eq!(rgb.shape(), &[1, 3, 64, 64]);
        // Depth floors to 32 first, then to the stride factor.
        assert_eq!(depth.shape(), &[1, 3, 64, 64]);
        assert!(rgb.iter().all(|v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_preprocess_depth_uses_fixed_stride() {
        let (rgb, depth) = processor()
            .preprocess(solid(48, 48, 0).into(), solid(48, 48, 0).into(), None, None)
            .unwrap();

        assert_eq!(rgb.shape(), &[1, 3, 48, 48]);
        assert_eq!(depth.shape(), &[1, 3, 32, 32]);
    }

    #[test]
    fn test_preprocess_depth_normalized_twice() {
        // transform_depth maps white to 1.0; the shared normalize maps that to 1.0 again,
        // and black goes -1.0 -> -3.0.
        let (_, white) = processor()
            .preprocess(solid(32, 32, 128).into(), solid(32, 32, 255).into(), None, None)
            .unwrap();
        let (_, black) = processor()
            .preprocess(solid(32, 32, 128).into(), solid(32, 32, 0).into(), None, None)
            .unwrap();

        assert!(white.iter().all(|v| (v - 1.0).abs() < 1e-5));
        assert!(black.iter().all(|v| (v + 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_preprocess_small_depth_floors_to_zero() {
        let (rgb, depth) = processor()
            .preprocess(solid(64, 64, 0).into(), solid(20, 20, 0).into(), None, None)
            .unwrap();

        assert_eq!(rgb.shape(), &[1, 3, 64, 64]);
        assert_eq!(depth.shape(), &[1, 3, 0, 0]);
    }

    #[test]
    fn test_preprocess_arrays() {
        let rgb = Array3::<f32>::from_elem((16, 16, 3), 0.5);
        let depth = Array3::<f32>::from_elem((16, 16, 3), 1.0);

        let (rgb, depth) = processor()
            .preprocess(ImageInput::array(rgb), ImageInput::array(depth), None, None)
            .unwrap();

        assert_eq!(rgb.shape(), &[1, 3, 16, 16]);
        assert!(rgb.iter().all(|v| v.abs() < 1e-6));
        assert!(depth.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_preprocess_arrays_not_divisible() {
        let rgb = Array3::<f32>::zeros((12, 16, 3));
        let depth = Array3::<f32>::zeros((12, 16, 3));

        let result =
            processor().preprocess(ImageInput::array(rgb), ImageInput::array(depth), None, None);

        assert!(matches!(
            result,
            Err(Error::SizeNotDivisible { kind: "array", .. })
        ));
    }

    #[test]
    fn test_preprocess_latent_passthrough() {
        let rgb = Array4::<f32>::from_elem((1, 4, 5, 5), -2.0);
        let depth = Array4::<f32>::from_elem((1, 1, 5, 5), 7.0);

        let (rgb_out, depth_out) = processor()
            .preprocess(
                ImageInput::tensor(rgb.clone()),
                ImageInput::tensor(depth.clone()),
                None,
                None,
            )
            .unwrap();

        assert_eq!(rgb_out, rgb);
        assert_eq!(depth_out, depth);
    }

    #[test]
    fn test_preprocess_negative_rgb_skips_both() {
        let rgb = Array4::<f32>::from_elem((1, 3, 8, 8), -0.5);
        let depth = Array4::<f32>::from_elem((1, 3, 8, 8), 0.5);

        let (_, depth_out) = processor()
            .preprocess(ImageInput::tensor(rgb), ImageInput::tensor(depth.clone()), None, None)
            .unwrap();

        assert_eq!(depth_out, depth);
    }

    #[test]
    fn test_preprocess_mismatched_kinds() {
        let result = processor().preprocess(
            solid(32, 32, 0).into(),
            ImageInput::array(Array3::<f32>::zeros((32, 32, 3))),
            None,
            None,
        );

        assert!(matches!(result, Err(Error::UnsupportedInputFormat { .. })));
    }

    #[test]
    fn test_postprocess_np() {
        let tensor = Array4::<f32>::zeros((1, 4, 32, 32));
        let output = processor()
            .postprocess(ImageInput::tensor(tensor), OutputFormat::Np, None)
            .unwrap();

        let DepthPostprocessed::Arrays { rgb, depth } = output else {
            panic!("expected array output");
        };
        assert_eq!(rgb.shape(), &[1, 32, 32, 3]);
        assert_eq!(depth.shape(), &[1, 32, 32]);
        assert!(rgb.iter().all(|v| (v - 0.5).abs() < 1e-6));
        // denormalize(0) = 0.5 -> 0.5 * 65535
        assert!(depth.iter().all(|&v| (v - 32767.5).abs() < 1e-3));
    }

    #[test]
    fn test_postprocess_np_rgblike_depth() {
        let mut tensor = Array4::<f32>::zeros((2, 6, 8, 8));
        tensor.slice_mut(s![.., 4, .., ..]).fill(0.5);
        tensor.slice_mut(s![.., 5, .., ..]).fill(0.25);

        let output = processor()
            .postprocess(ImageInput::tensor(tensor), OutputFormat::Np, Some(&[false, false][..]))
            .unwrap();

        let DepthPostprocessed::Arrays { rgb, depth } = output else {
            panic!("expected array output");
        };
        assert_eq!(rgb.shape(), &[2, 8, 8, 3]);
        assert!(depth.iter().all(|&v| (v - 128.25).abs() < 1e-4));
    }

    #[test]
    fn test_postprocess_pil() {
        let tensor = Array4::<f32>::ones((2, 4, 16, 8));
        let output = processor()
            .postprocess(ImageInput::tensor(tensor), OutputFormat::Pil, None)
            .unwrap();

        let DepthPostprocessed::Images { rgb, depth } = output else {
            panic!("expected image output");
        };
        assert_eq!(rgb.len(), 2);
        assert_eq!(depth.len(), 2);
        assert!(matches!(rgb[0], DynamicImage::ImageRgb8(_)));
        assert_eq!(rgb[0].dimensions(), (8, 16));
        let DynamicImage::ImageLuma16(map) = &depth[1] else {
            panic!("expected a 16-bit depth image");
        };
        assert_eq!(map.get_pixel(0, 0)[0], u16::MAX);
    }

    #[test]
    fn test_postprocess_rejects_tensor_outputs() {
        for output_type in [OutputFormat::Latent, OutputFormat::Pt] {
            let tensor = Array4::<f32>::zeros((1, 4, 8, 8));
            let result = processor().postprocess(ImageInput::tensor(tensor), output_type, None);

            assert!(matches!(
                result,
                Err(Error::UnsupportedOutputFormat { format }) if format == output_type.as_str()
            ));
        }
    }

    #[test]
    fn test_postprocess_rgb_only_tensor() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        let result = processor().postprocess(ImageInput::tensor(tensor), OutputFormat::Np, None);

        assert!(matches!(
            result,
            Err(Error::UnsupportedDepthEncoding { channels: 3 })
        ));
    }

    #[test]
    fn test_postprocess_denormalizes_per_item() {
        let tensor = Array4::<f32>::from_elem((2, 4, 4, 4), -1.0);
        let output = processor()
            .postprocess(ImageInput::tensor(tensor), OutputFormat::Np, Some(&[true, false][..]))
            .unwrap();

        let DepthPostprocessed::Arrays { rgb, .. } = output else {
            panic!("expected array output");
        };
        assert!(rgb.index_axis(Axis(0), 0).iter().all(|v| v.abs() < 1e-6));
        assert!(rgb.index_axis(Axis(0), 1).iter().all(|v| (v + 1.0).abs() < 1e-6));
    }
}
