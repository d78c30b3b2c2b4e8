//! Tagged input and output representations.

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use ndarray::{Array, Array3, ArrayD, Dimension, Ix4};

use crate::error::{Error, Result};
use crate::image::{ImageArray, ImageTensor};

/// Representation of a processor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Array,
    Tensor,
}

impl InputKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Array => "array",
            Self::Tensor => "tensor",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One or more images in a single representation.
///
/// Arrays are channel-last: `(H, W)`, `(H, W, C)` or batched `(N, H, W, C)`.
/// Tensors are channel-first: `(C, H, W)` or batched `(N, C, H, W)`.
/// A list mixes batches only along the leading axis; 4-D items are concatenated,
/// lower-rank items stacked.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Images(Vec<DynamicImage>),
    Arrays(Vec<ArrayD<f32>>),
    Tensors(Vec<ArrayD<f32>>),
}

impl ImageInput {
    /// A single channel-last array.
    pub fn array<D: Dimension>(array: Array<f32, D>) -> Self {
        Self::Arrays(vec![array.into_dyn()])
    }

    /// A list of channel-last arrays.
    pub fn arrays<D: Dimension>(arrays: impl IntoIterator<Item = Array<f32, D>>) -> Self {
        Self::Arrays(arrays.into_iter().map(Array::into_dyn).collect())
    }

    /// A single channel-first tensor.
    pub fn tensor<D: Dimension>(tensor: Array<f32, D>) -> Self {
        Self::Tensors(vec![tensor.into_dyn()])
    }

    /// A list of channel-first tensors.
    pub fn tensors<D: Dimension>(tensors: impl IntoIterator<Item = Array<f32, D>>) -> Self {
        Self::Tensors(tensors.into_iter().map(Array::into_dyn).collect())
    }

    #[must_use]
    pub const fn kind(&self) -> InputKind {
        match self {
            Self::Images(_) => InputKind::Image,
            Self::Arrays(_) => InputKind::Array,
            Self::Tensors(_) => InputKind::Tensor,
        }
    }

    /// Number of items in the list (not the batch size).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Images(items) => items.len(),
            Self::Arrays(items) | Self::Tensors(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unwrap a single 4-D tensor, as postprocessing expects.
    ///
    /// # Errors
    ///
    /// Returns an error for images, arrays, lists of several tensors, or a tensor
    /// that is not 4-D.
    pub fn into_tensor(self) -> Result<ImageTensor> {
        let kind = self.kind();
        match self {
            Self::Tensors(mut tensors) if tensors.len() == 1 => {
                let tensor = tensors.remove(0);
                let shape = tensor.shape().to_vec();
                tensor
                    .into_dimensionality::<Ix4>()
                    .map_err(|_| Error::UnsupportedInputFormat {
                        reason: format!("expected an (N, C, H, W) tensor, got shape {shape:?}"),
                    })
            }
            Self::Tensors(tensors) => Err(Error::UnsupportedInputFormat {
                reason: format!("expected a single tensor, got a list of {}", tensors.len()),
            }),
            _ => Err(Error::UnsupportedInputFormat {
                reason: format!("expected a tensor, got {kind} input"),
            }),
        }
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        Self::Images(vec![image])
    }
}

impl From<Vec<DynamicImage>> for ImageInput {
    fn from(images: Vec<DynamicImage>) -> Self {
        Self::Images(images)
    }
}

/// Output representation requested from postprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Raw tensor, untouched.
    Latent,
    /// NCHW tensor after denormalization.
    Pt,
    /// NHWC array after denormalization.
    Np,
    /// 8-bit images.
    #[default]
    Pil,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latent => "latent",
            Self::Pt => "pt",
            Self::Np => "np",
            Self::Pil => "pil",
        }
    }

    /// Parse an output format name, falling back to [`OutputFormat::Np`] for unknown names.
    ///
    /// Unknown names are deprecated and logged as a warning.
    #[must_use]
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                output_type = name,
                "output type is outdated and has been set to `np`; use one of `pil`, `np`, `pt`, `latent`"
            );
            Self::Np
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "latent" => Ok(Self::Latent),
            "pt" => Ok(Self::Pt),
            "np" => Ok(Self::Np),
            "pil" => Ok(Self::Pil),
            other => Err(Error::UnsupportedOutputFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Result of [`VaeImageProcessor::postprocess`](super::VaeImageProcessor::postprocess).
#[derive(Debug, Clone)]
pub enum Postprocessed {
    Latent(ImageTensor),
    Tensor(ImageTensor),
    Array(ImageArray),
    Images(Vec<DynamicImage>),
}

impl Postprocessed {
    /// The tensor of a `Latent` or `Tensor` output.
    #[must_use]
    pub fn into_tensor(self) -> Option<ImageTensor> {
        match self {
            Self::Latent(tensor) | Self::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_array(self) -> Option<ImageArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_images(self) -> Option<Vec<DynamicImage>> {
        match self {
            Self::Images(images) => Some(images),
            _ => None,
        }
    }
}

/// Result of [`DepthImageProcessor::postprocess`](super::DepthImageProcessor::postprocess).
#[derive(Debug, Clone)]
pub enum DepthPostprocessed {
    /// RGB as an `(N, H, W, 3)` array and depth as `(N, H, W)` values computed on
    /// the unquantized payload.
    Arrays { rgb: ImageArray, depth: Array3<f32> },
    /// RGB as 8-bit images and depth as 16-bit grayscale images.
    Images {
        rgb: Vec<DynamicImage>,
        depth: Vec<DynamicImage>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    #[test]
    fn test_single_constructors_wrap() {
        assert_eq!(ImageInput::from(DynamicImage::new_rgb8(2, 2)).len(), 1);
        assert_eq!(ImageInput::array(Array3::<f32>::zeros((2, 2, 3))).len(), 1);
        assert_eq!(
            ImageInput::tensors(vec![Array3::<f32>::zeros((3, 2, 2)); 3]).len(),
            3
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(ImageInput::from(Vec::new()).kind(), InputKind::Image);
        assert_eq!(ImageInput::arrays(Vec::<Array3<f32>>::new()).kind(), InputKind::Array);
        assert_eq!(ImageInput::tensor(Array4::<f32>::zeros((1, 3, 2, 2))).kind(), InputKind::Tensor);
    }

    #[test]
    fn test_into_tensor() {
        let input = ImageInput::tensor(Array4::<f32>::zeros((2, 3, 4, 4)));
        assert_eq!(input.into_tensor().unwrap().shape(), &[2, 3, 4, 4]);
    }

    #[test]
    fn test_into_tensor_rejects_other_inputs() {
        let inputs = [
            ImageInput::from(DynamicImage::new_rgb8(4, 4)),
            ImageInput::array(Array4::<f32>::zeros((1, 4, 4, 3))),
            ImageInput::tensor(Array3::<f32>::zeros((3, 4, 4))),
            ImageInput::tensors(vec![Array4::<f32>::zeros((1, 3, 4, 4)); 2]),
        ];

        for input in inputs {
            assert!(matches!(
                input.into_tensor(),
                Err(Error::UnsupportedInputFormat { .. })
            ));
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("latent".parse::<OutputFormat>().unwrap(), OutputFormat::Latent);
        assert_eq!("pil".parse::<OutputFormat>().unwrap(), OutputFormat::Pil);
        assert!(matches!(
            "numpy".parse::<OutputFormat>(),
            Err(Error::UnsupportedOutputFormat { format }) if format == "numpy"
        ));
    }

    #[test]
    fn test_output_format_lenient() {
        assert_eq!(OutputFormat::from_name_lenient("pt"), OutputFormat::Pt);
        assert_eq!(OutputFormat::from_name_lenient("numpy"), OutputFormat::Np);
        assert_eq!(OutputFormat::default(), OutputFormat::Pil);
    }
}
