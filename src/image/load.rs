//! Inbound conversions: images to arrays, arrays to tensors.

use image::{DynamicImage, GenericImageView};
use ndarray::{ArrayD, Axis, Ix4};

use crate::error::{Error, Result};

use super::{ImageArray, ImageTensor, PIXEL_MAX};

/// Convert a batch of images to an NHWC array with values in [0, 1].
///
/// 8-bit samples are divided by 255. Float images (`Rgb32F`, `Rgba32F`) are taken as-is.
/// Every image keeps its own channel count (1 for L, 2 for LA, 3 for RGB, 4 for RGBA),
/// so all images of one batch must agree on size and channel count.
///
/// # Errors
///
/// Returns an error if the batch is empty or the images differ in size or channel count.
pub fn image_to_array(images: &[DynamicImage]) -> Result<ImageArray> {
    let first = images.first().ok_or_else(|| Error::UnsupportedInputFormat {
        reason: "empty image list".to_string(),
    })?;

    let (width, height) = first.dimensions();
    let channels = first.color().channel_count();

    let mut data = Vec::with_capacity(
        images.len() * width as usize * height as usize * usize::from(channels),
    );

    for image in images {
        if image.dimensions() != (width, height) || image.color().channel_count() != channels {
            return Err(Error::ShapeMismatch {
                expected: format!("{width}x{height} image with {channels} channels"),
                actual: format!(
                    "{}x{} image with {} channels",
                    image.width(),
                    image.height(),
                    image.color().channel_count()
                ),
            });
        }
        data.extend(samples(image));
    }

    let shape = (
        images.len(),
        height as usize,
        width as usize,
        usize::from(channels),
    );
    Ok(ImageArray::from_shape_vec(shape, data)?)
}

/// Row-major, channel-last samples of one image.
fn samples(image: &DynamicImage) -> Vec<f32> {
    match image {
        DynamicImage::ImageRgb32F(buffer) => buffer.as_raw().clone(),
        DynamicImage::ImageRgba32F(buffer) => buffer.as_raw().clone(),
        _ => {
            let bytes = match image.color().channel_count() {
                1 => image.to_luma8().into_raw(),
                2 => image.to_luma_alpha8().into_raw(),
                3 => image.to_rgb8().into_raw(),
                _ => image.to_rgba8().into_raw(),
            };
            bytes
                .into_iter()
                .map(|value| f32::from(value) / PIXEL_MAX)
                .collect()
        }
    }
}

/// Convert an NHWC array to an NCHW tensor.
///
/// A 3-D array is treated as a channel-less `(N, H, W)` batch and gets a trailing
/// channel axis first.
///
/// # Errors
///
/// Returns an error if the array is not 3-D or 4-D.
pub fn array_to_tensor(array: ArrayD<f32>) -> Result<ImageTensor> {
    let array = if array.ndim() == 3 {
        array.insert_axis(Axis(3))
    } else {
        array
    };

    let shape = array.shape().to_vec();
    let array = array
        .into_dimensionality::<Ix4>()
        .map_err(|_| Error::UnsupportedInputFormat {
            reason: format!("expected an (N, H, W, C) array batch, got shape {shape:?}"),
        })?;

    Ok(array
        .permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned())
}

/// Turn a list of arrays into one batch along the leading axis.
///
/// 4-D items are already batches and get concatenated; lower-rank items are
/// stacked along a new batch axis.
///
/// # Errors
///
/// Returns an error if the list is empty, mixes ranks, or the items do not share
/// a shape.
pub fn stack_batch(items: &[ArrayD<f32>]) -> Result<ArrayD<f32>> {
    let first = items.first().ok_or_else(|| Error::UnsupportedInputFormat {
        reason: "empty batch".to_string(),
    })?;

    if let Some((index, item)) = items
        .iter()
        .enumerate()
        .find(|(_, item)| item.ndim() != first.ndim())
    {
        return Err(Error::UnsupportedInputFormat {
            reason: format!(
                "item {index} is {}-D but the batch starts with a {}-D item",
                item.ndim(),
                first.ndim()
            ),
        });
    }

    let views: Vec<_> = items.iter().map(ArrayD::view).collect();

    let batch = if first.ndim() == 4 {
        ndarray::concatenate(Axis(0), &views)?
    } else {
        ndarray::stack(Axis(0), &views)?
    };

    Ok(batch)
}

/// Force an image to 8-bit RGB, dropping alpha and expanding grayscale.
#[must_use]
pub fn convert_to_rgb(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageRgb8(image.to_rgb8())
}
