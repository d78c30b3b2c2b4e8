//! Outbound conversions: tensors to arrays, arrays to images.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{ArrayBase, ArrayView3, Axis, Data, Dimension};

use crate::error::{Error, Result};

use super::{quantize, ImageArray, ImageTensor};

/// Convert an NCHW tensor to an NHWC array.
#[must_use]
pub fn tensor_to_array(tensor: ImageTensor) -> ImageArray {
    tensor
        .permuted_axes([0, 2, 3, 1])
        .as_standard_layout()
        .into_owned()
}

/// Convert an NHWC array with values in [0, 1] to 8-bit images.
///
/// A 3-D `(H, W, C)` array is treated as a batch of one. Samples are scaled by 255,
/// rounded and clamped. One channel yields L images, two LA, three RGB, four RGBA.
///
/// # Errors
///
/// Returns an error if the array is not 3-D or 4-D, or has a channel count no
/// image mode can hold.
pub fn array_to_image<S, D>(array: &ArrayBase<S, D>) -> Result<Vec<DynamicImage>>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let view = array.view().into_dyn();
    let view = if view.ndim() == 3 {
        view.insert_axis(Axis(0))
    } else {
        view
    };

    let shape = view.shape().to_vec();
    let batch = view
        .into_dimensionality::<ndarray::Ix4>()
        .map_err(|_| Error::UnsupportedShape {
            shape,
            reason: "expected an (H, W, C) or (N, H, W, C) array".to_string(),
        })?;

    batch.outer_iter().map(encode_item).collect()
}

/// Encode one `(H, W, C)` item as an image.
fn encode_item(item: ArrayView3<'_, f32>) -> Result<DynamicImage> {
    let (height, width, channels) = item.dim();
    let unsupported = |reason: &str| Error::UnsupportedShape {
        shape: vec![height, width, channels],
        reason: reason.to_string(),
    };

    let width = u32::try_from(width).map_err(|_| unsupported("width exceeds u32"))?;
    let height = u32::try_from(height).map_err(|_| unsupported("height exceeds u32"))?;

    // iter() walks in logical row-major order whatever the memory layout
    let data: Vec<u8> = item.iter().copied().map(quantize).collect();

    let image = match channels {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        _ => return Err(unsupported("channel count must be 1, 2, 3 or 4")),
    };

    image.ok_or_else(|| unsupported("sample buffer does not match image size"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::image_to_array;
    use image::{GenericImageView, Rgb, Rgba};
    use ndarray::{Array3, Array4};

    #[test]
    fn test_tensor_to_array_transposes() {
        let mut tensor = ImageTensor::zeros((1, 3, 4, 5));
        tensor[[0, 2, 3, 1]] = 0.4;

        let array = tensor_to_array(tensor);

        assert_eq!(array.shape(), &[1, 4, 5, 3]);
        assert!((array[[0, 3, 1, 2]] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_array_to_image_rgb() {
        let array = Array4::<f32>::from_elem((2, 6, 4, 3), 0.5);
        let images = array_to_image(&array).unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].dimensions(), (4, 6));
        assert_eq!(images[0].to_rgb8().get_pixel(0, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_array_to_image_single_item() {
        let array = Array3::<f32>::ones((4, 4, 4));
        let images = array_to_image(&array).unwrap();

        assert_eq!(images.len(), 1);
        assert!(matches!(images[0], DynamicImage::ImageRgba8(_)));
        assert_eq!(images[0].to_rgba8().get_pixel(3, 3), &Rgba([255; 4]));
    }

    #[test]
    fn test_array_to_image_grayscale() {
        let array = Array4::<f32>::zeros((1, 4, 4, 1));
        let images = array_to_image(&array).unwrap();

        assert!(matches!(images[0], DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_array_to_image_clamps() {
        let array = Array4::<f32>::from_elem((1, 2, 2, 3), 1.8);
        let images = array_to_image(&array).unwrap();

        assert_eq!(images[0].to_rgb8().get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_array_to_image_unsupported_channels() {
        let array = Array4::<f32>::zeros((1, 4, 4, 5));
        let result = array_to_image(&array);

        assert!(matches!(result, Err(Error::UnsupportedShape { .. })));
    }

    #[test]
    fn test_image_round_trip() {
        let mut img = RgbImage::new(16, 8);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            #[allow(clippy::cast_possible_truncation)]
            let value = ((x * 16 + y * 3) % 256) as u8;
            *pixel = Rgb([value, 255 - value, value / 2]);
        }
        let original = DynamicImage::ImageRgb8(img);

        let array = image_to_array(std::slice::from_ref(&original)).unwrap();
        let restored = array_to_image(&array).unwrap();

        assert_eq!(restored[0].to_rgb8(), original.to_rgb8());
    }
}
