//! Depth-map packing for RGB-D VAEs.
//!
//! A decoded RGB-D batch carries RGB in channels 0-2 and a depth payload from
//! channel 3 onward. Two payload layouts exist:
//!
//! - one channel holding the depth directly, scaled to the full 16-bit range;
//! - an RGB-like triple whose second and third channels hold the high and low
//!   byte of a 16-bit depth value (the first is ignored).

use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::{Error, Result};

use super::{
    array_to_image, convert_to_rgb, normalize_value, quantize, resize, ImageArray, Resample,
    RGB_CHANNELS,
};

/// Stride depth maps are resized to, independent of the processor's stride factor.
pub const DEPTH_STRIDE: u32 = 32;

/// Largest 16-bit depth value.
const DEPTH_MAX: f32 = 65535.0;

/// Split a 16-bit depth value into its (high, low) bytes.
#[must_use]
pub const fn pack_depth(value: u16) -> (u8, u8) {
    let [high, low] = value.to_be_bytes();
    (high, low)
}

/// Rebuild a 16-bit depth value from its high and low bytes: `high * 256 + low`.
#[must_use]
pub const fn unpack_depth(high: u8, low: u8) -> u16 {
    u16::from_be_bytes([high, low])
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize_depth(value: f32) -> u16 {
    // Safe: clamped to [0, 65535] before casting
    (value * DEPTH_MAX).round().clamp(0.0, DEPTH_MAX) as u16
}

/// Prepare a depth image for the encoder.
///
/// The image is converted to RGB, resized with Lanczos to the nearest lower multiple
/// of [`DEPTH_STRIDE`] and mapped to [-1, 1]. The result is an `Rgb32F` image holding
/// normalized samples, not displayable pixels.
#[must_use]
pub fn transform_depth(image: &DynamicImage) -> DynamicImage {
    let rgb = convert_to_rgb(image);
    let mut samples = resize(&rgb, None, None, DEPTH_STRIDE, Resample::Lanczos).to_rgb32f();

    for value in samples.iter_mut() {
        *value = normalize_value(*value);
    }

    DynamicImage::ImageRgb32F(samples)
}

/// Depth planes of one `(H, W, C)` item, by payload layout.
enum Payload<'a> {
    /// One channel holding the whole depth range.
    Single(ArrayView2<'a, f32>),
    /// High and low byte planes of an RGB-like triple.
    Bytes {
        high: ArrayView2<'a, f32>,
        low: ArrayView2<'a, f32>,
    },
}

impl<'a> Payload<'a> {
    fn of(item: ArrayView3<'a, f32>) -> Result<Self> {
        let channels = item.len_of(Axis(2));
        if channels <= RGB_CHANNELS {
            return Err(Error::UnsupportedDepthEncoding { channels });
        }

        let payload = item.slice_move(s![.., .., RGB_CHANNELS..]);
        match payload.len_of(Axis(2)) {
            1 => Ok(Self::Single(payload.index_axis_move(Axis(2), 0))),
            n if n >= 3 => Ok(Self::Bytes {
                high: payload.clone().index_axis_move(Axis(2), 1),
                low: payload.index_axis_move(Axis(2), 2),
            }),
            _ => Err(Error::UnsupportedDepthEncoding { channels }),
        }
    }

    /// Depth on the float samples: `x * 65535`, or `high * 256 + low`.
    fn values(&self) -> Array2<f32> {
        match self {
            Self::Single(plane) => plane.mapv(|value| value * DEPTH_MAX),
            Self::Bytes { high, low } => Zip::from(high)
                .and(low)
                .map_collect(|&high, &low| high.mul_add(256.0, low)),
        }
    }

    /// Depth as 16-bit integers, quantizing each plane first.
    fn quantized(&self) -> Array2<u16> {
        match self {
            Self::Single(plane) => plane.mapv(quantize_depth),
            Self::Bytes { high, low } => Zip::from(high)
                .and(low)
                .map_collect(|&high, &low| unpack_depth(quantize(high), quantize(low))),
        }
    }
}

/// Apply `decode` to the depth payload of every item in an NHWC batch.
fn decode_batch<T, F>(array: &ImageArray, decode: F) -> Result<Array3<T>>
where
    T: Clone + Default,
    F: Fn(&Payload<'_>) -> Array2<T>,
{
    let (batch, height, width, _) = array.dim();
    let mut depth = Array3::<T>::default((batch, height, width));

    for (item, mut out) in array.outer_iter().zip(depth.outer_iter_mut()) {
        out.assign(&decode(&Payload::of(item)?));
    }

    Ok(depth)
}

/// Split a combined RGB-D batch into its RGB channels and depth values.
///
/// Depth is computed on the float samples without quantizing: `high * 256 + low`
/// for the RGB-like layout, `x * 65535` for a single payload channel.
///
/// # Errors
///
/// Returns an error if the batch has no decodable depth payload.
pub fn split_depth(array: &ImageArray) -> Result<(ImageArray, Array3<f32>)> {
    let depth = decode_batch(array, |payload| payload.values())?;
    let rgb = array.slice(s![.., .., .., ..RGB_CHANNELS]).to_owned();

    Ok((rgb, depth))
}

/// Encode the depth payload of a combined RGB-D batch as 16-bit grayscale images.
///
/// Payload channels are quantized to 8 bits (16 bits for a single channel) before
/// the bytes are combined.
///
/// # Errors
///
/// Returns an error if the batch has no decodable depth payload.
pub fn array_to_depth(array: &ImageArray) -> Result<Vec<DynamicImage>> {
    let depth = decode_batch(array, |payload| payload.quantized())?;
    let (_, height, width) = depth.dim();
    let unsupported = || Error::UnsupportedShape {
        shape: array.shape().to_vec(),
        reason: "depth map size exceeds u32".to_string(),
    };
    let width = u32::try_from(width).map_err(|_| unsupported())?;
    let height = u32::try_from(height).map_err(|_| unsupported())?;

    depth
        .outer_iter()
        .map(|item| {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, item.iter().copied().collect())
                .map(DynamicImage::ImageLuma16)
                .ok_or_else(unsupported)
        })
        .collect()
}

/// Encode the RGB part of a combined RGB-D batch as 8-bit images.
///
/// Single-channel batches become L images; everything else keeps at most the
/// first three channels.
///
/// # Errors
///
/// Returns an error if the array cannot be encoded as images.
pub fn array_to_rgb_image(array: &ImageArray) -> Result<Vec<DynamicImage>> {
    let channels = array.len_of(Axis(3)).min(RGB_CHANNELS);
    array_to_image(&array.slice(s![.., .., .., ..channels]))
}
