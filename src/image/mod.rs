//! Conversions between images, NHWC arrays and NCHW tensors.

pub mod depth;
mod load;
mod range;
mod resize;
mod save;

pub use load::{array_to_tensor, convert_to_rgb, image_to_array, stack_batch};
pub use range::{denormalize, denormalize_value, min_value, normalize, normalize_value};
pub use resize::{floor_to_multiple, resize, Resample};
pub use save::{array_to_image, tensor_to_array};

use ndarray::Array4;

/// Image batch in NHWC format (batch, height, width, channels), values in [0, 1].
pub type ImageArray = Array4<f32>;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Values are in [0, 1] before normalization and in [-1, 1] after.
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Channel count that marks a tensor as already being VAE latents.
pub const LATENT_CHANNELS: usize = 4;

/// Largest 8-bit sample value.
pub(crate) const PIXEL_MAX: f32 = 255.0;

/// Quantize a [0, 1] sample to 8 bits.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn quantize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] before casting
    (value * PIXEL_MAX).round().clamp(0.0, PIXEL_MAX) as u8
}
