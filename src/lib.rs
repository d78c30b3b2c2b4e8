//! # `vae-image-processor`
//!
//! Converts images between pixel images (`DynamicImage`), channel-last
//! `ndarray` arrays and channel-first tensors, and prepares them for the encoder
//! of a latent diffusion VAE: resizing to multiples of the VAE stride and mapping
//! values from [0, 1] to [-1, 1]. Decoder output goes the other way.
//!
//! [`DepthImageProcessor`] does the same for RGB-D models, carrying a depth map
//! packed next to the RGB channels.
//!
//! ## Example
//!
//! ```
//! use image::DynamicImage;
//! use vae_image_processor::{Config, ImageInput, OutputFormat, VaeImageProcessor};
//!
//! # fn main() -> vae_image_processor::Result<()> {
//! let processor = VaeImageProcessor::new(Config::default())?;
//!
//! let tensor = processor.preprocess(DynamicImage::new_rgb8(70, 70).into(), None, None)?;
//! assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
//!
//! let images = processor
//!     .postprocess(ImageInput::tensor(tensor), OutputFormat::Pil, None)?
//!     .into_images();
//! assert_eq!(images.map(|images| images.len()), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod processor;

pub use error::{Error, Result};
pub use processor::{
    Config, DepthConfig, DepthImageProcessor, DepthPostprocessed, ImageInput, ImageProcessor,
    OutputFormat, Postprocessed, VaeImageProcessor,
};
