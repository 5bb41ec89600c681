use crate::config::OutputFormat;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("webp encoding failed: {0}")]
    Webp(String),
    #[error("cannot encode an empty {0}x{1} image")]
    EmptyImage(u32, u32),
}

/// Encoder quality in `0..=100`; 100 means lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const LOSSLESS: Quality = Quality(100);

    /// Clamp any requested value into range.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lossless(self) -> bool {
        self == Self::LOSSLESS
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::LOSSLESS
    }
}

/// Serialize `image` in `format`. PNG ignores `quality`.
pub fn encode(
    image: &RgbImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage(width, height));
    }

    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Webp if quality.is_lossless() => {
            WebPEncoder::new_lossless(&mut bytes).encode(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Webp => {
            let encoded = webp::Encoder::from_rgb(image.as_raw(), width, height)
                .encode_simple(false, f32::from(quality.value()))
                .map_err(|e| EncodeError::Webp(format!("{e:?}")))?;
            bytes.extend_from_slice(&encoded);
        }
    }
    log::debug!("encoded {width}x{height} as {format}: {} bytes", bytes.len());
    Ok(bytes)
}
