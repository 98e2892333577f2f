//! RGBA raster type shared by avatars and accessories.
//!
//! Every raster in the pipeline is 8-bit RGBA with straight (un-premultiplied)
//! alpha. Three-channel and grayscale inputs are widened at the boundary by
//! adding a fully opaque alpha channel, so nothing downstream has to check.

use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::Array2;
use thiserror::Error;

pub const CHANNELS: usize = 4;
pub const OPAQUE: u8 = 255;
pub const TRANSPARENT: u8 = 0;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),
    #[error("mask is {mask_width}x{mask_height}, image is {width}x{height}")]
    MaskShape {
        mask_width: usize,
        mask_height: usize,
        width: u32,
        height: u32,
    },
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// An 8-bit RGBA bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// A raster filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self { pixels: RgbaImage::from_pixel(width, height, Rgba(rgba)) }
    }

    /// A fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, TRANSPARENT])
    }

    /// Build from an interleaved buffer with 3 (RGB) or 4 (RGBA) channels.
    ///
    /// RGB input gets an opaque alpha channel. Any other channel count, or a
    /// buffer whose length does not match the dimensions, is rejected.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(RasterError::InvalidImageFormat(format!(
                "{width}x{height}x{channels} needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let rgba = match channels {
            4 => data,
            3 => {
                let mut out = Vec::with_capacity(width as usize * height as usize * CHANNELS);
                for px in data.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], OPAQUE]);
                }
                out
            }
            n => {
                return Err(RasterError::InvalidImageFormat(format!(
                    "expected 3 or 4 channels, got {n}"
                )))
            }
        };

        RgbaImage::from_raw(width, height, rgba)
            .map(|pixels| Self { pixels })
            .ok_or_else(|| RasterError::InvalidImageFormat("buffer size mismatch".into()))
    }

    /// Decode an encoded image (PNG, JPEG, WebP, ...) into RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from(decoded))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True when the raster has no pixels on either axis.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.pixels.put_pixel(x, y, Rgba(rgba));
    }

    /// Interleaved RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Copy of the pixels inside `[x, x + w) × [y, y + h)`.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> RasterImage {
        let view = image::imageops::crop_imm(&self.pixels, x, y, w, h);
        Self { pixels: view.to_image() }
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        // into_rgba8 widens RGB/luma sources with an opaque alpha channel.
        Self { pixels: image.into_rgba8() }
    }
}

/// Cut a person out of `image` using the segmentation collaborator's mask.
///
/// RGB is copied through; alpha becomes opaque where the mask is set and
/// transparent elsewhere. The mask is indexed `[row, column]`.
pub fn apply_mask(image: &RasterImage, mask: &Array2<bool>) -> Result<RasterImage, RasterError> {
    let (mask_height, mask_width) = mask.dim();
    let (width, height) = image.dimensions();
    if mask_width != width as usize || mask_height != height as usize {
        return Err(RasterError::MaskShape { mask_width, mask_height, width, height });
    }

    let mut out = image.clone();
    for ((row, col), &keep) in mask.indexed_iter() {
        let [r, g, b, _] = out.pixel(col as u32, row as u32);
        let alpha = if keep { OPAQUE } else { TRANSPARENT };
        out.put_pixel(col as u32, row as u32, [r, g, b, alpha]);
    }
    Ok(out)
}
