use std::sync::Arc;

use anyhow::Context;

use crate::{
    foundation::error::{FilterError, FilterResult},
    pixel::buffer::{ColorSpace, PixelBuffer},
};

/// Externally supplied raster: straight (non-premultiplied) sRGB RGBA8, shared cheaply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Arc<Vec<u8>>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgba8: Vec<u8>) -> FilterResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| FilterError::resource("raster size overflow"))?;
        if rgba8.len() != expected {
            return Err(FilterError::config(format!(
                "raster has {} bytes, expected {expected}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba8),
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, ...).
    pub fn decode(bytes: &[u8]) -> FilterResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Straight `[r, g, b, a]` at `(x, y)`, clamped to the image edges.
    #[inline]
    pub fn texel_clamped(&self, x: i64, y: i64) -> [u8; 4] {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let o = (y * self.width as usize + x) * 4;
        [
            self.rgba8[o],
            self.rgba8[o + 1],
            self.rgba8[o + 2],
            self.rgba8[o + 3],
        ]
    }

    /// Copy into a straight-alpha sRGB pixel buffer.
    pub fn to_pixel_buffer(&self) -> FilterResult<PixelBuffer> {
        PixelBuffer::from_rgba8(
            self.width,
            self.height,
            self.rgba8.as_ref().clone(),
            false,
            ColorSpace::Srgb,
        )
    }
}
