use crate::{
    foundation::{
        core::{Affine, ClipRect, Rect},
        error::FilterResult,
    },
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::convert_buffer,
        raster::RasterImage,
    },
};

/// The vector content a filter is applied to, as seen by the filter engine.
///
/// Implementors own rasterization and the scene transform stack; the engine only asks for a
/// filter-free rendering and enough geometry to place the filter region.
pub trait ClientGeometry {
    /// Draw the geometry, with its own filter disabled, into `target`.
    ///
    /// `target` is viewport-sized, cleared to transparent, premultiplied, tagged sRGB.
    fn render(&self, target: &mut PixelBuffer) -> FilterResult<()>;

    /// Cumulative local-to-device transform.
    fn transform(&self) -> Affine;

    /// Tight bounds in local coordinates, if known.
    fn bounds(&self) -> Option<Rect>;

    /// Hidden or disabled geometry renders nothing.
    fn is_visible(&self) -> bool {
        true
    }
}

/// Client geometry backed by an already rasterised image placed at an integer device offset.
#[derive(Clone, Debug)]
pub struct RasterGeometry {
    pixels: PixelBuffer,
    x: i32,
    y: i32,
    bounds: Option<Rect>,
}

impl RasterGeometry {
    pub fn new(image: &RasterImage) -> FilterResult<Self> {
        Ok(Self::from_buffer(image.to_pixel_buffer()?))
    }

    /// Wrap a buffer in any colour state; it is normalized to premultiplied sRGB.
    pub fn from_buffer(mut pixels: PixelBuffer) -> Self {
        convert_buffer(&mut pixels, ColorSpace::Srgb);
        pixels.premultiply();
        let bounds = opaque_bounds(&pixels).map(ClipRect::to_rect);
        Self {
            pixels,
            x: 0,
            y: 0,
            bounds,
        }
    }

    /// Place the raster's top-left corner at device `(x, y)`.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }
}

impl ClientGeometry for RasterGeometry {
    fn render(&self, target: &mut PixelBuffer) -> FilterResult<()> {
        let dst = ClipRect::new(
            self.x,
            self.y,
            self.x.saturating_add(self.pixels.width() as i32),
            self.y.saturating_add(self.pixels.height() as i32),
        )
        .intersect(target.bounds());
        for y in dst.top..dst.bottom {
            for x in dst.left..dst.right {
                target.set_pixel(x, y, self.pixels.pixel(x - self.x, y - self.y));
            }
        }
        Ok(())
    }

    fn transform(&self) -> Affine {
        Affine::translate((f64::from(self.x), f64::from(self.y)))
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn is_visible(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Bounding box of the pixels with non-zero alpha.
pub(crate) fn opaque_bounds(buf: &PixelBuffer) -> Option<ClipRect> {
    let mut r = ClipRect::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for y in 0..buf.height() as i32 {
        for x in 0..buf.width() as i32 {
            if buf.pixel(x, y)[3] != 0 {
                r.left = r.left.min(x);
                r.top = r.top.min(y);
                r.right = r.right.max(x + 1);
                r.bottom = r.bottom.max(y + 1);
            }
        }
    }
    (r.left < r.right).then_some(r)
}

#[cfg(test)]
#[path = "../../tests/unit/render/geometry.rs"]
mod tests;
