use crate::foundation::{
    core::ClipRect,
    error::{FilterError, FilterResult},
    math::mul_div255_u8,
};

/// Colour encoding of the values stored in a [`PixelBuffer`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// Gamma-encoded sRGB, the storage format of rendered scenes.
    #[default]
    Srgb,
    /// Linear-light RGB; channel value proportional to intensity.
    LinearRgb,
}

/// Byte positions of the R, G, B and A channels inside each 4-byte pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelOffsets {
    pub r: usize,
    pub g: usize,
    pub b: usize,
    pub a: usize,
}

impl ChannelOffsets {
    pub const RGBA: Self = Self {
        r: 0,
        g: 1,
        b: 2,
        a: 3,
    };
    pub const BGRA: Self = Self {
        r: 2,
        g: 1,
        b: 0,
        a: 3,
    };

    pub fn new(r: usize, g: usize, b: usize, a: usize) -> FilterResult<Self> {
        let mut seen = [false; 4];
        for off in [r, g, b, a] {
            if off > 3 || seen[off] {
                return Err(FilterError::config(
                    "channel offsets must be a permutation of 0..4",
                ));
            }
            seen[off] = true;
        }
        Ok(Self { r, g, b, a })
    }
}

impl Default for ChannelOffsets {
    fn default() -> Self {
        Self::RGBA
    }
}

/// 32-bit-per-pixel raster with an explicit clip rectangle and colour state.
///
/// The backing allocation may be larger than `stride * height`: buffers are resized in place
/// and only reallocated when the requested size exceeds [`PixelBuffer::capacity_bytes`].
///
/// Pixel accessors take and return logical `[r, g, b, a]` arrays; the physical byte order is
/// given by [`PixelBuffer::channels`].
#[derive(Clone, Debug, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
    clip: ClipRect,
    channels: ChannelOffsets,
    color_space: ColorSpace,
    premultiplied: bool,
}

impl PixelBuffer {
    /// Allocate a transparent RGBA buffer.
    pub fn new(width: u32, height: u32) -> FilterResult<Self> {
        Self::with_channels(width, height, ChannelOffsets::RGBA)
    }

    pub fn with_channels(width: u32, height: u32, channels: ChannelOffsets) -> FilterResult<Self> {
        let mut out = Self {
            channels,
            premultiplied: true,
            ..Self::default()
        };
        out.resize(width, height)?;
        Ok(out)
    }

    /// Wrap tightly packed RGBA8 bytes.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        data: Vec<u8>,
        premultiplied: bool,
        color_space: ColorSpace,
    ) -> FilterResult<Self> {
        let len = byte_len(width, height)?;
        if data.len() != len {
            return Err(FilterError::config(format!(
                "rgba8 data has {} bytes, expected {len} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride: (width as usize) * 4,
            data,
            clip: ClipRect::from_size(width, height),
            channels: ChannelOffsets::RGBA,
            color_space,
            premultiplied,
        })
    }

    /// Change the logical dimensions, reallocating only when the capacity is insufficient.
    ///
    /// Pixel contents are unspecified afterwards; the clip is reset to the full buffer.
    pub fn resize(&mut self, width: u32, height: u32) -> FilterResult<()> {
        let needed = byte_len(width, height)?;
        if needed > self.data.len() {
            let extra = needed - self.data.len();
            self.data.try_reserve_exact(extra).map_err(|e| {
                FilterError::resource(format!("failed to allocate {width}x{height} buffer: {e}"))
            })?;
            self.data.resize(needed, 0);
        }
        self.width = width;
        self.height = height;
        self.stride = (width as usize) * 4;
        self.clip = ClipRect::from_size(width, height);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn len_bytes(&self) -> usize {
        self.stride * (self.height as usize)
    }

    pub fn clip(&self) -> ClipRect {
        self.clip
    }

    /// Set the clip, clamped to the buffer bounds.
    pub fn set_clip(&mut self, clip: ClipRect) {
        self.clip = clip.clamp_to(self.width, self.height);
    }

    pub fn bounds(&self) -> ClipRect {
        ClipRect::from_size(self.width, self.height)
    }

    pub fn channels(&self) -> ChannelOffsets {
        self.channels
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Retag the buffer without converting pixel values.
    pub(crate) fn set_color_space(&mut self, space: ColorSpace) {
        self.color_space = space;
    }

    pub fn is_premultiplied(&self) -> bool {
        self.premultiplied
    }

    pub(crate) fn set_premultiplied(&mut self, premultiplied: bool) {
        self.premultiplied = premultiplied;
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len_bytes()]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        let len = self.len_bytes();
        &mut self.data[..len]
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize) * self.stride + (x as usize) * 4
    }

    /// Read the pixel at `(x, y)` as `[r, g, b, a]`. Coordinates must be inside the buffer.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let o = self.offset(x, y);
        let c = self.channels;
        let px = &self.data[o..o + 4];
        [px[c.r], px[c.g], px[c.b], px[c.a]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        let o = self.offset(x, y);
        let c = self.channels;
        let px = &mut self.data[o..o + 4];
        px[c.r] = rgba[0];
        px[c.g] = rgba[1];
        px[c.b] = rgba[2];
        px[c.a] = rgba[3];
    }

    /// Pixel lookup returning transparent black outside the buffer.
    #[inline]
    pub fn pixel_or_transparent(&self, x: i32, y: i32) -> [u8; 4] {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            [0, 0, 0, 0]
        } else {
            self.pixel(x, y)
        }
    }

    /// Clear every pixel (ignoring the clip) to transparent black.
    pub fn clear_transparent(&mut self) {
        self.data_mut().fill(0);
    }

    /// Fill `rect` (clamped to the buffer) with a logical RGBA value.
    pub fn fill_rect(&mut self, rect: ClipRect, rgba: [u8; 4]) {
        let rect = rect.clamp_to(self.width, self.height);
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                self.set_pixel(x, y, rgba);
            }
        }
    }

    /// Resize to match `src` and copy its pixels and colour state, keeping this buffer's
    /// channel layout.
    pub fn copy_from(&mut self, src: &PixelBuffer) -> FilterResult<()> {
        self.resize(src.width, src.height)?;
        if self.channels == src.channels {
            let len = src.len_bytes();
            self.data[..len].copy_from_slice(src.data());
        } else {
            for y in 0..src.height as i32 {
                for x in 0..src.width as i32 {
                    self.set_pixel(x, y, src.pixel(x, y));
                }
            }
        }
        self.clip = src.clip;
        self.color_space = src.color_space;
        self.premultiplied = src.premultiplied;
        Ok(())
    }

    /// Copy the pixels inside `rect` from `src` (same dimensions), leaving the rest untouched.
    pub fn copy_rect_from(&mut self, src: &PixelBuffer, rect: ClipRect) {
        let rect = rect
            .intersect(self.bounds())
            .intersect(src.bounds());
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                self.set_pixel(x, y, src.pixel(x, y));
            }
        }
    }

    /// Convert to premultiplied alpha in place. No-op when already premultiplied.
    pub fn premultiply(&mut self) {
        if self.premultiplied {
            return;
        }
        let c = self.channels;
        for px in self.data_mut().chunks_exact_mut(4) {
            let a = u16::from(px[c.a]);
            px[c.r] = mul_div255_u8(u16::from(px[c.r]), a);
            px[c.g] = mul_div255_u8(u16::from(px[c.g]), a);
            px[c.b] = mul_div255_u8(u16::from(px[c.b]), a);
        }
        self.premultiplied = true;
    }

    /// Convert to straight alpha in place. No-op when already straight.
    pub fn demultiply(&mut self) {
        if !self.premultiplied {
            return;
        }
        let c = self.channels;
        for px in self.data_mut().chunks_exact_mut(4) {
            let a = px[c.a];
            px[c.r] = demultiply_channel(px[c.r], a);
            px[c.g] = demultiply_channel(px[c.g], a);
            px[c.b] = demultiply_channel(px[c.b], a);
        }
        self.premultiplied = false;
    }

    /// Bring the buffer into the requested alpha state.
    pub fn ensure_premultiplied(&mut self, premultiplied: bool) {
        if premultiplied {
            self.premultiply();
        } else {
            self.demultiply();
        }
    }

    /// Tightly packed RGBA8 copy of the logical pixels, in the buffer's current state.
    pub fn to_rgba8_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width as usize) * (self.height as usize) * 4);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                out.extend_from_slice(&self.pixel(x, y));
            }
        }
        out
    }
}

#[inline]
pub(crate) fn demultiply_channel(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let a = u32::from(a);
    ((u32::from(c) * 255 + a / 2) / a).min(255) as u8
}

fn byte_len(width: u32, height: u32) -> FilterResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| FilterError::resource("pixel buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/buffer.rs"]
mod tests;
