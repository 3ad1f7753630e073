use crate::{
    foundation::{error::FilterResult, math::unit_to_u8},
    graph::node::CompositeOp,
    pixel::buffer::PixelBuffer,
};

use super::{blend, pixel_or_clear};

/// Premultiplied pixel in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PremulF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl PremulF {
    #[inline]
    pub fn from_u8(px: [u8; 4]) -> Self {
        Self {
            r: f32::from(px[0]) / 255.0,
            g: f32::from(px[1]) / 255.0,
            b: f32::from(px[2]) / 255.0,
            a: f32::from(px[3]) / 255.0,
        }
    }

    /// Clamp into a valid premultiplied byte pixel (colour never exceeds alpha).
    #[inline]
    pub fn to_u8(self) -> [u8; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            unit_to_u8(self.r.clamp(0.0, a)),
            unit_to_u8(self.g.clamp(0.0, a)),
            unit_to_u8(self.b.clamp(0.0, a)),
            unit_to_u8(a),
        ]
    }

    #[inline]
    pub fn map2(self, d: Self, alpha: f32, f: impl Fn(f32, f32) -> f32) -> Self {
        Self {
            r: f(self.r, d.r),
            g: f(self.g, d.g),
            b: f(self.b, d.b),
            a: alpha,
        }
    }

    #[inline]
    pub fn scale(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a * k,
        }
    }

    #[inline]
    pub fn add(self, o: Self) -> Self {
        Self {
            r: self.r + o.r,
            g: self.g + o.g,
            b: self.b + o.b,
            a: self.a + o.a,
        }
    }
}

/// Combine foreground `s` (the input) with background `d` (the mix).
#[inline]
pub(crate) fn composite_px(op: &CompositeOp, s: PremulF, d: PremulF) -> PremulF {
    match *op {
        CompositeOp::Over => s.add(d.scale(1.0 - s.a)),
        CompositeOp::In => s.scale(d.a),
        CompositeOp::Out => s.scale(1.0 - d.a),
        CompositeOp::Atop => s.scale(d.a).add(d.scale(1.0 - s.a)),
        CompositeOp::Xor => s.scale(1.0 - d.a).add(d.scale(1.0 - s.a)),
        CompositeOp::Arithmetic { k1, k2, k3, k4 } => {
            let f = |s: f32, d: f32| (k1 * s * d + k2 * s + k3 * d + k4).clamp(0.0, 1.0);
            let a = f(s.a, d.a);
            s.map2(d, a, f)
        }
        CompositeOp::Blend(mode) => blend::blend_px(mode, s, d),
    }
}

/// Composite `input` over/with `mix` into `out`, premultiplied.
///
/// Only pixels inside both the output clip and the input clip are written.
pub(crate) fn apply(
    op: &CompositeOp,
    input: Option<&PixelBuffer>,
    mix: Option<&PixelBuffer>,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = match input {
        Some(i) => out.clip().intersect(i.clip()),
        None => out.clip(),
    };
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let s = PremulF::from_u8(pixel_or_clear(input, x, y));
            let d = PremulF::from_u8(pixel_or_clear(mix, x, y));
            out.set_pixel(x, y, composite_px(op, s, d).to_u8());
        }
    }
    if let Some(src) = input.or(mix) {
        out.set_color_space(src.color_space());
    }
    out.set_premultiplied(true);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
