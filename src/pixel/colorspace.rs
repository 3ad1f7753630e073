use std::sync::LazyLock;

use crate::pixel::buffer::{ColorSpace, PixelBuffer, demultiply_channel};
use crate::foundation::math::mul_div255_u8;

struct Luts {
    srgb_to_linear_f32: [f32; 256],
    srgb_to_linear_u8: [u8; 256],
    linear_to_srgb_u8: [u8; 256],
}

static LUTS: LazyLock<Luts> = LazyLock::new(|| {
    let mut srgb_to_linear_f32 = [0.0f32; 256];
    let mut srgb_to_linear_u8 = [0u8; 256];
    let mut linear_to_srgb_u8 = [0u8; 256];
    for i in 0..256 {
        let v = (i as f32) / 255.0;
        let lin = decode_srgb(v);
        srgb_to_linear_f32[i] = lin;
        srgb_to_linear_u8[i] = (lin * 255.0).round().clamp(0.0, 255.0) as u8;
        linear_to_srgb_u8[i] = (encode_srgb(v) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    Luts {
        srgb_to_linear_f32,
        srgb_to_linear_u8,
        linear_to_srgb_u8,
    }
});

/// sRGB transfer function, gamma-encoded to linear (both normalized).
pub fn decode_srgb(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse sRGB transfer function, linear to gamma-encoded (both normalized).
pub fn encode_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Normalized linear value for a gamma-encoded byte.
#[inline]
pub fn srgb_u8_to_linear_f32(v: u8) -> f32 {
    LUTS.srgb_to_linear_f32[v as usize]
}

#[inline]
pub fn srgb_to_linear_u8(v: u8) -> u8 {
    LUTS.srgb_to_linear_u8[v as usize]
}

#[inline]
pub fn linear_to_srgb_u8(v: u8) -> u8 {
    LUTS.linear_to_srgb_u8[v as usize]
}

/// Convert one straight colour channel byte between colour spaces.
#[inline]
pub fn convert_channel(v: u8, from: ColorSpace, to: ColorSpace) -> u8 {
    match (from, to) {
        (ColorSpace::Srgb, ColorSpace::LinearRgb) => srgb_to_linear_u8(v),
        (ColorSpace::LinearRgb, ColorSpace::Srgb) => linear_to_srgb_u8(v),
        _ => v,
    }
}

/// Convert a straight `[r, g, b, a]` pixel between colour spaces; alpha is untouched.
#[inline]
pub fn convert_straight_pixel(px: [u8; 4], from: ColorSpace, to: ColorSpace) -> [u8; 4] {
    [
        convert_channel(px[0], from, to),
        convert_channel(px[1], from, to),
        convert_channel(px[2], from, to),
        px[3],
    ]
}

/// Re-encode every pixel of `buf` into `target`, preserving its premultiplication state.
///
/// Premultiplied pixels are converted through straight alpha, since the transfer functions
/// are not linear in the alpha-scaled values.
pub fn convert_buffer(buf: &mut PixelBuffer, target: ColorSpace) {
    let from = buf.color_space();
    if from == target {
        return;
    }
    let premultiplied = buf.is_premultiplied();
    let c = buf.channels();
    for px in buf.data_mut().chunks_exact_mut(4) {
        let a = px[c.a];
        if a == 0 {
            continue;
        }
        for off in [c.r, c.g, c.b] {
            if premultiplied {
                let straight = demultiply_channel(px[off], a);
                let converted = convert_channel(straight, from, target);
                px[off] = mul_div255_u8(u16::from(converted), u16::from(a));
            } else {
                px[off] = convert_channel(px[off], from, target);
            }
        }
    }
    buf.set_color_space(target);
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/colorspace.rs"]
mod tests;
