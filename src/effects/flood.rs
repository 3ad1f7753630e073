use crate::{
    foundation::core::{Point, Rgba8},
    graph::node::FloodParams,
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::convert_straight_pixel,
    },
};

use super::EffectContext;

/// Fill the node's target area with a constant colour, premultiplied, without anti-aliasing.
///
/// An explicit subregion is filled as the transformed quad of its local rectangle, sampled at
/// pixel centres; otherwise the whole filter clip is filled.
pub(crate) fn apply(p: &FloodParams, ctx: &EffectContext<'_>, out: &mut PixelBuffer) {
    let straight = p.color.with_opacity(p.opacity).to_array();
    let [r, g, b, a] = convert_straight_pixel(straight, ColorSpace::Srgb, ctx.color_space);
    let premul = Rgba8::new(r, g, b, a).premultiplied();

    out.set_color_space(ctx.color_space);
    out.set_premultiplied(true);

    let clip = ctx.subregion.clip.intersect(out.clip());
    let axis_aligned = {
        let [_, b, c, _, _, _] = ctx.transform.as_coeffs();
        b == 0.0 && c == 0.0
    };
    if ctx.subregion.local == ctx.region.local
        || axis_aligned
        || ctx.transform.determinant().abs() <= f64::EPSILON
    {
        out.fill_rect(clip, premul);
        return;
    }

    let inverse = ctx.transform.inverse();
    let local = ctx.subregion.local;
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let pt = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if pt.x >= local.x0 && pt.x < local.x1 && pt.y >= local.y0 && pt.y < local.y1 {
                out.set_pixel(x, y, premul);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/flood.rs"]
mod tests;
