use crate::{
    foundation::core::{ClipRect, Vec2},
    graph::node::OffsetParams,
    pixel::buffer::PixelBuffer,
};

use super::EffectContext;

pub(crate) fn apply(
    p: &OffsetParams,
    ctx: &EffectContext<'_>,
    input: &PixelBuffer,
    out: &mut PixelBuffer,
) {
    let d = ctx.device_vector(p.dx, p.dy);
    let clip = out.clip();
    translate(input, out, clip, d);
}

/// Copy `src` into `dst` shifted by `d` device pixels (rounded). Pixels of `clip` with no
/// source stay transparent; the destination adopts the source's colour state.
pub(crate) fn translate(src: &PixelBuffer, dst: &mut PixelBuffer, clip: ClipRect, d: Vec2) {
    let dx = d.x.round() as i32;
    let dy = d.y.round() as i32;
    let src_clip = src.clip();
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let (sx, sy) = (x - dx, y - dy);
            let px = if src_clip.contains(sx, sy) {
                src.pixel(sx, sy)
            } else {
                [0; 4]
            };
            dst.set_pixel(x, y, px);
        }
    }
    dst.set_color_space(src.color_space());
    dst.set_premultiplied(src.is_premultiplied());
}

#[cfg(test)]
#[path = "../../tests/unit/effects/offset.rs"]
mod tests;
