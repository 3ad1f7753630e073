use crate::{
    foundation::{core::ClipRect, error::FilterResult},
    graph::node::{MorphologyOp, MorphologyParams},
    pixel::buffer::PixelBuffer,
};

use super::{EffectContext, copy_input};

/// Separable erode/dilate over premultiplied pixels, horizontal then vertical.
///
/// The window is clipped to the input region; an axis with a zero device radius is skipped.
pub(crate) fn apply(
    p: &MorphologyParams,
    ctx: &EffectContext<'_>,
    input: &PixelBuffer,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = out.clip().intersect(input.clip());
    ctx.check_canvas("morphology", clip)?;

    let (dx, dy) = ctx.device_lengths(p.radius_x, p.radius_y);
    let rx = dx.round().max(0.0) as i32;
    let ry = dy.round().max(0.0) as i32;

    if rx == 0 && ry == 0 {
        copy_input(input, out, clip);
        return Ok(());
    }

    let pick: fn(u8, u8) -> u8 = match p.op {
        MorphologyOp::Erode => u8::min,
        MorphologyOp::Dilate => u8::max,
    };

    // First pass lands in a private scratch buffer so the second never reads its own output.
    let mut scratch = PixelBuffer::new(input.width(), input.height())?;
    scratch.set_clip(clip);
    if rx > 0 {
        pass(input, &mut scratch, clip, rx, true, pick);
    } else {
        scratch.copy_rect_from(input, clip);
    }

    if ry > 0 {
        pass(&scratch, out, clip, ry, false, pick);
    } else {
        out.copy_rect_from(&scratch, clip);
    }
    out.set_color_space(input.color_space());
    out.set_premultiplied(input.is_premultiplied());
    Ok(())
}

fn pass(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    clip: ClipRect,
    radius: i32,
    horizontal: bool,
    pick: fn(u8, u8) -> u8,
) {
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let (lo, hi) = if horizontal {
                ((x - radius).max(clip.left), (x + radius).min(clip.right - 1))
            } else {
                ((y - radius).max(clip.top), (y + radius).min(clip.bottom - 1))
            };
            let mut acc = src.pixel(x, y);
            for k in lo..=hi {
                let s = if horizontal {
                    src.pixel(k, y)
                } else {
                    src.pixel(x, k)
                };
                for c in 0..4 {
                    acc[c] = pick(acc[c], s[c]);
                }
            }
            dst.set_pixel(x, y, acc);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/morphology.rs"]
mod tests;
