use crate::{
    foundation::{core::ClipRect, error::FilterResult},
    graph::node::{ConvolveParams, EdgeMode},
    pixel::buffer::PixelBuffer,
};

use super::EffectContext;

/// Matrix convolution of straight-alpha `input` into `out`.
///
/// Pixels whose kernel footprint lies inside the input region read it directly; the rest go
/// through the edge mode. Both paths accumulate in the same order, so they agree bit for bit.
pub(crate) fn apply(
    p: &ConvolveParams,
    ctx: &EffectContext<'_>,
    input: &PixelBuffer,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = out.clip().intersect(input.clip());
    ctx.check_canvas("convolution", clip)?;
    if clip.is_empty() {
        return Ok(());
    }

    let kernel = flipped_kernel(p);
    let (ox, oy) = (p.order_x as i32, p.order_y as i32);
    let (tx, ty) = (p.target_x as i32, p.target_y as i32);

    for y in clip.top..clip.bottom {
        let rows_inside = y - ty >= clip.top && y - ty + oy <= clip.bottom;
        for x in clip.left..clip.right {
            let inside = rows_inside && x - tx >= clip.left && x - tx + ox <= clip.right;
            let px = if inside {
                convolve_at(p, &kernel, input, x, y, |sx, sy| input.pixel(sx, sy))
            } else {
                convolve_at(p, &kernel, input, x, y, |sx, sy| {
                    sample_edge(input, clip, p.edge_mode, sx, sy)
                })
            };
            out.set_pixel(x, y, px);
        }
    }
    out.set_color_space(input.color_space());
    out.set_premultiplied(false);
    Ok(())
}

/// Kernel rotated by 180 degrees so it can be walked in source order.
fn flipped_kernel(p: &ConvolveParams) -> Vec<f32> {
    let mut k = p.kernel.clone();
    k.reverse();
    k
}

/// Evaluate the kernel at `(x, y)` reading source pixels through `fetch`.
#[inline]
pub(crate) fn convolve_at(
    p: &ConvolveParams,
    kernel: &[f32],
    input: &PixelBuffer,
    x: i32,
    y: i32,
    fetch: impl Fn(i32, i32) -> [u8; 4],
) -> [u8; 4] {
    let (ox, oy) = (p.order_x as i32, p.order_y as i32);
    let (tx, ty) = (p.target_x as i32, p.target_y as i32);
    let mut sum = [0.0f32; 4];
    let mut k = kernel.iter();
    for i in 0..oy {
        for j in 0..ox {
            let w = k.next().copied().unwrap_or(0.0);
            let s = fetch(x - tx + j, y - ty + i);
            for c in 0..4 {
                sum[c] += f32::from(s[c]) * w;
            }
        }
    }

    let bias = p.bias * 255.0;
    let chan = |v: f32| (v / p.divisor + bias).round().clamp(0.0, 255.0) as u8;
    let a = if p.preserve_alpha {
        input.pixel(x, y)[3]
    } else {
        chan(sum[3])
    };
    [chan(sum[0]), chan(sum[1]), chan(sum[2]), a]
}

/// Read `(x, y)` relative to the input region `clip` using the edge policy.
#[inline]
pub(crate) fn sample_edge(
    input: &PixelBuffer,
    clip: ClipRect,
    mode: EdgeMode,
    x: i32,
    y: i32,
) -> [u8; 4] {
    if clip.contains(x, y) {
        return input.pixel(x, y);
    }
    match mode {
        EdgeMode::Duplicate => input.pixel(
            x.clamp(clip.left, clip.right - 1),
            y.clamp(clip.top, clip.bottom - 1),
        ),
        EdgeMode::Wrap => input.pixel(
            clip.left + (x - clip.left).rem_euclid(clip.width()),
            clip.top + (y - clip.top).rem_euclid(clip.height()),
        ),
        EdgeMode::None => [0; 4],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/convolve.rs"]
mod tests;
