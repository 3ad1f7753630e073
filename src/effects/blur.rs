use crate::{
    foundation::{core::ClipRect, error::FilterResult},
    graph::node::BlurParams,
    pixel::buffer::PixelBuffer,
};

use super::EffectContext;

/// Device radius per unit of standard deviation.
pub(crate) const RADIUS_PER_SIGMA: f64 = 2.0;

/// Largest radius the multiplier tables cover.
const MAX_RADIUS: usize = 254;

/// Multipliers replacing the division by the stack weight sum, indexed by radius.
#[rustfmt::skip]
const STACK_BLUR8_MUL: [u32; 255] = [
    512,512,456,512,328,456,335,512,405,328,271,456,388,335,292,512,
    454,405,364,328,298,271,496,456,420,388,360,335,312,292,273,512,
    482,454,428,405,383,364,345,328,312,298,284,271,259,496,475,456,
    437,420,404,388,374,360,347,335,323,312,302,292,282,273,265,512,
    497,482,468,454,441,428,417,405,394,383,373,364,354,345,337,328,
    320,312,305,298,291,284,278,271,265,259,507,496,485,475,465,456,
    446,437,428,420,412,404,396,388,381,374,367,360,354,347,341,335,
    329,323,318,312,307,302,297,292,287,282,278,273,269,265,261,512,
    505,497,489,482,475,468,461,454,447,441,435,428,422,417,411,405,
    399,394,389,383,378,373,368,364,359,354,350,345,341,337,332,328,
    324,320,316,312,309,305,301,298,294,291,287,284,281,278,274,271,
    268,265,262,259,257,507,501,496,491,485,480,475,470,465,460,456,
    451,446,442,437,433,428,424,420,416,412,408,404,400,396,392,388,
    385,381,377,374,370,367,363,360,357,354,350,347,344,341,338,335,
    332,329,326,323,320,318,315,312,310,307,304,302,299,297,294,292,
    289,287,285,282,280,278,275,273,271,269,267,265,263,261,259,
];

/// Shifts paired with [`STACK_BLUR8_MUL`].
#[rustfmt::skip]
const STACK_BLUR8_SHR: [u32; 255] = [
     9, 11, 12, 13, 13, 14, 14, 15, 15, 15, 15, 16, 16, 16, 16, 17,
    17, 17, 17, 17, 17, 17, 18, 18, 18, 18, 18, 18, 18, 18, 18, 19,
    19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 20, 20, 20,
    20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 21,
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21,
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 22, 22, 22, 22, 22, 22,
    22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22,
    22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
];

/// Separable stack blur of `input` into `out`, restricted to the output clip.
///
/// Operates on premultiplied colour; the result is demultiplied once both passes are done.
pub(crate) fn apply(
    params: &BlurParams,
    ctx: &EffectContext<'_>,
    input: &PixelBuffer,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = out.clip();
    super::copy_input(input, out, clip);

    let (sx, sy) = ctx.device_lengths(params.std_dev_x, params.std_dev_y);
    let rx = sx * RADIUS_PER_SIGMA;
    let ry = sy * RADIUS_PER_SIGMA;
    if rx < 1.0 && ry < 1.0 {
        return Ok(());
    }

    out.premultiply();
    blur_buffer(out, clip, radius_px(rx), radius_px(ry));
    out.demultiply();
    Ok(())
}

fn radius_px(r: f64) -> usize {
    if r < 1.0 {
        0
    } else {
        (r.round() as usize).min(MAX_RADIUS)
    }
}

/// Blur the pixels inside `clip` in place; horizontal pass first.
pub(crate) fn blur_buffer(buf: &mut PixelBuffer, clip: ClipRect, rx: usize, ry: usize) {
    let mut line: Vec<[u8; 4]> = Vec::new();
    let mut stack: Vec<[u8; 4]> = Vec::new();

    if rx > 0 {
        for y in clip.top..clip.bottom {
            line.clear();
            line.extend((clip.left..clip.right).map(|x| buf.pixel(x, y)));
            blur_line(&mut line, rx, &mut stack);
            for (x, px) in (clip.left..clip.right).zip(&line) {
                buf.set_pixel(x, y, *px);
            }
        }
    }
    if ry > 0 {
        for x in clip.left..clip.right {
            line.clear();
            line.extend((clip.top..clip.bottom).map(|y| buf.pixel(x, y)));
            blur_line(&mut line, ry, &mut stack);
            for (y, px) in (clip.top..clip.bottom).zip(&line) {
                buf.set_pixel(x, y, *px);
            }
        }
    }
}

/// One sliding-window pass over a row or column. Window indices clamp to the line ends.
fn blur_line(line: &mut [[u8; 4]], radius: usize, stack: &mut Vec<[u8; 4]>) {
    let len = line.len();
    if len == 0 || radius == 0 {
        return;
    }
    let r = radius.min(MAX_RADIUS);
    let div = r * 2 + 1;
    let mul = u64::from(STACK_BLUR8_MUL[r]);
    let shr = STACK_BLUR8_SHR[r];
    let last = len - 1;

    stack.clear();
    stack.resize(div, [0; 4]);
    let mut sum = [0u64; 4];
    let mut sum_in = [0u64; 4];
    let mut sum_out = [0u64; 4];

    let first = line[0];
    for (i, slot) in stack.iter_mut().enumerate().take(r + 1) {
        *slot = first;
        for c in 0..4 {
            let v = u64::from(first[c]);
            sum[c] += v * (i as u64 + 1);
            sum_out[c] += v;
        }
    }
    for i in 1..=r {
        let px = line[i.min(last)];
        stack[i + r] = px;
        for c in 0..4 {
            let v = u64::from(px[c]);
            sum[c] += v * (r + 1 - i) as u64;
            sum_in[c] += v;
        }
    }

    let mut sp = r;
    let mut xp = r.min(last);
    for x in 0..len {
        // xp stays ahead of x until the line end, so in-place writes are safe.
        line[x] = [
            ((sum[0] * mul) >> shr) as u8,
            ((sum[1] * mul) >> shr) as u8,
            ((sum[2] * mul) >> shr) as u8,
            ((sum[3] * mul) >> shr) as u8,
        ];

        let mut start = sp + div - r;
        if start >= div {
            start -= div;
        }
        let leaving = stack[start];
        if xp < last {
            xp += 1;
        }
        let entering = line[xp];
        stack[start] = entering;
        for c in 0..4 {
            sum[c] -= sum_out[c];
            sum_out[c] -= u64::from(leaving[c]);
            sum_in[c] += u64::from(entering[c]);
            sum[c] += sum_in[c];
        }

        sp += 1;
        if sp >= div {
            sp = 0;
        }
        let centre = stack[sp];
        for c in 0..4 {
            sum_out[c] += u64::from(centre[c]);
            sum_in[c] -= u64::from(centre[c]);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
