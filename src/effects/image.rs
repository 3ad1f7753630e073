use std::f64::consts::PI;

use crate::{
    foundation::core::{Point, Rect},
    graph::node::{Align, AspectRatio, ImageParams, MeetOrSlice, Resample},
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::srgb_u8_to_linear_f32,
        raster::RasterImage,
    },
};

use super::EffectContext;

/// Window radius of the sinc-based kernels.
const SINC_RADIUS: f64 = 3.0;

/// Place `(iw, ih)` inside `target` according to the aspect-ratio policy.
pub(crate) fn fit_rect(target: Rect, iw: f64, ih: f64, aspect: AspectRatio) -> Rect {
    let (tw, th) = (target.width(), target.height());
    if aspect.align == Align::None || iw <= 0.0 || ih <= 0.0 {
        return target;
    }
    let scale = match aspect.fit {
        MeetOrSlice::Meet => (tw / iw).min(th / ih),
        MeetOrSlice::Slice => (tw / iw).max(th / ih),
    };
    let (w, h) = (iw * scale, ih * scale);
    let (fx, fy) = match aspect.align {
        Align::None | Align::XMinYMin => (0.0, 0.0),
        Align::XMidYMin => (0.5, 0.0),
        Align::XMaxYMin => (1.0, 0.0),
        Align::XMinYMid => (0.0, 0.5),
        Align::XMidYMid => (0.5, 0.5),
        Align::XMaxYMid => (1.0, 0.5),
        Align::XMinYMax => (0.0, 1.0),
        Align::XMidYMax => (0.5, 1.0),
        Align::XMaxYMax => (1.0, 1.0),
    };
    let x0 = target.x0 + (tw - w) * fx;
    let y0 = target.y0 + (th - h) * fy;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Kernel support radius in source texels.
fn radius(kind: Resample) -> f64 {
    match kind {
        Resample::Nearest => 0.5,
        Resample::Bilinear => 1.0,
        Resample::Bicubic => 2.0,
        Resample::Lanczos3 | Resample::Blackman | Resample::Hann => SINC_RADIUS,
    }
}

pub(crate) fn kernel_weight(kind: Resample, x: f64) -> f64 {
    let ax = x.abs();
    let r = radius(kind);
    if ax >= r {
        return 0.0;
    }
    match kind {
        Resample::Nearest => 1.0,
        Resample::Bilinear => 1.0 - ax,
        Resample::Bicubic => {
            // Catmull-Rom (a = -0.5).
            let a = -0.5;
            if ax <= 1.0 {
                ((a + 2.0) * ax - (a + 3.0)) * ax * ax + 1.0
            } else {
                ((a * ax - 5.0 * a) * ax + 8.0 * a) * ax - 4.0 * a
            }
        }
        Resample::Lanczos3 => sinc(x) * sinc(x / r),
        Resample::Blackman => {
            let t = PI * x / r;
            sinc(x) * (0.42 + 0.5 * t.cos() + 0.08 * (2.0 * t).cos())
        }
        Resample::Hann => sinc(x) * (0.5 + 0.5 * (PI * x / r).cos()),
    }
}

/// Premultiplied texel in the working colour space.
fn texel(img: &RasterImage, x: i64, y: i64, space: ColorSpace) -> [f32; 4] {
    let [r, g, b, a] = img.texel_clamped(x, y);
    let a = f32::from(a) / 255.0;
    let c = |v: u8| match space {
        ColorSpace::Srgb => f32::from(v) / 255.0,
        ColorSpace::LinearRgb => srgb_u8_to_linear_f32(v),
    };
    [c(r) * a, c(g) * a, c(b) * a, a]
}

/// Sample at continuous texel coordinates (texel centres at integer + 0.5).
pub(crate) fn sample(img: &RasterImage, u: f64, v: f64, kind: Resample, space: ColorSpace) -> [u8; 4] {
    let (cu, cv) = (u - 0.5, v - 0.5);
    let px = if kind == Resample::Nearest {
        texel(img, cu.round() as i64, cv.round() as i64, space)
    } else {
        let r = radius(kind);
        let (x0, x1) = ((cu - r).ceil() as i64, (cu + r).floor() as i64);
        let (y0, y1) = ((cv - r).ceil() as i64, (cv + r).floor() as i64);
        let mut acc = [0.0f64; 4];
        let mut total = 0.0f64;
        for ty in y0..=y1 {
            let wy = kernel_weight(kind, ty as f64 - cv);
            if wy == 0.0 {
                continue;
            }
            for tx in x0..=x1 {
                let w = wy * kernel_weight(kind, tx as f64 - cu);
                if w == 0.0 {
                    continue;
                }
                let t = texel(img, tx, ty, space);
                for c in 0..4 {
                    acc[c] += f64::from(t[c]) * w;
                }
                total += w;
            }
        }
        if total.abs() < 1e-12 {
            [0.0; 4]
        } else {
            acc.map(|v| (v / total) as f32)
        }
    };
    let a = px[3].clamp(0.0, 1.0);
    let q = |v: f32| (v.clamp(0.0, a) * 255.0).round() as u8;
    [q(px[0]), q(px[1]), q(px[2]), (a * 255.0).round() as u8]
}

/// Draw the raster into the node's target rectangle, premultiplied, in the working space.
pub(crate) fn apply(p: &ImageParams, ctx: &EffectContext<'_>, out: &mut PixelBuffer) {
    out.set_color_space(ctx.color_space);
    out.set_premultiplied(true);

    let img = &p.image;
    if img.is_empty() || ctx.transform.determinant().abs() <= f64::EPSILON {
        return;
    }
    let target = ctx.subregion.local;
    let (iw, ih) = (f64::from(img.width), f64::from(img.height));
    let fitted = fit_rect(target, iw, ih, p.aspect);
    if fitted.width() <= 0.0 || fitted.height() <= 0.0 {
        return;
    }

    let inverse = ctx.transform.inverse();
    let clip = ctx.subregion.clip.intersect(out.clip());
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let pt = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            // Slice overflows the target; meet leaves letterbox bands.
            if pt.x < target.x0 || pt.x >= target.x1 || pt.y < target.y0 || pt.y >= target.y1 {
                continue;
            }
            if pt.x < fitted.x0 || pt.x >= fitted.x1 || pt.y < fitted.y0 || pt.y >= fitted.y1 {
                continue;
            }
            let u = (pt.x - fitted.x0) / fitted.width() * iw;
            let v = (pt.y - fitted.y0) / fitted.height() * ih;
            out.set_pixel(x, y, sample(img, u, v, p.resample, ctx.color_space));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/image.rs"]
mod tests;
