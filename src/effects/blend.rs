use crate::graph::node::BlendMode;

use super::composite::PremulF;

/// Separable blend function on straight colour: backdrop `cb`, source `cs`.
fn separable(mode: BlendMode, cb: f32, cs: f32) -> f32 {
    match mode {
        BlendMode::Multiply => cb * cs,
        BlendMode::Screen => cb + cs - cb * cs,
        BlendMode::Overlay => hard_light(cs, cb),
        BlendMode::Darken => cb.min(cs),
        BlendMode::Lighten => cb.max(cs),
        BlendMode::Dodge => {
            if cb <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        }
        BlendMode::Burn => {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        }
        BlendMode::HardLight => hard_light(cb, cs),
        BlendMode::SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let d = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (d - cb)
            }
        }
        BlendMode::Difference => (cb - cs).abs(),
        BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
        // Non-separable modes are handled in premultiplied space.
        BlendMode::Plus
        | BlendMode::Minus
        | BlendMode::Invert
        | BlendMode::InvertRgb
        | BlendMode::Contrast => cs,
    }
}

fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        let s2 = 2.0 * cs - 1.0;
        cb + s2 - cb * s2
    }
}

#[inline]
fn straight(c: f32, a: f32) -> f32 {
    if a > 0.0 { (c / a).clamp(0.0, 1.0) } else { 0.0 }
}

/// Blend premultiplied foreground `s` onto premultiplied background `d`.
pub(crate) fn blend_px(mode: BlendMode, s: PremulF, d: PremulF) -> PremulF {
    let union = s.a + d.a - s.a * d.a;
    match mode {
        BlendMode::Plus => {
            let a = (s.a + d.a).min(1.0);
            s.map2(d, a, |sc, dc| (sc + dc).min(a))
        }
        BlendMode::Minus => s.map2(d, union, |sc, dc| (dc - sc).max(0.0)),
        BlendMode::Invert => s.map2(d, union, |_, dc| (d.a - dc) * s.a + dc * (1.0 - s.a)),
        BlendMode::InvertRgb => {
            s.map2(d, union, |sc, dc| (d.a - dc) * sc + dc * (1.0 - s.a))
        }
        BlendMode::Contrast => {
            let half = d.a * 0.5;
            s.map2(d, d.a, |sc, dc| {
                ((dc - half) * ((sc - s.a * 0.5) * 2.0 + 1.0) + half).clamp(0.0, d.a)
            })
        }
        _ => s.map2(d, union, |sc, dc| {
            let b = separable(mode, straight(dc, d.a), straight(sc, s.a));
            sc * (1.0 - d.a) + dc * (1.0 - s.a) + s.a * d.a * b
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
