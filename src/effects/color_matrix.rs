use crate::{
    foundation::{error::FilterResult, math::u8_to_unit},
    graph::node::ColorMatrixMode,
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::{decode_srgb, encode_srgb, srgb_u8_to_linear_f32},
    },
};

/// Row-major 4x5 colour matrix; column 4 is the offset.
pub type Matrix4x5 = [[f32; 5]; 4];

pub const IDENTITY: Matrix4x5 = [
    [1.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 1.0, 0.0],
];

/// Luma weights of the saturation matrix.
const SAT_WEIGHTS: [f32; 3] = [0.213, 0.715, 0.072];

/// ITU-R BT.709 luminance weights.
const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// Expand a mode into its matrix.
pub fn matrix_for(mode: &ColorMatrixMode) -> Matrix4x5 {
    match mode {
        ColorMatrixMode::Identity => IDENTITY,
        ColorMatrixMode::Saturate(s) => saturate(*s),
        ColorMatrixMode::HueRotate(deg) => hue_rotate(*deg),
        ColorMatrixMode::Brightness(b) => {
            let mut m = IDENTITY;
            for row in m.iter_mut().take(3) {
                row[4] = *b;
            }
            m
        }
        ColorMatrixMode::Contrast(c) => {
            let mut m = IDENTITY;
            for (i, row) in m.iter_mut().enumerate().take(3) {
                row[i] = *c;
                row[4] = 0.5 * (1.0 - c);
            }
            m
        }
        ColorMatrixMode::LuminanceToAlpha => [
            [0.0; 5],
            [0.0; 5],
            [0.0; 5],
            [
                LUMA_WEIGHTS[0] as f32,
                LUMA_WEIGHTS[1] as f32,
                LUMA_WEIGHTS[2] as f32,
                0.0,
                0.0,
            ],
        ],
        ColorMatrixMode::Colourise { color, amount } => {
            let tint = [
                decode_srgb(u8_to_unit(color.r)),
                decode_srgb(u8_to_unit(color.g)),
                decode_srgb(u8_to_unit(color.b)),
            ];
            let mut m = IDENTITY;
            for (c, row) in m.iter_mut().enumerate().take(3) {
                for (k, w) in LUMA_WEIGHTS.iter().enumerate() {
                    let ident = if c == k { 1.0 } else { 0.0 };
                    row[k] = (1.0 - amount) * ident + amount * tint[c] * (*w as f32);
                }
            }
            m
        }
        ColorMatrixMode::Matrix(v) => {
            let mut m = [[0.0; 5]; 4];
            for (i, row) in m.iter_mut().enumerate() {
                row.copy_from_slice(&v[i * 5..i * 5 + 5]);
            }
            m
        }
    }
}

fn saturate(s: f32) -> Matrix4x5 {
    let [wr, wg, wb] = SAT_WEIGHTS;
    [
        [wr + (1.0 - wr) * s, wg - wg * s, wb - wb * s, 0.0, 0.0],
        [wr - wr * s, wg + (1.0 - wg) * s, wb - wb * s, 0.0, 0.0],
        [wr - wr * s, wg - wg * s, wb + (1.0 - wb) * s, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 0.0],
    ]
}

type M3 = [[f64; 3]; 3];

fn mul3(a: &M3, b: &M3) -> M3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn apply3(m: &M3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn rot_x(s: f64, c: f64) -> M3 {
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

fn rot_y(s: f64, c: f64) -> M3 {
    [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
}

fn rot_z(s: f64, c: f64) -> M3 {
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

fn shear_z(dx: f64, dy: f64) -> M3 {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [dx, dy, 1.0]]
}

/// Hue rotation that keeps luminance constant.
///
/// The grey axis is rotated onto Z, space is sheared so the luminance plane is horizontal,
/// the rotation happens around Z, and the shear and axis rotations are undone.
fn hue_rotate(degrees: f32) -> Matrix4x5 {
    let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
    let (ys, yc) = (-1.0 / 3f64.sqrt(), (2.0f64 / 3.0).sqrt());

    let to_z = mul3(&rot_y(ys, yc), &rot_x(inv_sqrt2, inv_sqrt2));
    let from_z = mul3(&rot_x(-inv_sqrt2, inv_sqrt2), &rot_y(-ys, yc));

    // Luminance weights seen from the rotated frame.
    let l = apply3(&to_z, LUMA_WEIGHTS);
    let (zsx, zsy) = (l[0] / l[2], l[1] / l[2]);

    let (s, c) = f64::from(degrees).to_radians().sin_cos();
    let m = mul3(&shear_z(zsx, zsy), &to_z);
    let m = mul3(&rot_z(s, c), &m);
    let m = mul3(&shear_z(-zsx, -zsy), &m);
    let m = mul3(&from_z, &m);

    let mut out = IDENTITY;
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m[i][j] as f32;
        }
    }
    out
}

/// Transform `input` through the mode's matrix into `out` with straight alpha.
///
/// The arithmetic runs in `space` on float channels; the result is re-encoded into the input's
/// colour space, so no intermediate is quantised to 8-bit linear light.
pub(crate) fn apply(
    mode: &ColorMatrixMode,
    space: ColorSpace,
    input: &PixelBuffer,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let m = matrix_for(mode);
    let clip = out.clip().intersect(input.clip());
    let stored = input.color_space();
    let premultiplied = input.is_premultiplied();

    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let mut px = input.pixel(x, y);
            if premultiplied {
                px = demultiplied(px);
            }
            let v = [
                to_working(px[0], stored, space),
                to_working(px[1], stored, space),
                to_working(px[2], stored, space),
                u8_to_unit(px[3]),
            ];

            let mut res = [0u8; 4];
            for (c, row) in m.iter().enumerate() {
                let mut acc = row[4];
                for k in 0..4 {
                    acc += v[k] * row[k];
                }
                let acc = acc.clamp(0.0, 1.0);
                let acc = if c < 3 { from_working(acc, space, stored) } else { acc };
                res[c] = (acc * 255.0).round().clamp(0.0, 255.0) as u8;
            }
            out.set_pixel(x, y, res);
        }
    }
    out.set_color_space(stored);
    out.set_premultiplied(false);
    Ok(())
}

fn to_working(v: u8, stored: ColorSpace, space: ColorSpace) -> f32 {
    match (stored, space) {
        (ColorSpace::Srgb, ColorSpace::LinearRgb) => srgb_u8_to_linear_f32(v),
        (ColorSpace::LinearRgb, ColorSpace::Srgb) => encode_srgb(u8_to_unit(v)),
        _ => u8_to_unit(v),
    }
}

fn from_working(v: f32, space: ColorSpace, stored: ColorSpace) -> f32 {
    match (space, stored) {
        (ColorSpace::LinearRgb, ColorSpace::Srgb) => encode_srgb(v),
        (ColorSpace::Srgb, ColorSpace::LinearRgb) => decode_srgb(v),
        _ => v,
    }
}

fn demultiplied(px: [u8; 4]) -> [u8; 4] {
    use crate::pixel::buffer::demultiply_channel;
    [
        demultiply_channel(px[0], px[3]),
        demultiply_channel(px[1], px[3]),
        demultiply_channel(px[2], px[3]),
        px[3],
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/effects/color_matrix.rs"]
mod tests;
