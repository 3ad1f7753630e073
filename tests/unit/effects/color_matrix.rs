use super::*;

use crate::foundation::core::{ClipRect, Rgba8};

fn close(a: &Matrix4x5, b: &Matrix4x5, eps: f32) -> bool {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() <= eps)
}

fn run(mode: ColorMatrixMode, px: [u8; 4], space: ColorSpace) -> [u8; 4] {
    let mut input =
        PixelBuffer::from_rgba8(1, 1, px.to_vec(), false, space).unwrap();
    input.set_clip(ClipRect::from_size(1, 1));
    let mut out = PixelBuffer::new(1, 1).unwrap();
    apply(&mode, ColorSpace::LinearRgb, &input, &mut out).unwrap();
    assert!(!out.is_premultiplied());
    assert_eq!(out.color_space(), space);
    out.pixel(0, 0)
}

#[test]
fn neutral_parameters_expand_to_identity() {
    assert!(close(&matrix_for(&ColorMatrixMode::Saturate(1.0)), &IDENTITY, 1e-6));
    assert!(close(&matrix_for(&ColorMatrixMode::HueRotate(0.0)), &IDENTITY, 1e-5));
    assert!(close(&matrix_for(&ColorMatrixMode::HueRotate(360.0)), &IDENTITY, 1e-4));
    assert!(close(&matrix_for(&ColorMatrixMode::Contrast(1.0)), &IDENTITY, 1e-6));
    assert!(close(&matrix_for(&ColorMatrixMode::Brightness(0.0)), &IDENTITY, 1e-6));
}

#[test]
fn hue_rotation_keeps_greys_grey() {
    for deg in [30.0, 90.0, 180.0, 270.0] {
        let m = matrix_for(&ColorMatrixMode::HueRotate(deg));
        for row in m.iter().take(3) {
            let sum: f32 = row[..3].iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "{deg}: row sums to {sum}");
        }
    }
}

#[test]
fn zero_saturation_produces_equal_rows() {
    let m = matrix_for(&ColorMatrixMode::Saturate(0.0));
    assert_eq!(m[0][..3], m[1][..3]);
    assert_eq!(m[1][..3], m[2][..3]);
}

#[test]
fn raw_matrix_is_row_major() {
    let mut v = [0.0f32; 20];
    v[4] = 0.25;
    v[18] = 1.0;
    let m = matrix_for(&ColorMatrixMode::Matrix(v));
    assert_eq!(m[0][4], 0.25);
    assert_eq!(m[3][3], 1.0);
    assert_eq!(m[1], [0.0; 5]);
}

#[test]
fn identity_round_trips_srgb_pixels() {
    let px = [200, 100, 50, 255];
    let out = run(ColorMatrixMode::Identity, px, ColorSpace::Srgb);
    for c in 0..4 {
        assert!(out[c].abs_diff(px[c]) <= 1, "{out:?} vs {px:?}");
    }
}

#[test]
fn identity_is_exact_for_every_srgb_grey() {
    for v in 0..=255u8 {
        let out = run(ColorMatrixMode::Identity, [v, v, v, 255], ColorSpace::Srgb);
        assert_eq!(out, [v, v, v, 255]);
    }
}

#[test]
fn arithmetic_runs_in_the_requested_space() {
    let mut input =
        PixelBuffer::from_rgba8(1, 1, vec![0, 0, 0, 255], false, ColorSpace::Srgb).unwrap();
    input.set_clip(ClipRect::from_size(1, 1));

    let mut out = PixelBuffer::new(1, 1).unwrap();
    apply(&ColorMatrixMode::Brightness(0.5), ColorSpace::Srgb, &input, &mut out).unwrap();
    assert_eq!(out.pixel(0, 0)[0], 128);

    // Half intensity in linear light encodes to a much lighter sRGB value.
    let mut out = PixelBuffer::new(1, 1).unwrap();
    apply(&ColorMatrixMode::Brightness(0.5), ColorSpace::LinearRgb, &input, &mut out).unwrap();
    let px = out.pixel(0, 0);
    assert!((186..=189).contains(&px[0]), "{px:?}");
    assert_eq!(out.color_space(), ColorSpace::Srgb);
}

#[test]
fn premultiplied_input_is_demultiplied_first() {
    let mut input =
        PixelBuffer::from_rgba8(1, 1, vec![64, 0, 0, 128], true, ColorSpace::LinearRgb).unwrap();
    input.set_clip(ClipRect::from_size(1, 1));
    let mut out = PixelBuffer::new(1, 1).unwrap();
    apply(&ColorMatrixMode::Identity, ColorSpace::LinearRgb, &input, &mut out).unwrap();
    let px = out.pixel(0, 0);
    assert_eq!(px[3], 128);
    assert!(px[0].abs_diff(128) <= 1, "{px:?}");
}

#[test]
fn luminance_moves_into_alpha() {
    let out = run(
        ColorMatrixMode::LuminanceToAlpha,
        [255, 255, 255, 255],
        ColorSpace::LinearRgb,
    );
    assert_eq!(out, [0, 0, 0, 255]);

    let out = run(
        ColorMatrixMode::LuminanceToAlpha,
        [0, 255, 0, 255],
        ColorSpace::LinearRgb,
    );
    assert_eq!(out[3], (0.7154f32 * 255.0).round() as u8);
}

#[test]
fn brightness_adds_and_clamps() {
    let out = run(
        ColorMatrixMode::Brightness(0.5),
        [128, 200, 0, 255],
        ColorSpace::LinearRgb,
    );
    assert_eq!(out[2], 128);
    assert_eq!(out[1], 255);
    assert_eq!(out[3], 255);
}

#[test]
fn full_colourise_tints_by_luminance() {
    let mode = ColorMatrixMode::Colourise {
        color: Rgba8::new(255, 0, 0, 255),
        amount: 1.0,
    };
    let out = run(mode, [255, 255, 255, 255], ColorSpace::LinearRgb);
    assert!(out[0] >= 254, "{out:?}");
    assert_eq!(out[1], 0);
    assert_eq!(out[2], 0);
}
