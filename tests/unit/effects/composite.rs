use super::*;

use crate::{
    foundation::core::ClipRect,
    graph::node::BlendMode,
    pixel::buffer::ColorSpace,
};

const HALF_RED: [u8; 4] = [128, 0, 0, 128];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn px(op: CompositeOp, s: [u8; 4], d: [u8; 4]) -> [u8; 4] {
    composite_px(&op, PremulF::from_u8(s), PremulF::from_u8(d)).to_u8()
}

#[test]
fn porter_duff_operators() {
    assert_eq!(px(CompositeOp::Over, HALF_RED, BLUE), [128, 0, 127, 255]);
    assert_eq!(px(CompositeOp::In, HALF_RED, BLUE), HALF_RED);
    assert_eq!(px(CompositeOp::In, HALF_RED, [0; 4]), [0; 4]);
    assert_eq!(px(CompositeOp::Out, HALF_RED, BLUE), [0; 4]);
    assert_eq!(px(CompositeOp::Out, HALF_RED, [0; 4]), HALF_RED);
    assert_eq!(px(CompositeOp::Atop, HALF_RED, BLUE), [128, 0, 127, 255]);
    assert_eq!(px(CompositeOp::Xor, BLUE, BLUE), [0; 4]);
}

#[test]
fn arithmetic_clamps_and_keeps_colour_below_alpha() {
    let add = CompositeOp::Arithmetic {
        k1: 0.0,
        k2: 1.0,
        k3: 1.0,
        k4: 0.0,
    };
    assert_eq!(px(add, BLUE, BLUE), BLUE);

    let offset = CompositeOp::Arithmetic {
        k1: 0.0,
        k2: 0.0,
        k3: 0.0,
        k4: 0.5,
    };
    assert_eq!(px(offset, [0; 4], [0; 4]), [128, 128, 128, 128]);

    let shrink = CompositeOp::Arithmetic {
        k1: 0.0,
        k2: 1.0,
        k3: 0.0,
        k4: -0.6,
    };
    // Alpha drops to zero, so colour is clamped with it.
    assert_eq!(px(shrink, HALF_RED, [0; 4]), [0; 4]);
}

#[test]
fn blend_operator_routes_through_blend_modes() {
    let out = px(
        CompositeOp::Blend(BlendMode::Multiply),
        [255, 255, 255, 255],
        BLUE,
    );
    assert_eq!(out, BLUE);
}

#[test]
fn apply_writes_only_inside_the_input_clip() {
    let mut input = PixelBuffer::new(4, 4).unwrap();
    input.fill_rect(ClipRect::from_size(4, 4), HALF_RED);
    input.set_clip(ClipRect::new(0, 0, 2, 4));
    input.set_color_space(ColorSpace::LinearRgb);
    let mut mix = PixelBuffer::new(4, 4).unwrap();
    mix.fill_rect(ClipRect::from_size(4, 4), BLUE);

    let mut out = PixelBuffer::new(4, 4).unwrap();
    apply(&CompositeOp::Over, Some(&input), Some(&mix), &mut out).unwrap();
    assert_eq!(out.pixel(0, 0), [128, 0, 127, 255]);
    assert_eq!(out.pixel(3, 0), [0; 4]);
    assert!(out.is_premultiplied());
    assert_eq!(out.color_space(), ColorSpace::LinearRgb);
}

#[test]
fn missing_mix_reads_as_transparent() {
    let mut input = PixelBuffer::new(2, 2).unwrap();
    input.fill_rect(ClipRect::from_size(2, 2), HALF_RED);
    let mut out = PixelBuffer::new(2, 2).unwrap();
    apply(&CompositeOp::Over, Some(&input), None, &mut out).unwrap();
    assert_eq!(out.pixel(1, 1), HALF_RED);
}
