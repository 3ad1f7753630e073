use super::*;

use crate::{
    effects::test_context,
    pixel::buffer::ColorSpace,
    render::{options::FilterOptions, region::FilterUnits},
};

fn left_column() -> PixelBuffer {
    let mut buf = PixelBuffer::new(6, 3).unwrap();
    buf.fill_rect(ClipRect::new(0, 0, 2, 3), [255, 0, 0, 255]);
    buf
}

#[test]
fn shifts_right_and_leaves_a_transparent_strip() {
    let options = FilterOptions::default();
    let ctx = test_context(&options, 6, 3);
    let mut out = PixelBuffer::new(6, 3).unwrap();
    apply(&OffsetParams { dx: 3.0, dy: 0.0 }, &ctx, &left_column(), &mut out);
    assert_eq!(out.pixel(0, 1), [0; 4]);
    assert_eq!(out.pixel(2, 1), [0; 4]);
    assert_eq!(out.pixel(3, 1), [255, 0, 0, 255]);
    assert_eq!(out.pixel(4, 1), [255, 0, 0, 255]);
    assert_eq!(out.pixel(5, 1), [0; 4]);
}

#[test]
fn fractional_offsets_round_to_whole_pixels() {
    let mut dst = PixelBuffer::new(6, 3).unwrap();
    let clip = dst.clip();
    translate(&left_column(), &mut dst, clip, Vec2::new(0.6, -1.4));
    assert_eq!(dst.pixel(1, 0), [255, 0, 0, 255]);
    assert_eq!(dst.pixel(0, 0), [0; 4]);
    assert_eq!(dst.pixel(1, 2), [0; 4]);
}

#[test]
fn source_clip_bounds_what_is_read() {
    let mut src = left_column();
    src.set_clip(ClipRect::new(1, 0, 6, 3));
    src.set_color_space(ColorSpace::LinearRgb);
    src.set_premultiplied(false);
    let mut dst = PixelBuffer::new(6, 3).unwrap();
    let clip = dst.clip();
    translate(&src, &mut dst, clip, Vec2::new(1.0, 0.0));
    assert_eq!(dst.pixel(1, 0), [0; 4]);
    assert_eq!(dst.pixel(2, 0), [255, 0, 0, 255]);
    assert_eq!(dst.color_space(), ColorSpace::LinearRgb);
    assert!(!dst.is_premultiplied());
}

#[test]
fn bounding_box_units_scale_by_the_reference_box() {
    let options = FilterOptions::default();
    let ctx = EffectContext {
        primitive_units: FilterUnits::BoundingBox,
        ..test_context(&options, 6, 3)
    };
    // 0.5 of a 6px wide box.
    let mut out = PixelBuffer::new(6, 3).unwrap();
    apply(&OffsetParams { dx: 0.5, dy: 0.0 }, &ctx, &left_column(), &mut out);
    assert_eq!(out.pixel(3, 0), [255, 0, 0, 255]);
    assert_eq!(out.pixel(2, 0), [0; 4]);
}
