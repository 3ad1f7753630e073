use super::*;

use crate::{foundation::core::ClipRect, pixel::buffer::ColorSpace};

fn solid(px: [u8; 4]) -> PixelBuffer {
    let mut buf = PixelBuffer::new(2, 2).unwrap();
    buf.fill_rect(ClipRect::from_size(2, 2), px);
    buf
}

#[test]
fn over_short_circuits_on_extreme_alpha() {
    assert_eq!(over([1, 2, 3, 4], [0; 4]), [1, 2, 3, 4]);
    assert_eq!(over([1, 2, 3, 4], [9, 9, 9, 255]), [9, 9, 9, 255]);
    assert_eq!(over([0, 0, 255, 255], [128, 0, 0, 128]), [128, 0, 127, 255]);
}

#[test]
fn layers_stack_in_order() {
    let bottom = solid([0, 0, 255, 255]);
    let top = solid([128, 0, 0, 128]);
    let mut out = PixelBuffer::new(2, 2).unwrap();
    apply(&[Some(&bottom), Some(&top)], &mut out);
    assert_eq!(out.pixel(1, 1), [128, 0, 127, 255]);

    let mut out = PixelBuffer::new(2, 2).unwrap();
    apply(&[Some(&top), Some(&bottom)], &mut out);
    assert_eq!(out.pixel(1, 1), [0, 0, 255, 255]);
}

#[test]
fn ignored_inputs_are_skipped() {
    let mut layer = solid([10, 20, 30, 255]);
    layer.set_color_space(ColorSpace::LinearRgb);
    let mut out = PixelBuffer::new(2, 2).unwrap();
    apply(&[None, Some(&layer), None], &mut out);
    assert_eq!(out.pixel(0, 0), [10, 20, 30, 255]);
    assert_eq!(out.color_space(), ColorSpace::LinearRgb);

    let mut empty = PixelBuffer::new(2, 2).unwrap();
    apply(&[None, None], &mut empty);
    assert!(empty.data().iter().all(|&v| v == 0));
}
