use super::*;
use crate::pixel::buffer::PixelBuffer;

#[test]
fn transfer_functions_hit_endpoints() {
    assert_eq!(srgb_to_linear_u8(0), 0);
    assert_eq!(srgb_to_linear_u8(255), 255);
    assert_eq!(linear_to_srgb_u8(0), 0);
    assert_eq!(linear_to_srgb_u8(255), 255);
    // Mid grey in sRGB is roughly 21% linear light.
    assert!((srgb_u8_to_linear_f32(128) - 0.2158).abs() < 1e-3);
}

#[test]
fn float_round_trip_is_exact_for_every_byte() {
    for v in 0..=255u8 {
        let lin = srgb_u8_to_linear_f32(v);
        let back = (encode_srgb(lin) * 255.0).round() as u8;
        assert_eq!(back, v);
    }
}

#[test]
fn convert_buffer_tags_and_keeps_alpha() {
    let mut buf =
        PixelBuffer::from_rgba8(1, 1, vec![128, 255, 0, 200], false, ColorSpace::Srgb).unwrap();
    convert_buffer(&mut buf, ColorSpace::LinearRgb);
    assert_eq!(buf.color_space(), ColorSpace::LinearRgb);
    let px = buf.pixel(0, 0);
    assert_eq!(px[3], 200);
    assert_eq!(px[1], 255);
    assert_eq!(px[2], 0);
    assert!(px[0] < 128);

    convert_buffer(&mut buf, ColorSpace::Srgb);
    assert_eq!(buf.color_space(), ColorSpace::Srgb);
    assert!((i16::from(buf.pixel(0, 0)[0]) - 128).abs() <= 2);
}

#[test]
fn convert_buffer_handles_premultiplied_pixels() {
    let mut buf =
        PixelBuffer::from_rgba8(1, 1, vec![255, 0, 0, 255], true, ColorSpace::LinearRgb).unwrap();
    convert_buffer(&mut buf, ColorSpace::Srgb);
    assert_eq!(buf.pixel(0, 0), [255, 0, 0, 255]);
    assert!(buf.is_premultiplied());
}
