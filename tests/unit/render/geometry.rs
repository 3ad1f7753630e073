use super::*;

fn dot_image() -> RasterImage {
    // 4x3, one opaque pixel at (2, 1) and one half-transparent at (1, 2).
    let mut data = vec![0u8; 4 * 3 * 4];
    let put = |data: &mut Vec<u8>, x: usize, y: usize, px: [u8; 4]| {
        let o = (y * 4 + x) * 4;
        data[o..o + 4].copy_from_slice(&px);
    };
    put(&mut data, 2, 1, [255, 0, 0, 255]);
    put(&mut data, 1, 2, [0, 0, 255, 128]);
    RasterImage::new(4, 3, data).unwrap()
}

#[test]
fn bounds_cover_non_transparent_pixels() {
    let geom = RasterGeometry::new(&dot_image()).unwrap();
    assert_eq!(geom.bounds(), Some(Rect::new(1.0, 1.0, 3.0, 3.0)));
    assert!(geom.is_visible());
    assert!(geom.pixels().is_premultiplied());
}

#[test]
fn fully_transparent_raster_is_invisible() {
    let img = RasterImage::new(2, 2, vec![0; 16]).unwrap();
    let geom = RasterGeometry::new(&img).unwrap();
    assert_eq!(geom.bounds(), None);
    assert!(!geom.is_visible());
}

#[test]
fn render_places_pixels_at_the_offset() {
    let geom = RasterGeometry::new(&dot_image()).unwrap().at(5, 2);
    assert_eq!(geom.transform(), Affine::translate((5.0, 2.0)));

    let mut target = PixelBuffer::new(10, 10).unwrap();
    geom.render(&mut target).unwrap();
    assert_eq!(target.pixel(7, 3), [255, 0, 0, 255]);
    assert_eq!(target.pixel(6, 4), [0, 0, 128, 128]);
    assert_eq!(target.pixel(2, 1), [0, 0, 0, 0]);
}

#[test]
fn render_clips_to_the_target() {
    let geom = RasterGeometry::new(&dot_image()).unwrap().at(-2, -1);
    let mut target = PixelBuffer::new(2, 2).unwrap();
    geom.render(&mut target).unwrap();
    assert_eq!(target.pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn opaque_bounds_of_an_empty_buffer() {
    let buf = PixelBuffer::new(3, 3).unwrap();
    assert_eq!(opaque_bounds(&buf), None);
}
