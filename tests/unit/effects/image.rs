use super::*;

use crate::{
    effects::test_context,
    foundation::core::ClipRect,
    render::{options::FilterOptions, region::ResolvedRegion},
};

fn checker() -> RasterImage {
    // 2x2: red, green / blue, white, all opaque.
    RasterImage::new(
        2,
        2,
        vec![
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ],
    )
    .unwrap()
}

fn aspect(align: Align, fit: MeetOrSlice) -> AspectRatio {
    AspectRatio { align, fit }
}

#[test]
fn meet_letterboxes_and_slice_overflows() {
    let target = Rect::new(0.0, 0.0, 100.0, 50.0);
    let meet = fit_rect(target, 10.0, 10.0, aspect(Align::XMidYMid, MeetOrSlice::Meet));
    assert_eq!(meet, Rect::new(25.0, 0.0, 75.0, 50.0));

    let min = fit_rect(target, 10.0, 10.0, aspect(Align::XMinYMin, MeetOrSlice::Meet));
    assert_eq!(min, Rect::new(0.0, 0.0, 50.0, 50.0));

    let max = fit_rect(target, 10.0, 10.0, aspect(Align::XMaxYMax, MeetOrSlice::Meet));
    assert_eq!(max, Rect::new(50.0, 0.0, 100.0, 50.0));

    let slice = fit_rect(target, 10.0, 10.0, aspect(Align::XMidYMid, MeetOrSlice::Slice));
    assert_eq!(slice, Rect::new(0.0, -25.0, 100.0, 75.0));

    let stretch = fit_rect(target, 10.0, 10.0, aspect(Align::None, MeetOrSlice::Meet));
    assert_eq!(stretch, target);
}

#[test]
fn kernels_are_interpolating_and_bounded() {
    for kind in [
        Resample::Bilinear,
        Resample::Bicubic,
        Resample::Lanczos3,
        Resample::Blackman,
        Resample::Hann,
    ] {
        assert!((kernel_weight(kind, 0.0) - 1.0).abs() < 1e-9, "{kind:?}");
        assert!(kernel_weight(kind, 1.0).abs() < 1e-9, "{kind:?}");
        assert_eq!(kernel_weight(kind, 3.0), 0.0, "{kind:?}");
        assert_eq!(
            kernel_weight(kind, 0.4),
            kernel_weight(kind, -0.4),
            "{kind:?} is not symmetric"
        );
    }
    assert_eq!(kernel_weight(Resample::Bilinear, 0.25), 0.75);
    assert_eq!(kernel_weight(Resample::Nearest, 0.6), 0.0);
}

#[test]
fn sampling_at_texel_centres_returns_the_texel() {
    let img = checker();
    for kind in [Resample::Nearest, Resample::Bilinear, Resample::Bicubic] {
        assert_eq!(sample(&img, 0.5, 0.5, kind, ColorSpace::Srgb), [255, 0, 0, 255]);
        assert_eq!(sample(&img, 1.5, 1.5, kind, ColorSpace::Srgb), [255, 255, 255, 255]);
    }
}

#[test]
fn bilinear_blends_neighbours_and_keeps_colour_under_alpha() {
    let img = RasterImage::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 0]).unwrap();
    let px = sample(&img, 1.0, 0.5, Resample::Bilinear, ColorSpace::Srgb);
    // Halfway between opaque red and transparent: premultiplied, so no blue bleeds in.
    assert_eq!(px, [128, 0, 0, 128]);
}

#[test]
fn apply_draws_into_the_fitted_rect() {
    let options = FilterOptions::default();
    let target = ResolvedRegion {
        local: Rect::new(0.0, 0.0, 8.0, 4.0),
        clip: ClipRect::new(0, 0, 8, 4),
    };
    let ctx = EffectContext {
        subregion: target,
        ..test_context(&options, 8, 4)
    };
    let p = ImageParams {
        image: checker(),
        aspect: AspectRatio::default(),
        resample: Resample::Nearest,
    };
    let mut out = PixelBuffer::new(8, 4).unwrap();
    apply(&p, &ctx, &mut out);

    assert!(out.is_premultiplied());
    // 4x4 image area centred horizontally: columns 2..6.
    assert_eq!(out.pixel(1, 1), [0; 4]);
    assert_eq!(out.pixel(6, 1), [0; 4]);
    assert_eq!(out.pixel(2, 0), [255, 0, 0, 255]);
    assert_eq!(out.pixel(5, 0), [0, 255, 0, 255]);
    assert_eq!(out.pixel(2, 3), [0, 0, 255, 255]);
    assert_eq!(out.pixel(5, 3), [255, 255, 255, 255]);
}

#[test]
fn empty_image_draws_nothing() {
    let options = FilterOptions::default();
    let ctx = test_context(&options, 4, 4);
    let p = ImageParams {
        image: RasterImage::new(0, 0, Vec::new()).unwrap(),
        aspect: AspectRatio::default(),
        resample: Resample::Bilinear,
    };
    let mut out = PixelBuffer::new(4, 4).unwrap();
    apply(&p, &ctx, &mut out);
    assert!(out.data().iter().all(|&v| v == 0));
}
