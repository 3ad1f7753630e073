use super::*;

use crate::{
    effects::test_context,
    pixel::buffer::ColorSpace,
    render::options::FilterOptions,
};

fn params(kind: NoiseKind) -> TurbulenceParams {
    TurbulenceParams {
        base_freq_x: 0.05,
        base_freq_y: 0.05,
        octaves: 3,
        seed: 7,
        stitch: false,
        kind,
    }
}

#[test]
fn seeds_are_folded_into_the_generator_range() {
    assert_eq!(setup_seed(0), 1);
    assert_eq!(setup_seed(-5), 6);
    assert_eq!(setup_seed(42), 42);
    assert_eq!(setup_seed(i64::MAX), RAND_M - 1);
    assert_eq!(random(1), RAND_A);
}

#[test]
fn tables_are_deterministic_per_seed() {
    let a = NoiseTables::new(3);
    let b = NoiseTables::new(3);
    let c = NoiseTables::new(4);
    assert_eq!(a.lattice, b.lattice);
    assert_eq!(a.gradient, b.gradient);
    assert_ne!(a.gradient, c.gradient);

    for g in &a.gradient[0][..BSIZE] {
        let len = (g[0] * g[0] + g[1] * g[1]).sqrt();
        assert!(len == 0.0 || (len - 1.0).abs() < 1e-9);
    }
    // Mirrored tail.
    assert_eq!(a.lattice[BSIZE + 5], a.lattice[5]);
}

#[test]
fn lattice_points_are_zero_noise() {
    let t = NoiseTables::new(1);
    let tile = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(
        sample(&t, &params(NoiseKind::FractalNoise), tile, (0.0, 0.0)),
        [127; 4]
    );
    assert_eq!(
        sample(&t, &params(NoiseKind::Turbulence), tile, (0.0, 0.0)),
        [0; 4]
    );
}

#[test]
fn stitched_noise_repeats_across_the_tile() {
    let t = NoiseTables::new(11);
    let p = TurbulenceParams {
        base_freq_x: 1.0 / 16.0,
        base_freq_y: 1.0 / 16.0,
        stitch: true,
        ..params(NoiseKind::FractalNoise)
    };
    let tile = Rect::new(0.0, 0.0, 64.0, 64.0);
    for y in [5.3, 20.9, 41.1] {
        let left = sample(&t, &p, tile, (3.7, y));
        let right = sample(&t, &p, tile, (67.7, y));
        for c in 0..4 {
            assert!(left[c].abs_diff(right[c]) <= 1, "{left:?} vs {right:?}");
        }
    }
}

#[test]
fn cache_regenerates_only_on_change() {
    let options = FilterOptions::default();
    let ctx = test_context(&options, 24, 24);
    let mut cache = NoiseCache::default();
    let mut out = PixelBuffer::new(24, 24).unwrap();

    let p = params(NoiseKind::Turbulence);
    apply(&p, &ctx, &mut cache, &mut out).unwrap();
    let first = out.data().to_vec();
    assert!(!out.is_premultiplied());
    assert_eq!(out.color_space(), ColorSpace::Srgb);

    out.clear_transparent();
    apply(&p, &ctx, &mut cache, &mut out).unwrap();
    assert_eq!(cache.generations(), 1);
    assert_eq!(out.data(), first.as_slice());

    let reseeded = TurbulenceParams { seed: 8, ..p };
    apply(&reseeded, &ctx, &mut cache, &mut out).unwrap();
    assert_eq!(cache.generations(), 2);
    assert_ne!(out.data(), first.as_slice());

    cache.invalidate();
    apply(&reseeded, &ctx, &mut cache, &mut out).unwrap();
    assert_eq!(cache.generations(), 3);
}

#[test]
fn pooled_synthesis_matches_sequential() {
    let options = FilterOptions::default();
    let pool = build_thread_pool(3).unwrap();
    let sequential = test_context(&options, 31, 17);
    let pooled = EffectContext {
        pool: Some(&pool),
        ..test_context(&options, 31, 17)
    };
    let p = params(NoiseKind::FractalNoise);

    let mut a = PixelBuffer::new(31, 17).unwrap();
    apply(&p, &sequential, &mut NoiseCache::default(), &mut a).unwrap();
    let mut b = PixelBuffer::new(31, 17).unwrap();
    apply(&p, &pooled, &mut NoiseCache::default(), &mut b).unwrap();
    assert_eq!(a.data(), b.data());
}

#[test]
fn huge_octave_counts_match_the_significant_prefix() {
    let options = FilterOptions::default();
    let ctx = test_context(&options, 4, 4);
    for stitch in [true, false] {
        let deep = TurbulenceParams {
            octaves: 80,
            stitch,
            ..params(NoiseKind::Turbulence)
        };
        let mut a = PixelBuffer::new(4, 4).unwrap();
        apply(&deep, &ctx, &mut NoiseCache::default(), &mut a).unwrap();

        let capped = TurbulenceParams {
            octaves: SIGNIFICANT_OCTAVES,
            ..deep
        };
        let mut b = PixelBuffer::new(4, 4).unwrap();
        apply(&capped, &ctx, &mut NoiseCache::default(), &mut b).unwrap();
        assert_eq!(a.data(), b.data(), "stitch={stitch}");
    }
}

#[test]
fn saturated_lattice_coordinates_do_not_overflow() {
    let t = NoiseTables::new(5);
    let p = TurbulenceParams {
        base_freq_x: 1e30,
        base_freq_y: 1e30,
        octaves: 4,
        stitch: true,
        ..params(NoiseKind::FractalNoise)
    };
    let tile = Rect::new(0.0, 0.0, 4.0, 4.0);
    let _ = sample(&t, &p, tile, (3.0, 2.0));
}
