//! Perlin turbulence and fractal noise.
//!
//! Lattice and gradient tables are seeded from a Park-Miller generator so a given seed produces
//! the same image on every platform. Rows are synthesized on a bounded rayon pool, each worker
//! owning a contiguous range of rows.

use rayon::prelude::*;

use crate::{
    foundation::{
        core::{Affine, ClipRect, Point, Rect},
        error::{FilterError, FilterResult},
    },
    graph::node::{NoiseKind, TurbulenceParams},
    pixel::buffer::{ChannelOffsets, PixelBuffer},
};

use super::EffectContext;

const RAND_M: i64 = 2_147_483_647; // 2^31 - 1
const RAND_A: i64 = 16_807;
const RAND_Q: i64 = 127_773; // M / A
const RAND_R: i64 = 2_836; // M % A

const BSIZE: usize = 0x100;
const BM: usize = 0xff;
const PERLIN_N: f64 = 4096.0;
const TABLE_LEN: usize = BSIZE + BSIZE + 2;
/// Octaves past this weigh less than 2^-32 and cannot move an 8-bit channel.
pub(crate) const SIGNIFICANT_OCTAVES: u32 = 32;

fn setup_seed(mut seed: i64) -> i64 {
    if seed <= 0 {
        seed = -(seed % (RAND_M - 1)) + 1;
    }
    if seed > RAND_M - 1 {
        seed = RAND_M - 1;
    }
    seed
}

fn random(seed: i64) -> i64 {
    let mut r = RAND_A * (seed % RAND_Q) - RAND_R * (seed / RAND_Q);
    if r <= 0 {
        r += RAND_M;
    }
    r
}

/// Permutation and per-channel gradient tables, mirrored for wraparound.
#[derive(Clone, Debug)]
pub(crate) struct NoiseTables {
    lattice: [usize; TABLE_LEN],
    gradient: [[[f64; 2]; TABLE_LEN]; 4],
}

impl NoiseTables {
    pub fn new(seed: i32) -> Box<Self> {
        let mut t = Box::new(Self {
            lattice: [0; TABLE_LEN],
            gradient: [[[0.0; 2]; TABLE_LEN]; 4],
        });
        let mut seed = setup_seed(i64::from(seed));
        for k in 0..4 {
            for i in 0..BSIZE {
                t.lattice[i] = i;
                for j in 0..2 {
                    seed = random(seed);
                    t.gradient[k][i][j] =
                        ((seed % (2 * BSIZE as i64)) - BSIZE as i64) as f64 / BSIZE as f64;
                }
                let g = t.gradient[k][i];
                let s = (g[0] * g[0] + g[1] * g[1]).sqrt();
                if s > 0.0 {
                    t.gradient[k][i] = [g[0] / s, g[1] / s];
                }
            }
        }
        for i in (1..BSIZE).rev() {
            seed = random(seed);
            let j = (seed % BSIZE as i64) as usize;
            t.lattice.swap(i, j);
        }
        for i in 0..BSIZE + 2 {
            t.lattice[BSIZE + i] = t.lattice[i];
            for k in 0..4 {
                t.gradient[k][BSIZE + i] = t.gradient[k][i];
            }
        }
        t
    }
}

/// Lattice wrap state used when stitching tiles.
#[derive(Clone, Copy, Debug, Default)]
struct Stitch {
    width: i64,
    height: i64,
    wrap_x: i64,
    wrap_y: i64,
}

#[inline]
fn s_curve(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

fn noise2(t: &NoiseTables, channel: usize, vx: f64, vy: f64, stitch: Option<&Stitch>) -> f64 {
    let tx = vx + PERLIN_N;
    let mut bx0 = tx as i64;
    let rx0 = tx - bx0 as f64;
    let rx1 = rx0 - 1.0;
    let mut bx1 = bx0.wrapping_add(1);

    let ty = vy + PERLIN_N;
    let mut by0 = ty as i64;
    let ry0 = ty - by0 as f64;
    let ry1 = ry0 - 1.0;
    let mut by1 = by0.wrapping_add(1);

    // Wrap before masking so lattice points past the tile edge fold back onto it. Only the
    // low byte survives the mask, so wrapping arithmetic keeps the lattice index exact.
    if let Some(s) = stitch {
        if bx0 >= s.wrap_x {
            bx0 = bx0.wrapping_sub(s.width);
        }
        if bx1 >= s.wrap_x {
            bx1 = bx1.wrapping_sub(s.width);
        }
        if by0 >= s.wrap_y {
            by0 = by0.wrapping_sub(s.height);
        }
        if by1 >= s.wrap_y {
            by1 = by1.wrapping_sub(s.height);
        }
    }

    let m = BM as i64;
    let (bx0, bx1, by0, by1) = (
        (bx0 & m) as usize,
        (bx1 & m) as usize,
        (by0 & m) as usize,
        (by1 & m) as usize,
    );

    let i = t.lattice[bx0];
    let j = t.lattice[bx1];
    let b00 = t.lattice[i + by0];
    let b10 = t.lattice[j + by0];
    let b01 = t.lattice[i + by1];
    let b11 = t.lattice[j + by1];

    let sx = s_curve(rx0);
    let sy = s_curve(ry0);
    let g = &t.gradient[channel];

    let u = rx0 * g[b00][0] + ry0 * g[b00][1];
    let v = rx1 * g[b10][0] + ry0 * g[b10][1];
    let a = lerp(sx, u, v);
    let u = rx0 * g[b01][0] + ry1 * g[b01][1];
    let v = rx1 * g[b11][0] + ry1 * g[b11][1];
    let b = lerp(sx, u, v);
    lerp(sy, a, b)
}

/// Octave sum for one channel at user-space `point`. `tile` is the stitching tile.
fn turbulence(
    t: &NoiseTables,
    channel: usize,
    point: (f64, f64),
    p: &TurbulenceParams,
    tile: Rect,
) -> f64 {
    let mut fx = p.base_freq_x;
    let mut fy = p.base_freq_y;
    let mut stitch = None;

    if p.stitch {
        let (tw, th) = (tile.width(), tile.height());
        if fx != 0.0 && tw > 0.0 {
            let lo = (tw * fx).floor() / tw;
            let hi = (tw * fx).ceil() / tw;
            fx = if lo > 0.0 && fx / lo < hi / fx { lo } else { hi };
        }
        if fy != 0.0 && th > 0.0 {
            let lo = (th * fy).floor() / th;
            let hi = (th * fy).ceil() / th;
            fy = if lo > 0.0 && fy / lo < hi / fy { lo } else { hi };
        }
        let width = (tw * fx + 0.5) as i64;
        let height = (th * fy + 0.5) as i64;
        stitch = Some(Stitch {
            width,
            height,
            wrap_x: ((tile.x0 * fx + PERLIN_N) as i64).saturating_add(width),
            wrap_y: ((tile.y0 * fy + PERLIN_N) as i64).saturating_add(height),
        });
    }

    let mut sum = 0.0;
    let mut vx = point.0 * fx;
    let mut vy = point.1 * fy;
    let mut ratio = 1.0;
    for _ in 0..p.octaves.min(SIGNIFICANT_OCTAVES) {
        let n = noise2(t, channel, vx, vy, stitch.as_ref());
        sum += match p.kind {
            NoiseKind::FractalNoise => n / ratio,
            NoiseKind::Turbulence => n.abs() / ratio,
        };
        vx *= 2.0;
        vy *= 2.0;
        ratio *= 2.0;
        if let Some(s) = stitch.as_mut() {
            s.width = s.width.saturating_mul(2);
            s.wrap_x = s.wrap_x.saturating_mul(2).saturating_sub(PERLIN_N as i64);
            s.height = s.height.saturating_mul(2);
            s.wrap_y = s.wrap_y.saturating_mul(2).saturating_sub(PERLIN_N as i64);
        }
    }
    sum
}

/// Straight RGBA noise sample at user-space `point`.
pub(crate) fn sample(
    t: &NoiseTables,
    p: &TurbulenceParams,
    tile: Rect,
    point: (f64, f64),
) -> [u8; 4] {
    let mut px = [0u8; 4];
    for (ch, v) in px.iter_mut().enumerate() {
        let n = turbulence(t, ch, point, p, tile);
        let n = match p.kind {
            NoiseKind::FractalNoise => (n * 255.0 + 255.0) / 2.0,
            NoiseKind::Turbulence => n * 255.0,
        };
        *v = n.clamp(0.0, 255.0) as u8;
    }
    px
}

#[derive(Clone, Debug, PartialEq)]
struct NoiseKey {
    params: TurbulenceParams,
    width: u32,
    height: u32,
    clip: ClipRect,
    tile: Rect,
    transform: Affine,
}

/// Long-lived noise buffer for one turbulence node, regenerated only when its inputs change.
#[derive(Debug, Default)]
pub(crate) struct NoiseCache {
    key: Option<NoiseKey>,
    tables: Option<(i32, Box<NoiseTables>)>,
    buffer: PixelBuffer,
    generations: u64,
}

impl NoiseCache {
    /// Force regeneration on the next pass.
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// Times the noise has been synthesized.
    pub fn generations(&self) -> u64 {
        self.generations
    }
}

/// Fill the node's subregion of `out` with straight noise in the working colour space.
pub(crate) fn apply(
    p: &TurbulenceParams,
    ctx: &EffectContext<'_>,
    cache: &mut NoiseCache,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = ctx.subregion.clip.intersect(out.clip());
    let key = NoiseKey {
        params: *p,
        width: out.width(),
        height: out.height(),
        clip,
        tile: ctx.subregion.local,
        transform: ctx.transform,
    };

    if cache.key.as_ref() != Some(&key) {
        let tables = match cache.tables.take() {
            Some((seed, t)) if seed == p.seed => t,
            _ => NoiseTables::new(p.seed),
        };
        cache.buffer.resize(out.width(), out.height())?;
        cache.buffer.clear_transparent();
        let result = synthesize(&tables, p, &key, ctx.pool, &mut cache.buffer);
        cache.tables = Some((p.seed, tables));
        result?;
        cache.key = Some(key);
        cache.generations += 1;
        tracing::trace!(
            generation = cache.generations,
            width = clip.width(),
            height = clip.height(),
            "turbulence synthesized"
        );
    }

    // Pixels outside the subregion may hold earlier output of a shared canvas.
    out.ensure_premultiplied(false);
    out.copy_rect_from(&cache.buffer, clip);
    out.set_color_space(ctx.color_space);
    Ok(())
}

fn synthesize(
    tables: &NoiseTables,
    p: &TurbulenceParams,
    key: &NoiseKey,
    pool: Option<&rayon::ThreadPool>,
    buf: &mut PixelBuffer,
) -> FilterResult<()> {
    let clip = key.clip;
    if clip.is_empty() {
        return Ok(());
    }
    let inverse = if key.transform.determinant().abs() > f64::EPSILON {
        key.transform.inverse()
    } else {
        return Err(FilterError::unsupported("turbulence under a singular transform"));
    };

    let stride = buf.stride();
    let ch = buf.channels();
    let rows = clip.height() as usize;
    let workers = pool.map_or(1, |p| p.current_num_threads()).max(1);
    let rows_per_chunk = rows.div_ceil(workers).max(1);

    let start = clip.top as usize * stride;
    let end = clip.bottom as usize * stride;
    let region = &mut buf.data_mut()[start..end];

    let fill = |(chunk_idx, chunk): (usize, &mut [u8])| {
        for (ri, row) in chunk.chunks_exact_mut(stride).enumerate() {
            let y = clip.top + (chunk_idx * rows_per_chunk + ri) as i32;
            for x in clip.left..clip.right {
                let pt = inverse * Point::new(f64::from(x), f64::from(y));
                let px = sample(tables, p, key.tile, (pt.x, pt.y));
                write_px(row, x as usize, ch, px);
            }
        }
    };

    match pool {
        Some(pool) => pool.install(|| {
            region
                .par_chunks_mut(rows_per_chunk * stride)
                .enumerate()
                .for_each(fill)
        }),
        None => region
            .chunks_mut(rows_per_chunk * stride)
            .enumerate()
            .for_each(fill),
    }
    Ok(())
}

#[inline]
fn write_px(row: &mut [u8], x: usize, ch: ChannelOffsets, px: [u8; 4]) {
    let o = x * 4;
    row[o + ch.r] = px[0];
    row[o + ch.g] = px[1];
    row[o + ch.b] = px[2];
    row[o + ch.a] = px[3];
}

/// Build the worker pool used for noise synthesis.
pub(crate) fn build_thread_pool(threads: usize) -> FilterResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("filterfx-noise-{i}"))
        .build()
        .map_err(|e| FilterError::resource(format!("failed to build noise thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/effects/turbulence.rs"]
mod tests;
