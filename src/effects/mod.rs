//! Effect implementations and their dispatch.
//!
//! Every effect writes into a bank buffer that arrives cleared to transparent, sized to the
//! viewport and clipped to the filter region, and tags it with the alpha state it produced.

pub(crate) mod blend;
pub(crate) mod blur;
pub(crate) mod color_matrix;
pub(crate) mod composite;
pub(crate) mod convolve;
pub(crate) mod flood;
pub(crate) mod image;
pub(crate) mod merge;
pub(crate) mod morphology;
pub(crate) mod offset;
pub(crate) mod turbulence;

use smallvec::SmallVec;

use crate::{
    foundation::{
        core::{Affine, ClipRect, Rect, Vec2, axis_scales, diagonal_scale},
        error::{FilterError, FilterResult},
    },
    graph::node::Effect,
    pixel::buffer::{ColorSpace, PixelBuffer},
    render::{
        options::FilterOptions,
        region::{FilterUnits, ResolvedRegion},
    },
};

/// Per-node parameters that do not live in the node itself.
pub(crate) struct EffectContext<'a> {
    pub transform: Affine,
    pub primitive_units: FilterUnits,
    /// Local reference bounds of the client geometry.
    pub bounds: Rect,
    pub region: ResolvedRegion,
    pub subregion: ResolvedRegion,
    /// Working colour space.
    pub color_space: ColorSpace,
    pub options: &'a FilterOptions,
    pub pool: Option<&'a rayon::ThreadPool>,
}

impl EffectContext<'_> {
    /// Device-pixel lengths of an `(x, y)` pair given in primitive units.
    ///
    /// Bounding-box units scale each axis independently; user space uses the diagonal scale.
    pub fn device_lengths(&self, x: f64, y: f64) -> (f64, f64) {
        match self.primitive_units {
            FilterUnits::BoundingBox => {
                let (sx, sy) = axis_scales(self.transform);
                (
                    x * self.bounds.width() * sx,
                    y * self.bounds.height() * sy,
                )
            }
            FilterUnits::UserSpace => {
                let s = diagonal_scale(self.transform);
                (x * s, y * s)
            }
        }
    }

    /// Device-space displacement of a primitive-unit vector.
    pub fn device_vector(&self, dx: f64, dy: f64) -> Vec2 {
        let (dx, dy) = match self.primitive_units {
            FilterUnits::BoundingBox => (dx * self.bounds.width(), dy * self.bounds.height()),
            FilterUnits::UserSpace => (dx, dy),
        };
        let [a, b, c, d, _, _] = self.transform.as_coeffs();
        Vec2::new(a * dx + c * dy, b * dx + d * dy)
    }

    /// Reject canvases above the configured pixel ceiling.
    pub fn check_canvas(&self, what: &str, clip: ClipRect) -> FilterResult<()> {
        if clip.area() > self.options.max_kernel_pixels {
            return Err(FilterError::resource(format!(
                "{what} canvas of {}x{} exceeds {} pixels",
                clip.width(),
                clip.height(),
                self.options.max_kernel_pixels
            )));
        }
        Ok(())
    }
}

/// Buffers an effect reads. `None` means the input was ignored and reads as transparent.
#[derive(Default)]
pub(crate) struct EffectInputs<'a> {
    pub input: Option<&'a PixelBuffer>,
    pub mix: Option<&'a PixelBuffer>,
    pub merge: SmallVec<[Option<&'a PixelBuffer>; 4]>,
}

/// State an effect keeps across passes.
#[derive(Debug, Default)]
pub(crate) struct NodeCache {
    pub noise: Option<turbulence::NoiseCache>,
}

impl NodeCache {
    pub fn clear(&mut self) {
        self.noise = None;
    }
}

pub(crate) fn apply(
    effect: &Effect,
    ctx: &EffectContext<'_>,
    inputs: &EffectInputs<'_>,
    cache: &mut NodeCache,
    out: &mut PixelBuffer,
) -> FilterResult<()> {
    match effect {
        Effect::Blur(p) => match inputs.input {
            Some(input) => blur::apply(p, ctx, input, out),
            None => Ok(()),
        },
        Effect::ColorMatrix(mode) => match inputs.input {
            Some(input) => color_matrix::apply(mode, ctx.color_space, input, out),
            None => Ok(()),
        },
        Effect::Composite(op) => composite::apply(op, inputs.input, inputs.mix, out),
        Effect::Convolve(p) => match inputs.input {
            Some(input) => convolve::apply(p, ctx, input, out),
            None => Ok(()),
        },
        Effect::Morphology(p) => match inputs.input {
            Some(input) => morphology::apply(p, ctx, input, out),
            None => Ok(()),
        },
        Effect::Turbulence(p) => turbulence::apply(p, ctx, cache.noise.get_or_insert_default(), out),
        Effect::Flood(p) => {
            flood::apply(p, ctx, out);
            Ok(())
        }
        Effect::Offset(p) => {
            if let Some(input) = inputs.input {
                offset::apply(p, ctx, input, out);
            }
            Ok(())
        }
        Effect::Image(p) => {
            image::apply(p, ctx, out);
            Ok(())
        }
        Effect::Merge(_) => {
            merge::apply(&inputs.merge, out);
            Ok(())
        }
    }
}

/// Copy the pixels of `input` inside `clip` into `out` and adopt its colour state.
pub(crate) fn copy_input(input: &PixelBuffer, out: &mut PixelBuffer, clip: ClipRect) {
    out.copy_rect_from(input, clip);
    out.set_color_space(input.color_space());
    out.set_premultiplied(input.is_premultiplied());
}

/// Logical pixel of an optional buffer; missing buffers and out-of-range reads are transparent.
#[inline]
pub(crate) fn pixel_or_clear(buf: Option<&PixelBuffer>, x: i32, y: i32) -> [u8; 4] {
    buf.map_or([0; 4], |b| b.pixel_or_transparent(x, y))
}

/// Identity-transform user-space context covering a `width` x `height` viewport in sRGB.
#[cfg(test)]
pub(crate) fn test_context(options: &FilterOptions, width: u32, height: u32) -> EffectContext<'_> {
    let clip = ClipRect::from_size(width, height);
    let region = ResolvedRegion {
        local: clip.to_rect(),
        clip,
    };
    EffectContext {
        transform: Affine::IDENTITY,
        primitive_units: FilterUnits::UserSpace,
        bounds: clip.to_rect(),
        region,
        subregion: region,
        color_space: ColorSpace::Srgb,
        options,
        pool: None,
    }
}
