//! filterfx is a CPU filter-effects engine for vector graphics.
//!
//! A filter is an ordered graph of effect nodes (blur, colour matrix, compositing, blending,
//! convolution, morphology, turbulence, flood, offset, image, merge). Each node reads the
//! filter-free rendering of the client geometry, a background snapshot, or the output of an
//! earlier node, and writes a new raster. The API is pass-oriented:
//!
//! - Describe the filter with [`FilterGraph::builder`] or a JSON [`FilterDesc`]
//! - Wrap the built graph in a [`Filter`]
//! - Call [`Filter::render`] once per frame with a [`ClientGeometry`]
#![forbid(unsafe_code)]

mod effects;
mod foundation;
mod graph;
mod pixel;
mod render;

pub use crate::foundation::core::{
    Affine, ClipRect, Point, Rect, Rgba8, Vec2, Viewport, axis_scales, diagonal_scale,
};
pub use crate::foundation::error::{FilterError, FilterResult};
pub use crate::foundation::math::name_hash;

pub use crate::graph::build::GraphBuilder;
pub use crate::graph::desc::{ColorMatrixKind, CompositeOperator, EffectDesc, FilterDesc, NodeDesc};
pub use crate::graph::node::{
    Align, AspectRatio, BlendMode, BlurParams, ColorMatrixMode, CompositeOp, ConvolveParams,
    EdgeMode, Effect, EffectNode, FloodParams, ImageParams, Input, MeetOrSlice, MorphologyOp,
    MorphologyParams, NodeId, NoiseKind, OffsetParams, Resample, SourceSelector,
    TurbulenceParams,
};
pub use crate::graph::{DroppedNode, FilterGraph};

pub use crate::effects::color_matrix::matrix_for;
pub use crate::pixel::buffer::{ChannelOffsets, ColorSpace, PixelBuffer};
pub use crate::pixel::colorspace::{decode_srgb, encode_srgb};
pub use crate::pixel::raster::RasterImage;

pub use crate::render::bank::{BankSlot, DEFAULT_BANK_CAPACITY, ImageBank, ImageBankStats};
pub use crate::render::geometry::{ClientGeometry, RasterGeometry};
pub use crate::render::options::{DEFAULT_MAX_KERNEL_PIXELS, FilterOptions, MAX_NOISE_WORKERS};
pub use crate::render::pipeline::{Filter, RenderOutcome, SkipReason, render_filter};
pub use crate::render::region::{
    Dimension, FilterUnits, RegionInput, RegionSpec, ResolvedRegion, Subregion, filter_region,
    primitive_subregion,
};
