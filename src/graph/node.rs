use smallvec::SmallVec;

use crate::{
    foundation::core::{Rgba8, Vec2},
    pixel::raster::RasterImage,
    render::region::Subregion,
};

/// Arena index of a node inside its [`crate::FilterGraph`]. References always point at a
/// strictly lower index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where an effect reads one of its inputs from, after the graph has been built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceSelector {
    SourceGraphic,
    SourceAlpha,
    BackgroundImage,
    BackgroundAlpha,
    FillPaint,
    StrokePaint,
    Reference(NodeId),
    /// Continue without an input.
    Ignore,
    /// No input configured.
    None,
}

impl SourceSelector {
    pub fn reference(self) -> Option<NodeId> {
        match self {
            Self::Reference(id) => Some(id),
            _ => None,
        }
    }
}

/// Input selector as written in configuration; named references are resolved by the builder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    SourceGraphic,
    SourceAlpha,
    BackgroundImage,
    BackgroundAlpha,
    FillPaint,
    StrokePaint,
    /// Output of an earlier node, by its case-sensitive result name.
    Result(String),
    /// Output of the node declared immediately before.
    Previous,
    Ignore,
    /// Use the default for the effect (the previous node, or the source graphic for the first).
    #[default]
    Unset,
}

impl Input {
    pub fn result(name: impl Into<String>) -> Self {
        Self::Result(name.into())
    }
}

/// Gaussian-approximating stack blur. Deviations are in primitive units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurParams {
    pub std_dev_x: f64,
    pub std_dev_y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColorMatrixMode {
    Identity,
    Saturate(f32),
    /// Rotation in degrees around the luma axis.
    HueRotate(f32),
    /// Additive offset applied to R, G and B.
    Brightness(f32),
    /// Scale around mid-grey; 1.0 is identity.
    Contrast(f32),
    LuminanceToAlpha,
    /// Tint towards `color` by `amount` in `[0, 1]`.
    Colourise { color: Rgba8, amount: f32 },
    /// Raw row-major 4x5 coefficients.
    Matrix([f32; 20]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Multiply,
    Screen,
    Darken,
    Lighten,
    Dodge,
    Burn,
    Overlay,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Plus,
    Minus,
    Invert,
    InvertRgb,
    Contrast,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompositeOp {
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic { k1: f32, k2: f32, k3: f32, k4: f32 },
    Blend(BlendMode),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    #[default]
    Duplicate,
    Wrap,
    None,
}

/// Validated convolution kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvolveParams {
    pub order_x: u32,
    pub order_y: u32,
    pub kernel: Vec<f32>,
    pub divisor: f32,
    pub bias: f32,
    pub target_x: u32,
    pub target_y: u32,
    pub edge_mode: EdgeMode,
    pub preserve_alpha: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphologyOp {
    Erode,
    Dilate,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MorphologyParams {
    pub op: MorphologyOp,
    pub radius_x: f64,
    pub radius_y: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    FractalNoise,
    #[default]
    Turbulence,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurbulenceParams {
    pub base_freq_x: f64,
    pub base_freq_y: f64,
    pub octaves: u32,
    pub seed: i32,
    pub stitch: bool,
    pub kind: NoiseKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloodParams {
    pub color: Rgba8,
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetParams {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resample {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
    Blackman,
    Hann,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    None,
    XMinYMin,
    XMidYMin,
    XMaxYMin,
    XMinYMid,
    #[default]
    XMidYMid,
    XMaxYMid,
    XMinYMax,
    XMidYMax,
    XMaxYMax,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetOrSlice {
    #[default]
    Meet,
    Slice,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AspectRatio {
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub fit: MeetOrSlice,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageParams {
    pub image: RasterImage,
    pub aspect: AspectRatio,
    pub resample: Resample,
}

/// One filter primitive with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Blur(BlurParams),
    ColorMatrix(ColorMatrixMode),
    Composite(CompositeOp),
    Convolve(ConvolveParams),
    Morphology(MorphologyParams),
    Turbulence(TurbulenceParams),
    Flood(FloodParams),
    Offset(OffsetParams),
    Image(ImageParams),
    /// Inputs blended in order, the first copied.
    Merge(SmallVec<[Input; 4]>),
}

impl Effect {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Blur(_) => "blur",
            Self::ColorMatrix(_) => "color_matrix",
            Self::Composite(_) => "composite",
            Self::Convolve(_) => "convolve",
            Self::Morphology(_) => "morphology",
            Self::Turbulence(_) => "turbulence",
            Self::Flood(_) => "flood",
            Self::Offset(_) => "offset",
            Self::Image(_) => "image",
            Self::Merge(_) => "merge",
        }
    }

    /// Generators ignore their primary input.
    pub fn is_generator(&self) -> bool {
        matches!(self, Self::Turbulence(_) | Self::Flood(_) | Self::Image(_))
    }

    pub fn needs_mix(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Reads its input in the stored colour space and converts per pixel in float.
    pub fn reads_stored_space(&self) -> bool {
        matches!(self, Self::ColorMatrix(_))
    }

    /// Alpha state the primary input must be in, or `None` when the effect does not care.
    pub fn input_premultiplied(&self) -> Option<bool> {
        match self {
            Self::Blur(_) | Self::Composite(_) | Self::Morphology(_) | Self::Merge(_) => Some(true),
            Self::ColorMatrix(_) | Self::Convolve(_) => Some(false),
            Self::Offset(_) | Self::Turbulence(_) | Self::Flood(_) | Self::Image(_) => None,
        }
    }
}

/// A built node: resolved inputs, reference count and optional folded offset.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectNode {
    pub(crate) name: String,
    pub(crate) id: u32,
    /// `None` when the node failed to build leniently; references to it yield no data.
    pub(crate) effect: Option<Effect>,
    pub(crate) primary: SourceSelector,
    pub(crate) secondary: SourceSelector,
    pub(crate) merge_inputs: SmallVec<[SourceSelector; 4]>,
    pub(crate) subregion: Subregion,
    pub(crate) usage: u32,
    /// Offset node folded into its only consumer; produces no output.
    pub(crate) folded: bool,
    /// Translation applied to the primary input, in primitive units.
    pub(crate) source_offset: Option<Vec2>,
}

impl EffectNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-sensitive hash of the result name (0 for unnamed nodes).
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    pub fn primary(&self) -> SourceSelector {
        self.primary
    }

    pub fn secondary(&self) -> SourceSelector {
        self.secondary
    }

    pub fn usage(&self) -> u32 {
        self.usage
    }

    pub fn is_folded(&self) -> bool {
        self.folded
    }

    pub fn is_dropped(&self) -> bool {
        self.effect.is_none()
    }

    pub fn source_offset(&self) -> Option<Vec2> {
        self.source_offset
    }

    /// Every selector this node reads from.
    pub(crate) fn selectors(&self) -> impl Iterator<Item = SourceSelector> + '_ {
        [self.primary, self.secondary]
            .into_iter()
            .chain(self.merge_inputs.iter().copied())
    }
}
