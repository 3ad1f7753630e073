//! Serializable filter configuration.
//!
//! A [`FilterDesc`] is the unvalidated form of a [`FilterGraph`]: result names instead of arena
//! indices, optional attributes instead of resolved defaults. It can be written by hand in JSON
//! or assembled with the [`NodeDesc`] constructors and handed to the builder.

use std::path::Path;

use anyhow::Context;

use crate::{
    foundation::{
        core::Rgba8,
        error::{FilterError, FilterResult},
    },
    graph::{
        FilterGraph,
        node::{
            AspectRatio, BlendMode, EdgeMode, Input, MorphologyOp, NoiseKind, Resample,
        },
    },
    pixel::{buffer::ColorSpace, raster::RasterImage},
    render::region::{FilterUnits, RegionSpec, Subregion},
};

/// Whole-filter configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterDesc {
    #[serde(default)]
    pub region: RegionSpec,
    #[serde(default = "default_primitive_units")]
    pub primitive_units: FilterUnits,
    /// Colour space effects operate in.
    #[serde(default = "default_working_space")]
    pub color_space: ColorSpace,
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
}

impl Default for FilterDesc {
    fn default() -> Self {
        Self {
            region: RegionSpec::default(),
            primitive_units: default_primitive_units(),
            color_space: default_working_space(),
            nodes: Vec::new(),
        }
    }
}

fn default_primitive_units() -> FilterUnits {
    FilterUnits::UserSpace
}

fn default_working_space() -> ColorSpace {
    ColorSpace::LinearRgb
}

impl FilterDesc {
    pub fn from_json_str(s: &str) -> FilterResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| FilterError::config(format!("invalid filter description: {e}")))
    }

    /// Decode every image node's `href` relative to `base_dir`.
    pub fn load_images(&mut self, base_dir: &Path) -> FilterResult<()> {
        for node in &mut self.nodes {
            if let EffectDesc::Image {
                href: Some(href),
                image,
                ..
            } = &mut node.effect
                && image.is_none()
            {
                let path = base_dir.join(href.as_str());
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read image '{}'", path.display()))?;
                *image = Some(RasterImage::decode(&bytes)?);
            }
        }
        Ok(())
    }

    /// Build strictly: the first invalid node fails the whole graph.
    pub fn build(&self) -> FilterResult<FilterGraph> {
        self.builder().build()
    }

    /// Build leniently: invalid nodes are dropped and recorded.
    pub fn build_lenient(&self) -> FilterResult<FilterGraph> {
        self.builder().build_lenient()
    }

    fn builder(&self) -> crate::graph::build::GraphBuilder {
        let mut b = FilterGraph::builder()
            .region(self.region)
            .primitive_units(self.primitive_units)
            .color_space(self.color_space);
        for node in &self.nodes {
            b = b.node(node.clone());
        }
        b
    }
}

/// One node as configured.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDesc {
    /// Result name later nodes refer to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, rename = "in")]
    pub input: Input,
    #[serde(default, rename = "in2")]
    pub mix: Input,
    #[serde(default, flatten)]
    pub subregion: Subregion,
    #[serde(flatten)]
    pub effect: EffectDesc,
}

impl NodeDesc {
    pub fn new(effect: EffectDesc) -> Self {
        Self {
            result: None,
            input: Input::Unset,
            mix: Input::Unset,
            subregion: Subregion::default(),
            effect,
        }
    }

    pub fn result(mut self, name: impl Into<String>) -> Self {
        self.result = Some(name.into());
        self
    }

    pub fn input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    pub fn mix(mut self, mix: Input) -> Self {
        self.mix = mix;
        self
    }

    pub fn subregion(mut self, subregion: Subregion) -> Self {
        self.subregion = subregion;
        self
    }

    pub fn blur(std_dev: f64) -> Self {
        Self::new(EffectDesc::Blur {
            std_deviation: std_dev,
            std_deviation_y: None,
        })
    }

    pub fn blur_xy(std_dev_x: f64, std_dev_y: f64) -> Self {
        Self::new(EffectDesc::Blur {
            std_deviation: std_dev_x,
            std_deviation_y: Some(std_dev_y),
        })
    }

    pub fn color_matrix(mode: ColorMatrixKind, value: Option<f32>) -> Self {
        Self::new(EffectDesc::ColorMatrix {
            mode,
            value,
            values: Vec::new(),
            color: None,
        })
    }

    pub fn color_matrix_values(values: Vec<f32>) -> Self {
        Self::new(EffectDesc::ColorMatrix {
            mode: ColorMatrixKind::Matrix,
            value: None,
            values,
            color: None,
        })
    }

    pub fn composite(operator: CompositeOperator) -> Self {
        Self::new(EffectDesc::Composite {
            operator,
            k: [0.0; 4],
        })
    }

    pub fn arithmetic(k1: f32, k2: f32, k3: f32, k4: f32) -> Self {
        Self::new(EffectDesc::Composite {
            operator: CompositeOperator::Arithmetic,
            k: [k1, k2, k3, k4],
        })
    }

    pub fn blend(mode: BlendMode) -> Self {
        Self::new(EffectDesc::Blend { mode })
    }

    pub fn convolve(order: u32, kernel: Vec<f32>) -> Self {
        Self::new(EffectDesc::Convolve {
            order,
            order_y: None,
            kernel,
            divisor: None,
            bias: 0.0,
            target_x: None,
            target_y: None,
            edge_mode: EdgeMode::default(),
            preserve_alpha: false,
        })
    }

    pub fn morphology(operator: MorphologyOp, radius: f64) -> Self {
        Self::new(EffectDesc::Morphology {
            operator,
            radius,
            radius_y: None,
        })
    }

    pub fn turbulence(base_frequency: f64, num_octaves: u32, seed: f64, kind: NoiseKind) -> Self {
        Self::new(EffectDesc::Turbulence {
            base_frequency,
            base_frequency_y: None,
            num_octaves,
            seed,
            stitch_tiles: false,
            kind,
        })
    }

    pub fn flood(color: Rgba8, opacity: f32) -> Self {
        Self::new(EffectDesc::Flood { color, opacity })
    }

    pub fn offset(dx: f64, dy: f64) -> Self {
        Self::new(EffectDesc::Offset { dx, dy })
    }

    pub fn image(image: RasterImage) -> Self {
        Self::new(EffectDesc::Image {
            href: None,
            image: Some(image),
            aspect: AspectRatio::default(),
            resample: Resample::default(),
        })
    }

    pub fn merge(inputs: Vec<Input>) -> Self {
        Self::new(EffectDesc::Merge { inputs })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMatrixKind {
    Identity,
    Saturate,
    HueRotate,
    Brightness,
    Contrast,
    LuminanceToAlpha,
    Colourise,
    Matrix,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOperator {
    #[default]
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic,
}

/// Unvalidated effect parameters, tagged by `type`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectDesc {
    Blur {
        std_deviation: f64,
        #[serde(default)]
        std_deviation_y: Option<f64>,
    },
    ColorMatrix {
        #[serde(default = "default_matrix_kind")]
        mode: ColorMatrixKind,
        #[serde(default)]
        value: Option<f32>,
        #[serde(default)]
        values: Vec<f32>,
        #[serde(default)]
        color: Option<Rgba8>,
    },
    Composite {
        #[serde(default)]
        operator: CompositeOperator,
        #[serde(default)]
        k: [f32; 4],
    },
    Blend {
        mode: BlendMode,
    },
    Convolve {
        order: u32,
        #[serde(default)]
        order_y: Option<u32>,
        kernel: Vec<f32>,
        #[serde(default)]
        divisor: Option<f32>,
        #[serde(default)]
        bias: f32,
        #[serde(default)]
        target_x: Option<u32>,
        #[serde(default)]
        target_y: Option<u32>,
        #[serde(default)]
        edge_mode: EdgeMode,
        #[serde(default)]
        preserve_alpha: bool,
    },
    Morphology {
        operator: MorphologyOp,
        #[serde(default)]
        radius: f64,
        #[serde(default)]
        radius_y: Option<f64>,
    },
    Turbulence {
        base_frequency: f64,
        #[serde(default)]
        base_frequency_y: Option<f64>,
        #[serde(default = "default_octaves")]
        num_octaves: u32,
        #[serde(default)]
        seed: f64,
        #[serde(default)]
        stitch_tiles: bool,
        #[serde(default)]
        kind: NoiseKind,
    },
    Flood {
        #[serde(default)]
        color: Rgba8,
        #[serde(default = "default_opacity")]
        opacity: f32,
    },
    Offset {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    Image {
        #[serde(default)]
        href: Option<String>,
        #[serde(skip)]
        image: Option<RasterImage>,
        #[serde(default)]
        aspect: AspectRatio,
        #[serde(default)]
        resample: Resample,
    },
    Merge {
        inputs: Vec<Input>,
    },
}

fn default_matrix_kind() -> ColorMatrixKind {
    ColorMatrixKind::Identity
}

fn default_octaves() -> u32 {
    1
}

fn default_opacity() -> f32 {
    1.0
}

#[cfg(test)]
#[path = "../../tests/unit/graph/desc.rs"]
mod tests;
