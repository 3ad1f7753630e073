use std::collections::HashMap;

use smallvec::SmallVec;

use crate::{
    foundation::{
        core::{Rgba8, Vec2},
        error::{FilterError, FilterResult},
        math::name_hash,
    },
    graph::{
        DroppedNode, FilterGraph,
        desc::{ColorMatrixKind, CompositeOperator, EffectDesc, NodeDesc},
        node::{
            BlurParams, ColorMatrixMode, CompositeOp, ConvolveParams, Effect, EffectNode,
            FloodParams, ImageParams, Input, MorphologyParams, NodeId, OffsetParams,
            SourceSelector, TurbulenceParams,
        },
    },
    pixel::buffer::ColorSpace,
    render::region::{FilterUnits, RegionSpec},
};

/// Largest convolution kernel side accepted.
const MAX_KERNEL_ORDER: u32 = 64;

/// Builder for a [`FilterGraph`]. Nodes may only reference results declared before them.
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    region: RegionSpec,
    primitive_units: FilterUnits,
    color_space: ColorSpace,
    nodes: Vec<NodeDesc>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            region: RegionSpec::default(),
            primitive_units: FilterUnits::UserSpace,
            color_space: ColorSpace::LinearRgb,
            nodes: Vec::new(),
        }
    }
}

impl GraphBuilder {
    pub fn region(mut self, region: RegionSpec) -> Self {
        self.region = region;
        self
    }

    pub fn primitive_units(mut self, units: FilterUnits) -> Self {
        self.primitive_units = units;
        self
    }

    /// Working colour space of the effects.
    pub fn color_space(mut self, space: ColorSpace) -> Self {
        self.color_space = space;
        self
    }

    pub fn node(mut self, node: NodeDesc) -> Self {
        self.nodes.push(node);
        self
    }

    /// Fail on the first node that does not validate.
    pub fn build(self) -> FilterResult<FilterGraph> {
        self.finish(false)
    }

    /// Drop nodes that do not validate; references to them yield no data at render time.
    pub fn build_lenient(self) -> FilterResult<FilterGraph> {
        self.finish(true)
    }

    #[tracing::instrument(skip(self), fields(nodes = self.nodes.len()))]
    fn finish(self, lenient: bool) -> FilterResult<FilterGraph> {
        let mut names: HashMap<String, usize> = HashMap::new();
        let mut nodes: Vec<EffectNode> = Vec::with_capacity(self.nodes.len());
        let mut dropped = Vec::new();

        for (index, desc) in self.nodes.iter().enumerate() {
            match build_node(index, desc, &names) {
                Ok(node) => nodes.push(node),
                Err(err) if lenient => {
                    let name = desc.result.clone().unwrap_or_default();
                    tracing::warn!(index, name = %name, error = %err, "dropping filter node");
                    dropped.push(DroppedNode {
                        index,
                        name: name.clone(),
                        reason: err.to_string(),
                    });
                    nodes.push(EffectNode {
                        id: node_id(&name),
                        name,
                        effect: None,
                        primary: SourceSelector::None,
                        secondary: SourceSelector::None,
                        merge_inputs: SmallVec::new(),
                        subregion: desc.subregion,
                        usage: 0,
                        folded: false,
                        source_offset: None,
                    });
                }
                Err(FilterError::Config(msg)) => {
                    return Err(match desc.result.as_deref() {
                        Some(name) => FilterError::config(format!("node '{name}': {msg}")),
                        None => FilterError::config(format!("node #{index}: {msg}")),
                    });
                }
                Err(err) => return Err(err),
            }
            // Later declarations shadow earlier ones with the same name.
            if let Some(name) = &desc.result {
                names.insert(name.clone(), index);
            }
        }

        fold_offsets(&mut nodes);
        count_usage(&mut nodes);

        tracing::debug!(
            nodes = nodes.len(),
            dropped = dropped.len(),
            folded = nodes.iter().filter(|n| n.folded).count(),
            "filter graph built"
        );

        Ok(FilterGraph {
            nodes,
            region: self.region,
            primitive_units: self.primitive_units,
            color_space: self.color_space,
            dropped,
        })
    }
}

fn node_id(name: &str) -> u32 {
    if name.is_empty() { 0 } else { name_hash(name) }
}

fn build_node(
    index: usize,
    desc: &NodeDesc,
    names: &HashMap<String, usize>,
) -> FilterResult<EffectNode> {
    let effect = build_effect(&desc.effect)?;

    let primary = match (&desc.input, &effect) {
        (Input::Unset, Effect::ColorMatrix(_)) => {
            return Err(FilterError::config("color matrix requires an explicit input"));
        }
        // Generators and merges never read the primary input.
        (_, e) if e.is_generator() || matches!(e, Effect::Merge(_)) => SourceSelector::None,
        (input, _) => resolve_input(input, index, names, true)?,
    };
    let secondary = resolve_input(&desc.mix, index, names, false)?;
    if effect.needs_mix() && secondary == SourceSelector::None {
        return Err(FilterError::config("composite requires a mix input"));
    }

    let mut merge_inputs = SmallVec::new();
    if let Effect::Merge(inputs) = &effect {
        if inputs.is_empty() {
            return Err(FilterError::config("merge requires at least one input"));
        }
        for input in inputs {
            merge_inputs.push(resolve_input(input, index, names, true)?);
        }
    }

    let name = desc.result.clone().unwrap_or_default();
    Ok(EffectNode {
        id: node_id(&name),
        name,
        effect: Some(effect),
        primary,
        secondary,
        merge_inputs,
        subregion: desc.subregion,
        usage: 0,
        folded: false,
        source_offset: None,
    })
}

fn resolve_input(
    input: &Input,
    index: usize,
    names: &HashMap<String, usize>,
    primary: bool,
) -> FilterResult<SourceSelector> {
    let previous = || {
        if index == 0 {
            SourceSelector::SourceGraphic
        } else {
            SourceSelector::Reference(NodeId(index - 1))
        }
    };
    Ok(match input {
        Input::SourceGraphic => SourceSelector::SourceGraphic,
        Input::SourceAlpha => SourceSelector::SourceAlpha,
        Input::BackgroundImage => SourceSelector::BackgroundImage,
        Input::BackgroundAlpha => SourceSelector::BackgroundAlpha,
        Input::FillPaint => SourceSelector::FillPaint,
        Input::StrokePaint => SourceSelector::StrokePaint,
        Input::Ignore => SourceSelector::Ignore,
        Input::Previous => previous(),
        Input::Unset if primary => previous(),
        Input::Unset => SourceSelector::None,
        Input::Result(name) => match names.get(name) {
            Some(&i) => SourceSelector::Reference(NodeId(i)),
            None => {
                return Err(FilterError::config(format!(
                    "unknown result '{name}' (references must name an earlier node)"
                )));
            }
        },
    })
}

fn require_finite(what: &str, v: f64) -> FilterResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(FilterError::config(format!("{what} must be finite")))
    }
}

fn non_negative(what: &str, v: f64) -> FilterResult<f64> {
    require_finite(what, v)?;
    if v < 0.0 {
        return Err(FilterError::config(format!("{what} must not be negative")));
    }
    Ok(v)
}

pub(crate) fn build_effect(desc: &EffectDesc) -> FilterResult<Effect> {
    Ok(match desc {
        EffectDesc::Blur {
            std_deviation,
            std_deviation_y,
        } => {
            let x = non_negative("std_deviation", *std_deviation)?;
            let y = non_negative("std_deviation_y", std_deviation_y.unwrap_or(x))?;
            Effect::Blur(BlurParams {
                std_dev_x: x,
                std_dev_y: y,
            })
        }
        EffectDesc::ColorMatrix {
            mode,
            value,
            values,
            color,
        } => Effect::ColorMatrix(build_color_matrix(*mode, *value, values, *color)?),
        EffectDesc::Composite { operator, k } => {
            let [k1, k2, k3, k4] = *k;
            Effect::Composite(match operator {
                CompositeOperator::Over => CompositeOp::Over,
                CompositeOperator::In => CompositeOp::In,
                CompositeOperator::Out => CompositeOp::Out,
                CompositeOperator::Atop => CompositeOp::Atop,
                CompositeOperator::Xor => CompositeOp::Xor,
                CompositeOperator::Arithmetic => {
                    for (i, v) in k.iter().enumerate() {
                        require_finite(&format!("k{}", i + 1), f64::from(*v))?;
                    }
                    CompositeOp::Arithmetic { k1, k2, k3, k4 }
                }
            })
        }
        EffectDesc::Blend { mode } => Effect::Composite(CompositeOp::Blend(*mode)),
        EffectDesc::Convolve {
            order,
            order_y,
            kernel,
            divisor,
            bias,
            target_x,
            target_y,
            edge_mode,
            preserve_alpha,
        } => {
            let order_x = *order;
            let order_y = order_y.unwrap_or(order_x);
            if order_x == 0 || order_y == 0 {
                return Err(FilterError::config("convolution order must be at least 1"));
            }
            if order_x > MAX_KERNEL_ORDER || order_y > MAX_KERNEL_ORDER {
                return Err(FilterError::config(format!(
                    "convolution order {order_x}x{order_y} exceeds {MAX_KERNEL_ORDER}"
                )));
            }
            let expected = (order_x * order_y) as usize;
            if kernel.len() != expected {
                return Err(FilterError::config(format!(
                    "convolution kernel has {} values, expected {expected}",
                    kernel.len()
                )));
            }
            if kernel.iter().any(|v| !v.is_finite()) {
                return Err(FilterError::config("convolution kernel must be finite"));
            }
            let divisor = match divisor {
                Some(d) if *d == 0.0 || !d.is_finite() => {
                    return Err(FilterError::config("convolution divisor must be non-zero"));
                }
                Some(d) => *d,
                None => {
                    let sum: f32 = kernel.iter().sum();
                    if sum == 0.0 { 1.0 } else { sum }
                }
            };
            let target_x = target_x.unwrap_or(order_x / 2);
            let target_y = target_y.unwrap_or(order_y / 2);
            if target_x >= order_x || target_y >= order_y {
                return Err(FilterError::config(format!(
                    "convolution target ({target_x}, {target_y}) outside {order_x}x{order_y} kernel"
                )));
            }
            Effect::Convolve(ConvolveParams {
                order_x,
                order_y,
                kernel: kernel.clone(),
                divisor,
                bias: *bias,
                target_x,
                target_y,
                edge_mode: *edge_mode,
                preserve_alpha: *preserve_alpha,
            })
        }
        EffectDesc::Morphology {
            operator,
            radius,
            radius_y,
        } => {
            let rx = non_negative("radius", *radius)?;
            let ry = non_negative("radius_y", radius_y.unwrap_or(rx))?;
            Effect::Morphology(MorphologyParams {
                op: *operator,
                radius_x: rx,
                radius_y: ry,
            })
        }
        EffectDesc::Turbulence {
            base_frequency,
            base_frequency_y,
            num_octaves,
            seed,
            stitch_tiles,
            kind,
        } => {
            let fx = non_negative("base_frequency", *base_frequency)?;
            let fy = non_negative("base_frequency_y", base_frequency_y.unwrap_or(fx))?;
            require_finite("seed", *seed)?;
            Effect::Turbulence(TurbulenceParams {
                base_freq_x: fx,
                base_freq_y: fy,
                octaves: *num_octaves,
                seed: seed.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32,
                stitch: *stitch_tiles,
                kind: *kind,
            })
        }
        EffectDesc::Flood { color, opacity } => {
            require_finite("opacity", f64::from(*opacity))?;
            Effect::Flood(FloodParams {
                color: *color,
                opacity: opacity.clamp(0.0, 1.0),
            })
        }
        EffectDesc::Offset { dx, dy } => {
            require_finite("dx", *dx)?;
            require_finite("dy", *dy)?;
            Effect::Offset(OffsetParams { dx: *dx, dy: *dy })
        }
        EffectDesc::Image {
            href,
            image,
            aspect,
            resample,
        } => {
            let Some(image) = image else {
                return Err(match href {
                    Some(h) => FilterError::config(format!("image '{h}' was not loaded")),
                    None => FilterError::config("image node has no raster"),
                });
            };
            Effect::Image(ImageParams {
                image: image.clone(),
                aspect: *aspect,
                resample: *resample,
            })
        }
        EffectDesc::Merge { inputs } => Effect::Merge(inputs.iter().cloned().collect()),
    })
}

fn build_color_matrix(
    kind: ColorMatrixKind,
    value: Option<f32>,
    values: &[f32],
    color: Option<Rgba8>,
) -> FilterResult<ColorMatrixMode> {
    if let Some(v) = value
        && !v.is_finite()
    {
        return Err(FilterError::config("color matrix value must be finite"));
    }
    Ok(match kind {
        ColorMatrixKind::Identity => ColorMatrixMode::Identity,
        ColorMatrixKind::Saturate => ColorMatrixMode::Saturate(value.unwrap_or(1.0)),
        ColorMatrixKind::HueRotate => ColorMatrixMode::HueRotate(value.unwrap_or(0.0)),
        ColorMatrixKind::Brightness => ColorMatrixMode::Brightness(value.unwrap_or(0.0)),
        ColorMatrixKind::Contrast => ColorMatrixMode::Contrast(value.unwrap_or(1.0)),
        ColorMatrixKind::LuminanceToAlpha => ColorMatrixMode::LuminanceToAlpha,
        ColorMatrixKind::Colourise => ColorMatrixMode::Colourise {
            color: color.ok_or_else(|| FilterError::config("colourise requires a color"))?,
            amount: value.unwrap_or(1.0).clamp(0.0, 1.0),
        },
        ColorMatrixKind::Matrix => {
            let m: [f32; 20] = values.try_into().map_err(|_| {
                FilterError::config(format!(
                    "color matrix needs exactly 20 values, got {}",
                    values.len()
                ))
            })?;
            if m.iter().any(|v| !v.is_finite()) {
                return Err(FilterError::config("color matrix values must be finite"));
            }
            ColorMatrixMode::Matrix(m)
        }
    })
}

/// Fold offsets consumed exactly once, as their consumer's primary input, into that consumer.
fn fold_offsets(nodes: &mut [EffectNode]) {
    for j in 0..nodes.len() {
        let Some(Effect::Offset(OffsetParams { dx, dy })) = nodes[j].effect else {
            continue;
        };
        let target = SourceSelector::Reference(NodeId(j));
        let consumers: SmallVec<[usize; 2]> = nodes
            .iter()
            .enumerate()
            .skip(j + 1)
            .filter(|(_, n)| !n.folded && n.effect.is_some())
            .flat_map(|(i, n)| n.selectors().filter(move |s| *s == target).map(move |_| i))
            .take(2)
            .collect();
        let [c] = consumers[..] else {
            continue;
        };
        let consumer = &nodes[c];
        let foldable = consumer.primary == target
            && consumer.source_offset.is_none()
            && consumer.effect.as_ref().is_some_and(|e| !e.is_generator());
        if !foldable {
            continue;
        }

        let inner = nodes[j].source_offset.unwrap_or(Vec2::ZERO);
        let source = nodes[j].primary;
        let consumer = &mut nodes[c];
        consumer.primary = source;
        consumer.source_offset = Some(inner + Vec2::new(dx, dy));
        nodes[j].folded = true;
        tracing::trace!(offset = j, consumer = c, "folded offset into consumer");
    }
}

fn count_usage(nodes: &mut [EffectNode]) {
    let mut counts = vec![0u32; nodes.len()];
    for n in nodes.iter().filter(|n| !n.folded && n.effect.is_some()) {
        for id in n.selectors().filter_map(SourceSelector::reference) {
            counts[id.0] = counts[id.0].saturating_add(1);
        }
    }
    for (n, c) in nodes.iter_mut().zip(counts) {
        n.usage = c;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/build.rs"]
mod tests;
