use crate::{
    effects::{self, EffectContext, EffectInputs, NodeCache, offset, turbulence},
    foundation::{core::Viewport, error::FilterResult},
    graph::{
        FilterGraph,
        node::{Effect, EffectNode},
    },
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::convert_buffer,
    },
    render::{
        bank::{BankSlot, ImageBank, ImageBankStats},
        geometry::ClientGeometry,
        options::FilterOptions,
        region::{RegionInput, ResolvedRegion, filter_region, primitive_subregion},
        source::{PassSources, Resolved, SourceImage},
    },
};

/// Why a pass produced nothing. None of these are failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    EmptyGraph,
    EmptyViewport,
    /// The client geometry reported itself hidden or disabled.
    Invisible,
    /// The cumulative transform collapses the geometry.
    DegenerateTransform,
    /// The filter region clamps to zero width or height.
    EmptyRegion,
}

/// Result of one [`Filter::render`] call.
#[derive(Debug)]
pub enum RenderOutcome<'a> {
    /// Premultiplied sRGB pixels, valid until the next call on the same filter.
    Rendered(&'a PixelBuffer),
    Skipped(SkipReason),
}

impl<'a> RenderOutcome<'a> {
    pub fn buffer(&self) -> Option<&'a PixelBuffer> {
        match self {
            Self::Rendered(buf) => Some(buf),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// A built graph plus the state that survives across render passes: the image bank, the
/// source graphic scratch buffer, per-node caches and the noise worker pool.
///
/// One filter drives one pass at a time; concurrent passes need independent filters.
pub struct Filter {
    graph: FilterGraph,
    options: FilterOptions,
    bank: ImageBank,
    source: SourceImage,
    caches: Vec<NodeCache>,
    outputs: Vec<Option<BankSlot>>,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("nodes", &self.graph.len())
            .field("options", &self.options)
            .field("bank", &self.bank.stats())
            .field("pool", &self.pool.as_ref().map(rayon::ThreadPool::current_num_threads))
            .finish()
    }
}

impl Filter {
    pub fn new(graph: FilterGraph) -> FilterResult<Self> {
        Self::with_options(graph, FilterOptions::default())
    }

    pub fn with_options(graph: FilterGraph, options: FilterOptions) -> FilterResult<Self> {
        options.validate()?;
        let mut caches = Vec::with_capacity(graph.len());
        caches.resize_with(graph.len(), NodeCache::default);
        Ok(Self {
            bank: ImageBank::new(options.bank_capacity),
            graph,
            options,
            source: SourceImage::default(),
            caches,
            outputs: Vec::new(),
            pool: None,
        })
    }

    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn bank_stats(&self) -> ImageBankStats {
        self.bank.stats()
    }

    /// Number of times turbulence noise has been synthesized, summed over all nodes.
    pub fn noise_generations(&self) -> u64 {
        self.caches
            .iter()
            .filter_map(|c| c.noise.as_ref())
            .map(|n| n.generations())
            .sum()
    }

    /// Drop every retained buffer and cache; the next pass starts cold.
    pub fn clear(&mut self) {
        self.bank.release_all();
        self.source.clear();
        self.caches.iter_mut().for_each(NodeCache::clear);
        self.outputs.clear();
    }

    /// Run one pass over the graph.
    ///
    /// The returned buffer is viewport-sized, premultiplied and gamma-encoded; pixels outside
    /// the filter clip are transparent.
    #[tracing::instrument(
        skip_all,
        fields(nodes = self.graph.len(), width = viewport.width, height = viewport.height)
    )]
    pub fn render(
        &mut self,
        viewport: Viewport,
        client: &dyn ClientGeometry,
        background: Option<&PixelBuffer>,
    ) -> FilterResult<RenderOutcome<'_>> {
        if self.graph.is_empty() {
            return Ok(RenderOutcome::Skipped(SkipReason::EmptyGraph));
        }
        if viewport.is_empty() {
            return Ok(RenderOutcome::Skipped(SkipReason::EmptyViewport));
        }
        if !client.is_visible() {
            return Ok(RenderOutcome::Skipped(SkipReason::Invisible));
        }
        let transform = client.transform();
        if transform.determinant().abs() <= f64::EPSILON {
            return Ok(RenderOutcome::Skipped(SkipReason::DegenerateTransform));
        }

        let input = RegionInput {
            viewport,
            transform,
            bounds: client.bounds(),
        };
        let region = filter_region(self.graph.region(), &input);
        if region.clip.is_empty() {
            tracing::debug!(region = ?region.local, "filter region is empty");
            return Ok(RenderOutcome::Skipped(SkipReason::EmptyRegion));
        }

        if self.pool.is_none() && self.graph.nodes().iter().any(is_turbulence) {
            let workers = self.options.effective_noise_workers();
            if workers > 1 {
                self.pool = Some(turbulence::build_thread_pool(workers)?);
            }
        }

        self.bank.reset();
        self.source.rendered = false;
        self.outputs.clear();
        self.outputs.resize(self.graph.len(), None);

        let slot = self.run_nodes(&input, &region, client, background)?;
        let out = self.bank.get_mut(slot);
        convert_buffer(out, ColorSpace::Srgb);
        out.premultiply();

        let stats = self.bank.stats();
        tracing::debug!(
            handed_out = stats.handed_out,
            retained_bytes = stats.retained_bytes,
            "filter pass complete"
        );
        Ok(RenderOutcome::Rendered(self.bank.get(slot)))
    }

    /// Evaluate every active node in order and return the slot holding the result.
    fn run_nodes(
        &mut self,
        input: &RegionInput,
        region: &ResolvedRegion,
        client: &dyn ClientGeometry,
        background: Option<&PixelBuffer>,
    ) -> FilterResult<BankSlot> {
        let Self {
            graph,
            options,
            bank,
            source,
            caches,
            outputs,
            pool,
        } = self;
        let (graph, options) = (&*graph, &*options);

        let sources = PassSources {
            graph,
            client,
            background,
            viewport: input.viewport,
            clip: region.clip,
            color_space: graph.color_space(),
        };
        let bounds = input.reference_bounds();
        let mut shared: Option<BankSlot> = None;

        for (index, node) in graph.nodes().iter().enumerate() {
            let Some(effect) = node.effect() else {
                continue;
            };
            if node.is_folded() {
                continue;
            }

            let ctx = EffectContext {
                transform: input.transform,
                primitive_units: graph.primitive_units(),
                bounds,
                region: *region,
                subregion: primitive_subregion(
                    &node.subregion,
                    graph.primitive_units(),
                    region,
                    input,
                ),
                color_space: graph.color_space(),
                options,
                pool: pool.as_ref(),
            };

            let resolved = resolve_inputs(&sources, node, effect, &ctx, outputs, bank, source)
                .inspect_err(|e| {
                    tracing::warn!(
                        node = index,
                        name = node.name(),
                        error = %e,
                        "input resolution failed; aborting pass"
                    );
                })?;

            let slot = if node.usage() > 0 {
                sources.acquire(bank)?
            } else if let Some(slot) = shared {
                // Unreferenced nodes accumulate; bring the canvas back to the working state.
                let buf = bank.get_mut(slot);
                convert_buffer(buf, graph.color_space());
                buf.ensure_premultiplied(true);
                slot
            } else {
                let slot = sources.acquire(bank)?;
                shared = Some(slot);
                slot
            };

            let mut out = bank.take(slot);
            let result = {
                let (bank, source) = (&*bank, &*source);
                let inputs = EffectInputs {
                    input: resolved.input.and_then(|r| r.buffer(bank, source)),
                    mix: resolved.mix.and_then(|r| r.buffer(bank, source)),
                    merge: resolved
                        .merge
                        .iter()
                        .map(|r| r.buffer(bank, source))
                        .collect(),
                };
                effects::apply(effect, &ctx, &inputs, &mut caches[index], &mut out)
            };
            bank.restore(slot, out);
            result?;

            tracing::debug!(
                node = index,
                name = node.name(),
                kind = effect.kind_name(),
                slot = slot.0,
                shared = node.usage() == 0,
                "node evaluated"
            );
            outputs[index] = Some(slot);
        }

        match shared {
            Some(slot) => Ok(slot),
            None => sources.acquire(bank),
        }
    }
}

fn is_turbulence(node: &EffectNode) -> bool {
    matches!(node.effect(), Some(Effect::Turbulence(_)))
}

#[derive(Default)]
struct ResolvedInputs {
    input: Option<Resolved>,
    mix: Option<Resolved>,
    merge: Vec<Resolved>,
}

fn resolve_inputs(
    sources: &PassSources<'_>,
    node: &EffectNode,
    effect: &Effect,
    ctx: &EffectContext<'_>,
    outputs: &[Option<BankSlot>],
    bank: &mut ImageBank,
    source: &mut SourceImage,
) -> FilterResult<ResolvedInputs> {
    let mut resolved = ResolvedInputs::default();
    if effect.is_generator() {
        return Ok(resolved);
    }
    if let Effect::Merge(_) = effect {
        for &sel in &node.merge_inputs {
            resolved
                .merge
                .push(sources.resolve(sel, Some(true), outputs, bank, source)?);
        }
        return Ok(resolved);
    }

    let want = effect.input_premultiplied();
    let space = (!effect.reads_stored_space()).then_some(sources.color_space);
    let mut primary = sources.resolve_in(node.primary(), space, want, outputs, bank, source)?;
    if let Some(shift) = node.source_offset()
        && primary != Resolved::Ignored
    {
        primary = shift_input(sources, primary, shift.x, shift.y, ctx, bank, source)?;
    }
    resolved.input = Some(primary);

    if effect.needs_mix() {
        resolved.mix = Some(sources.resolve(node.secondary(), Some(true), outputs, bank, source)?);
    }
    Ok(resolved)
}

/// Translate a resolved input into a fresh bank buffer for a node with a folded offset.
fn shift_input(
    sources: &PassSources<'_>,
    from: Resolved,
    dx: f64,
    dy: f64,
    ctx: &EffectContext<'_>,
    bank: &mut ImageBank,
    source: &SourceImage,
) -> FilterResult<Resolved> {
    let slot = sources.acquire(bank)?;
    let mut dst = bank.take(slot);
    if let Some(src) = from.buffer(bank, source) {
        let clip = dst.clip();
        offset::translate(src, &mut dst, clip, ctx.device_vector(dx, dy));
    }
    bank.restore(slot, dst);
    Ok(Resolved::Bank(slot))
}

/// One-shot convenience: build a throwaway [`Filter`] and return an owned copy of the result.
///
/// `Ok(None)` means there was nothing to render.
pub fn render_filter(
    graph: &FilterGraph,
    viewport: Viewport,
    client: &dyn ClientGeometry,
    background: Option<&PixelBuffer>,
) -> FilterResult<Option<PixelBuffer>> {
    let mut filter = Filter::new(graph.clone())?;
    let outcome = filter.render(viewport, client, background)?;
    Ok(outcome.buffer().cloned())
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
