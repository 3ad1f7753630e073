use crate::{
    foundation::{
        core::{ClipRect, Viewport},
        error::{FilterError, FilterResult},
    },
    graph::{
        FilterGraph,
        node::{NodeId, SourceSelector},
    },
    pixel::{
        buffer::{ColorSpace, PixelBuffer},
        colorspace::convert_buffer,
    },
    render::{
        bank::{BankSlot, ImageBank},
        geometry::ClientGeometry,
    },
};

/// Filter-free rendering of the client geometry, kept across passes and rendered at most once
/// per pass.
#[derive(Debug, Default)]
pub(crate) struct SourceImage {
    pub buffer: PixelBuffer,
    pub rendered: bool,
}

impl SourceImage {
    pub fn clear(&mut self) {
        self.buffer = PixelBuffer::default();
        self.rendered = false;
    }
}

/// Where a resolved input lives while its consumer runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolved {
    Source,
    Bank(BankSlot),
    /// Read as transparent.
    Ignored,
}

impl Resolved {
    pub fn buffer<'b>(self, bank: &'b ImageBank, source: &'b SourceImage) -> Option<&'b PixelBuffer> {
        match self {
            Self::Source => Some(&source.buffer),
            Self::Bank(slot) => Some(bank.get(slot)),
            Self::Ignored => None,
        }
    }
}

/// Pass-wide facts the resolver needs.
pub(crate) struct PassSources<'p> {
    pub graph: &'p FilterGraph,
    pub client: &'p dyn ClientGeometry,
    pub background: Option<&'p PixelBuffer>,
    pub viewport: Viewport,
    /// Filter clip; banked buffers are clipped to it.
    pub clip: ClipRect,
    /// Working colour space inputs are converted to unless the consumer opts out.
    pub color_space: ColorSpace,
}

impl PassSources<'_> {
    /// Resolve `selector` to a buffer in the working colour space.
    ///
    /// `premultiplied` brings the buffer into that alpha state in place; `None` leaves it as is.
    pub fn resolve(
        &self,
        selector: SourceSelector,
        premultiplied: Option<bool>,
        outputs: &[Option<BankSlot>],
        bank: &mut ImageBank,
        source: &mut SourceImage,
    ) -> FilterResult<Resolved> {
        self.resolve_in(selector, Some(self.color_space), premultiplied, outputs, bank, source)
    }

    /// Like [`Self::resolve`], converting to `space` instead; `None` keeps the stored space.
    pub fn resolve_in(
        &self,
        selector: SourceSelector,
        space: Option<ColorSpace>,
        premultiplied: Option<bool>,
        outputs: &[Option<BankSlot>],
        bank: &mut ImageBank,
        source: &mut SourceImage,
    ) -> FilterResult<Resolved> {
        let resolved = match selector {
            SourceSelector::SourceGraphic => {
                self.render_source(source)?;
                Resolved::Source
            }
            SourceSelector::SourceAlpha => {
                self.render_source(source)?;
                let slot = self.acquire(bank)?;
                copy_alpha(&source.buffer, bank.get_mut(slot), self.clip);
                Resolved::Bank(slot)
            }
            SourceSelector::BackgroundImage | SourceSelector::BackgroundAlpha => {
                let background = self
                    .background
                    .ok_or_else(|| FilterError::no_data("no background snapshot was supplied"))?;
                let slot = self.acquire(bank)?;
                let out = bank.get_mut(slot);
                if selector == SourceSelector::BackgroundAlpha {
                    copy_alpha(background, out, self.clip);
                } else {
                    copy_background(background, out, self.clip);
                }
                Resolved::Bank(slot)
            }
            SourceSelector::Reference(id) => {
                return self.resolve_reference(id, space, premultiplied, outputs, bank, source);
            }
            SourceSelector::Ignore | SourceSelector::None => Resolved::Ignored,
            SourceSelector::FillPaint | SourceSelector::StrokePaint => {
                return Err(FilterError::unsupported(format!(
                    "{selector:?} is not available as a filter input"
                )));
            }
        };

        let buf = match resolved {
            Resolved::Source => &mut source.buffer,
            Resolved::Bank(slot) => bank.get_mut(slot),
            Resolved::Ignored => return Ok(resolved),
        };
        settle(buf, space, premultiplied);
        Ok(resolved)
    }

    /// Walk back through passthrough nodes to the one that produced output.
    fn resolve_reference(
        &self,
        id: NodeId,
        space: Option<ColorSpace>,
        premultiplied: Option<bool>,
        outputs: &[Option<BankSlot>],
        bank: &mut ImageBank,
        source: &mut SourceImage,
    ) -> FilterResult<Resolved> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| FilterError::no_data(format!("node #{} does not exist", id.index())))?;
        if node.is_dropped() {
            return Err(FilterError::no_data(format!(
                "node {} failed to build and has no output",
                display_name(node.name(), id)
            )));
        }
        if node.is_folded() {
            return self.resolve_in(node.primary(), space, premultiplied, outputs, bank, source);
        }
        let slot = outputs.get(id.index()).copied().flatten().ok_or_else(|| {
            FilterError::no_data(format!(
                "node {} produced no output",
                display_name(node.name(), id)
            ))
        })?;
        settle(bank.get_mut(slot), space, premultiplied);
        Ok(Resolved::Bank(slot))
    }

    pub fn acquire(&self, bank: &mut ImageBank) -> FilterResult<BankSlot> {
        bank.acquire(
            self.viewport.width,
            self.viewport.height,
            self.clip,
            self.color_space,
        )
    }

    fn render_source(&self, source: &mut SourceImage) -> FilterResult<()> {
        if source.rendered {
            return Ok(());
        }
        let buf = &mut source.buffer;
        buf.resize(self.viewport.width, self.viewport.height)?;
        buf.clear_transparent();
        buf.set_color_space(ColorSpace::Srgb);
        buf.set_premultiplied(true);
        self.client.render(buf)?;
        source.rendered = true;
        Ok(())
    }
}

fn settle(buf: &mut PixelBuffer, space: Option<ColorSpace>, premultiplied: Option<bool>) {
    if let Some(space) = space {
        convert_buffer(buf, space);
    }
    if let Some(p) = premultiplied {
        buf.ensure_premultiplied(p);
    }
}

fn display_name(name: &str, id: NodeId) -> String {
    if name.is_empty() {
        format!("#{}", id.index())
    } else {
        format!("'{name}'")
    }
}

/// Alpha of `src` with colour zeroed; valid in either alpha state and colour space.
fn copy_alpha(src: &PixelBuffer, dst: &mut PixelBuffer, clip: ClipRect) {
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            let a = src.pixel_or_transparent(x, y)[3];
            dst.set_pixel(x, y, [0, 0, 0, a]);
        }
    }
    dst.set_premultiplied(true);
}

/// Copy the background inside `clip`, adopting its colour state for later conversion.
fn copy_background(src: &PixelBuffer, dst: &mut PixelBuffer, clip: ClipRect) {
    for y in clip.top..clip.bottom {
        for x in clip.left..clip.right {
            dst.set_pixel(x, y, src.pixel_or_transparent(x, y));
        }
    }
    dst.set_color_space(src.color_space());
    dst.set_premultiplied(src.is_premultiplied());
}

#[cfg(test)]
#[path = "../../tests/unit/render/source.rs"]
mod tests;
