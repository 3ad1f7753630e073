use crate::foundation::core::{Affine, ClipRect, Rect, Viewport};

/// Coordinate system that region and primitive dimensions are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterUnits {
    /// Fractions of the client geometry's bounding box.
    #[default]
    BoundingBox,
    /// The client's user space (local coordinates before the cumulative transform).
    UserSpace,
}

/// One region edge or extent.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Absolute user-space value.
    Fixed(f64),
    /// Fraction of the reference extent (bounding box or viewport).
    Relative(f64),
}

impl Dimension {
    fn resolve(self, origin: f64, extent: f64) -> f64 {
        match self {
            Self::Fixed(v) => origin + v,
            Self::Relative(f) => origin + f * extent,
        }
    }

    fn resolve_len(self, extent: f64) -> f64 {
        match self {
            Self::Fixed(v) => v,
            Self::Relative(f) => f * extent,
        }
    }
}

/// Optional X/Y/W/H of either the filter region or a primitive subregion.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Subregion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
}

impl Subregion {
    pub fn is_unset(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }
}

/// Filter region description: unit mode plus per-axis dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegionSpec {
    #[serde(default)]
    pub units: FilterUnits,
    #[serde(default, flatten)]
    pub dims: Subregion,
}

/// Default bounding-box margin on each side, as a fraction of the box.
const BBOX_MARGIN: f64 = 0.1;

/// Everything the region calculator needs about the client for one pass.
#[derive(Clone, Copy, Debug)]
pub struct RegionInput {
    pub viewport: Viewport,
    pub transform: Affine,
    /// Tight local-space bounds of the client geometry, if it reported any.
    pub bounds: Option<Rect>,
}

impl RegionInput {
    /// Local bounds, falling back to the viewport mapped back into user space.
    pub fn reference_bounds(&self) -> Rect {
        if let Some(b) = self.bounds
            && b.width() > 0.0
            && b.height() > 0.0
        {
            return b;
        }
        let vp = self.viewport.bounds().to_rect();
        if self.transform.determinant().abs() > f64::EPSILON {
            self.transform.inverse().transform_rect_bbox(vp)
        } else {
            vp
        }
    }
}

/// Filter region in local space and its device-pixel clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedRegion {
    pub local: Rect,
    pub clip: ClipRect,
}

/// Resolve the filter region for one pass. An empty clip means nothing to render.
pub fn filter_region(spec: &RegionSpec, input: &RegionInput) -> ResolvedRegion {
    let vp = input.viewport;
    match spec.units {
        FilterUnits::BoundingBox => {
            let bb = input.reference_bounds();
            let (w, h) = (bb.width(), bb.height());
            let d = &spec.dims;
            let x0 = d
                .x
                .map_or(bb.x0 - BBOX_MARGIN * w, |v| v.resolve(bb.x0, w));
            let y0 = d
                .y
                .map_or(bb.y0 - BBOX_MARGIN * h, |v| v.resolve(bb.y0, h));
            let rw = d
                .width
                .map_or((1.0 + 2.0 * BBOX_MARGIN) * w, |v| v.resolve_len(w));
            let rh = d
                .height
                .map_or((1.0 + 2.0 * BBOX_MARGIN) * h, |v| v.resolve_len(h));
            let local = Rect::new(x0, y0, x0 + rw.max(0.0), y0 + rh.max(0.0));
            ResolvedRegion {
                local,
                clip: device_clip(local, input.transform, vp),
            }
        }
        FilterUnits::UserSpace => {
            let (vw, vh) = (f64::from(vp.width), f64::from(vp.height));
            let d = &spec.dims;
            let x0 = d.x.map_or(0.0, |v| v.resolve(0.0, vw));
            let y0 = d.y.map_or(0.0, |v| v.resolve(0.0, vh));
            let rw = d.width.map_or(vw, |v| v.resolve_len(vw));
            let rh = d.height.map_or(vh, |v| v.resolve_len(vh));
            let local = Rect::new(x0, y0, x0 + rw.max(0.0), y0 + rh.max(0.0));
            let mut clip = ClipRect::covering(input.transform.transform_rect_bbox(local));
            // Unset axes span the whole viewport in device space.
            if d.x.is_none() {
                clip.left = 0;
            }
            if d.y.is_none() {
                clip.top = 0;
            }
            if d.width.is_none() {
                clip.right = vp.bounds().right;
            }
            if d.height.is_none() {
                clip.bottom = vp.bounds().bottom;
            }
            ResolvedRegion {
                local,
                clip: clip.clamp_to(vp.width, vp.height),
            }
        }
    }
}

/// Resolve a primitive subregion against the filter region. Unset edges inherit the region's.
pub fn primitive_subregion(
    sub: &Subregion,
    units: FilterUnits,
    region: &ResolvedRegion,
    input: &RegionInput,
) -> ResolvedRegion {
    if sub.is_unset() {
        return *region;
    }
    let (origin, extent) = match units {
        FilterUnits::BoundingBox => {
            let bb = input.reference_bounds();
            ((bb.x0, bb.y0), (bb.width(), bb.height()))
        }
        FilterUnits::UserSpace => (
            (0.0, 0.0),
            (
                f64::from(input.viewport.width),
                f64::from(input.viewport.height),
            ),
        ),
    };
    let r = region.local;
    let x0 = sub.x.map_or(r.x0, |v| v.resolve(origin.0, extent.0));
    let y0 = sub.y.map_or(r.y0, |v| v.resolve(origin.1, extent.1));
    let x1 = sub.width.map_or(r.x1, |v| x0 + v.resolve_len(extent.0).max(0.0));
    let y1 = sub
        .height
        .map_or(r.y1, |v| y0 + v.resolve_len(extent.1).max(0.0));
    let local = Rect::new(x0, y0, x1.max(x0), y1.max(y0));
    let clip = device_clip(local, input.transform, input.viewport).intersect(region.clip);
    ResolvedRegion { local, clip }
}

fn device_clip(local: Rect, transform: Affine, vp: Viewport) -> ClipRect {
    // Rotated or skewed regions take the axis-aligned envelope.
    ClipRect::covering(transform.transform_rect_bbox(local)).clamp_to(vp.width, vp.height)
}

#[cfg(test)]
#[path = "../../tests/unit/render/region.rs"]
mod tests;
