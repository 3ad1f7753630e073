use crate::{
    foundation::math::mul_div255_u8,
    pixel::buffer::PixelBuffer,
};

/// Source-over of premultiplied `src` onto premultiplied `dst`.
#[inline]
pub(crate) fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Stack the inputs in order: the first is copied, each later one is composited over.
///
/// Ignored inputs contribute nothing.
pub(crate) fn apply(inputs: &[Option<&PixelBuffer>], out: &mut PixelBuffer) {
    let clip = out.clip();
    let mut layers = inputs.iter().flatten();
    let Some(first) = layers.next() else {
        return;
    };
    out.copy_rect_from(first, clip);
    for layer in layers {
        let region = clip.intersect(layer.clip());
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let d = out.pixel(x, y);
                out.set_pixel(x, y, over(d, layer.pixel(x, y)));
            }
        }
    }
    out.set_color_space(first.color_space());
    out.set_premultiplied(true);
}

#[cfg(test)]
#[path = "../../tests/unit/effects/merge.rs"]
mod tests;
