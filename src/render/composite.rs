use crate::foundation::math::mul_div255_u8;
use crate::overlay::composer::{OverlayElement, XPlacement};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over in premultiplied alpha.
///
/// Base frames decoded from video are opaque, which makes their straight RGBA
/// bytes valid premultiplied values; overlay bitmaps are premultiplied by the
/// text renderer.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Resolve an element's left edge against the frame width.
pub fn resolve_x(frame_width: u32, bitmap_width: u32, placement: XPlacement) -> i64 {
    match placement {
        XPlacement::Fixed(x) => x,
        XPlacement::Centered => (i64::from(frame_width) - i64::from(bitmap_width)) / 2,
    }
}

/// Blit a premultiplied bitmap over an opaque RGBA8 frame at `(x, y)`.
///
/// The bitmap is clipped at the frame edges; fully off-frame placements are a
/// no-op.
pub fn blit_over(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    bitmap: &[u8],
    bitmap_width: u32,
    bitmap_height: u32,
    x: i64,
    y: i64,
) {
    let fw = i64::from(frame_width);
    let fh = i64::from(frame_height);
    let bw = i64::from(bitmap_width);
    let bh = i64::from(bitmap_height);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + bw).min(fw);
    let y1 = (y + bh).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for fy in y0..y1 {
        let by = fy - y;
        for fx in x0..x1 {
            let bx = fx - x;
            let src_off = ((by * bw + bx) * 4) as usize;
            let dst_off = ((fy * fw + fx) * 4) as usize;
            let src = [
                bitmap[src_off],
                bitmap[src_off + 1],
                bitmap[src_off + 2],
                bitmap[src_off + 3],
            ];
            let dst = [
                frame[dst_off],
                frame[dst_off + 1],
                frame[dst_off + 2],
                frame[dst_off + 3],
            ];
            let out = over(dst, src);
            frame[dst_off..dst_off + 4].copy_from_slice(&out);
        }
    }
}

/// Composite every element active at `t_sec` onto one frame, in list order.
///
/// List order is the draw order; later elements paint over earlier ones.
pub fn composite_frame(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    elements: &[OverlayElement],
    t_sec: f64,
) {
    for element in elements {
        if !element.active_at(t_sec) {
            continue;
        }
        let x = resolve_x(frame_width, element.bitmap.width, element.x);
        blit_over(
            frame,
            frame_width,
            frame_height,
            &element.bitmap.rgba8_premul,
            element.bitmap.width,
            element.bitmap.height,
            x,
            element.y,
        );
    }
}
